//! Statements produced by the generation pipeline

use std::collections::HashMap;

use crate::dialect::GeneratorDialect;
use crate::model::Table;
use crate::value::{ColumnExpression, Value};

/// Column name to expression
pub type ColumnValues = HashMap<String, ColumnExpression>;

/// A single row insert
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Table description at the time the row was generated
    pub table: Table,
    /// Assigned expressions, columns without an entry are NULL
    pub values: ColumnValues,
}

impl InsertStatement {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            values: ColumnValues::new(),
        }
    }

    /// Assign a literal
    pub fn with_value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values
            .insert(column.into(), ColumnExpression::literal(value));
        self
    }

    /// Assign a raw SQL expression
    pub fn with_plain(mut self, column: impl Into<String>, sql: impl Into<String>) -> Self {
        self.values
            .insert(column.into(), ColumnExpression::plain(sql));
        self
    }

    pub fn set(&mut self, column: impl Into<String>, expression: ColumnExpression) {
        self.values.insert(column.into(), expression);
    }

    /// True if any value is a raw SQL fragment, which rules out bulk files
    pub fn has_plain_expression(&self) -> bool {
        self.values.values().any(ColumnExpression::is_plain)
    }

    /// Render as `INSERT INTO ... VALUES ...`, columns in table order
    pub fn to_sql(&self, dialect: &dyn GeneratorDialect) -> String {
        let mut columns = Vec::with_capacity(self.values.len());
        let mut values = Vec::with_capacity(self.values.len());
        for column in self.table.columns() {
            if let Some(expression) = self.values.get(&column.name) {
                columns.push(column.name.as_str());
                values.push(match expression {
                    ColumnExpression::Primitive(value) => dialect.format_value(value),
                    ColumnExpression::Plain { sql } => sql.clone(),
                });
            }
        }

        if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.table.name())
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table.name(),
                columns.join(", "),
                values.join(", ")
            )
        }
    }
}

/// A statement of the generated script
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Row insert, candidate for a bulk file
    Insert(InsertStatement),
    /// Any other SQL (updates, DDL, truncations, sequence adjustments)
    Raw(String),
}

impl Statement {
    pub fn raw(sql: impl Into<String>) -> Self {
        Statement::Raw(sql.into())
    }

    /// SQL text of the statement, without separator
    pub fn to_sql(&self, dialect: &dyn GeneratorDialect) -> String {
        match self {
            Statement::Insert(insert) => insert.to_sql(dialect),
            Statement::Raw(sql) => sql.clone(),
        }
    }
}

impl From<InsertStatement> for Statement {
    fn from(insert: InsertStatement) -> Self {
        Statement::Insert(insert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::PostgresDialect;

    fn people() -> Table {
        Table::new("people")
            .with_generated_column("id")
            .with_column("name")
            .with_column("created")
    }

    #[test]
    fn test_insert_to_sql_uses_table_order() {
        let insert = InsertStatement::new(people())
            .with_plain("created", "now()")
            .with_value("name", "Ann");

        assert!(insert.has_plain_expression());
        assert_eq!(
            insert.to_sql(&PostgresDialect),
            "INSERT INTO people (name, created) VALUES ('Ann', now())"
        );
    }

    #[test]
    fn test_insert_without_values() {
        let insert = InsertStatement::new(people());
        assert!(!insert.has_plain_expression());
        assert_eq!(
            Statement::from(insert).to_sql(&PostgresDialect),
            "INSERT INTO people DEFAULT VALUES"
        );
    }
}
