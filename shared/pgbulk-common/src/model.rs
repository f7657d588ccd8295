//! Table descriptions handed over by the generation pipeline
//!
//! The model is treated as already resolved: names are used verbatim and
//! column order is the order of the fields in every generated row.

use serde::{Deserialize, Serialize};

use crate::error::BulkWriteError;

/// Table identifier
pub type TableName = String;

/// A column of a generated table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Name of the owning table
    pub table: TableName,
    /// Value is produced by the database (identity, serial, defaults)
    #[serde(default)]
    pub auto_generated: bool,
}

impl Column {
    /// Create a regular column
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            auto_generated: false,
        }
    }

    /// Create a column whose value is generated by the database
    pub fn generated(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            auto_generated: true,
            ..Self::new(table, name)
        }
    }

    pub fn is_auto_generated(&self) -> bool {
        self.auto_generated
    }
}

/// A table with its columns in definition order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    name: TableName,
    columns: Vec<Column>,
}

impl Table {
    /// Create a table without columns
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a regular column
    pub fn with_column(mut self, name: impl Into<String>) -> Self {
        let column = Column::new(self.name.clone(), name);
        self.columns.push(column);
        self
    }

    /// Add a database-generated column
    pub fn with_generated_column(mut self, name: impl Into<String>) -> Self {
        let column = Column::generated(self.name.clone(), name);
        self.columns.push(column);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All columns in definition order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Columns that are part of a bulk row (everything not generated by the database)
    pub fn bulk_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|column| !column.is_auto_generated())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Append a column at the end of the table
    ///
    /// Fails if the column belongs to another table or the name is taken.
    pub fn add_column(&mut self, column: Column) -> Result<(), BulkWriteError> {
        if column.table != self.name {
            return Err(BulkWriteError::SchemaError(format!(
                "Column {} belongs to {}, not to {}",
                column.name, column.table, self.name
            )));
        }
        if self.column(&column.name).is_some() {
            return Err(BulkWriteError::SchemaError(format!(
                "Column {} already exists in {}",
                column.name, self.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }
}
