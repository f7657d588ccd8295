//! Statement classification
//!
//! A COPY directive loads its file at the position it occupies in the SQL
//! script. Rows appended to a file after an unrelated statement would still
//! be loaded before that statement, so every plain statement closes the open
//! bulk files first. Truncations are the only exception.

use std::borrow::Cow;

use pgbulk_common::{GeneratorDialect, InsertStatement, Statement};

/// Prefix of statements that keep the open bulk files
pub const TRUNCATE_PREFIX: &str = "TRUNCATE ";

/// Where a statement goes
#[derive(Debug, PartialEq)]
pub enum Route<'a> {
    /// Row for the table's bulk file
    Bulk(&'a InsertStatement),
    /// Inline SQL for the main script
    Plain(Cow<'a, str>),
}

/// Bulk path for inserts made of literals only, inline SQL for everything else
///
/// Tables without a column to load (all database generated) are inlined too,
/// `COPY t ()` is not valid.
pub fn classify<'a>(statement: &'a Statement, dialect: &dyn GeneratorDialect) -> Route<'a> {
    match statement {
        Statement::Insert(insert) if is_bulk_candidate(insert) => Route::Bulk(insert),
        Statement::Insert(_) => Route::Plain(Cow::Owned(statement.to_sql(dialect))),
        Statement::Raw(sql) => Route::Plain(Cow::Borrowed(sql)),
    }
}

fn is_bulk_candidate(insert: &InsertStatement) -> bool {
    !insert.has_plain_expression() && insert.table.bulk_columns().next().is_some()
}

/// True if writing `sql` inline requires closing all open bulk files
///
/// The prefix match is exact and case sensitive.
pub fn closes_bulk_writers(sql: &str) -> bool {
    !sql.starts_with(TRUNCATE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgbulk_common::{PostgresDialect, Table};

    fn table() -> Table {
        Table::new("t").with_column("a").with_column("b")
    }

    #[test]
    fn test_literal_insert_goes_to_bulk() {
        let statement = Statement::from(InsertStatement::new(table()).with_value("a", 1));
        assert!(matches!(
            classify(&statement, &PostgresDialect),
            Route::Bulk(_)
        ));
    }

    #[test]
    fn test_insert_with_plain_expression_is_inlined() {
        let statement = Statement::from(
            InsertStatement::new(table())
                .with_value("a", 1)
                .with_plain("b", "currval('t_seq')"),
        );
        assert_eq!(
            classify(&statement, &PostgresDialect),
            Route::Plain(Cow::Borrowed(
                "INSERT INTO t (a, b) VALUES (1, currval('t_seq'))"
            ))
        );
    }

    #[test]
    fn test_generated_only_table_is_inlined() {
        let statement = Statement::from(InsertStatement::new(
            Table::new("counters").with_generated_column("id"),
        ));
        assert_eq!(
            classify(&statement, &PostgresDialect),
            Route::Plain(Cow::Borrowed("INSERT INTO counters DEFAULT VALUES"))
        );
    }

    #[test]
    fn test_raw_statement_is_inlined() {
        let statement = Statement::raw("UPDATE t SET a = 2");
        assert_eq!(
            classify(&statement, &PostgresDialect),
            Route::Plain(Cow::Borrowed("UPDATE t SET a = 2"))
        );
    }

    #[test]
    fn test_only_truncate_keeps_writers() {
        assert!(!closes_bulk_writers("TRUNCATE t"));
        assert!(closes_bulk_writers("UPDATE t SET a = 1"));
        assert!(closes_bulk_writers("truncate t"));
        assert!(closes_bulk_writers("TRUNCATE"));
        assert!(closes_bulk_writers("DELETE FROM t"));
    }
}
