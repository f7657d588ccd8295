//! PostgreSQL bulk statement writer
//!
//! Writes the statements of a generation run into a SQL script. Inserts that
//! consist of literals only are appended to per-table bulk files instead and
//! loaded by `COPY ... FROM '<file>'` directives placed in the script:
//!
//! ```sql
//! CREATE SEQUENCE users_seq;
//! COPY users (name, email) FROM '/out/users.blk' WITH ENCODING 'utf-8';
//! UPDATE users SET manager = 1 WHERE name = 'ann';
//! COPY users (name, email) FROM '/out/users.2.blk' WITH ENCODING 'utf-8';
//! ```

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use pgbulk_common::{BulkWriteError, GeneratorContext, GeneratorDialect, Result, Statement};
use serde::Serialize;
use tracing::{debug, info, instrument, trace};

use crate::config::BulkWriterConfig;
use crate::encoder::encode_row;
use crate::encoding::BulkEncoding;
use crate::gate::{SchemaChangeGate, Subscription};
use crate::pool::TableWriterPool;
use crate::router::{classify, closes_bulk_writers, Route};
use crate::stream::SqlStream;

/// Final counts of a closed writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkWriteSummary {
    /// SQL statements, COPY directives and bulk rows
    pub statements_count: u64,
    /// SQL script (if created by the writer) and all bulk files, in creation order
    pub generated_files: Vec<PathBuf>,
}

/// Statement writer that moves literal inserts into COPY bulk files
pub struct PostgresBulkWriter {
    dialect: Arc<dyn GeneratorDialect>,
    pool: Arc<Mutex<TableWriterPool>>,
    sql: SqlStream,
    subscription: Subscription,
}

impl PostgresBulkWriter {
    /// Create a writer for `writer`, placing bulk files into `directory`
    ///
    /// Subscribes to column changes of `context` until the writer is closed.
    pub fn new(
        context: Arc<GeneratorContext>,
        directory: impl AsRef<Path>,
        writer: impl Write + Send + 'static,
        config: BulkWriterConfig,
        dialect: Arc<dyn GeneratorDialect>,
    ) -> Result<Self> {
        let directory = std::path::absolute(directory.as_ref())
            .map_err(|e| BulkWriteError::file(directory.as_ref(), e))?;
        debug!(
            "Creating bulk writer in {} ({}, {})",
            directory.display(),
            config.encoding,
            dialect.name()
        );

        let pool = Arc::new(Mutex::new(TableWriterPool::new(directory, &config)));
        let subscription = Subscription::subscribe(context, SchemaChangeGate::new(&pool));
        let sql = SqlStream::new(
            Box::new(writer),
            config.encoding,
            config.statement_separator,
            config.buffer_capacity,
        );

        Ok(Self {
            dialect,
            pool,
            sql,
            subscription,
        })
    }

    /// Create a writer for a new SQL file, bulk files end up next to it
    ///
    /// The SQL file is the first entry of the generated files.
    pub fn create(
        context: Arc<GeneratorContext>,
        sql_file: impl AsRef<Path>,
        config: BulkWriterConfig,
        dialect: Arc<dyn GeneratorDialect>,
    ) -> Result<Self> {
        let sql_file = std::path::absolute(sql_file.as_ref())
            .map_err(|e| BulkWriteError::file(sql_file.as_ref(), e))?;
        let directory = sql_file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                BulkWriteError::ConfigError(format!(
                    "Cannot determine parent directory for: {}",
                    sql_file.display()
                ))
            })?;
        let file = File::create(&sql_file).map_err(|e| BulkWriteError::file(&sql_file, e))?;

        let writer = Self::new(context, directory, file, config, dialect)?;
        writer.pool.lock().record_generated_file(sql_file);
        Ok(writer)
    }

    /// Directory of the bulk files
    pub fn directory(&self) -> PathBuf {
        self.pool.lock().directory().to_path_buf()
    }

    pub fn encoding(&self) -> BulkEncoding {
        self.pool.lock().encoding()
    }

    /// All files generated so far, closed or not
    pub fn generated_files(&self) -> Vec<PathBuf> {
        self.pool.lock().generated_files().to_vec()
    }

    pub fn statements_count(&self) -> u64 {
        self.sql.statements_count()
    }

    /// Tables that currently have an open bulk file
    pub fn open_tables(&self) -> Vec<String> {
        self.pool
            .lock()
            .open_tables()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Write a generated statement
    pub fn write_statement(&mut self, statement: &Statement) -> Result<()> {
        match classify(statement, self.dialect.as_ref()) {
            Route::Bulk(insert) => {
                let line = encode_row(&insert.table, &insert.values)?;
                let mut pool = self.pool.lock();
                // Convert before acquiring so a row that cannot be encoded opens no file
                let row = pool.encoding().encode(&line)?;
                pool.acquire(&insert.table, self.dialect.as_ref(), &mut self.sql)?
                    .write_row(&row)?;
                self.sql.count_statement();
                Ok(())
            }
            Route::Plain(sql) => self.write_plain_statement(&sql),
        }
    }

    /// Write SQL text to the script
    ///
    /// Closes all open bulk files first, unless the statement is a truncation.
    pub fn write_plain_statement(&mut self, sql: &str) -> Result<()> {
        if closes_bulk_writers(sql) {
            self.pool.lock().close_all()?;
        } else {
            trace!("Keeping bulk files open for truncation");
        }
        self.sql.write_statement(sql)
    }

    /// Close the bulk file of a table, the next row starts a new file
    pub fn close_bulk_writer(&mut self, table: &str) -> Result<bool> {
        self.pool.lock().invalidate(table)
    }

    /// Flush all bulk files, then the SQL script
    pub fn flush(&mut self) -> Result<()> {
        self.pool.lock().flush_all()?;
        self.sql.flush()
    }

    /// Unsubscribe from the context, close all files and report the counts
    #[instrument(skip(self))]
    pub fn close(mut self) -> Result<BulkWriteSummary> {
        self.subscription.cancel();
        let generated_files = {
            let mut pool = self.pool.lock();
            pool.close_all()?;
            pool.generated_files().to_vec()
        };
        self.sql.flush()?;

        let summary = BulkWriteSummary {
            statements_count: self.sql.statements_count(),
            generated_files,
        };
        info!(
            "{} statements and {} files written",
            summary.statements_count,
            summary.generated_files.len()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgbulk_common::{Column, InsertStatement, PostgresDialect, Table};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn setup() -> (
        tempfile::TempDir,
        Arc<GeneratorContext>,
        SharedBuffer,
        PostgresBulkWriter,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let context = Arc::new(GeneratorContext::new());
        let buffer = SharedBuffer::default();
        let writer = PostgresBulkWriter::new(
            Arc::clone(&context),
            dir.path(),
            buffer.clone(),
            BulkWriterConfig::default(),
            Arc::new(PostgresDialect),
        )
        .unwrap();
        (dir, context, buffer, writer)
    }

    fn insert(table: &Table, value: i64) -> Statement {
        InsertStatement::new(table.clone())
            .with_value("a", value)
            .into()
    }

    #[test]
    fn test_counts_rows_and_directive() {
        let (dir, context, buffer, mut writer) = setup();
        let table = Table::new("t").with_column("a");

        for i in 0..5 {
            writer.write_statement(&insert(&table, i)).unwrap();
        }
        assert_eq!(writer.statements_count(), 6);

        let summary = writer.close().unwrap();
        assert_eq!(summary.statements_count, 6);
        assert_eq!(summary.generated_files, vec![dir.path().join("t.blk")]);
        assert_eq!(context.listener_count(), 0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("t.blk")).unwrap(),
            "0\n1\n2\n3\n4\n"
        );
        assert_eq!(buffer.text().lines().count(), 1);
    }

    #[test]
    fn test_truncate_keeps_writer_open() {
        let (_dir, _context, buffer, mut writer) = setup();
        let table = Table::new("t").with_column("a");

        writer.write_statement(&insert(&table, 1)).unwrap();
        writer.write_plain_statement("TRUNCATE other").unwrap();
        assert_eq!(writer.open_tables(), vec!["t".to_string()]);

        writer.write_statement(&insert(&table, 2)).unwrap();
        let summary = writer.close().unwrap();
        assert_eq!(summary.generated_files.len(), 1);
        assert!(buffer.text().ends_with("TRUNCATE other;\n"));
    }

    #[test]
    fn test_schema_change_rotates_file() {
        let (dir, context, buffer, mut writer) = setup();
        context.register_table(Table::new("t").with_column("a"));

        let first = context.table("t").unwrap();
        writer.write_statement(&insert(&first, 1)).unwrap();

        context.add_column(Column::new("t", "b")).unwrap();
        assert!(writer.open_tables().is_empty());

        let second = context.table("t").unwrap();
        writer
            .write_statement(
                &InsertStatement::new(second)
                    .with_value("a", 2)
                    .with_value("b", "x")
                    .into(),
            )
            .unwrap();
        writer.close().unwrap();

        let script = buffer.text();
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("COPY t (a) FROM "));
        assert!(lines[1].starts_with("COPY t (a, b) FROM "));
        assert!(lines[1].contains("t.2.blk"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("t.2.blk")).unwrap(),
            "2\tx\n"
        );
    }

    #[test]
    fn test_unencodable_first_row_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let context = Arc::new(GeneratorContext::new());
        let buffer = SharedBuffer::default();
        let mut writer = PostgresBulkWriter::new(
            Arc::clone(&context),
            dir.path(),
            buffer.clone(),
            BulkWriterConfig::default().with_encoding(BulkEncoding::Ascii),
            Arc::new(PostgresDialect),
        )
        .unwrap();
        let table = Table::new("t").with_column("a");

        let result =
            writer.write_statement(&InsertStatement::new(table).with_value("a", "é").into());
        assert!(matches!(result, Err(BulkWriteError::Encoding(_))));
        assert_eq!(writer.statements_count(), 0);
        assert!(writer.open_tables().is_empty());

        let summary = writer.close().unwrap();
        assert!(summary.generated_files.is_empty());
        assert!(buffer.text().is_empty());
        assert!(!dir.path().join("t.blk").exists());
    }

    #[test]
    fn test_flush_writes_through() {
        let (dir, _context, buffer, mut writer) = setup();
        let table = Table::new("t").with_column("a");

        writer.write_statement(&insert(&table, 7)).unwrap();
        writer.flush().unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("t.blk")).unwrap(),
            "7\n"
        );
        assert!(buffer.text().starts_with("COPY t (a) FROM "));
        writer.close().unwrap();
    }
}
