//! Per-table bulk file management
//!
//! Every table has at most one open bulk file. The file is opened lazily on
//! the first row and announced with a `COPY ... FROM '<file>'` directive in
//! the SQL script. A closed file is never reopened: the next row for the same
//! table starts `<table>.2.blk`, `<table>.3.blk` and so on, each with its own
//! directive at the current position of the script.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pgbulk_common::{BulkWriteError, GeneratorDialect, Result, Table, TableName};
use tracing::{debug, error, trace};

use crate::config::BulkWriterConfig;
use crate::encoding::BulkEncoding;
use crate::stream::SqlStream;

/// File extension of bulk files
pub const BULK_FILE_EXTENSION: &str = "blk";

/// A bulk file created for a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFile {
    /// Absolute path of the file
    pub path: PathBuf,
    pub table: TableName,
    /// 1 for `<table>.blk`, n for `<table>.<n>.blk`
    pub sequence: u32,
}

/// An open bulk file
pub struct BulkFileWriter {
    file: BulkFile,
    writer: BufWriter<File>,
    rows: u64,
}

impl BulkFileWriter {
    fn create(file: BulkFile, buffer_capacity: usize) -> Result<Self> {
        let handle =
            File::create(&file.path).map_err(|e| BulkWriteError::file(&file.path, e))?;
        Ok(Self {
            file,
            writer: BufWriter::with_capacity(buffer_capacity, handle),
            rows: 0,
        })
    }

    pub fn file(&self) -> &BulkFile {
        &self.file
    }

    /// Rows written to this file
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Append a row already converted to the pool's encoding
    pub fn write_row(&mut self, row: &[u8]) -> Result<()> {
        self.writer
            .write_all(row)
            .map_err(|e| BulkWriteError::file(&self.file.path, e))?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| BulkWriteError::file(&self.file.path, e))
    }

    fn close(mut self) -> Result<BulkFile> {
        self.flush()?;
        debug!(
            "Closed bulk file {} ({} rows)",
            self.file.path.display(),
            self.rows
        );
        Ok(self.file)
    }
}

/// Open bulk files by table
pub struct TableWriterPool {
    directory: PathBuf,
    encoding: BulkEncoding,
    buffer_capacity: usize,
    /// Sequence number of the next file per table, absent until the first file
    file_numbers: HashMap<TableName, u32>,
    open: HashMap<TableName, BulkFileWriter>,
    /// Every file ever opened, in creation order
    generated_files: Vec<PathBuf>,
}

impl TableWriterPool {
    /// Create a pool writing into `directory`, which must be absolute
    pub fn new(directory: impl Into<PathBuf>, config: &BulkWriterConfig) -> Self {
        Self {
            directory: directory.into(),
            encoding: config.encoding,
            buffer_capacity: config.buffer_capacity,
            file_numbers: HashMap::new(),
            open: HashMap::new(),
            generated_files: Vec::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn encoding(&self) -> BulkEncoding {
        self.encoding
    }

    pub fn generated_files(&self) -> &[PathBuf] {
        &self.generated_files
    }

    /// Add a file created outside the pool (the SQL script) to the files log
    pub fn record_generated_file(&mut self, path: impl Into<PathBuf>) {
        self.generated_files.push(path.into());
    }

    pub fn is_open(&self, table: &str) -> bool {
        self.open.contains_key(table)
    }

    /// Tables with an open bulk file, sorted by name
    pub fn open_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = self.open.keys().map(String::as_str).collect();
        tables.sort_unstable();
        tables
    }

    /// The open bulk file of `table`, opening a new one if necessary
    ///
    /// Opening creates the file, then writes its COPY directive to `sql` and
    /// counts it as a statement. A file that cannot be created leaves `sql`
    /// untouched.
    pub fn acquire(
        &mut self,
        table: &Table,
        dialect: &dyn GeneratorDialect,
        sql: &mut SqlStream,
    ) -> Result<&mut BulkFileWriter> {
        match self.open.entry(table.name().to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let sequence = next_sequence(&mut self.file_numbers, table.name());
                let file = BulkFile {
                    path: self.directory.join(file_name(table.name(), sequence)),
                    table: table.name().to_string(),
                    sequence,
                };

                let directive = copy_directive(table, &file.path, self.encoding, dialect)?;
                let writer = BulkFileWriter::create(file, self.buffer_capacity)?;
                debug!(
                    "Opened bulk file {} for {}",
                    writer.file.path.display(),
                    table.name()
                );
                self.generated_files.push(writer.file.path.clone());
                sql.write_statement(&directive)?;
                Ok(entry.insert(writer))
            }
        }
    }

    /// Close the bulk file of `table`, returns false if none was open
    pub fn invalidate(&mut self, table: &str) -> Result<bool> {
        match self.open.remove(table) {
            Some(writer) => {
                trace!("Invalidating bulk file of {}", table);
                writer.close()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close all open bulk files
    ///
    /// Every file is closed even if an earlier one fails; the first failure is
    /// returned and later ones are logged.
    pub fn close_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for (table, writer) in self.open.drain() {
            if let Err(e) = writer.close() {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    error!("Failed to close bulk file of {}: {}", table, e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Flush all open bulk files without closing them
    pub fn flush_all(&mut self) -> Result<()> {
        for writer in self.open.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Sequence of the next file for `table`: 1 the first time, then 2, 3, ...
fn next_sequence(file_numbers: &mut HashMap<TableName, u32>, table: &str) -> u32 {
    match file_numbers.get_mut(table) {
        Some(number) => {
            let sequence = *number;
            *number += 1;
            sequence
        }
        None => {
            file_numbers.insert(table.to_string(), 2);
            1
        }
    }
}

/// `<table>.blk` for the first file, `<table>.<n>.blk` afterwards
pub fn file_name(table: &str, sequence: u32) -> String {
    if sequence <= 1 {
        format!("{}.{}", table, BULK_FILE_EXTENSION)
    } else {
        format!("{}.{}.{}", table, sequence, BULK_FILE_EXTENSION)
    }
}

/// `COPY <table> (<columns>) FROM '<path>' WITH ENCODING '<encoding>'`
///
/// Lists the columns of a bulk row: database-generated columns are omitted.
/// Fails for a path that is not valid UTF-8.
pub fn copy_directive(
    table: &Table,
    path: &Path,
    encoding: BulkEncoding,
    dialect: &dyn GeneratorDialect,
) -> Result<String> {
    let location = path.to_str().ok_or_else(|| {
        BulkWriteError::Encoding(format!(
            "Bulk file path {} is not valid UTF-8",
            path.display()
        ))
    })?;
    let columns = table
        .bulk_columns()
        .map(|column| column.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "COPY {} ({}) FROM {} WITH ENCODING {}",
        table.name(),
        columns,
        dialect.quote_string(location),
        dialect.quote_string(&encoding.directive_name())
    ))
}
