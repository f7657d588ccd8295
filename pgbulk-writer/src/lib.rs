//! pgbulk Writer
//!
//! Turns the statements of a generation run into a PostgreSQL script that
//! loads literal rows through `COPY ... FROM '<file>'` bulk files:
//! - Literal inserts are encoded in the COPY text format, one file per table
//! - Each file is announced by a COPY directive at its position in the script
//! - Plain statements close the open files so later rows get a new directive
//! - Column discovery for a table rotates that table's file
//!
//! Configuration via environment variables (see [`BulkWriterConfig::from_env`]):
//! - PGBULK_ENCODING: encoding of the script and the bulk files
//! - PGBULK_STATEMENT_SEPARATOR: statement terminator
//! - PGBULK_BUFFER_CAPACITY: write buffer size in bytes

pub mod config;
pub mod encoder;
pub mod encoding;
pub mod gate;
pub mod pool;
pub mod replay;
pub mod router;
pub mod stream;
pub mod writer;

pub use config::BulkWriterConfig;
pub use encoder::{decode_field, encode_row, escape_text};
pub use encoding::BulkEncoding;
pub use gate::{SchemaChangeGate, Subscription};
pub use pool::{BulkFile, TableWriterPool};
pub use replay::{replay, ReplayError, ReplayEvent, ReplayStats};
pub use router::{classify, closes_bulk_writers, Route};
pub use writer::{BulkWriteSummary, PostgresBulkWriter};

// Re-export common types
pub use pgbulk_common::{
    BulkWriteError, Column, ColumnExpression, GeneratorContext, GeneratorDialect,
    InsertStatement, PostgresDialect, Result, Statement, Table, Value,
};
