//! pgbulk Common Library
//!
//! Shared types for the bulk writer: the table model handed over by the
//! generation pipeline, the statements it produces, the SQL dialect used to
//! quote them and the context that announces model changes.

pub mod context;
pub mod dialect;
pub mod error;
pub mod model;
pub mod statement;
pub mod value;

// Re-export commonly used types
pub use context::{ContextModelListener, GeneratorContext, ListenerId};
pub use dialect::{GeneratorDialect, PostgresDialect};
pub use error::BulkWriteError;
pub use model::{Column, Table, TableName};
pub use statement::{ColumnValues, InsertStatement, Statement};
pub use value::{ColumnExpression, Value};

/// Result type alias for bulk writer operations
pub type Result<T> = std::result::Result<T, BulkWriteError>;
