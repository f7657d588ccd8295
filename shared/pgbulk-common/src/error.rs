//! Error types for the bulk writer

use std::path::PathBuf;

use thiserror::Error;

/// Bulk writer errors
#[derive(Error, Debug)]
pub enum BulkWriteError {
    /// I/O error on the main statement stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error on a specific file (bulk file or SQL file)
    #[error("I/O error on {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failure raised while reacting to a model change
    #[error("Model error: {message}")]
    Model {
        message: String,
        #[source]
        source: Box<BulkWriteError>,
    },

    /// Text that cannot be represented in the configured encoding
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Raw SQL expression where only literals are allowed
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// Table not registered in the model
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Inconsistent table description
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BulkWriteError {
    /// Attach the file path to an I/O error
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BulkWriteError::File {
            path: path.into(),
            source,
        }
    }

    /// Wrap an error raised inside a model listener
    pub fn model(message: impl Into<String>, source: BulkWriteError) -> Self {
        BulkWriteError::Model {
            message: message.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_model_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = BulkWriteError::model(
            "Could not close the writer for users",
            BulkWriteError::file("/tmp/users.blk", io),
        );

        assert_eq!(
            err.to_string(),
            "Model error: Could not close the writer for users"
        );
        let source = err.source().expect("source");
        assert!(source.to_string().contains("/tmp/users.blk"));
        assert!(source.to_string().contains("disk full"));
    }
}
