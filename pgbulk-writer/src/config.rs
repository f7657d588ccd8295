//! Configuration for the bulk writer
//!
//! Values come from defaults, the environment (`PGBULK_*`, optionally from a
//! `.env` file) or a property map supplied by the embedding application.

use std::collections::HashMap;

use pgbulk_common::Result;
use serde::{Deserialize, Serialize};

use crate::encoding::BulkEncoding;

/// Separator appended to every statement of the SQL script
pub const DEFAULT_STATEMENT_SEPARATOR: &str = ";\n";

/// Buffer size of every bulk file and of the SQL script
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Bulk writer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkWriterConfig {
    /// Encoding of the SQL script and all bulk files
    pub encoding: BulkEncoding,
    /// Terminator of every statement in the SQL script
    pub statement_separator: String,
    /// Write buffer size in bytes
    pub buffer_capacity: usize,
}

impl Default for BulkWriterConfig {
    fn default() -> Self {
        Self {
            encoding: BulkEncoding::Utf8,
            statement_separator: DEFAULT_STATEMENT_SEPARATOR.to_string(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl BulkWriterConfig {
    /// Load configuration from environment variables
    ///
    /// - PGBULK_ENCODING (default UTF-8)
    /// - PGBULK_STATEMENT_SEPARATOR (default ";\n", `\n` is unescaped)
    /// - PGBULK_BUFFER_CAPACITY (bytes, default 8192)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let props: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with("PGBULK_"))
            .collect();
        Self::from_properties(&props)
    }

    /// Load configuration from a property map
    ///
    /// Accepts the lower-case property names (`pgbulk_encoding`) as well as
    /// the environment spelling (`PGBULK_ENCODING`).
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        fn lookup<'a>(props: &'a HashMap<String, String>, key: &str) -> Option<&'a String> {
            props
                .get(key)
                .or_else(|| props.get(&key.to_ascii_uppercase()))
        }

        let defaults = Self::default();

        let encoding = match lookup(props, "pgbulk_encoding") {
            Some(label) => label.parse()?,
            None => defaults.encoding,
        };
        let statement_separator = lookup(props, "pgbulk_statement_separator")
            .map(|value| unescape_separator(value))
            .unwrap_or(defaults.statement_separator);
        let buffer_capacity = lookup(props, "pgbulk_buffer_capacity")
            .and_then(|v| v.parse().ok())
            .filter(|capacity| *capacity > 0)
            .unwrap_or(defaults.buffer_capacity);

        Ok(Self {
            encoding,
            statement_separator,
            buffer_capacity,
        })
    }

    pub fn with_encoding(mut self, encoding: BulkEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_statement_separator(mut self, separator: impl Into<String>) -> Self {
        self.statement_separator = separator.into();
        self
    }
}

/// Environment values cannot easily carry line breaks
fn unescape_separator(value: &str) -> String {
    value.replace("\\r", "\r").replace("\\n", "\n")
}
