//! SQL dialect used to render literals into statements

use crate::value::Value;

/// Quoting rules of the target database
pub trait GeneratorDialect: Send + Sync {
    /// Dialect name for logging
    fn name(&self) -> &'static str;

    /// Quote a string literal, including the enclosing quotes
    fn quote_string(&self, value: &str) -> String;

    /// Render a literal for an inline SQL statement
    fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(_) | Value::Float(_) => value.to_string(),
            Value::Uuid(_) | Value::Timestamp(_) | Value::Text(_) => {
                self.quote_string(&value.to_string())
            }
        }
    }
}

/// PostgreSQL quoting
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl GeneratorDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    /// Doubles single quotes; strings with backslashes use the escape string
    /// syntax so they do not depend on `standard_conforming_strings`.
    fn quote_string(&self, value: &str) -> String {
        let escaped = value.replace('\'', "''");
        if escaped.contains('\\') {
            format!("E'{}'", escaped.replace('\\', "\\\\"))
        } else {
            format!("'{}'", escaped)
        }
    }
}
