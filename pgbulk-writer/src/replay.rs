//! Replay of recorded generation events
//!
//! Reads newline-delimited JSON, one event per line:
//!
//! ```text
//! {"kind": "table", "name": "users", "columns": [{"name": "id", "auto_generated": true}, {"name": "name"}]}
//! {"kind": "insert", "table": "users", "values": {"name": "ann"}}
//! {"kind": "column", "table": "users", "name": "email"}
//! {"kind": "sql", "sql": "UPDATE users SET name = 'bob'"}
//! ```
//!
//! Empty lines and lines starting with `#` are ignored.

use std::collections::HashMap;
use std::io::BufRead;

use pgbulk_common::{
    BulkWriteError, Column, ColumnExpression, GeneratorContext, InsertStatement, Statement, Table,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::writer::PostgresBulkWriter;

/// Column of a `table` event
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(default)]
    pub auto_generated: bool,
}

/// A recorded generation event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// Register a table
    Table { name: String, columns: Vec<ColumnSpec> },
    /// A column discovered after generation started
    Column {
        table: String,
        name: String,
        #[serde(default)]
        auto_generated: bool,
    },
    /// Insert a row into a registered table
    Insert {
        table: String,
        values: HashMap<String, ColumnExpression>,
    },
    /// Plain SQL
    Sql { sql: String },
}

/// Replay errors
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Line {line}: invalid event: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Line {line}: {source}")]
    Write {
        line: usize,
        #[source]
        source: BulkWriteError,
    },

    #[error("Failed to read events: {0}")]
    Io(#[from] std::io::Error),
}

/// Counts of replayed events
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayStats {
    pub tables: usize,
    pub columns: usize,
    pub inserts: usize,
    pub statements: usize,
}

/// Parse a single event line, `None` for blank lines and comments
pub fn parse_event(line: &str) -> Result<Option<ReplayEvent>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

/// Apply one event to the context and the writer
pub fn apply_event(
    event: ReplayEvent,
    context: &GeneratorContext,
    writer: &mut PostgresBulkWriter,
    stats: &mut ReplayStats,
) -> pgbulk_common::Result<()> {
    match event {
        ReplayEvent::Table { name, columns } => {
            let table = columns.into_iter().fold(Table::new(name), |table, spec| {
                if spec.auto_generated {
                    table.with_generated_column(spec.name)
                } else {
                    table.with_column(spec.name)
                }
            });
            context.register_table(table);
            stats.tables += 1;
        }
        ReplayEvent::Column {
            table,
            name,
            auto_generated,
        } => {
            let column = if auto_generated {
                Column::generated(table, name)
            } else {
                Column::new(table, name)
            };
            context.add_column(column)?;
            stats.columns += 1;
        }
        ReplayEvent::Insert { table, values } => {
            let table = context
                .table(&table)
                .ok_or(BulkWriteError::TableNotFound(table))?;
            let mut insert = InsertStatement::new(table);
            for (column, expression) in values {
                insert.set(column, expression);
            }
            writer.write_statement(&Statement::Insert(insert))?;
            stats.inserts += 1;
        }
        ReplayEvent::Sql { sql } => {
            writer.write_statement(&Statement::Raw(sql))?;
            stats.statements += 1;
        }
    }
    Ok(())
}

/// Replay all events of `input`, stopping at the first failure
pub fn replay(
    input: impl BufRead,
    context: &GeneratorContext,
    writer: &mut PostgresBulkWriter,
) -> Result<ReplayStats, ReplayError> {
    let mut stats = ReplayStats::default();
    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = line?;
        let Some(event) = parse_event(&line).map_err(|source| ReplayError::Parse {
            line: line_number,
            source,
        })?
        else {
            continue;
        };
        apply_event(event, context, writer, &mut stats).map_err(|source| ReplayError::Write {
            line: line_number,
            source,
        })?;
    }
    debug!("Replayed events: {:?}", stats);
    Ok(stats)
}
