//! Rotation of bulk files on schema changes
//!
//! The COPY directive of an open bulk file fixes its column list. When the
//! model discovers another column for that table, the file is closed so the
//! next row starts a new file with a directive that includes the column.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use pgbulk_common::{BulkWriteError, Column, ContextModelListener, GeneratorContext, ListenerId, Result};
use tracing::debug;

use crate::pool::TableWriterPool;

/// Listener that invalidates the bulk file of a table whose columns changed
pub struct SchemaChangeGate {
    pool: Weak<Mutex<TableWriterPool>>,
}

impl SchemaChangeGate {
    pub fn new(pool: &Arc<Mutex<TableWriterPool>>) -> Self {
        Self {
            pool: Arc::downgrade(pool),
        }
    }
}

impl ContextModelListener for SchemaChangeGate {
    fn found_column(&self, column: &Column) -> Result<()> {
        // The writer is gone, nothing left to rotate
        let Some(pool) = self.pool.upgrade() else {
            return Ok(());
        };

        let closed = pool.lock().invalidate(&column.table).map_err(|e| {
            BulkWriteError::model(
                format!("Could not close the writer for {}", column.table),
                e,
            )
        })?;
        if closed {
            debug!(
                "Column {} added to {}, bulk file closed",
                column.name, column.table
            );
        }
        Ok(())
    }
}

/// Registration of a [`SchemaChangeGate`] with a generation context
///
/// Unsubscribes on [`Subscription::cancel`] or when dropped.
pub struct Subscription {
    context: Arc<GeneratorContext>,
    id: Option<ListenerId>,
}

impl Subscription {
    pub fn subscribe(context: Arc<GeneratorContext>, gate: SchemaChangeGate) -> Self {
        let id = context.add_listener(Arc::new(gate));
        Self {
            context,
            id: Some(id),
        }
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(id) = self.id.take() {
            self.context.remove_listener(id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
