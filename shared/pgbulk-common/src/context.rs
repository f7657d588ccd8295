//! Generation context: table registry and model change notifications
//!
//! Writers that depend on the shape of a table subscribe with a
//! [`ContextModelListener`] and are told about every column that is
//! discovered after generation has started.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, instrument};

use crate::error::BulkWriteError;
use crate::model::{Column, Table, TableName};
use crate::Result;

/// Handle of a registered listener, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Receives model change notifications
pub trait ContextModelListener: Send + Sync {
    /// A column was added to `column.table`
    fn found_column(&self, column: &Column) -> Result<()>;
}

/// The model known to the current generation run
#[derive(Default)]
pub struct GeneratorContext {
    tables: RwLock<HashMap<TableName, Table>>,
    listeners: Mutex<Vec<(ListenerId, Arc<dyn ContextModelListener>)>>,
    next_listener_id: AtomicU64,
}

impl GeneratorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a table description
    pub fn register_table(&self, table: Table) {
        debug!("Registering table {}", table.name());
        self.tables.write().insert(table.name().to_string(), table);
    }

    /// Snapshot of the current table description
    pub fn table(&self, name: &str) -> Option<Table> {
        self.tables.read().get(name).cloned()
    }

    /// Add a column to a registered table and notify all listeners
    ///
    /// Listener failures are returned to the caller after the column has been
    /// added; remaining listeners are not called.
    #[instrument(skip(self, column), fields(table = %column.table, column = %column.name))]
    pub fn add_column(&self, column: Column) -> Result<()> {
        {
            let mut tables = self.tables.write();
            let table = tables
                .get_mut(&column.table)
                .ok_or_else(|| BulkWriteError::TableNotFound(column.table.clone()))?;
            table.add_column(column.clone())?;
        }

        // Callbacks run without holding the registry locks
        let listeners: Vec<Arc<dyn ContextModelListener>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener.found_column(&column)?;
        }
        Ok(())
    }

    pub fn add_listener(&self, listener: Arc<dyn ContextModelListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    /// Returns false if the listener was not registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}
