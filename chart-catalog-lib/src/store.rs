//! Shared handle to the catalog connection.

use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::Connection;

/// A cloneable handle to one SQLite connection.
///
/// Import workers and the synchronizer all go through [`with`](Self::with),
/// so every read and write is serialized on the mutex.
#[derive(Clone)]
pub struct CatalogStore {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` with exclusive access to the connection.
    ///
    /// A panic in another holder does not leave SQLite in a torn state (each
    /// statement is atomic), so a poisoned lock is recovered rather than
    /// propagated.
    pub fn with<R>(&self, f: impl FnOnce(&Connection) -> R) -> R {
        let guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}
