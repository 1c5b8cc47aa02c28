//! Transactional element store
//!
//! Writers are serialized and stage their changes on a private copy of the
//! tables; the copy replaces the published state only when the unit of work
//! succeeds. Readers hold an `Arc` to a published state, so a long compile
//! always sees one consistent snapshot.

use crate::error::StoreError;
use crate::snapshot::TableSnapshot;
use crate::tables::Tables;
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Shared, transactional home of every element tree
#[derive(Debug, Default)]
pub struct ElementStore {
    current: RwLock<Arc<Tables>>,
    writer: Mutex<()>,
}

impl ElementStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store publishing `tables`
    #[must_use]
    pub fn from_tables(tables: Tables) -> Self {
        Self {
            current: RwLock::new(Arc::new(tables)),
            writer: Mutex::new(()),
        }
    }

    /// Consistent read-only view of the last committed state
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Arc<Tables> {
        Arc::clone(&self.current.read())
    }

    /// Run `work` against a staged copy and publish it on `Ok`
    ///
    /// On `Err` every staged write is discarded, including sort shifts made
    /// before the failure.
    ///
    /// # Errors
    /// Propagates the error returned by `work`.
    pub fn unit_of_work<T, E>(
        &self,
        work: impl FnOnce(&mut Tables) -> Result<T, E>,
    ) -> Result<T, E> {
        let _writer = self.writer.lock();
        let mut staged = Tables::clone(&self.snapshot());
        match work(&mut staged) {
            Ok(out) => {
                *self.current.write() = Arc::new(staged);
                debug!("unit of work committed");
                Ok(out)
            }
            Err(err) => {
                debug!("unit of work rolled back");
                Err(err)
            }
        }
    }

    /// Load a JSON row dump
    ///
    /// # Errors
    /// Fails on io errors, malformed JSON or inconsistent rows.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path)?;
        let snapshot: TableSnapshot = serde_json::from_str(&text)?;
        Ok(Self::from_tables(Tables::from_snapshot(snapshot)?))
    }

    /// Write the committed state as a JSON row dump
    ///
    /// # Errors
    /// Fails on io or serialization errors.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.snapshot().to_snapshot())?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
