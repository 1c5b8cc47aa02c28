//! Audit sinks
//!
//! A sink durably stores change-log entries. The engine treats every sink as
//! best effort: failures are logged by the publisher and never reach the
//! caller of the mutation.

use crate::error::AuditError;
use parking_lot::Mutex;
use scriptree_model::ChangeLogEntry;
use sha2::{Digest, Sha256};
use tracing::info;

/// Append-only destination for change-log entries
pub trait AuditSink: Send + Sync {
    /// Store one entry
    ///
    /// # Errors
    /// Any error is logged and swallowed by the publisher.
    fn record(&self, entry: &ChangeLogEntry) -> Result<(), AuditError>;
}

/// Entry plus its position in the hash chain
#[derive(Debug, Clone)]
pub struct ChainedEntry {
    pub entry: ChangeLogEntry,
    pub prev_hash: [u8; 32],
    pub hash: [u8; 32],
}

/// In-memory, hash-chained audit log
///
/// Each entry's hash covers its serialized form and the previous hash, so
/// any later edit or removal is detected by [`MemoryAuditSink::verify_integrity`].
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    inner: Mutex<Vec<ChainedEntry>>,
}

impl MemoryAuditSink {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every recorded entry in order
    #[must_use]
    pub fn entries(&self) -> Vec<ChangeLogEntry> {
        self.inner.lock().iter().map(|c| c.entry.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Hex digest of the newest entry, `None` when empty
    #[must_use]
    pub fn head_hash(&self) -> Option<String> {
        self.inner.lock().last().map(|c| hex::encode(c.hash))
    }

    /// Re-hash the chain and compare against stored hashes
    ///
    /// # Errors
    /// Returns [`AuditError::IntegrityViolation`] at the first mismatch.
    pub fn verify_integrity(&self) -> Result<(), AuditError> {
        let guard = self.inner.lock();
        let mut prev = [0u8; 32];
        for (index, chained) in guard.iter().enumerate() {
            if chained.prev_hash != prev || chained.hash != compute_hash(&chained.entry, &prev)? {
                return Err(AuditError::IntegrityViolation { index });
            }
            prev = chained.hash;
        }
        Ok(())
    }

    #[cfg(test)]
    fn tamper(&self, index: usize, actor: &str) {
        if let Some(c) = self.inner.lock().get_mut(index) {
            c.entry.operation_by = actor.to_string();
        }
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: &ChangeLogEntry) -> Result<(), AuditError> {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map_or([0u8; 32], |c| c.hash);
        let hash = compute_hash(entry, &prev_hash)?;
        guard.push(ChainedEntry {
            entry: entry.clone(),
            prev_hash,
            hash,
        });
        Ok(())
    }
}

fn compute_hash(entry: &ChangeLogEntry, prev: &[u8; 32]) -> Result<[u8; 32], AuditError> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(entry)?);
    hasher.update([0]);
    hasher.update(prev);
    Ok(hasher.finalize().into())
}

/// Sink that writes one structured log line per entry
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: &ChangeLogEntry) -> Result<(), AuditError> {
        info!(
            target: "scriptree::audit",
            kind = %entry.change.kind,
            element = %entry.change.element,
            root = ?entry.root.map(|r| r.to_string()),
            case = ?entry.case.map(|c| c.to_string()),
            workspace = ?entry.workspace.as_ref().map(ToString::to_string),
            prop = ?entry.change.prop_name,
            attr = ?entry.change.attr_name,
            by = %entry.operation_by,
            "element changed"
        );
        Ok(())
    }
}

impl<S: AuditSink + ?Sized> AuditSink for std::sync::Arc<S> {
    fn record(&self, entry: &ChangeLogEntry) -> Result<(), AuditError> {
        (**self).record(entry)
    }
}
