//! Change recording and publishing
//!
//! A [`ChangeRecorder`] lives inside one unit of work. It turns each
//! [`Change`] into a [`ChangeLogEntry`] against the in-flight tables, then
//! hands the batch to [`publish`] once the unit of work has committed. An
//! aborted operation drops its recorder and nothing is published.

use crate::ancestry::AncestryCache;
use crate::sink::AuditSink;
use chrono::Utc;
use scriptree_model::{Change, ChangeLogEntry, IdGenerator, UlidGenerator, WorkspaceId};
use scriptree_store::Tables;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Collects audit entries for one logical operation
pub struct ChangeRecorder {
    actor: String,
    workspace: Option<WorkspaceId>,
    ids: Arc<dyn IdGenerator>,
    cache: AncestryCache,
    pending: Vec<ChangeLogEntry>,
}

impl fmt::Debug for ChangeRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRecorder")
            .field("actor", &self.actor)
            .field("workspace", &self.workspace)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl ChangeRecorder {
    /// Recorder for `actor`; `workspace` fills entries whose tree has none
    #[must_use]
    pub fn new(actor: impl Into<String>, workspace: Option<WorkspaceId>) -> Self {
        Self {
            actor: actor.into(),
            workspace,
            ids: Arc::new(UlidGenerator),
            cache: AncestryCache::new(),
            pending: Vec::new(),
        }
    }

    /// Draw log ids from `ids` instead of fresh ULIDs
    #[inline]
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Resolve ancestry of the affected node and queue an entry
    pub fn record(&mut self, tables: &Tables, change: Change) {
        let ancestry = self.cache.resolve(tables, change.element);
        self.pending.push(ChangeLogEntry {
            log_id: self.ids.next_log_id(),
            workspace: ancestry.workspace.or_else(|| self.workspace.clone()),
            root: Some(ancestry.root),
            case: ancestry.case,
            parent: ancestry.parent,
            change,
            operation_by: self.actor.clone(),
            operation_time: Utc::now(),
        });
    }

    /// Drop memoized ancestry after a structural change
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Entries queued so far
    #[must_use]
    pub fn pending(&self) -> &[ChangeLogEntry] {
        &self.pending
    }

    /// Consume the recorder, yielding its entries
    #[must_use]
    pub fn finish(self) -> Vec<ChangeLogEntry> {
        self.pending
    }
}

/// Deliver committed entries; failures are logged and swallowed
///
/// Returns the number of entries the sink accepted.
pub fn publish(sink: &dyn AuditSink, entries: &[ChangeLogEntry]) -> usize {
    let mut delivered = 0;
    for entry in entries {
        match sink.record(entry) {
            Ok(()) => delivered += 1,
            Err(err) => warn!(
                error = %err,
                element = %entry.change.element,
                kind = %entry.change.kind,
                "audit delivery failed"
            ),
        }
    }
    delivered
}
