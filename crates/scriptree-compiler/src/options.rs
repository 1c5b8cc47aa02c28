//! Compile scope options

use scriptree_model::NodeId;
use serde::{Deserialize, Serialize};

/// Which parts of a tree to compile
///
/// - `group`: keep only this group, plus setup/teardown groups unless `self_only`
/// - `sampler`: with `self_only`, every other sampler is pruned; otherwise
///   samplers after this one in document order are pruned
/// - `no_sampler`: prune every sampler
/// - `no_scaffolding`: prune setup and teardown groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    pub group: Option<NodeId>,
    pub sampler: Option<NodeId>,
    pub self_only: bool,
    pub no_sampler: bool,
    pub no_scaffolding: bool,
}

impl CompileOptions {
    /// Whole tree, nothing pruned beyond disabled nodes
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one group
    #[inline]
    #[must_use]
    pub fn for_group(mut self, group: NodeId) -> Self {
        self.group = Some(group);
        self
    }

    /// Restrict to one sampler
    #[inline]
    #[must_use]
    pub fn for_sampler(mut self, sampler: NodeId) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Exclude siblings of the scoped group or sampler
    #[inline]
    #[must_use]
    pub fn self_only(mut self) -> Self {
        self.self_only = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn without_samplers(mut self) -> Self {
        self.no_sampler = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn without_scaffolding(mut self) -> Self {
        self.no_scaffolding = true;
        self
    }
}
