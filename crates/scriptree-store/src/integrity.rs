//! Whole-store invariant checks
//!
//! Used by tests and by the `check` command to confirm that every sibling
//! sequence is dense and every cached root matches the actual top ancestor.

use crate::tables::{is_dense, Tables};
use scriptree_model::{ComponentCategory, NodeId};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// One broken invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    /// Structural children not numbered `1..=N`
    SparseChildren { parent: NodeId, sorts: Vec<u32> },
    /// Components of one category not numbered `1..=N`
    SparseComponents {
        parent: NodeId,
        category: ComponentCategory,
        sorts: Vec<u32>,
    },
    /// Cached root differs from the real top ancestor
    RootMismatch {
        node: NodeId,
        expected: NodeId,
        found: NodeId,
    },
    /// Parent chain loops back on itself
    Cycle { node: NodeId },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SparseChildren { parent, sorts } => {
                write!(f, "children of {parent} are not dense: {sorts:?}")
            }
            Self::SparseComponents {
                parent,
                category,
                sorts,
            } => write!(f, "{category} components of {parent} are not dense: {sorts:?}"),
            Self::RootMismatch {
                node,
                expected,
                found,
            } => write!(f, "node {node} caches root {found}, expected {expected}"),
            Self::Cycle { node } => write!(f, "parent chain of {node} is cyclic"),
        }
    }
}

impl Tables {
    /// Top-most ancestor found by walking parent edges, `None` on a cycle
    #[must_use]
    pub fn top_ancestor(&self, id: NodeId) -> Option<NodeId> {
        let mut seen = HashSet::new();
        let mut cursor = id;
        while let Some(parent) = self.parent_of(cursor) {
            if !seen.insert(cursor) {
                return None;
            }
            cursor = parent;
        }
        Some(cursor)
    }

    /// Every density and root-propagation violation in the store
    #[must_use]
    pub fn verify(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        let mut parents: Vec<NodeId> = self.parents().copied().collect();
        parents.sort();
        for parent in parents {
            let sorts: Vec<u32> = self.children(parent).iter().map(|e| e.sort).collect();
            if !is_dense(&sorts) {
                violations.push(Violation::SparseChildren { parent, sorts });
            }
        }

        let mut hosts: Vec<NodeId> = self.hosts().copied().collect();
        hosts.sort();
        for parent in hosts {
            for category in ComponentCategory::ALL {
                let sorts: Vec<u32> = self
                    .components_in(parent, category)
                    .iter()
                    .map(|e| e.sort)
                    .collect();
                if !is_dense(&sorts) {
                    violations.push(Violation::SparseComponents {
                        parent,
                        category,
                        sorts,
                    });
                }
            }
        }

        let mut attached: Vec<(NodeId, NodeId)> = self
            .child_edges()
            .map(|e| (e.child, e.root))
            .chain(self.component_edges().map(|e| (e.child, e.root)))
            .collect();
        attached.sort();
        for (node, found) in attached {
            match self.top_ancestor(node) {
                None => violations.push(Violation::Cycle { node }),
                Some(expected) if expected != found => violations.push(Violation::RootMismatch {
                    node,
                    expected,
                    found,
                }),
                Some(_) => {}
            }
        }
        violations
    }
}
