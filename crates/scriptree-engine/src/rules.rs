//! Placement rules for paste and cross-parent move

use crate::error::EngineError;
use scriptree_model::Node;
use serde::{Deserialize, Serialize};

/// How a paste treats its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PasteMode {
    /// Deep-clone the source under the target
    Copy,
    /// Move the source itself under the target
    Cut,
}

/// Check that `source` may be placed under `target`
///
/// - collections and snippets are never placed under anything
/// - a group only goes under a collection
/// - a sampler or controller goes under a snippet, group or controller
/// - a timer goes under a snippet, group, sampler or controller
/// - anything else may go anywhere
///
/// # Errors
/// Returns [`EngineError::Compatibility`] naming the rejected pairing.
pub fn check_placement(source: &Node, target: &Node) -> Result<(), EngineError> {
    let reject = |reason: &'static str| {
        Err(EngineError::Compatibility {
            source_class: source.class.to_string(),
            target_class: target.class.to_string(),
            reason,
        })
    };

    if source.is_collection() || source.is_snippet() {
        return reject("collections and snippets are top-level only");
    }
    if source.is_group() {
        if !target.is_collection() {
            return reject("groups only go under a collection");
        }
    } else if source.is_sampler() || source.is_controller() {
        if !(target.is_snippet() || target.is_group() || target.is_controller()) {
            return reject("samplers and controllers only go under a snippet, group or controller");
        }
    } else if source.is_timer()
        && !(target.is_snippet() || target.is_group() || target.is_sampler() || target.is_controller())
    {
        return reject("timers only go under a snippet, group, sampler or controller");
    }
    Ok(())
}
