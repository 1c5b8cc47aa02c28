//! Snippet parameter binding and standalone snippet wrapping

use crate::document::{argument, ElementDocument};
use crate::variables::ARGUMENTS_PROPERTY;
use indexmap::IndexMap;
use scriptree_model::ElementClass;
use serde_json::{json, Value};

/// Snippet property declaring `[{name, default}]`
pub const PARAMETERS_PROPERTY: &str = "parameters";
/// Snippet property requesting session affinity
pub const SESSION_PROPERTY: &str = "useHTTPSession";
/// Reference property naming the snippet
pub const SNIPPET_REF_PROPERTY: &str = "snippetNo";
/// Reference property requesting declared defaults
pub const USE_DEFAULT_PROPERTY: &str = "useDefault";
/// Reference property supplying `[{name, value}]`
pub const ARGUMENTS_REF_PROPERTY: &str = "arguments";

fn is_true(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => s == "true",
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}

fn pairs(value: Option<&Value>, key: &str) -> IndexMap<String, Value> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?;
            Some((name.to_string(), item.get(key).cloned().unwrap_or(Value::Null)))
        })
        .collect()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Whether a snippet's properties request a shared HTTP session
pub(crate) fn uses_session(snippet: &IndexMap<String, Value>) -> bool {
    is_true(snippet.get(SESSION_PROPERTY))
}

/// Prepend session and parameter children to an expanded snippet
///
/// Argument values come from the snippet's declared defaults when the
/// reference asks for them; otherwise from the supplied arguments, falling
/// back to the default for blank or missing ones.
pub(crate) fn configure(
    children: &mut Vec<ElementDocument>,
    snippet: &IndexMap<String, Value>,
    reference: &IndexMap<String, Value>,
) {
    if uses_session(snippet) {
        children.insert(
            0,
            ElementDocument::new(
                "TransactionHTTPSessionManager",
                "TransactionHTTPSessionManager",
            ),
        );
    }

    let parameters = pairs(snippet.get(PARAMETERS_PROPERTY), "default");
    let arguments = pairs(reference.get(ARGUMENTS_REF_PROPERTY), "value");
    if parameters.is_empty() && arguments.is_empty() {
        return;
    }
    let use_default = is_true(reference.get(USE_DEFAULT_PROPERTY));
    let bound: Vec<Value> = parameters
        .iter()
        .map(|(name, default)| {
            let value = if use_default {
                default.clone()
            } else {
                arguments
                    .get(name)
                    .filter(|v| !is_blank(v))
                    .unwrap_or(default)
                    .clone()
            };
            argument(name, value)
        })
        .collect();
    children.insert(
        0,
        ElementDocument::new("TransactionParameter", "TransactionParameter")
            .with_property(ARGUMENTS_PROPERTY, bound),
    );
}

/// Wrap compiled snippet children in a one-iteration group and collection
pub(crate) fn wrap(name: &str, children: Vec<ElementDocument>) -> ElementDocument {
    let mut group = ElementDocument::new(name, ElementClass::TestGroup)
        .with_property("TestGroup__on_sample_error", "start_next_coroutine")
        .with_property("TestGroup__number_groups", "1")
        .with_property("TestGroup__start_interval", "")
        .with_property(
            "TestGroup__main_controller",
            json!({
                "class": "LoopController",
                "property": {
                    "LoopController__loops": "1",
                    "LoopController__continue_forever": "false",
                },
            }),
        );
    group.children = children;
    ElementDocument::new(name, ElementClass::TestCollection)
        .with_property("TestCollection__serialize_groups", "true")
        .with_property("TestCollection__delay", "0")
        .with_child(group)
}
