//! Header template flattening for HTTP samplers

use crate::document::{entry, ElementDocument};
use scriptree_model::{ElementClass, Node, NodeId};
use scriptree_store::Tables;
use serde_json::{json, Value};
use tracing::warn;

/// Sampler attribute listing referenced template ids
pub const SAMPLER_TEMPLATES_ATTR: &str = "HTTPSampler__header_templates";
/// Template attribute holding `[{name, value, desc, enabled}]`
pub const TEMPLATE_HEADERS_ATTR: &str = "HTTPHeaderTemplate__headers";
/// Header manager property carrying the flattened headers
pub const MANAGER_HEADERS_PROPERTY: &str = "HeaderManager__headers";

/// Build the synthesized header manager for `sampler`
///
/// Returns `None` when the sampler references no templates. Templates that
/// cannot be found are skipped with a warning; only enabled headers are kept.
pub(crate) fn header_manager(tables: &Tables, sampler: &Node) -> Option<ElementDocument> {
    let refs = sampler.attrs.get(SAMPLER_TEMPLATES_ATTR)?.as_array()?;
    if refs.is_empty() {
        return None;
    }

    let mut headers = Vec::new();
    for reference in refs {
        let Some(template) = resolve(tables, reference) else {
            warn!(sampler = %sampler.id, template = %reference, "header template not found, skipped");
            continue;
        };
        let Some(list) = template.attrs.get(TEMPLATE_HEADERS_ATTR).and_then(Value::as_array) else {
            continue;
        };
        headers.extend(
            list.iter()
                .filter(|h| h.get("enabled").and_then(Value::as_bool).unwrap_or(true))
                .map(|h| {
                    entry(
                        "HTTPHeader",
                        json!({
                            "Header__name": h.get("name").cloned().unwrap_or(Value::Null),
                            "Header__value": h.get("value").cloned().unwrap_or(Value::Null),
                        }),
                    )
                }),
        );
    }

    Some(
        ElementDocument::new("HTTPHeaderManager", ElementClass::HttpHeaderManager)
            .with_property(MANAGER_HEADERS_PROPERTY, headers),
    )
}

fn resolve<'t>(tables: &'t Tables, reference: &Value) -> Option<&'t Node> {
    let id: NodeId = reference.as_str()?.parse().ok()?;
    tables
        .node(id)
        .filter(|n| n.class == ElementClass::HttpHeaderTemplate)
}
