//! Engine configuration

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Mutation engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Appended to the name of a duplicated node
    pub copy_suffix: String,
    /// Emit an UPDATE entry when reconciliation deletes a property
    pub audit_property_removals: bool,
    /// Verify sibling density after moves and pastes
    pub verify_sibling_order: bool,
    /// Actor recorded when the caller supplies none
    pub default_actor: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            copy_suffix: " copy".to_string(),
            audit_property_removals: true,
            verify_sibling_order: true,
            default_actor: "system".to_string(),
        }
    }
}

impl EngineConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With duplicate-name suffix
    #[inline]
    #[must_use]
    pub fn with_copy_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.copy_suffix = suffix.into();
        self
    }

    /// With property-removal auditing on or off
    #[inline]
    #[must_use]
    pub fn with_audit_property_removals(mut self, enabled: bool) -> Self {
        self.audit_property_removals = enabled;
        self
    }

    /// With post-move density verification on or off
    #[inline]
    #[must_use]
    pub fn with_verify_sibling_order(mut self, enabled: bool) -> Self {
        self.verify_sibling_order = enabled;
        self
    }

    /// With fallback actor
    #[inline]
    #[must_use]
    pub fn with_default_actor(mut self, actor: impl Into<String>) -> Self {
        self.default_actor = actor.into();
        self
    }

    /// Parse from TOML text; missing keys take defaults
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] on malformed TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
