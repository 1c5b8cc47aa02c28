//! Model-level errors

/// Errors raised while encoding, decoding or parsing model values
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Category name not recognised
    #[error("unknown element type: {0}")]
    UnknownElementType(String),

    /// Property value could not be serialized
    #[error("property encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Stored property payload is not valid JSON
    #[error("property {name} has a corrupt payload: {source}")]
    Decode {
        /// Property name
        name: String,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },
}
