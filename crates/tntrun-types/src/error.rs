//! Error types for shared data handling.
//!
//! A `TypesError` is always about a definition file, never about a
//! world or an arena.

/// Errors raised while encoding, decoding or validating definitions.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// Serialization failed (turning a definition into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed file, missing required fields,
    /// wrong value types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The definition decoded fine but breaks a rule (empty world, player
    /// bounds out of range).
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),
}
