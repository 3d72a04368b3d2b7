//! How arena definitions are turned into files.

use serde::{de::DeserializeOwned, Serialize};

use crate::TypesError;

/// A file format for stored definitions.
pub trait Codec: Send + Sync + 'static {
    /// File extension, without the dot. The store only reads files with
    /// this extension.
    fn extension(&self) -> &'static str;

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, TypesError>;

    /// # Errors
    /// [`TypesError::Decode`] for malformed input or a shape that does not
    /// match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, TypesError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// Indented JSON, since admins edit these files by hand. Needs the
/// `json` feature (on by default).
///
/// ```rust
/// use tntrun_types::{ArenaDefinition, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let def = ArenaDefinition::new("arena_world", 2, 8);
///
/// let bytes = codec.encode(&def).unwrap();
/// let decoded: ArenaDefinition = codec.decode(&bytes).unwrap();
/// assert_eq!(def, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, TypesError> {
        serde_json::to_vec_pretty(value).map_err(TypesError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, TypesError> {
        serde_json::from_slice(data).map_err(TypesError::Decode)
    }
}
