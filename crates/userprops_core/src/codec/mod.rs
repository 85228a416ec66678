//! Buffer codecs for property mappings.
//!
//! # Responsibility
//! - Define the contract between a property store and its text encoding.
//! - Keep encode and decode failures distinguishable.
//!
//! # Invariants
//! - Codecs are symmetric: `decode(encode(map)) == map` for every encodable map.
//! - Decode failures are always reported as `CodecError::Decode`.

use crate::model::property_map::PropertyMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod extended_json;

pub use extended_json::{ExtendedJsonCodec, TYPE_TAG, VALUE_TAG};

pub type CodecResult<T> = Result<T, CodecError>;

/// Codec failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The in-memory mapping holds a value the wire form cannot carry.
    Encode(String),
    /// The buffer text is not a valid encoded mapping.
    Decode(String),
}

impl CodecError {
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(message) => write!(f, "failed to encode properties: {message}"),
            Self::Decode(message) => write!(f, "failed to decode properties: {message}"),
        }
    }
}

impl Error for CodecError {}

/// Text codec used to persist a property mapping into a node attribute.
pub trait PropertyCodec {
    fn encode(&self, properties: &PropertyMap) -> CodecResult<String>;
    fn decode(&self, buffer: &str) -> CodecResult<PropertyMap>;
}
