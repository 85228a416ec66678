//! Node-attached user property stores.
//!
//! # Responsibility
//! - Present a mutable-mapping facade over properties persisted as one
//!   serialized text attribute per node.
//! - Own the store error taxonomy and configuration knobs.
//!
//! # Invariants
//! - Every successful mutation is followed by a synchronous write-back.
//! - An empty mapping is never flushed by the regular write-back path.
//!
//! # See also
//! - `host::SceneHost` for the collaborator contract.

use crate::codec::CodecError;
use crate::host::{AttributeSpec, HostError};
use crate::model::key::PropertyKey;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod user_properties;

pub use user_properties::PropertyStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// What to do when the stored buffer cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailurePolicy {
    /// Drop the unreadable buffer and persist an empty mapping in its place.
    #[default]
    Discard,
    /// Return the decode error and leave the buffer untouched.
    Surface,
}

impl DecodeFailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discard => "discard",
            Self::Surface => "surface",
        }
    }
}

impl FromStr for DecodeFailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "discard" => Ok(Self::Discard),
            "surface" => Ok(Self::Surface),
            other => Err(format!(
                "unsupported decode failure policy `{other}`; expected discard|surface"
            )),
        }
    }
}

/// Per-store configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Backing attribute declaration; defaults to `notes` / `nts`.
    pub attribute: AttributeSpec,
    pub decode_failure: DecodeFailurePolicy,
}

/// Property store failure.
#[derive(Debug)]
pub enum StoreError {
    /// The node reference given at construction does not name exactly one node.
    NodeResolution { reference: String, source: HostError },
    KeyNotFound(PropertyKey),
    /// Strict buffer read against a node without the backing attribute.
    AttributeMissing { node: String, attribute: String },
    Host(HostError),
    Codec(CodecError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeResolution { reference, source } => {
                write!(f, "cannot resolve node `{reference}`: {source}")
            }
            Self::KeyNotFound(key) => write!(f, "property not found: {key}"),
            Self::AttributeMissing { node, attribute } => {
                write!(f, "property attribute does not exist: {node}.{attribute}")
            }
            Self::Host(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NodeResolution { source, .. } => Some(source),
            Self::Host(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::KeyNotFound(_) | Self::AttributeMissing { .. } => None,
        }
    }
}

impl From<HostError> for StoreError {
    fn from(value: HostError) -> Self {
        match value {
            HostError::AttributeMissing { node, attribute } => {
                Self::AttributeMissing { node, attribute }
            }
            other => Self::Host(other),
        }
    }
}

impl From<CodecError> for StoreError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}
