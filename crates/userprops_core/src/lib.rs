//! Persistent user properties for scene-graph nodes.
//! Properties live as one serialized text attribute per node and are
//! materialized into an ordered in-memory mapping on access.

pub mod codec;
pub mod host;
pub mod logging;
pub mod model;
pub mod store;

pub use codec::{CodecError, CodecResult, ExtendedJsonCodec, PropertyCodec};
pub use host::{
    open_scene_file, open_scene_in_memory, scene_schema_version, AttributeSpec, HostError,
    HostResult, MemoryScene, NodeId, NodeKind, NodeRef, NodeSummary, SceneHost, SqliteScene,
    SCENE_SCHEMA_VERSION,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::key::PropertyKey;
pub use model::property_map::PropertyMap;
pub use model::value::{Matrix4, PropertyValue, IDENTITY_MATRIX};
pub use store::{DecodeFailurePolicy, PropertyStore, StoreError, StoreOptions, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
