//! Error types for the dense mapper.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::system::MapperState;

/// Errors surfaced by the mapping core.
///
/// I/O sources are held in an `Arc` so a shutdown outcome can be cached and
/// handed to every caller of `shutdown`.
#[derive(Error, Debug, Clone)]
pub enum MappingError {
    /// Malformed keyframe, rejected before any state change.
    #[error("invalid keyframe: {0}")]
    InvalidInput(String),

    /// The mapper no longer accepts keyframes.
    #[error("mapper is {0} and no longer accepts keyframes")]
    NotAccepting(MapperState),

    /// The finalized map could not be written.
    #[error("failed to write point cloud to {}: {source}", .path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("mapping thread panicked")]
    WorkerPanicked,
}

impl From<toml::de::Error> for MappingError {
    fn from(e: toml::de::Error) -> Self {
        MappingError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MappingError>;
