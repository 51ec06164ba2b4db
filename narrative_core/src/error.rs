//! Workflow-level errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::oracle::OracleError;

/// Errors that terminate a workflow.
///
/// Tolerated misses (an update naming an unknown space or NPC during a batch)
/// are not errors and never surface here.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {message}")]
    Config {
        path: Option<PathBuf>,
        message: String,
    },

    #[error("prompt template not found: {}", .path.display())]
    TemplateMissing { path: PathBuf },

    #[error("space {space_id} does not exist")]
    UnknownSpace { space_id: String },

    #[error("npc {npc_id} does not exist")]
    UnknownNpc { npc_id: String },

    #[error("oracle call failed: {0}")]
    Oracle(#[from] OracleError),
}

pub type Result<T> = std::result::Result<T, NarrativeError>;
