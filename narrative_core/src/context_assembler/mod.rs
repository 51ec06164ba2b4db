//! Context Assembler - selects what the oracle sees for each workflow.
//!
//! - **Candidates** (Tick): every unfrozen space and every NPC, summarized
//! - **Space logs** (Collapse): recent records associated with one space
//! - **NPC context** (Dialog): the NPC, its surroundings, memory and past talk
//!
//! The log window itself comes from the store; the assembler only filters it.

mod dialogue;

pub use dialogue::*;

use serde::{Deserialize, Serialize};

use world_model::{EntityKind, LogRecord, NpcId, SpaceId, WorldState};

use crate::config::ContextConfig;
use crate::error::{NarrativeError, Result};

/// Summary of a space eligible for latent update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceCandidate {
    pub id: SpaceId,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub importance: i64,
    pub status: String,
}

/// Summary of an NPC eligible for latent update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcCandidate {
    pub id: NpcId,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub importance: i64,
    pub location: SpaceId,
    pub role: String,
}

/// The candidate pool for one Tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub spaces: Vec<SpaceCandidate>,
    pub npcs: Vec<NpcCandidate>,
}

impl CandidateSummary {
    pub fn contains_space(&self, id: &str) -> bool {
        self.spaces.iter().any(|s| s.id == id)
    }
}

/// Everything shown to the oracle when a space collapses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollapseContext {
    pub space_id: SpaceId,
    pub visible_state: String,
    pub latent_state: Vec<String>,
    pub space_logs: Vec<LogRecord>,
}

/// Heuristic association of a log record with a space: the space id's literal
/// text occurs anywhere in the record's serialized form.
///
/// This over-matches on purpose. An id that is a substring of another id
/// (`hall` inside `hallway`) or of unrelated prose will match.
pub fn mentions_space_id(record: &LogRecord, space_id: &str) -> bool {
    serde_json::to_string(record)
        .map(|text| text.contains(space_id))
        .unwrap_or(false)
}

/// Whether a record belongs to a space: an explicit `space_id` or
/// `player_location` equal to the target, or failing that
/// [`mentions_space_id`].
pub fn is_space_log(record: &LogRecord, space_id: &str) -> bool {
    record.get_str("space_id") == Some(space_id)
        || record.get_str("player_location") == Some(space_id)
        || mentions_space_id(record, space_id)
}

/// Keep the records associated with a space, preserving order.
pub fn filter_space_logs(space_id: &str, logs: &[LogRecord]) -> Vec<LogRecord> {
    logs.iter()
        .filter(|record| is_space_log(record, space_id))
        .cloned()
        .collect()
}

/// The context assembler builds oracle inputs from world state and logs.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    config: ContextConfig,
}

impl ContextAssembler {
    /// Create a new context assembler with the given configuration.
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Create a context assembler with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ContextConfig::default())
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Summaries of every unfrozen space and every NPC, in id order.
    pub fn build_candidates(&self, state: &WorldState) -> CandidateSummary {
        let spaces = state
            .active_spaces()
            .map(|(id, space)| SpaceCandidate {
                id: id.clone(),
                kind: EntityKind::Space,
                importance: space.importance,
                status: space.status.clone(),
            })
            .collect();

        let npcs = state
            .entities
            .iter()
            .map(|(id, npc)| NpcCandidate {
                id: id.clone(),
                kind: EntityKind::Npc,
                importance: npc.importance,
                location: npc.location.clone(),
                role: npc.role.clone(),
            })
            .collect();

        CandidateSummary { spaces, npcs }
    }

    /// Context for collapsing `space_id`, given the recent log window.
    pub fn collapse_context(
        &self,
        state: &WorldState,
        space_id: &str,
        recent_logs: &[LogRecord],
    ) -> Result<CollapseContext> {
        let space = state
            .get_space(space_id)
            .ok_or_else(|| NarrativeError::UnknownSpace {
                space_id: space_id.to_string(),
            })?;

        Ok(CollapseContext {
            space_id: space_id.to_string(),
            visible_state: space.visible_state.clone(),
            latent_state: space.latent_state.as_slice().to_vec(),
            space_logs: filter_space_logs(space_id, recent_logs),
        })
    }
}
