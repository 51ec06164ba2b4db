//! Typed updates proposed by the oracle.
//!
//! Every update is one variant of [`Update`], discriminated on the wire by a
//! `"type"` field. Updates are validated before they reach the application
//! engine; see [`Validate`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::entities::{EventId, NpcId, SpaceId};
use crate::mechanics::LatentOpKind;

/// Maximum length of a visible-state delta, in characters.
pub const MAX_VISIBLE_DELTA_CHARS: usize = 60;

/// Maximum length of a latent cue, in characters.
pub const MAX_CUE_CHARS: usize = 60;

/// A schema constraint violated by an oracle-produced value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} is {actual} characters long, limit is {limit}")]
    TooLong {
        field: String,
        limit: usize,
        actual: usize,
    },

    #[error("{field} must not be empty")]
    Empty { field: String },

    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Constraints beyond what deserialization enforces.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Check a string's length in characters.
pub fn check_len(field: &str, text: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let actual = text.chars().count();
    if actual < min {
        return Err(ValidationError::Empty {
            field: field.to_string(),
        });
    }
    if actual > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            limit: max,
            actual,
        });
    }
    Ok(())
}

/// One add/remove operation on a space's latent cues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentOp {
    pub op: LatentOpKind,
    pub cue: String,
}

impl LatentOp {
    pub fn add(cue: impl Into<String>) -> Self {
        Self {
            op: LatentOpKind::Add,
            cue: cue.into(),
        }
    }

    pub fn remove(cue: impl Into<String>) -> Self {
        Self {
            op: LatentOpKind::Remove,
            cue: cue.into(),
        }
    }
}

impl Validate for LatentOp {
    fn validate(&self) -> Result<(), ValidationError> {
        check_len("cue", &self.cue, 1, MAX_CUE_CHARS)
    }
}

/// Change to one space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceUpdate {
    pub space_id: SpaceId,
    pub visible_state_delta: String,
    #[serde(default)]
    pub latent_state_ops: Vec<LatentOp>,
    #[serde(default)]
    pub importance_delta: i64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl SpaceUpdate {
    pub fn new(space_id: impl Into<SpaceId>, visible_state_delta: impl Into<String>) -> Self {
        Self {
            space_id: space_id.into(),
            visible_state_delta: visible_state_delta.into(),
            latent_state_ops: Vec::new(),
            importance_delta: 0,
            reasons: Vec::new(),
        }
    }

    pub fn with_op(mut self, op: LatentOp) -> Self {
        self.latent_state_ops.push(op);
        self
    }

    pub fn with_importance_delta(mut self, delta: i64) -> Self {
        self.importance_delta = delta;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }
}

impl Validate for SpaceUpdate {
    fn validate(&self) -> Result<(), ValidationError> {
        check_len(
            "visible_state_delta",
            &self.visible_state_delta,
            0,
            MAX_VISIBLE_DELTA_CHARS,
        )?;
        self.latent_state_ops.iter().try_for_each(Validate::validate)
    }
}

/// Change to one NPC.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NpcUpdate {
    pub npc_id: NpcId,
    /// Open mapping merged key by key into the NPC's state.
    #[serde(default)]
    pub state_delta: serde_json::Map<String, Value>,
    #[serde(default)]
    pub memory_write: Vec<String>,
    #[serde(default)]
    pub importance_delta: i64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl NpcUpdate {
    pub fn new(npc_id: impl Into<NpcId>) -> Self {
        Self {
            npc_id: npc_id.into(),
            ..Default::default()
        }
    }

    pub fn with_state(mut self, key: impl Into<String>, value: Value) -> Self {
        self.state_delta.insert(key.into(), value);
        self
    }

    pub fn with_memory(mut self, entry: impl Into<String>) -> Self {
        self.memory_write.push(entry.into());
        self
    }

    pub fn with_importance_delta(mut self, delta: i64) -> Self {
        self.importance_delta = delta;
        self
    }
}

impl Validate for NpcUpdate {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Proposal to create or revise a pending event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventProposal {
    pub event_id: EventId,
    #[serde(default)]
    pub scope_spaces: Vec<SpaceId>,
    pub suggested_probability: f64,
    #[serde(default)]
    pub possible_outcomes: Vec<String>,
    pub justification: String,
}

impl EventProposal {
    pub fn new(event_id: impl Into<EventId>, suggested_probability: f64) -> Self {
        Self {
            event_id: event_id.into(),
            scope_spaces: Vec::new(),
            suggested_probability,
            possible_outcomes: Vec::new(),
            justification: String::new(),
        }
    }

    pub fn with_scope(mut self, spaces: impl IntoIterator<Item = impl Into<SpaceId>>) -> Self {
        self.scope_spaces = spaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outcomes(mut self, outcomes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.possible_outcomes = outcomes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = justification.into();
        self
    }
}

impl Validate for EventProposal {
    fn validate(&self) -> Result<(), ValidationError> {
        let p = self.suggested_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(ValidationError::OutOfRange {
                field: "suggested_probability".to_string(),
                value: p,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

/// A single oracle-proposed change, discriminated by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Update {
    SpaceUpdate(SpaceUpdate),
    NpcUpdate(NpcUpdate),
    EventProposal(EventProposal),
}

impl Update {
    /// Wire name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Update::SpaceUpdate(_) => "space_update",
            Update::NpcUpdate(_) => "npc_update",
            Update::EventProposal(_) => "event_proposal",
        }
    }

    /// Id of the entity the update targets.
    pub fn target_id(&self) -> &str {
        match self {
            Update::SpaceUpdate(u) => &u.space_id,
            Update::NpcUpdate(u) => &u.npc_id,
            Update::EventProposal(u) => &u.event_id,
        }
    }
}

impl From<SpaceUpdate> for Update {
    fn from(update: SpaceUpdate) -> Self {
        Update::SpaceUpdate(update)
    }
}

impl From<NpcUpdate> for Update {
    fn from(update: NpcUpdate) -> Self {
        Update::NpcUpdate(update)
    }
}

impl From<EventProposal> for Update {
    fn from(update: EventProposal) -> Self {
        Update::EventProposal(update)
    }
}

impl Validate for Update {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Update::SpaceUpdate(u) => u.validate(),
            Update::NpcUpdate(u) => u.validate(),
            Update::EventProposal(u) => u.validate(),
        }
    }
}

/// A batch of updates in application order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateList {
    pub updates: Vec<Update>,
}

impl UpdateList {
    pub fn new(updates: Vec<Update>) -> Self {
        Self { updates }
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }
}

impl Validate for UpdateList {
    fn validate(&self) -> Result<(), ValidationError> {
        self.updates.iter().try_for_each(Validate::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_list_from_oracle_json() {
        let raw = json!({
            "updates": [
                {"type": "space_update", "space_id": "hall", "visible_state_delta": "Dust settles.",
                 "latent_state_ops": [{"op": "add", "cue": "scratch marks"}]},
                {"type": "npc_update", "npc_id": "mara", "memory_write": ["heard a bell"]},
                {"type": "event_proposal", "event_id": "storm", "suggested_probability": 0.3,
                 "justification": "clouds gather"}
            ]
        });
        let list: UpdateList = serde_json::from_value(raw).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.updates[0].kind(), "space_update");
        assert_eq!(list.updates[1].target_id(), "mara");
        assert!(list.validate().is_ok());
    }

    #[test]
    fn test_missing_discriminant_is_rejected() {
        let raw = json!({"updates": [{"space_id": "hall", "visible_state_delta": "x"}]});
        assert!(serde_json::from_value::<UpdateList>(raw).is_err());
    }

    #[test]
    fn test_visible_delta_length_limit() {
        let ok = SpaceUpdate::new("hall", "a".repeat(60));
        assert!(ok.validate().is_ok());

        let too_long = SpaceUpdate::new("hall", "a".repeat(61));
        assert!(matches!(
            too_long.validate(),
            Err(ValidationError::TooLong { limit: 60, actual: 61, .. })
        ));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let update = SpaceUpdate::new("hall", "门".repeat(60));
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_empty_cue_rejected() {
        let update = SpaceUpdate::new("hall", "").with_op(LatentOp::add(""));
        assert!(matches!(update.validate(), Err(ValidationError::Empty { .. })));
    }

    #[test]
    fn test_probability_range() {
        assert!(EventProposal::new("ev", 1.0).validate().is_ok());
        assert!(EventProposal::new("ev", 1.2).validate().is_err());
        assert!(EventProposal::new("ev", -0.1).validate().is_err());
        assert!(EventProposal::new("ev", f64::NAN).validate().is_err());
    }

    #[test]
    fn test_serialized_update_carries_type_tag() {
        let update: Update = NpcUpdate::new("mara").with_memory("x").into();
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["type"], "npc_update");
        assert_eq!(value["npc_id"], "mara");
    }
}
