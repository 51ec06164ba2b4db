//! Pending world events.

use serde::{Deserialize, Serialize};

use super::{EventId, SpaceId};

/// A possible future happening scoped to one or more spaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,

    #[serde(default)]
    pub scope_spaces: Vec<SpaceId>,

    /// Chance in `[0, 1]` that the event fires.
    #[serde(default)]
    pub trigger_probability: f64,

    #[serde(default)]
    pub possible_outcomes: Vec<String>,

    /// `true` while the event has not yet visibly manifested.
    #[serde(default)]
    pub latency: bool,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Event {
    /// Create a latent event with no scope or outcomes.
    pub fn new(id: impl Into<EventId>, trigger_probability: f64) -> Self {
        Self {
            id: id.into(),
            scope_spaces: Vec::new(),
            trigger_probability,
            possible_outcomes: Vec::new(),
            latency: true,
            extra: serde_json::Map::new(),
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
}
