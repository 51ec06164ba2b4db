//! Space definitions.

use serde::{Deserialize, Serialize};

use crate::mechanics::{
    adjust_importance, clamp_importance, default_importance, deserialize_importance, LatentCues,
};

/// A location in the world with a player-visible description and hidden cues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Player-observable description.
    #[serde(default)]
    pub visible_state: String,

    /// Hidden cues not yet revealed to the player.
    #[serde(default)]
    pub latent_state: LatentCues,

    /// Narrative weight in `[1, 3]`.
    #[serde(default = "default_importance", deserialize_with = "deserialize_importance")]
    pub importance: i64,

    #[serde(default)]
    pub status: String,

    /// Set once the space has been collapsed; never cleared.
    #[serde(default)]
    pub frozen: bool,

    // Fields produced by world generation that the engine does not interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Space {
    fn default() -> Self {
        Self {
            visible_state: String::new(),
            latent_state: LatentCues::new(),
            importance: default_importance(),
            status: String::new(),
            frozen: false,
            extra: serde_json::Map::new(),
        }
    }
}

impl Space {
    /// Create an unfrozen space with the given visible description.
    pub fn new(visible_state: impl Into<String>) -> Self {
        Self {
            visible_state: visible_state.into(),
            ..Default::default()
        }
    }

    pub fn with_importance(mut self, importance: i64) -> Self {
        self.importance = clamp_importance(importance);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_cue(mut self, cue: impl Into<String>) -> Self {
        self.latent_state.add(cue);
        self
    }

    /// Append a visible-state delta with a single separating space.
    ///
    /// An empty existing description is replaced outright.
    pub fn append_visible(&mut self, delta: &str) {
        if self.visible_state.is_empty() {
            self.visible_state = delta.to_string();
        } else {
            self.visible_state = format!("{} {}", self.visible_state, delta)
                .trim()
                .to_string();
        }
    }

    pub fn adjust_importance(&mut self, delta: i64) {
        self.importance = adjust_importance(self.importance, delta);
    }

    /// Freeze the space, removing it from future latent updates.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }
}
