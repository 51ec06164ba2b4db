//! Non-player character definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mechanics::{adjust_importance, clamp_importance, default_importance, deserialize_importance};

/// Outcome of merging one `state_delta` key into an NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateMerge {
    /// Stored in the open state sidecar.
    Sidecar,
    /// Overwrote a typed field (`role` or `location`).
    Field,
    /// Refused because it would bypass an invariant (`memory`, `importance`)
    /// or carried the wrong type for a typed field.
    Refused,
}

/// A non-player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    #[serde(default)]
    pub role: String,

    /// Weak reference to a space id; may name a space that no longer exists.
    #[serde(default)]
    pub location: String,

    /// Append-only memory, oldest first.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub memory: Vec<String>,

    #[serde(default = "default_importance", deserialize_with = "deserialize_importance")]
    pub importance: i64,

    /// Schema-less sidecar. Any key may be introduced at any time.
    #[serde(flatten)]
    pub state: serde_json::Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for Npc {
    fn default() -> Self {
        Self {
            role: String::new(),
            location: String::new(),
            memory: Vec::new(),
            importance: default_importance(),
            state: serde_json::Map::new(),
        }
    }
}

impl Npc {
    /// Create an NPC with a role, standing in the given space.
    pub fn new(role: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            location: location.into(),
            ..Default::default()
        }
    }

    pub fn with_importance(mut self, importance: i64) -> Self {
        self.importance = clamp_importance(importance);
        self
    }

    pub fn with_memory(mut self, entry: impl Into<String>) -> Self {
        self.memory.push(entry.into());
        self
    }

    /// Merge one key of a state delta, last write wins.
    pub fn merge_state(&mut self, key: &str, value: Value) -> StateMerge {
        match key {
            "role" | "location" => {
                let Value::String(text) = value else {
                    return StateMerge::Refused;
                };
                if key == "role" {
                    self.role = text;
                } else {
                    self.location = text;
                }
                StateMerge::Field
            }
            "memory" | "importance" => StateMerge::Refused,
            _ => {
                self.state.insert(key.to_string(), value);
                StateMerge::Sidecar
            }
        }
    }

    /// Append entries to memory in order. Prior entries are never touched.
    pub fn remember<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.memory.extend(entries.into_iter().map(Into::into));
    }

    /// The last `n` memory entries, oldest first. `n == 0` returns everything.
    pub fn memory_tail(&self, n: usize) -> &[String] {
        if n == 0 || n >= self.memory.len() {
            &self.memory
        } else {
            &self.memory[self.memory.len() - n..]
        }
    }

    pub fn adjust_importance(&mut self, delta: i64) {
        self.importance = adjust_importance(self.importance, delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loaded_importance_is_clamped() {
        let high: Npc = serde_json::from_str(r#"{"role": "guard", "importance": 7}"#).unwrap();
        let low: Npc = serde_json::from_str(r#"{"role": "guard", "importance": -4}"#).unwrap();
        assert_eq!((high.importance, low.importance), (3, 1));
    }

    #[test]
    fn test_merge_state_sidecar_last_write_wins() {
        let mut npc = Npc::new("innkeeper", "tavern");
        npc.merge_state("mood", json!("wary"));
        npc.merge_state("mood", json!("cheerful"));
        assert_eq!(npc.state.get("mood"), Some(&json!("cheerful")));
    }

    #[test]
    fn test_merge_state_moves_location() {
        let mut npc = Npc::new("guard", "gate");
        assert_eq!(npc.merge_state("location", json!("barracks")), StateMerge::Field);
        assert_eq!(npc.location, "barracks");
        assert!(npc.state.get("location").is_none());
    }

    #[test]
    fn test_merge_state_refuses_protected_keys() {
        let mut npc = Npc::new("guard", "gate").with_memory("saw a fox");
        assert_eq!(npc.merge_state("memory", json!([])), StateMerge::Refused);
        assert_eq!(npc.merge_state("importance", json!(3)), StateMerge::Refused);
        assert_eq!(npc.merge_state("role", json!(5)), StateMerge::Refused);
        assert_eq!(npc.memory, vec!["saw a fox"]);
        assert_eq!(npc.importance, 1);
        assert_eq!(npc.role, "guard");
    }

    #[test]
    fn test_memory_tail() {
        let mut npc = Npc::default();
        npc.remember(["a", "b", "c", "d"]);
        assert_eq!(npc.memory_tail(2), ["c", "d"]);
        assert_eq!(npc.memory_tail(0).len(), 4);
        assert_eq!(npc.memory_tail(10).len(), 4);
    }

    #[test]
    fn test_sidecar_is_flattened_in_documents() {
        let npc: Npc = serde_json::from_str(
            r#"{"role":"smith","location":"forge","memory":null,"mood":"tired"}"#,
        )
        .unwrap();
        assert!(npc.memory.is_empty());
        assert_eq!(npc.state.get("mood"), Some(&json!("tired")));

        let value = serde_json::to_value(&npc).unwrap();
        assert_eq!(value["mood"], "tired");
        assert_eq!(value["role"], "smith");
    }
}
