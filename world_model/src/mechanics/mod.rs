//! World mechanics: importance bounds and latent cue set semantics.

use serde::{Deserialize, Deserializer, Serialize};

/// Lowest importance any space or NPC may hold.
pub const MIN_IMPORTANCE: i64 = 1;

/// Highest importance any space or NPC may hold.
pub const MAX_IMPORTANCE: i64 = 3;

/// Default importance for entities that do not declare one.
pub fn default_importance() -> i64 {
    MIN_IMPORTANCE
}

/// Clamp an importance value into `[MIN_IMPORTANCE, MAX_IMPORTANCE]`.
pub fn clamp_importance(value: i64) -> i64 {
    value.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE)
}

/// Read an importance value from a document, clamping it into bounds.
///
/// Generated and hand-edited documents may carry any integer here.
pub fn deserialize_importance<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    i64::deserialize(deserializer).map(clamp_importance)
}

/// Add a delta to an importance value and clamp the result.
///
/// Saturating so that absurd deltas from the oracle cannot overflow.
pub fn adjust_importance(current: i64, delta: i64) -> i64 {
    clamp_importance(current.saturating_add(delta))
}

/// Operation kinds on a latent cue set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatentOpKind {
    Add,
    Remove,
}

/// Ordered set of hidden cues.
///
/// Stored as a plain list so persisted documents keep their order, but mutated
/// only through set operations: adding a present cue or removing an absent cue
/// is a no-op. A persisted `null` reads as the empty set and duplicates in a
/// persisted list collapse to their first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<Vec<String>>", into = "Vec<String>")]
pub struct LatentCues(Vec<String>);

impl From<Option<Vec<String>>> for LatentCues {
    fn from(raw: Option<Vec<String>>) -> Self {
        raw.unwrap_or_default().into_iter().collect()
    }
}

impl From<LatentCues> for Vec<String> {
    fn from(cues: LatentCues) -> Self {
        cues.0
    }
}

impl LatentCues {
    /// Create an empty cue set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cue at the end unless it is already present.
    ///
    /// Returns `true` if the set changed.
    pub fn add(&mut self, cue: impl Into<String>) -> bool {
        let cue = cue.into();
        if self.contains(&cue) {
            return false;
        }
        self.0.push(cue);
        true
    }

    /// Remove a cue if present.
    ///
    /// Returns `true` if the set changed.
    pub fn remove(&mut self, cue: &str) -> bool {
        match self.0.iter().position(|c| c == cue) {
            Some(index) => {
                self.0.remove(index);
                true
            }
            None => false,
        }
    }

    /// Apply one operation.
    pub fn apply(&mut self, kind: LatentOpKind, cue: &str) -> bool {
        match kind {
            LatentOpKind::Add => self.add(cue),
            LatentOpKind::Remove => self.remove(cue),
        }
    }

    pub fn contains(&self, cue: &str) -> bool {
        self.0.iter().any(|c| c == cue)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for LatentCues {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut cues = LatentCues::new();
        for cue in iter {
            cues.add(cue);
        }
        cues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_importance() {
        assert_eq!(clamp_importance(-4), 1);
        assert_eq!(clamp_importance(0), 1);
        assert_eq!(clamp_importance(2), 2);
        assert_eq!(clamp_importance(9), 3);
    }

    #[test]
    fn test_deserialized_importance_is_clamped() {
        #[derive(Deserialize)]
        struct Doc {
            #[serde(deserialize_with = "deserialize_importance")]
            importance: i64,
        }
        let high: Doc = serde_json::from_str(r#"{"importance": 7}"#).unwrap();
        let low: Doc = serde_json::from_str(r#"{"importance": -4}"#).unwrap();
        let ok: Doc = serde_json::from_str(r#"{"importance": 2}"#).unwrap();
        assert_eq!((high.importance, low.importance, ok.importance), (3, 1, 2));
    }

    #[test]
    fn test_adjust_importance_saturates() {
        assert_eq!(adjust_importance(2, 2), 3);
        assert_eq!(adjust_importance(2, -5), 1);
        assert_eq!(adjust_importance(3, i64::MAX), 3);
        assert_eq!(adjust_importance(1, i64::MIN), 1);
    }

    #[test]
    fn test_latent_add_is_idempotent() {
        let mut cues = LatentCues::new();
        assert!(cues.add("footsteps"));
        assert!(!cues.add("footsteps"));
        assert_eq!(cues.len(), 1);
    }

    #[test]
    fn test_latent_remove_absent_is_noop() {
        let mut cues: LatentCues = ["a", "b"].into_iter().collect();
        assert!(!cues.remove("zzz"));
        assert_eq!(cues.as_slice(), ["a", "b"]);
    }

    #[test]
    fn test_latent_order_is_insertion_minus_removals() {
        let mut cues: LatentCues = ["a", "b", "c"].into_iter().collect();
        cues.remove("b");
        cues.add("d");
        cues.add("a");
        assert_eq!(cues.as_slice(), ["a", "c", "d"]);
    }

    #[test]
    fn test_from_iter_drops_duplicates() {
        let cues: LatentCues = ["x", "y", "x"].into_iter().collect();
        assert_eq!(cues.as_slice(), ["x", "y"]);
    }

    #[test]
    fn test_persisted_cues_null_and_duplicates() {
        let cues: LatentCues = serde_json::from_str("null").unwrap();
        assert!(cues.is_empty());

        let cues: LatentCues = serde_json::from_str(r#"["a","b","a"]"#).unwrap();
        assert_eq!(cues.as_slice(), ["a", "b"]);
        assert_eq!(serde_json::to_string(&cues).unwrap(), r#"["a","b"]"#);
    }

    #[test]
    fn test_latent_op_kind_wire_format() {
        let kind: LatentOpKind = serde_json::from_str("\"remove\"").unwrap();
        assert_eq!(kind, LatentOpKind::Remove);
        assert_eq!(serde_json::to_string(&LatentOpKind::Add).unwrap(), "\"add\"");
    }
}
