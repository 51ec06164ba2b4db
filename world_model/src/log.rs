//! Append-only world log records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One line of the world log.
///
/// Records are open-ended: besides the `event` kind and the timestamp, any
/// field may be attached. Records are never rewritten once appended.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogRecord {
    /// What produced the record (`"init"`, `"collapse"`, `"dialog"`, or an
    /// update batch source such as `"latent_update"`).
    #[serde(default)]
    pub event: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,

    /// Seconds since the Unix epoch. Filled in by the store when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<f64>,
}

impl LogRecord {
    /// Create a record of the given event kind.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            fields: Map::new(),
            ts: None,
        }
    }

    /// Attach a field, replacing any previous value under the same key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_ts(mut self, ts: f64) -> Self {
        self.ts = Some(ts);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// A string-valued field, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn is_kind(&self, event: &str) -> bool {
        self.event == event
    }
}
