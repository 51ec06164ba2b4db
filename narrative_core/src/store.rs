//! State Store - JSON documents for the world triplet plus an append-only log.
//!
//! The three documents are written independently. There is no transaction
//! across them: a process interrupted between two writes leaves the triplet
//! mutually inconsistent on disk, and nothing here repairs that.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use world_model::{EntityMap, EventList, LogRecord, WorldMap, WorldState};

use crate::config::PathsConfig;
use crate::error::Result;

pub const WORLD_FILE: &str = "world.json";
pub const ENTITIES_FILE: &str = "entities.json";
pub const EVENTS_FILE: &str = "events.json";
pub const LOG_FILE: &str = "world_log.jsonl";

/// Seconds since the Unix epoch, with sub-second precision.
pub fn now_ts() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// File-backed persistence for the world.
#[derive(Debug, Clone)]
pub struct WorldStore {
    data_dir: PathBuf,
    snapshots_dir: PathBuf,
}

impl WorldStore {
    pub fn new(data_dir: impl Into<PathBuf>, snapshots_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            snapshots_dir: snapshots_dir.into(),
        }
    }

    pub fn from_paths(paths: &PathsConfig) -> Self {
        Self::new(paths.data_dir.clone(), paths.snapshots_dir.clone())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }

    /// Load the triplet. Missing documents default to empty.
    pub fn load(&self) -> Result<WorldState> {
        Ok(WorldState {
            world: self.read_document(WORLD_FILE)?,
            entities: self.read_document(ENTITIES_FILE)?,
            events: self.read_document(EVENTS_FILE)?,
        })
    }

    pub fn save_world(&self, world: &WorldMap) -> Result<()> {
        self.write_document(WORLD_FILE, world)
    }

    pub fn save_entities(&self, entities: &EntityMap) -> Result<()> {
        self.write_document(ENTITIES_FILE, entities)
    }

    pub fn save_events(&self, events: &EventList) -> Result<()> {
        self.write_document(EVENTS_FILE, events)
    }

    /// Write all three documents, one after another.
    pub fn save_all(&self, state: &WorldState) -> Result<()> {
        self.save_world(&state.world)?;
        self.save_entities(&state.entities)?;
        self.save_events(&state.events)
    }

    /// Append one record as a single line, stamping it if it carries no
    /// timestamp. Returns the record as written.
    pub fn append_log(&self, mut record: LogRecord) -> Result<LogRecord> {
        if record.ts.is_none() {
            record.ts = Some(now_ts());
        }
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        fs::create_dir_all(&self.data_dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())?;
        file.write_all(line.as_bytes())?;

        tracing::debug!(event = %record.event, "log record appended");
        Ok(record)
    }

    /// The last `k` records in chronological order.
    ///
    /// Blank or unparseable lines inside the window are skipped, so the window
    /// may hold fewer than `k` records.
    pub fn recent_logs(&self, k: usize) -> Result<Vec<LogRecord>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let content = match fs::read_to_string(self.log_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(k);
        Ok(lines[start..]
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .filter_map(|line| serde_json::from_str::<LogRecord>(line).ok())
            .collect())
    }

    /// Copy whichever documents currently exist into `<snapshots_dir>/<tag>/`.
    ///
    /// The copy is not coordinated with concurrent writers. Returns the
    /// snapshot directory.
    pub fn snapshot(&self, tag: &str) -> Result<PathBuf> {
        let target = self.snapshots_dir.join(tag);
        fs::create_dir_all(&target)?;
        for name in [WORLD_FILE, ENTITIES_FILE, EVENTS_FILE] {
            let source = self.data_dir.join(name);
            if source.exists() {
                fs::copy(&source, target.join(name))?;
            }
        }
        tracing::info!(tag = %tag, path = %target.display(), "snapshot written");
        Ok(target)
    }

    fn read_document<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.data_dir.join(name);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(T::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_document<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.data_dir.join(name);
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), "document written");
        Ok(())
    }
}
