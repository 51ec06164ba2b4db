//! Update Application Engine - applies a batch of updates, logs each one and
//! persists the triplet.

use serde_json::{json, Value};

use world_model::{LogRecord, Update, UpdateList, WorldState};

use crate::error::Result;
use crate::store::WorldStore;

/// Per-batch tally returned by [`apply_updates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: usize,
}

impl ApplyReport {
    pub fn total(&self) -> usize {
        self.applied + self.skipped
    }
}

/// Log record describing one update of a batch tagged `source`.
pub fn update_record(source: &str, update: &Update, applied: bool) -> LogRecord {
    let record = LogRecord::new(source).with("type", update.kind());
    let record = match update {
        Update::SpaceUpdate(u) => record
            .with("space_id", u.space_id.as_str())
            .with("visible_state_delta", u.visible_state_delta.as_str())
            .with("reasons", u.reasons.clone()),
        Update::NpcUpdate(u) => record
            .with("npc_id", u.npc_id.as_str())
            .with("state_delta", Value::Object(u.state_delta.clone()))
            .with("memory_write", u.memory_write.clone())
            .with("reasons", u.reasons.clone()),
        Update::EventProposal(u) => record
            .with("event_id", u.event_id.as_str())
            .with("scope_spaces", u.scope_spaces.clone())
            .with("prob", json!(u.suggested_probability))
            .with("justification", u.justification.as_str()),
    };
    record.with("applied", applied)
}

/// Apply `updates` in order, append one log record per update, then write the
/// three documents.
///
/// An update naming a missing space or NPC is skipped and logged with
/// `applied: false`; it never aborts the batch.
pub fn apply_updates(
    state: &mut WorldState,
    updates: &UpdateList,
    source: &str,
    store: &WorldStore,
) -> Result<ApplyReport> {
    let mut report = ApplyReport::default();

    for update in &updates.updates {
        let applied = state.apply(update);
        if applied {
            report.applied += 1;
        } else {
            report.skipped += 1;
            tracing::debug!(
                kind = update.kind(),
                target = update.target_id(),
                "update skipped: unknown target"
            );
        }
        store.append_log(update_record(source, update, applied))?;
    }

    store.save_world(&state.world)?;
    store.save_entities(&state.entities)?;
    store.save_events(&state.events)?;

    tracing::info!(
        source = %source,
        applied = report.applied,
        skipped = report.skipped,
        "update batch applied"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use world_model::{EventProposal, LatentOp, Npc, NpcUpdate, Space, SpaceUpdate};

    fn store_in(dir: &std::path::Path) -> WorldStore {
        WorldStore::new(dir.join("data"), dir.join("snapshots"))
    }

    fn sample_state() -> WorldState {
        let mut state = WorldState::new();
        state.add_space("hall", Space::new("A hall.").with_cue("draft"));
        state.add_npc("mara", Npc::new("innkeeper", "hall"));
        state
    }

    #[test]
    fn test_batch_tolerates_stale_references() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let mut state = sample_state();

        let updates = UpdateList::new(vec![
            SpaceUpdate::new("attic", "Bats stir.").into(),
            SpaceUpdate::new("hall", "Dust settles.")
                .with_op(LatentOp::remove("draft"))
                .into(),
            NpcUpdate::new("ghost").with_memory("boo").into(),
            NpcUpdate::new("mara").with_memory("heard a bell").into(),
        ]);

        let report = apply_updates(&mut state, &updates, "latent_update", &store).unwrap();
        assert_eq!(report, ApplyReport { applied: 2, skipped: 2 });

        let hall = state.get_space("hall").unwrap();
        assert_eq!(hall.visible_state, "A hall. Dust settles.");
        assert!(hall.latent_state.is_empty());
        assert_eq!(state.get_npc("mara").unwrap().memory, ["heard a bell"]);
        assert!(state.get_space("attic").is_none());
    }

    #[test]
    fn test_one_record_per_update() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let mut state = sample_state();

        let updates = UpdateList::new(vec![
            SpaceUpdate::new("attic", "x").into(),
            EventProposal::new("storm", 0.4)
                .with_scope(["hall"])
                .with_justification("clouds")
                .into(),
        ]);
        apply_updates(&mut state, &updates, "latent_update", &store).unwrap();

        let logs = store.recent_logs(10).unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|r| r.is_kind("latent_update") && r.ts.is_some()));
        assert_eq!(logs[0].get("applied"), Some(&json!(false)));
        assert_eq!(logs[1].get_str("type"), Some("event_proposal"));
        assert_eq!(logs[1].get("prob"), Some(&json!(0.4)));
        assert_eq!(logs[1].get("applied"), Some(&json!(true)));
    }

    #[test]
    fn test_batch_persists_all_documents() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let mut state = sample_state();

        let updates = UpdateList::new(vec![EventProposal::new("storm", 0.4).into()]);
        apply_updates(&mut state, &updates, "latent_update", &store).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, state);
        assert_eq!(reloaded.get_event("storm").unwrap().latency, true);
    }

    #[test]
    fn test_npc_record_shape() {
        let update: Update = NpcUpdate::new("mara")
            .with_state("mood", json!("wary"))
            .with_memory("m")
            .into();
        let value = serde_json::to_value(update_record("dialog", &update, true)).unwrap();
        assert_eq!(value["event"], "dialog");
        assert_eq!(value["type"], "npc_update");
        assert_eq!(value["state_delta"]["mood"], "wary");
        assert_eq!(value["memory_write"], json!(["m"]));
    }
}
