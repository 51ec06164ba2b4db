use world_model::UpdateList;

use super::{prompt_json, Narrator};
use crate::engine::{apply_updates, ApplyReport};
use crate::error::Result;
use crate::oracle::{CompletionClient, OracleCache};
use crate::prompts::TICK_TEMPLATE;

/// Source tag of records written by a latent tick.
pub const TICK_SOURCE: &str = "latent_update";

const TICK_CACHE_TAG: &str = "latent_tick";

/// Result of one latent tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickOutcome {
    /// Updates handed to the engine, after truncation.
    pub updates: UpdateList,
    pub report: ApplyReport,
    /// Updates dropped for exceeding the per-tick maximum.
    pub dropped: usize,
}

impl<C: CompletionClient, K: OracleCache> Narrator<C, K> {
    /// Evolve unobserved parts of the world by one step.
    ///
    /// An empty update list writes nothing and logs nothing.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let mut state = self.store.load()?;
        let candidates = self.assembler.build_candidates(&state);
        let recent_k = self.config.context.recent_log_k;
        let recent_logs = self.store.recent_logs(recent_k)?;
        let max_updates = self.config.max_updates_per_tick;

        let template = self.prompts.load(TICK_TEMPLATE)?;
        let candidates_json = prompt_json(&candidates)?;
        let logs_json = prompt_json(&recent_logs)?;
        let recent_k = recent_k.to_string();
        let max_text = max_updates.to_string();
        let prompt = template.render(&[
            ("CANDIDATES_JSON", candidates_json.as_str()),
            ("RECENT_LOGS_JSON", logs_json.as_str()),
            ("RECENT_K", recent_k.as_str()),
            ("MAX_UPDATES", max_text.as_str()),
        ]);

        let mut updates: UpdateList = self.generate(prompt, TICK_CACHE_TAG)?;

        let dropped = updates.len().saturating_sub(max_updates);
        if dropped > 0 {
            tracing::warn!(
                proposed = updates.len(),
                max = max_updates,
                "tick proposed too many updates, dropping the excess"
            );
            updates.updates.truncate(max_updates);
        }

        if updates.is_empty() {
            tracing::info!("tick produced no updates");
            return Ok(TickOutcome {
                dropped,
                ..TickOutcome::default()
            });
        }

        let report = apply_updates(&mut state, &updates, TICK_SOURCE, &self.store)?;
        Ok(TickOutcome {
            updates,
            report,
            dropped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{narrator, seed_world};
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_tick_applies_updates() {
        let reply = json!({"updates": [
            {"type": "space_update", "space_id": "cellar", "visible_state_delta": "Water drips.",
             "latent_state_ops": [{"op": "add", "cue": "loose brick"}], "importance_delta": 1},
            {"type": "npc_update", "npc_id": "mara", "state_delta": {"mood": "uneasy"},
             "memory_write": ["heard dripping"]},
            {"type": "event_proposal", "event_id": "flood", "scope_spaces": ["cellar"],
             "suggested_probability": 0.2, "justification": "water rising"}
        ]});
        let dir = tempdir().unwrap();
        let mut narrator = narrator(dir.path(), [reply.to_string()]);
        seed_world(&narrator);

        let outcome = narrator.tick().unwrap();
        assert_eq!(outcome.report.applied, 3);
        assert_eq!(outcome.dropped, 0);

        let state = narrator.store().load().unwrap();
        let cellar = state.get_space("cellar").unwrap();
        assert_eq!(cellar.visible_state, "Water drips.");
        assert!(cellar.latent_state.contains("loose brick"));
        assert_eq!(cellar.importance, 2);
        let mara = state.get_npc("mara").unwrap();
        assert_eq!(mara.state.get("mood"), Some(&json!("uneasy")));
        assert_eq!(mara.memory, ["heard dripping"]);
        assert!(state.get_event("flood").unwrap().latency);

        let logs = narrator.store().recent_logs(10).unwrap();
        assert_eq!(logs.len(), 3);
        assert!(logs.iter().all(|r| r.is_kind(TICK_SOURCE)));
    }

    #[test]
    fn test_empty_tick_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut narrator = narrator(dir.path(), [r#"{"updates": []}"#]);
        seed_world(&narrator);
        let world_path = narrator.store().data_dir().join(crate::store::WORLD_FILE);
        let before = std::fs::read_to_string(&world_path).unwrap();

        let outcome = narrator.tick().unwrap();
        assert!(outcome.updates.is_empty());
        assert_eq!(outcome.report.total(), 0);
        assert_eq!(std::fs::read_to_string(&world_path).unwrap(), before);
        assert!(!narrator.store().log_path().exists());
    }

    #[test]
    fn test_tick_truncates_to_maximum() {
        let updates: Vec<_> = (0..7)
            .map(|i| json!({"type": "npc_update", "npc_id": "mara", "memory_write": [format!("m{i}")]}))
            .collect();
        let dir = tempdir().unwrap();
        let mut narrator = narrator(dir.path(), [json!({ "updates": updates }).to_string()]);
        seed_world(&narrator);

        let outcome = narrator.tick().unwrap();
        assert_eq!(outcome.updates.len(), 5);
        assert_eq!(outcome.dropped, 2);
        let state = narrator.store().load().unwrap();
        assert_eq!(state.get_npc("mara").unwrap().memory.len(), 5);
    }

    #[test]
    fn test_tick_prompt_excludes_frozen_spaces() {
        let dir = tempdir().unwrap();
        let mut narrator = narrator(dir.path(), [r#"{"updates": []}"#]);
        let mut state = seed_world(&narrator);
        state.freeze_space("hall");
        narrator.store().save_all(&state).unwrap();

        narrator.tick().unwrap();
        let prompt = narrator.oracle().client().last_prompt().unwrap();
        assert!(prompt.starts_with("max 5 of 10"));
        assert!(prompt.contains("\"cellar\""));
        assert!(!prompt.contains("\"id\": \"hall\""));
        // NPCs are never filtered, even when standing in a frozen space.
        assert!(prompt.contains("\"mara\""));
    }
}
