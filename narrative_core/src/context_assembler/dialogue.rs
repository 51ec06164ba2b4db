//! Dialogue context for talking to one NPC.

use serde::{Deserialize, Serialize};

use world_model::{LogRecord, Npc, NpcId, WorldState};

use super::ContextAssembler;
use crate::error::{NarrativeError, Result};

/// Log event kind written by the Dialog workflow.
pub const DIALOG_EVENT: &str = "dialog";

/// Everything shown to the oracle when the player talks to an NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcContext {
    pub npc_id: NpcId,
    pub npc: Npc,
    /// Visible state of the NPC's location; empty if the location is unknown.
    pub visible_state: String,
    pub memory_tail: Vec<String>,
    /// Past dialogue with this NPC, oldest first.
    pub dialog_logs: Vec<LogRecord>,
}

impl NpcContext {
    pub fn role(&self) -> &str {
        &self.npc.role
    }

    pub fn location(&self) -> &str {
        &self.npc.location
    }
}

/// The most recent `max` dialog records for `npc_id`, oldest first.
///
/// Scans newest to oldest and stops once `max` records are found.
pub fn recent_dialogue(npc_id: &str, logs: &[LogRecord], max: usize) -> Vec<LogRecord> {
    let mut found: Vec<LogRecord> = logs
        .iter()
        .rev()
        .filter(|record| record.is_kind(DIALOG_EVENT) && record.get_str("npc_id") == Some(npc_id))
        .take(max)
        .cloned()
        .collect();
    found.reverse();
    found
}

impl ContextAssembler {
    /// Build the dialogue context for `npc_id` from the dialog log window.
    ///
    /// An unknown NPC is a hard error.
    pub fn npc_context(
        &self,
        state: &WorldState,
        npc_id: &str,
        recent_logs: &[LogRecord],
    ) -> Result<NpcContext> {
        let npc = state
            .get_npc(npc_id)
            .ok_or_else(|| NarrativeError::UnknownNpc {
                npc_id: npc_id.to_string(),
            })?;

        let visible_state = state
            .get_space(&npc.location)
            .map(|space| space.visible_state.clone())
            .unwrap_or_default();

        Ok(NpcContext {
            npc_id: npc_id.to_string(),
            npc: npc.clone(),
            visible_state,
            memory_tail: npc.memory_tail(self.config.max_memory).to_vec(),
            dialog_logs: recent_dialogue(npc_id, recent_logs, self.config.max_dialog_logs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use world_model::Space;

    fn dialog(npc: &str, n: i32) -> LogRecord {
        LogRecord::new(DIALOG_EVENT).with("npc_id", npc).with("n", n)
    }

    #[test]
    fn test_recent_dialogue_caps_and_keeps_chronology() {
        let logs = vec![
            dialog("mara", 1),
            dialog("tobin", 2),
            LogRecord::new("latent_update").with("npc_id", "mara"),
            dialog("mara", 3),
            dialog("mara", 4),
            dialog("mara", 5),
        ];

        let picked: Vec<_> = recent_dialogue("mara", &logs, 2)
            .into_iter()
            .map(|r| r.get("n").cloned().unwrap())
            .collect();
        assert_eq!(picked, [4, 5]);

        assert_eq!(recent_dialogue("mara", &logs, 10).len(), 4);
        assert!(recent_dialogue("mara", &logs, 0).is_empty());
    }

    #[test]
    fn test_npc_context_collects_surroundings() {
        let mut state = WorldState::new();
        state.add_space("tavern", Space::new("Smoke and song."));
        let mut npc = Npc::new("innkeeper", "tavern");
        npc.remember(["m1", "m2", "m3"]);
        state.add_npc("mara", npc);

        let assembler = ContextAssembler::new(ContextConfig {
            max_memory: 2,
            max_dialog_logs: 1,
            ..ContextConfig::default()
        });
        let logs = vec![dialog("mara", 1), dialog("mara", 2)];

        let ctx = assembler.npc_context(&state, "mara", &logs).unwrap();
        assert_eq!(ctx.role(), "innkeeper");
        assert_eq!(ctx.visible_state, "Smoke and song.");
        assert_eq!(ctx.memory_tail, ["m2", "m3"]);
        assert_eq!(ctx.dialog_logs.len(), 1);
        assert_eq!(ctx.dialog_logs[0].get("n").cloned().unwrap(), 2);
    }

    #[test]
    fn test_npc_context_unresolved_location() {
        let mut state = WorldState::new();
        state.add_npc("tobin", Npc::new("thief", "sewers"));

        let ctx = ContextAssembler::with_defaults()
            .npc_context(&state, "tobin", &[])
            .unwrap();
        assert_eq!(ctx.location(), "sewers");
        assert!(ctx.visible_state.is_empty());
    }

    #[test]
    fn test_npc_context_unknown_npc_is_hard_error() {
        let err = ContextAssembler::with_defaults()
            .npc_context(&WorldState::new(), "ghost", &[])
            .unwrap_err();
        assert!(matches!(err, NarrativeError::UnknownNpc { npc_id } if npc_id == "ghost"));
    }
}
