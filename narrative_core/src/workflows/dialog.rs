use serde::{Deserialize, Serialize};

use world_model::{apply_npc_update, check_len, LogRecord, NpcUpdate, Validate, ValidationError};

use super::{prompt_json, Narrator};
use crate::context_assembler::DIALOG_EVENT;
use crate::error::Result;
use crate::oracle::{CompletionClient, OracleCache};
use crate::prompts::{escape_player_input, DIALOG_TEMPLATE};

/// Maximum NPC reply length, in characters.
pub const MAX_UTTERANCE_CHARS: usize = 200;

const EMPTY_SURROUNDINGS: &str = "(nothing notable is visible here)";
const UNKNOWN: &str = "unknown";

/// What the oracle returns for one line of dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogResponse {
    pub npc_update: NpcUpdate,
    pub utterance_text: String,
}

impl Validate for DialogResponse {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.npc_update.validate()?;
        check_len("utterance_text", &self.utterance_text, 1, MAX_UTTERANCE_CHARS)
    }
}

fn or_unknown(text: &str) -> &str {
    if text.is_empty() {
        UNKNOWN
    } else {
        text
    }
}

impl<C: CompletionClient, K: OracleCache> Narrator<C, K> {
    /// Say `player_input` to `npc_id` and return the NPC's reply.
    ///
    /// An unknown NPC is an error and nothing is written. Only the entities
    /// document is rewritten.
    pub fn dialog(&mut self, npc_id: &str, player_input: &str) -> Result<String> {
        let mut state = self.store.load()?;
        let recent_logs = self
            .store
            .recent_logs(self.config.context.dialog_log_window)?;
        let ctx = self.assembler.npc_context(&state, npc_id, &recent_logs)?;

        let template = self.prompts.load(DIALOG_TEMPLATE)?;
        let visible = if ctx.visible_state.is_empty() {
            EMPTY_SURROUNDINGS
        } else {
            ctx.visible_state.as_str()
        };
        let memory_json = prompt_json(&ctx.memory_tail)?;
        let dialogs_json = prompt_json(&ctx.dialog_logs)?;
        let escaped_input = escape_player_input(player_input);
        let prompt = template.render(&[
            ("NPC_ID", npc_id),
            ("ROLE", or_unknown(ctx.role())),
            ("LOCATION", or_unknown(ctx.location())),
            ("VISIBLE_STATE", visible),
            ("NPC_MEMORY_JSON", memory_json.as_str()),
            ("RECENT_DIALOGS_JSON", dialogs_json.as_str()),
            ("PLAYER_INPUT", escaped_input.as_str()),
        ]);

        let mut response: DialogResponse =
            self.generate(prompt, &format!("{DIALOG_TEMPLATE}::{npc_id}"))?;
        if response.npc_update.npc_id != npc_id {
            tracing::warn!(
                proposed = %response.npc_update.npc_id,
                npc_id = %npc_id,
                "dialog update named another npc, retargeting"
            );
            response.npc_update.npc_id = npc_id.to_string();
        }

        apply_npc_update(&mut state.entities, &response.npc_update);
        self.store.save_entities(&state.entities)?;

        self.store.append_log(
            LogRecord::new(DIALOG_EVENT)
                .with("npc_id", npc_id)
                .with("player_input", player_input)
                .with("npc_reply", response.utterance_text.as_str())
                .with("npc_update", serde_json::to_value(&response.npc_update)?),
        )?;
        tracing::info!(npc_id = %npc_id, "dialog turn recorded");

        Ok(response.utterance_text)
    }
}
