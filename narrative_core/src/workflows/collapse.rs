use world_model::{apply_space_update, LatentOp, LogRecord, SpaceId, SpaceUpdate};

use super::{prompt_json, Narrator};
use crate::error::{NarrativeError, Result};
use crate::oracle::{CompletionClient, OracleCache};
use crate::prompts::COLLAPSE_TEMPLATE;

/// Log event kind written when a space collapses.
pub const COLLAPSE_EVENT: &str = "collapse";

const EMPTY_VISIBLE_STATE: &str = "(no visible description yet)";

/// Result of entering a space.
#[derive(Debug, Clone, PartialEq)]
pub struct CollapseOutcome {
    pub space_id: SpaceId,
    pub update: SpaceUpdate,
    /// Visible state after the update.
    pub visible_state: String,
}

impl CollapseOutcome {
    pub fn latent_ops(&self) -> &[LatentOp] {
        &self.update.latent_state_ops
    }
}

impl<C: CompletionClient, K: OracleCache> Narrator<C, K> {
    /// Materialize `space_id` as the player enters it, then freeze it.
    ///
    /// Fails before any oracle call if the space does not exist. Only the
    /// world document is rewritten.
    pub fn collapse(&mut self, space_id: &str) -> Result<CollapseOutcome> {
        let mut state = self.store.load()?;
        let recent_logs = self.store.recent_logs(self.config.context.recent_log_k)?;
        let ctx = self
            .assembler
            .collapse_context(&state, space_id, &recent_logs)?;

        let template = self.prompts.load(COLLAPSE_TEMPLATE)?;
        let visible = if ctx.visible_state.is_empty() {
            EMPTY_VISIBLE_STATE
        } else {
            ctx.visible_state.as_str()
        };
        let latent_json = prompt_json(&ctx.latent_state)?;
        let logs_json = prompt_json(&ctx.space_logs)?;
        let prompt = template.render(&[
            ("SPACE_ID", space_id),
            ("VISIBLE_STATE", visible),
            ("LATENT_STATE", latent_json.as_str()),
            ("SPACE_LOGS_JSON", logs_json.as_str()),
        ]);

        let mut update: SpaceUpdate =
            self.generate(prompt, &format!("{COLLAPSE_TEMPLATE}::{space_id}"))?;
        if update.space_id != space_id {
            tracing::warn!(
                proposed = %update.space_id,
                space_id = %space_id,
                "collapse update named another space, retargeting"
            );
            update.space_id = space_id.to_string();
        }

        apply_space_update(&mut state.world, &update);
        state.freeze_space(space_id);
        self.store.save_world(&state.world)?;

        self.store.append_log(
            LogRecord::new(COLLAPSE_EVENT)
                .with("space_id", space_id)
                .with("visible_state_delta", update.visible_state_delta.as_str())
                .with("latent_state_ops", serde_json::to_value(&update.latent_state_ops)?)
                .with("importance_delta", update.importance_delta)
                .with("reasons", update.reasons.clone()),
        )?;

        let visible_state = state
            .get_space(space_id)
            .map(|space| space.visible_state.clone())
            .ok_or_else(|| NarrativeError::UnknownSpace {
                space_id: space_id.to_string(),
            })?;
        tracing::info!(space_id = %space_id, "space collapsed and frozen");

        Ok(CollapseOutcome {
            space_id: space_id.to_string(),
            update,
            visible_state,
        })
    }
}
