use world_model::{LogRecord, WorldState};

use super::{prompt_json, Narrator};
use crate::error::Result;
use crate::oracle::{CompletionClient, OracleCache};
use crate::prompts::INIT_TEMPLATE;

/// Log event kind written once when a world is generated.
pub const INIT_EVENT: &str = "init";

/// Result of generating a fresh world.
#[derive(Debug, Clone, PartialEq)]
pub struct InitOutcome {
    pub state: WorldState,
    pub player_location: String,
}

impl<C: CompletionClient, K: OracleCache> Narrator<C, K> {
    /// Generate the initial world from the configured seed and persist it,
    /// replacing whatever documents exist.
    pub fn init(&mut self) -> Result<InitOutcome> {
        let template = self.prompts.load(INIT_TEMPLATE)?;
        let seed = prompt_json(&self.config.init)?;
        let prompt = template.render(&[("CONFIG", seed.as_str())]);

        let state: WorldState = self.generate(prompt, INIT_TEMPLATE)?;
        self.store.save_all(&state)?;

        let player_location = self.config.start_location().to_string();
        self.store.append_log(
            LogRecord::new(INIT_EVENT)
                .with("t", 0)
                .with("player_location", player_location.as_str()),
        )?;

        tracing::info!(
            spaces = state.world.len(),
            npcs = state.entities.len(),
            events = state.events.len(),
            "world initialised"
        );
        Ok(InitOutcome {
            state,
            player_location,
        })
    }
}
