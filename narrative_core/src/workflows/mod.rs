//! Workflow orchestrators: Init, Tick, Collapse and Dialog.
//!
//! Each workflow loads the persisted world, assembles context, asks the oracle
//! for a typed result, applies it and persists what it touched. Workflows are
//! not safe to run concurrently against the same data directory.

mod collapse;
mod dialog;
mod init;
mod tick;

pub use collapse::*;
pub use dialog::*;
pub use init::*;
pub use tick::*;

use serde::Serialize;

use crate::config::NarrativeConfig;
use crate::context_assembler::ContextAssembler;
use crate::error::Result;
use crate::oracle::{
    CompletionClient, DiskCache, OracleCache, OracleRequest, RetryPolicy, StructuredOracle,
    StructuredOutput,
};
use crate::prompts::PromptLibrary;
use crate::store::WorldStore;

/// Owns everything a workflow needs.
#[derive(Debug)]
pub struct Narrator<C, K = DiskCache> {
    config: NarrativeConfig,
    store: WorldStore,
    prompts: PromptLibrary,
    assembler: ContextAssembler,
    oracle: StructuredOracle<C, K>,
}

impl<C: CompletionClient> Narrator<C, DiskCache> {
    /// Wire a narrator from configuration, caching on disk unless disabled.
    pub fn from_config(config: NarrativeConfig, client: C) -> Self {
        let cache = config
            .cache
            .then(|| DiskCache::new(config.paths.cache_dir.clone()));
        let oracle = StructuredOracle::new(client, cache, RetryPolicy::from_config(&config));
        Self::new(config, oracle)
    }
}

impl<C: CompletionClient, K: OracleCache> Narrator<C, K> {
    pub fn new(config: NarrativeConfig, oracle: StructuredOracle<C, K>) -> Self {
        Self {
            store: WorldStore::from_paths(&config.paths),
            prompts: PromptLibrary::new(config.paths.prompts_dir.clone()),
            assembler: ContextAssembler::new(config.context.clone()),
            config,
            oracle,
        }
    }

    pub fn config(&self) -> &NarrativeConfig {
        &self.config
    }

    pub fn store(&self) -> &WorldStore {
        &self.store
    }

    pub fn oracle(&self) -> &StructuredOracle<C, K> {
        &self.oracle
    }

    fn generate<T: StructuredOutput>(&mut self, prompt: String, tag: &str) -> Result<T> {
        let request = OracleRequest::from_config(prompt, &self.config).with_tag(tag);
        Ok(self.oracle.generate(&request)?)
    }
}

/// Pretty JSON for prompt insertion.
fn prompt_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
