use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use narrative_core::{
    NarrativeConfig, Narrator, OpenAiChatClient, WorldStore, DEFAULT_CONFIG_FILE_NAME,
};

#[derive(Parser, Debug)]
#[command(name = "latent-world", version, about = "Drive a latent narrative world from the command line")]
struct Cli {
    /// Configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE_NAME)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a fresh world from the configured seed
    Init,
    /// Run one latent update over unobserved spaces and NPCs
    Tick,
    /// Enter a space, collapsing and freezing it
    Enter { space_id: String },
    /// Say something to an NPC
    Talk {
        npc_id: String,
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },
    /// Print the effective model settings and init seed
    ShowConfig,
    /// Copy the current world documents into a tagged snapshot directory
    Snapshot { tag: Option<String> },
}

fn narrator(config: NarrativeConfig) -> Result<Narrator<OpenAiChatClient>> {
    let client = OpenAiChatClient::from_config(&config.llm).context("cannot build oracle client")?;
    Ok(Narrator::from_config(config, client))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = NarrativeConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    tracing::debug!(config = %cli.config.display(), model = %config.model, "configuration loaded");

    match cli.command {
        Command::ShowConfig => {
            println!("model: {}", config.model);
            println!("temperature: {} max_tokens: {}", config.temperature, config.max_tokens);
            println!("init: {}", config.init);
        }
        Command::Snapshot { tag } => {
            let tag = tag.unwrap_or_else(|| format!("snapshot-{}", uuid::Uuid::new_v4()));
            let path = WorldStore::from_paths(&config.paths).snapshot(&tag)?;
            println!("snapshot written to {}", path.display());
        }
        Command::Init => {
            let outcome = narrator(config)?.init()?;
            println!(
                "world ready: {} spaces, {} npcs, {} events; player starts at {}",
                outcome.state.world.len(),
                outcome.state.entities.len(),
                outcome.state.events.len(),
                outcome.player_location
            );
        }
        Command::Tick => {
            let outcome = narrator(config)?.tick()?;
            println!(
                "tick: {} applied, {} skipped, {} dropped",
                outcome.report.applied, outcome.report.skipped, outcome.dropped
            );
        }
        Command::Enter { space_id } => {
            let outcome = narrator(config)?.collapse(&space_id)?;
            println!("[{}] {}", outcome.space_id, outcome.visible_state);
            println!("  new: {}", outcome.update.visible_state_delta);
        }
        Command::Talk { npc_id, words } => {
            let reply = narrator(config)?.dialog(&npc_id, &words.join(" "))?;
            println!("{npc_id}: {reply}");
        }
    }
    Ok(())
}
