//! # Narrative Core
//!
//! The engine half of the latent world. This crate reads and writes the
//! persisted world, decides what the oracle gets to see, talks to the oracle
//! and applies what comes back.
//!
//! ## Core Components
//!
//! - **store**: JSON documents for the world triplet plus the append-only log
//! - **context_assembler**: candidate pools, space-scoped logs and NPC context
//! - **oracle**: cached, validated, retried structured generation
//! - **engine**: batch application of updates with per-update log records
//! - **workflows**: Init, Tick, Collapse and Dialog on one [`Narrator`]
//!
//! ## Design Philosophy
//!
//! - **Latent until observed**: unobserved spaces evolve as hidden cues; entering
//!   one collapses it into visible description and freezes it
//! - **Tolerant batches**: an update naming a missing id is skipped, never fatal
//! - **Append-only history**: the log and NPC memory only ever grow

pub mod config;
pub mod context_assembler;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod prompts;
pub mod store;
pub mod workflows;

pub use config::*;
pub use context_assembler::*;
pub use engine::*;
pub use error::*;
pub use oracle::*;
pub use prompts::*;
pub use store::*;
pub use workflows::*;

pub use world_model;
