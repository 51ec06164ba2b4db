//! # World Model
//!
//! The "world bible" crate - contains the narrative world's data model and the
//! typed updates that evolve it. This crate is the single source of truth for
//! what a valid world looks like and does no I/O and no oracle calls.
//!
//! - **entities**: spaces, NPCs and events
//! - **mechanics**: importance bounds and latent cue set semantics
//! - **updates**: the oracle's update taxonomy and its validation rules
//! - **world_state**: the world triplet and in-memory update application
//! - **log**: append-only log records

pub mod entities;
pub mod log;
pub mod mechanics;
pub mod updates;
pub mod world_state;

pub use entities::*;
pub use log::*;
pub use mechanics::*;
pub use updates::*;
pub use world_state::*;
