//! Entity definitions for the narrative world.

mod event;
mod npc;
mod space;

pub use event::*;
pub use npc::*;
pub use space::*;

use serde::{Deserialize, Serialize};

/// Identifier of a space. Chosen by world generation, unique within the world map.
pub type SpaceId = String;

/// Identifier of an NPC. Unique within the entity map.
pub type NpcId = String;

/// Identifier of an event. Unique within the event list.
pub type EventId = String;

/// Kinds of entities the engine tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Space,
    Npc,
    Event,
}
