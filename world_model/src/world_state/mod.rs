//! World state management - the triplet of spaces, NPCs and events, and the
//! in-memory application of typed updates to it.
//!
//! Every `apply_*` function tolerates stale references: an update naming an id
//! that is not present is ignored and reported as not applied, so a single bad
//! reference never aborts a batch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::{Event, Npc, NpcId, Space, SpaceId, StateMerge};
use crate::updates::{EventProposal, NpcUpdate, SpaceUpdate, Update, Validate, ValidationError};

/// All spaces keyed by id.
pub type WorldMap = BTreeMap<SpaceId, Space>;

/// All NPCs keyed by id.
pub type EntityMap = BTreeMap<NpcId, Npc>;

/// Pending events in insertion order.
pub type EventList = Vec<Event>;

/// Apply a space update. Returns `false` if the space does not exist.
pub fn apply_space_update(world: &mut WorldMap, update: &SpaceUpdate) -> bool {
    let Some(space) = world.get_mut(&update.space_id) else {
        tracing::debug!(space_id = %update.space_id, "space update ignored: unknown space");
        return false;
    };

    space.append_visible(&update.visible_state_delta);
    for op in &update.latent_state_ops {
        space.latent_state.apply(op.op, &op.cue);
    }
    space.adjust_importance(update.importance_delta);
    true
}

/// Apply an NPC update. Returns `false` if the NPC does not exist.
pub fn apply_npc_update(entities: &mut EntityMap, update: &NpcUpdate) -> bool {
    let Some(npc) = entities.get_mut(&update.npc_id) else {
        tracing::debug!(npc_id = %update.npc_id, "npc update ignored: unknown npc");
        return false;
    };

    for (key, value) in &update.state_delta {
        if npc.merge_state(key, value.clone()) == StateMerge::Refused {
            tracing::warn!(
                npc_id = %update.npc_id,
                key = %key,
                "state delta key refused"
            );
        }
    }
    npc.remember(update.memory_write.iter().cloned());
    npc.adjust_importance(update.importance_delta);
    true
}

/// Upsert an event by id.
///
/// An existing event takes the proposal's probability unconditionally and its
/// scope/outcomes unless the proposal leaves them empty. An unknown id appends
/// a new latent event. Always applies; returns `true` when a new event was
/// appended.
pub fn apply_event_proposal(events: &mut EventList, proposal: &EventProposal) -> bool {
    if let Some(event) = events.iter_mut().find(|e| e.id == proposal.event_id) {
        if !proposal.scope_spaces.is_empty() {
            event.scope_spaces = proposal.scope_spaces.clone();
        }
        event.trigger_probability = proposal.suggested_probability;
        if !proposal.possible_outcomes.is_empty() {
            event.possible_outcomes = proposal.possible_outcomes.clone();
        }
        return false;
    }

    events.push(
        Event::new(proposal.event_id.clone(), proposal.suggested_probability)
            .with_scope(proposal.scope_spaces.iter().cloned())
            .with_outcomes(proposal.possible_outcomes.iter().cloned()),
    );
    true
}

/// The complete persisted state of the world.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldState {
    #[serde(default)]
    pub world: WorldMap,

    #[serde(default)]
    pub entities: EntityMap,

    #[serde(default)]
    pub events: EventList,
}

impl WorldState {
    /// Create a new empty world state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a space to the world.
    pub fn add_space(&mut self, id: impl Into<SpaceId>, space: Space) {
        self.world.insert(id.into(), space);
    }

    /// Add an NPC to the world.
    pub fn add_npc(&mut self, id: impl Into<NpcId>, npc: Npc) {
        self.entities.insert(id.into(), npc);
    }

    pub fn get_space(&self, id: &str) -> Option<&Space> {
        self.world.get(id)
    }

    pub fn get_space_mut(&mut self, id: &str) -> Option<&mut Space> {
        self.world.get_mut(id)
    }

    pub fn get_npc(&self, id: &str) -> Option<&Npc> {
        self.entities.get(id)
    }

    pub fn get_event(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Spaces still eligible for latent updates, in id order.
    pub fn active_spaces(&self) -> impl Iterator<Item = (&SpaceId, &Space)> {
        self.world.iter().filter(|(_, space)| !space.frozen)
    }

    /// Freeze a space after collapse. Returns `false` if it does not exist.
    pub fn freeze_space(&mut self, id: &str) -> bool {
        match self.world.get_mut(id) {
            Some(space) => {
                space.freeze();
                true
            }
            None => false,
        }
    }

    /// Dispatch one update to the matching apply function.
    ///
    /// Returns whether the target was found; event proposals always apply.
    pub fn apply(&mut self, update: &Update) -> bool {
        match update {
            Update::SpaceUpdate(u) => apply_space_update(&mut self.world, u),
            Update::NpcUpdate(u) => apply_npc_update(&mut self.entities, u),
            Update::EventProposal(u) => {
                apply_event_proposal(&mut self.events, u);
                true
            }
        }
    }
}

impl Validate for WorldState {
    fn validate(&self) -> Result<(), ValidationError> {
        for event in &self.events {
            let p = event.trigger_probability;
            if !(0.0..=1.0).contains(&p) {
                return Err(ValidationError::OutOfRange {
                    field: format!("events[{}].trigger_probability", event.id),
                    value: p,
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        Ok(())
    }
}
