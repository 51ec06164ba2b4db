//! Property tests for world invariants.
//!
//! Random sequences of updates are applied to a small world and the importance
//! bounds, the latent cue set law and the event upsert law are checked after
//! every step.

use proptest::prelude::*;
use world_model::*;

const SPACE_IDS: [&str; 3] = ["hall", "cellar", "tower"];
const NPC_IDS: [&str; 2] = ["mara", "tobin"];
const CUES: [&str; 4] = ["key", "draft", "footsteps", "smell of smoke"];

fn seeded_world() -> WorldState {
    let mut state = WorldState::new();
    for id in SPACE_IDS {
        state.add_space(id, Space::new(""));
    }
    for id in NPC_IDS {
        state.add_npc(id, Npc::new("villager", "hall"));
    }
    state
}

fn latent_op() -> impl Strategy<Value = LatentOp> {
    (any::<bool>(), 0..CUES.len()).prop_map(|(add, i)| {
        if add {
            LatentOp::add(CUES[i])
        } else {
            LatentOp::remove(CUES[i])
        }
    })
}

/// Any update, including references to ids that do not exist.
fn update() -> impl Strategy<Value = Update> {
    let space = (
        prop::sample::select(vec!["hall", "cellar", "tower", "void"]),
        prop::collection::vec(latent_op(), 0..5),
        -10i64..10,
    )
        .prop_map(|(id, ops, delta)| {
            let mut update = SpaceUpdate::new(id, "").with_importance_delta(delta);
            update.latent_state_ops = ops;
            Update::from(update)
        });
    let npc = (
        prop::sample::select(vec!["mara", "tobin", "ghost"]),
        prop::collection::vec("[a-z]{1,8}", 0..3),
        -10i64..10,
    )
        .prop_map(|(id, memory, delta)| {
            let mut update = NpcUpdate::new(id).with_importance_delta(delta);
            update.memory_write = memory;
            Update::from(update)
        });
    let event = (prop::sample::select(vec!["ev1", "ev2", "ev3"]), 0.0f64..=1.0)
        .prop_map(|(id, p)| Update::from(EventProposal::new(id, p)));

    prop_oneof![space, npc, event]
}

proptest! {
    #[test]
    fn importance_stays_in_bounds(updates in prop::collection::vec(update(), 0..40)) {
        let mut state = seeded_world();
        for update in &updates {
            state.apply(update);
            for space in state.world.values() {
                prop_assert!((MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&space.importance));
            }
            for npc in state.entities.values() {
                prop_assert!((MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&npc.importance));
            }
        }
    }

    #[test]
    fn latent_cues_follow_set_law(ops in prop::collection::vec(latent_op(), 0..30)) {
        let mut state = seeded_world();
        let mut model: Vec<String> = Vec::new();

        for op in ops {
            match op.op {
                LatentOpKind::Add => {
                    if !model.contains(&op.cue) {
                        model.push(op.cue.clone());
                    }
                }
                LatentOpKind::Remove => model.retain(|c| c != &op.cue),
            }
            let update = SpaceUpdate::new("cellar", "").with_op(op);
            state.apply(&update.into());

            let cues = state.get_space("cellar").unwrap().latent_state.as_slice();
            prop_assert_eq!(cues, model.as_slice());
        }
    }

    #[test]
    fn memory_is_append_only(updates in prop::collection::vec(update(), 0..40)) {
        let mut state = seeded_world();
        for update in &updates {
            let before = state.get_npc("mara").unwrap().memory.clone();
            state.apply(update);
            let after = &state.get_npc("mara").unwrap().memory;
            prop_assert!(after.starts_with(&before));
        }
    }

    #[test]
    fn event_upsert_grows_only_on_new_ids(updates in prop::collection::vec(update(), 0..40)) {
        let mut state = seeded_world();
        for update in &updates {
            let before = state.events.len();
            let known = state.get_event(update.target_id()).is_some();
            state.apply(update);
            if let Update::EventProposal(_) = update {
                let expected = if known { before } else { before + 1 };
                prop_assert_eq!(state.events.len(), expected);
                prop_assert!(state.get_event(update.target_id()).is_some());
            } else {
                prop_assert_eq!(state.events.len(), before);
            }
        }
    }
}
