//! Property tests for the registry's load counters.

use proptest::prelude::*;
use triage_core::{AgentRegistry, AgentSpec};

#[derive(Debug, Clone, Copy)]
enum LoadOp {
    Increment,
    Decrement,
    Reserve,
}

proptest! {
    /// After any sequence of increment/decrement/reserve calls the counter
    /// matches the clamped model and is never observably negative.
    #[test]
    fn load_counter_matches_clamped_model(
        ops in proptest::collection::vec(
            prop_oneof![
                Just(LoadOp::Increment),
                Just(LoadOp::Decrement),
                Just(LoadOp::Reserve),
            ],
            0..200,
        ),
        max_load in 1u32..20,
    ) {
        let registry = AgentRegistry::new();
        let id = registry
            .register(AgentSpec::new("prop").with_max_load(max_load))
            .unwrap();

        let mut model: u32 = 0;
        for op in ops {
            match op {
                LoadOp::Increment => {
                    registry.increment_load(id).unwrap();
                    model += 1;
                }
                LoadOp::Decrement => {
                    registry.decrement_load(id).unwrap();
                    model = model.saturating_sub(1);
                }
                LoadOp::Reserve => {
                    let granted = registry.try_reserve(id).is_ok();
                    prop_assert_eq!(granted, model < max_load);
                    if granted {
                        model += 1;
                    }
                }
            }
            prop_assert_eq!(registry.get(id).unwrap().current_load, model);
        }
    }

    /// Reservations alone can never push the counter past capacity.
    #[test]
    fn reserve_never_exceeds_capacity(
        attempts in 1usize..100,
        max_load in 1u32..10,
    ) {
        let registry = AgentRegistry::new();
        let id = registry
            .register(AgentSpec::new("prop").with_max_load(max_load))
            .unwrap();

        let granted = (0..attempts)
            .filter(|_| registry.try_reserve(id).is_ok())
            .count();

        prop_assert_eq!(granted as u32, max_load.min(attempts as u32));
        prop_assert!(registry.get(id).unwrap().current_load <= max_load);
    }
}
