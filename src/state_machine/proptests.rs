//! Property-based tests for dialog navigation
//!
//! These check the back-navigation invariants against a simple model
//! across arbitrary sequences of advances and retreats.

use super::*;
use crate::collaborators::local::MemoryIdentityStore;
use crate::collaborators::IdentityRecord;
use crate::state_machine::event::{AssertionInfo, EmailInfo, EmailSelection, PrimaryUserInfo};
use crate::state_machine::transition::Lookups;
use crate::validation::RegexEmailValidator;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::CheckAuth),
        Just(Step::Offline),
        Just(Step::NotMe),
        Just(Step::AddEmail),
        "[a-z]{1,8}@[a-z]{1,8}\\.com".prop_map(Step::ConfirmUser),
        "[a-z]{1,8}@[a-z]{1,8}\\.com".prop_map(Step::ConfirmEmail),
        "[a-zA-Z0-9]{8}".prop_map(Step::AssertionGenerated),
    ]
}

#[derive(Debug, Clone)]
enum NavOp {
    Advance(Step),
    Detour(Step),
    Retreat,
}

fn arb_nav_op() -> impl Strategy<Value = NavOp> {
    prop_oneof![
        3 => arb_step().prop_map(NavOp::Advance),
        1 => arb_step().prop_map(NavOp::Detour),
        2 => Just(NavOp::Retreat),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    let email = "[a-z]{1,6}@[a-z]{1,6}\\.com";
    prop_oneof![
        Just(Event::Offline),
        Just(Event::Cancel),
        Just(Event::WindowUnload),
        Just(Event::UserConfirmed),
        Just(Event::PrimaryUserAuthenticating),
        Just(Event::PickEmail),
        Just(Event::NotMe),
        Just(Event::AddEmail),
        Just(Event::EmailConfirmed),
        Just(Event::CancelState),
        email.prop_map(|e| Event::UserStaged(EmailInfo::new(e))),
        email.prop_map(|e| Event::EmailStaged(EmailInfo::new(e))),
        (email, any::<bool>()).prop_map(|(e, add)| Event::PrimaryUser(PrimaryUserInfo::new(e, add))),
        Just(Event::EmailChosen(EmailSelection::new("fed@idp.com"))),
        proptest::option::of("[a-z]{4}").prop_map(|assertion| {
            Event::AssertionGenerated(AssertionInfo { assertion })
        }),
    ]
}

// ============================================================================
// Navigation properties
// ============================================================================

proptest! {
    /// Recorded advances minus retreats, floored at zero
    #[test]
    fn prop_stack_depth_tracks_recorded_advances(
        ops in proptest::collection::vec(prop_oneof![
            arb_step().prop_map(NavOp::Advance),
            Just(NavOp::Retreat),
        ], 0..40)
    ) {
        let mut stack = NavigationStack::new();
        let mut expected: usize = 0;
        for op in ops {
            match op {
                NavOp::Advance(step) | NavOp::Detour(step) => {
                    stack.advance(true, step);
                    expected += 1;
                }
                NavOp::Retreat => {
                    stack.retreat();
                    expected = expected.saturating_sub(1);
                }
            }
            prop_assert_eq!(stack.len(), expected);
        }
    }

    /// Whatever retreat replays is the frame left on top, and never a detour
    #[test]
    fn prop_retreat_replays_top_and_skips_detours(
        ops in proptest::collection::vec(arb_nav_op(), 0..40)
    ) {
        let mut stack = NavigationStack::new();
        let mut model: Vec<Step> = Vec::new();
        let mut detour: Option<Step> = None;

        for op in ops {
            match op {
                NavOp::Advance(step) => {
                    stack.advance(true, step.clone());
                    model.push(step);
                    detour = None;
                }
                NavOp::Detour(step) => {
                    stack.advance(false, step.clone());
                    detour = Some(step);
                }
                NavOp::Retreat => {
                    let replayed = stack.retreat();
                    if detour.take().is_none() {
                        model.pop();
                    }
                    prop_assert_eq!(replayed.as_ref(), model.last());
                    prop_assert_eq!(stack.current(), model.last());
                }
            }
            prop_assert_eq!(stack.frames(), model.as_slice());
        }
    }

    /// Frames never popped since the prefix was pushed stay untouched
    #[test]
    fn prop_frames_are_never_mutated(
        prefix in proptest::collection::vec(arb_step(), 1..10),
        ops in proptest::collection::vec(arb_nav_op(), 0..20)
    ) {
        let mut stack = NavigationStack::new();
        for step in &prefix {
            stack.advance(true, step.clone());
        }
        let mut untouched = prefix.len();
        for op in ops {
            match op {
                NavOp::Advance(step) => { stack.advance(true, step); }
                NavOp::Detour(step) => { stack.advance(false, step); }
                NavOp::Retreat => { stack.retreat(); }
            }
            untouched = untouched.min(stack.len());
            prop_assert_eq!(&stack.frames()[..untouched], &prefix[..untouched]);
        }
    }
}

// ============================================================================
// Transition properties
// ============================================================================

proptest! {
    /// Success is sticky: once set, no event clears it
    #[test]
    fn prop_success_is_never_cleared(events in proptest::collection::vec(arb_event(), 0..30)) {
        let store = MemoryIdentityStore::from_records([
            IdentityRecord::primary("fed@idp.com", Some("cert")),
        ]);
        let validator = RegexEmailValidator::new();
        let lookups = Lookups { store: &store, validator: &validator };

        let mut context = FlowContext::default();
        let mut seen_success = false;
        for event in events {
            let result = transition(&context, event, &lookups).unwrap();
            context = result.context;
            seen_success |= context.success;
            prop_assert_eq!(context.success, seen_success);
        }
    }

    /// Every transition yields at most two effects, and only unload yields two
    #[test]
    fn prop_effects_are_small(event in arb_event()) {
        let store = MemoryIdentityStore::from_records([
            IdentityRecord::primary("fed@idp.com", Some("cert")),
        ]);
        let validator = RegexEmailValidator::new();
        let lookups = Lookups { store: &store, validator: &validator };

        let is_unload = matches!(event, Event::WindowUnload);
        let result = transition(&FlowContext::default(), event, &lookups).unwrap();
        if is_unload {
            prop_assert_eq!(result.effects.len(), 2);
        } else {
            prop_assert!(result.effects.len() <= 1);
        }
    }
}
