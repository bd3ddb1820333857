//! Arbitration and reconciliation properties over generated inputs

mod helpers;

use helpers::*;
use pcon_engine::payload::{PaymentMethodData, RequisitesData};
use pcon_engine::sync::{CrossStepSynchronizer, SyncRule};
use pcon_engine::{SourceTier, StepId, StepState};
use proptest::prelude::*;
use serde_json::{json, Value};

fn tier() -> impl Strategy<Value = SourceTier> {
    prop::sample::select(SourceTier::ALL.to_vec())
}

#[derive(Debug, Clone)]
enum Op {
    Submit(u8, SourceTier),
    Manual(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1u8..=7, tier()).prop_map(|(step, tier)| Op::Submit(step, tier)),
        1 => (1u8..=7).prop_map(Op::Manual),
    ]
}

fn method_payload() -> impl Strategy<Value = Value> {
    (
        prop::sample::subsequence(vec!["bank_transfer", "p2p", "crypto", "card", "cash"], 0..=5),
        prop::option::of(prop::sample::select(vec!["bank_transfer", "p2p", "crypto"])),
    )
        .prop_map(|(methods, primary)| match primary {
            Some(primary) => json!({"methods": methods, "primary_method": primary}),
            None => json!({"methods": methods}),
        })
}

fn requisite() -> impl Strategy<Value = Value> {
    (
        prop::sample::select(vec!["bank_account", "p2p_card", "crypto_wallet"]),
        any::<bool>(),
    )
        .prop_map(|(kind, primary)| json!({"kind": kind, "name": kind, "primary": primary}))
}

fn requisites_payload() -> impl Strategy<Value = Value> {
    (
        prop::collection::vec(requisite(), 0..5),
        prop::option::of(requisite()),
    )
        .prop_map(|(list, explicit)| match explicit {
            Some(primary) => json!({"requisites": list, "primary_requisite": primary}),
            None => json!({"requisites": list}),
        })
}

fn filled(payload: Value, locked: bool) -> StepState {
    StepState {
        current_tier: Some(if locked { SourceTier::Manual } else { SourceTier::Catalog }),
        payload: Some(payload),
        user_locked: locked,
        auto_filled: !locked,
        filled_at: None,
    }
}

proptest! {
    #[test]
    fn prop_tier_rank_never_decreases(ops in prop::collection::vec(op(), 1..40)) {
        let mut controller = controller();
        let mut last_rank = [0u8; 8];
        let mut locked = [false; 8];

        for op in ops {
            let step = match op {
                Op::Submit(step, tier) => {
                    let outcome = controller
                        .submit_candidate(StepId(step), json!({"n": 1}), tier)
                        .unwrap();
                    if locked[step as usize] {
                        prop_assert!(!outcome.accepted);
                    }
                    step
                }
                Op::Manual(step) => {
                    controller.mark_manual_edit(StepId(step), json!({"n": 2})).unwrap();
                    locked[step as usize] = true;
                    step
                }
            };

            let snapshot = controller.get_snapshot();
            let state = snapshot.get(StepId(step)).unwrap();
            let rank = state.current_tier.map(|t| t.rank()).unwrap_or(0);
            prop_assert!(rank >= last_rank[step as usize]);
            if locked[step as usize] {
                prop_assert_eq!(state.current_tier, Some(SourceTier::Manual));
            }
            last_rank[step as usize] = rank;
        }
    }

    #[test]
    fn prop_rejection_leaves_snapshot_identical(
        first in tier(),
        second in tier(),
        step in 1u8..=7,
    ) {
        let mut controller = controller();
        controller.submit_candidate(StepId(step), json!({"a": 1}), first).unwrap();

        let before = controller.get_snapshot();
        let outcome = controller.submit_candidate(StepId(step), json!({"b": 2}), second).unwrap();
        if !outcome.accepted {
            prop_assert_eq!(before, controller.get_snapshot());
        }
        prop_assert_eq!(outcome.accepted, second.outranks(first));
    }

    #[test]
    fn prop_lock_is_absolute(step in 1u8..=7, tiers in prop::collection::vec(tier(), 1..10)) {
        let mut controller = controller();
        controller.mark_manual_edit(StepId(step), json!({"user": true})).unwrap();
        for tier in tiers {
            let outcome = controller.submit_candidate(StepId(step), json!({"auto": true}), tier).unwrap();
            prop_assert!(!outcome.accepted);
        }
        prop_assert_eq!(payload(&controller, StepId(step)), Some(json!({"user": true})));
    }

    #[test]
    fn prop_reconcile_reaches_fixed_point(
        methods in method_payload(),
        requisites in requisites_payload(),
        method_locked in any::<bool>(),
        requisites_locked in any::<bool>(),
    ) {
        let sync = CrossStepSynchronizer::new(SyncRule::standard(METHOD, REQUISITES));
        let mut method_state = filled(methods, method_locked);
        let mut requisites_state = filled(requisites, requisites_locked);

        let first = sync.reconcile(&method_state, &requisites_state);
        prop_assert!(!(method_locked && first.method.is_some()));
        prop_assert!(!(requisites_locked && first.requisites.is_some()));

        if let Some(payload) = first.method {
            method_state.payload = Some(payload);
        }
        if let Some(payload) = first.requisites {
            requisites_state.payload = Some(payload);
        }

        if !requisites_locked {
            let methods: PaymentMethodData =
                serde_json::from_value(method_state.payload.clone().unwrap()).unwrap();
            let requisites: RequisitesData =
                serde_json::from_value(requisites_state.payload.clone().unwrap()).unwrap();
            if !methods.methods.is_empty() {
                for requisite in requisites.requisites.iter().chain(&requisites.primary_requisite) {
                    prop_assert!(
                        sync.rule().accepts(&methods.methods, requisite.kind),
                        "{:?} kept without a compatible method in {:?}",
                        requisite.kind,
                        methods.methods
                    );
                }
            }
        }

        let second = sync.reconcile(&method_state, &requisites_state);
        prop_assert!(second.is_noop(), "second pass changed state: {:?}", second);
    }

    #[test]
    fn prop_verdicts_are_pure(ops in prop::collection::vec(op(), 0..20)) {
        let mut controller = controller();
        for op in ops {
            match op {
                Op::Submit(step, tier) => {
                    controller.submit_candidate(StepId(step), json!({"methods": ["p2p"]}), tier).unwrap();
                }
                Op::Manual(step) => {
                    controller.mark_manual_edit(StepId(step), json!({"name": "Acme"})).unwrap();
                }
            }
        }
        for step in 1u8..=7 {
            let a = controller.get_verdict(StepId(step)).unwrap();
            let b = controller.get_verdict(StepId(step)).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
