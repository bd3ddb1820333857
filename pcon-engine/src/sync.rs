//! Payment method / requisites coupling
//!
//! Two rules, always applied in this order:
//! 1. Method → requisites: drop requisites whose kind no selected method
//!    accepts.
//! 2. Requisites → method: if the primary requisite implies a method that is
//!    not selected, prepend it and make it the primary method.
//!
//! Rule 1 filters against the *effective* method set: the selected methods
//! plus the method implied by the primary requisite, which rule 2 adds. The
//! primary requisite therefore survives rule 1 unless the method step is
//! user-locked; rule 2 cannot add its method then, so it is dropped like any
//! other incompatible requisite. A second pass over the result changes nothing.
//!
//! `reconcile` is pure. The controller applies its result through the store
//! with each step's existing tier, so a rewrite never changes arbitration.

use crate::payload::{PaymentMethod, PaymentMethodData, RequisiteKind, RequisitesData};
use crate::store::{StepId, StepState};
use pcon_common::events::ReconcileRule;
use serde_json::Value;
use tracing::{debug, warn};

/// Identities of the coupled steps and the method ↔ requisite table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRule {
    pub method_step: StepId,
    pub requisites_step: StepId,
    pub compatibility: Vec<(PaymentMethod, RequisiteKind)>,
}

impl SyncRule {
    /// Standard table: bank transfer ↔ bank account, p2p ↔ p2p card,
    /// crypto ↔ crypto wallet
    pub fn standard(method_step: StepId, requisites_step: StepId) -> Self {
        Self {
            method_step,
            requisites_step,
            compatibility: vec![
                (PaymentMethod::BankTransfer, RequisiteKind::BankAccount),
                (PaymentMethod::P2p, RequisiteKind::P2pCard),
                (PaymentMethod::Crypto, RequisiteKind::CryptoWallet),
            ],
        }
    }

    /// Method a requisite kind implies (first table match)
    pub fn method_for(&self, kind: RequisiteKind) -> Option<PaymentMethod> {
        self.compatibility
            .iter()
            .find(|(_, k)| *k == kind)
            .map(|(m, _)| *m)
    }

    /// True if any of `methods` accepts requisites of `kind`
    pub fn accepts(&self, methods: &[PaymentMethod], kind: RequisiteKind) -> bool {
        self.compatibility
            .iter()
            .any(|(m, k)| *k == kind && methods.contains(m))
    }

    /// True if `step` is one of the coupled pair
    pub fn couples(&self, step: StepId) -> bool {
        step == self.method_step || step == self.requisites_step
    }
}

/// New payloads for the coupled steps (None = leave the step alone)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub method: Option<Value>,
    pub requisites: Option<Value>,
    /// Rewrites that were needed but hit a user-locked step
    pub blocked: Vec<(StepId, ReconcileRule)>,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.method.is_none() && self.requisites.is_none()
    }
}

/// Keeps the method and requisites steps mutually consistent
#[derive(Debug, Clone)]
pub struct CrossStepSynchronizer {
    rule: SyncRule,
}

impl CrossStepSynchronizer {
    pub fn new(rule: SyncRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> &SyncRule {
        &self.rule
    }

    /// Compute the writes that bring the pair into agreement
    ///
    /// Steps with no payload, or a payload that does not decode, are left
    /// alone. A user-locked step is never rewritten; the needed rewrite is
    /// reported in `blocked` instead.
    pub fn reconcile(&self, method_state: &StepState, requisites_state: &StepState) -> Reconciliation {
        let mut out = Reconciliation::default();

        let (Some(mut methods), Some(mut requisites)) = (
            decode::<PaymentMethodData>(method_state),
            decode::<RequisitesData>(requisites_state),
        ) else {
            return out;
        };

        let implied = requisites
            .primary()
            .and_then(|primary| self.rule.method_for(primary.kind));

        // Rule 1
        let mut effective = methods.methods.clone();
        if !method_state.user_locked {
            effective.extend(implied);
        }
        if !effective.is_empty() {
            let before = requisites.requisites.len();
            requisites
                .requisites
                .retain(|r| self.rule.accepts(&effective, r.kind));
            let mut changed = requisites.requisites.len() != before;

            if requisites
                .primary_requisite
                .as_ref()
                .is_some_and(|p| !self.rule.accepts(&effective, p.kind))
            {
                requisites.primary_requisite = None;
                changed = true;
            }

            if changed {
                if requisites_state.user_locked {
                    out.blocked
                        .push((self.rule.requisites_step, ReconcileRule::MethodToRequisites));
                } else {
                    debug!(
                        "Dropping {} incompatible requisite(s) from {}",
                        before - requisites.requisites.len(),
                        self.rule.requisites_step
                    );
                    out.requisites = encode(&requisites, self.rule.requisites_step);
                }
            }
        }

        // Rule 2
        if let Some(method) = implied {
            if !methods.has_method(method) {
                if method_state.user_locked {
                    out.blocked
                        .push((self.rule.method_step, ReconcileRule::RequisitesToMethod));
                } else {
                    debug!("Adding {:?} to {} from primary requisite", method, self.rule.method_step);
                    methods.methods.insert(0, method);
                    methods.primary_method = Some(method);
                    out.method = encode(&methods, self.rule.method_step);
                }
            }
        }

        out
    }
}

fn encode<T: serde::Serialize>(data: &T, step: StepId) -> Option<Value> {
    match serde_json::to_value(data) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to encode reconciled payload for {}: {}", step, e);
            None
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(state: &StepState) -> Option<T> {
    let raw = state.payload.as_ref().filter(|v| !v.is_null())?;
    serde_json::from_value(raw.clone()).ok()
}
