//! Priority arbitration between data sources
//!
//! Admission rule, evaluated in order:
//! 1. User-locked step: reject.
//! 2. Never-filled step: admit.
//! 3. Otherwise admit iff the candidate tier strictly outranks the current one.
//!
//! Same-tier resubmission is rejected so two equal-rank sources racing each
//! other cannot oscillate: first writer wins.

pub use pcon_common::events::{AdmissionReason, RejectionReason};
pub use pcon_common::SourceTier;

use crate::store::StepState;

/// Outcome of arbitration for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit(AdmissionReason),
    Reject(RejectionReason),
}

impl Admission {
    pub fn is_admitted(self) -> bool {
        matches!(self, Admission::Admit(_))
    }
}

/// Strict-priority resolver
///
/// Stateless; every call is O(1).
#[derive(Debug, Default, Clone, Copy)]
pub struct PriorityResolver;

impl PriorityResolver {
    /// Decide whether `candidate` may overwrite `state`, with the reason
    pub fn decide(&self, state: &StepState, candidate: SourceTier) -> Admission {
        if state.user_locked {
            return Admission::Reject(RejectionReason::UserLocked);
        }

        match state.current_tier {
            None => Admission::Admit(AdmissionReason::FirstFill),
            Some(current) if candidate.outranks(current) => {
                Admission::Admit(AdmissionReason::Outranks)
            }
            Some(_) => Admission::Reject(RejectionReason::NotHigher),
        }
    }

    /// True if `candidate` may overwrite `state`
    pub fn can_admit(&self, state: &StepState, candidate: SourceTier) -> bool {
        self.decide(state, candidate).is_admitted()
    }
}
