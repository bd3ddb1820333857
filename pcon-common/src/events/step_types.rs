//! Step arbitration event types

use serde::{Deserialize, Serialize};

/// Why a candidate was admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionReason {
    /// Step had never been filled
    FirstFill,
    /// Candidate tier strictly outranks the current tier
    Outranks,
    /// Direct user edit (always wins, locks the step)
    ManualEdit,
}

/// Why a candidate was rejected
///
/// Rejection is an expected outcome, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Step was edited by the user and is frozen
    UserLocked,
    /// Candidate tier is equal to or below the current tier
    NotHigher,
}

/// Which coupling rule rewrote a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileRule {
    /// Requisites filtered down to those compatible with selected methods
    MethodToRequisites,
    /// Method implied by the primary requisite added to the method list
    RequisitesToMethod,
}
