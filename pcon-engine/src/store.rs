//! Authoritative step state for one wizard session
//!
//! The store is owned by the `ConstructorController`; nothing else mutates it.
//! Reads go through `StepSnapshot`, an owned copy that can be handed to
//! collaborators freely.

use chrono::{DateTime, Utc};
use pcon_common::{Error, Result, SourceTier};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Wizard step identifier (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepId(pub u8);

impl StepId {
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {}", self.0)
    }
}

impl From<u8> for StepId {
    fn from(value: u8) -> Self {
        StepId(value)
    }
}

/// State of a single step
///
/// `auto_filled` and `filled_at` are provenance for UI and audit; they play
/// no part in arbitration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepState {
    /// Tier of the last successful write (None = never filled)
    pub current_tier: Option<SourceTier>,
    /// Last accepted value, kept verbatim even when it fails validation
    pub payload: Option<Value>,
    /// Set by a direct user edit; no automated candidate may overwrite after
    pub user_locked: bool,
    pub auto_filled: bool,
    pub filled_at: Option<DateTime<Utc>>,
}

impl StepState {
    pub fn is_empty(&self) -> bool {
        self.current_tier.is_none()
    }
}

/// Read-only copy of every step's state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    steps: BTreeMap<StepId, StepState>,
}

impl StepSnapshot {
    pub fn get(&self, step: StepId) -> Option<&StepState> {
        self.steps.get(&step)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StepId, &StepState)> {
        self.steps.iter().map(|(id, state)| (*id, state))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Step storage
pub struct StepStore {
    steps: BTreeMap<StepId, StepState>,
}

impl StepStore {
    /// Create a store with `step_count` empty steps (ids 1..=step_count)
    pub fn new(step_count: u8) -> Self {
        let steps = (1..=step_count)
            .map(|id| (StepId(id), StepState::default()))
            .collect();
        Self { steps }
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn contains(&self, step: StepId) -> bool {
        self.steps.contains_key(&step)
    }

    pub fn get(&self, step: StepId) -> Result<&StepState> {
        self.steps.get(&step).ok_or(Error::UnknownStep(step.0))
    }

    /// Replace a step's payload and tier
    ///
    /// Callers arbitrate first; the store does not re-check priority. Coupled
    /// step reconciliation also writes here, passing the step's existing tier.
    pub fn write(&mut self, step: StepId, payload: Value, tier: SourceTier) -> Result<&StepState> {
        let state = self
            .steps
            .get_mut(&step)
            .ok_or(Error::UnknownStep(step.0))?;

        state.payload = Some(payload);
        state.current_tier = Some(tier);
        state.auto_filled = tier != SourceTier::Manual;
        state.filled_at = Some(Utc::now());

        debug!("{} written from {:?}", step, tier);
        Ok(state)
    }

    /// Freeze a step against all future automated candidates
    ///
    /// Also raises the tier to `Manual` so the tier sequence never decreases
    /// when a manual edit follows an automated write.
    pub fn mark_user_locked(&mut self, step: StepId) -> Result<&StepState> {
        let state = self
            .steps
            .get_mut(&step)
            .ok_or(Error::UnknownStep(step.0))?;

        state.user_locked = true;
        state.current_tier = Some(SourceTier::Manual);
        Ok(state)
    }

    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            steps: self.steps.clone(),
        }
    }
}
