//! # Project Constructor Engine
//!
//! Arbitration and consistency core of the project constructor wizard.
//! Decides, for every candidate value arriving from a data source, whether it
//! may overwrite what a step holds, keeps the payment method and payment
//! requisites steps consistent, and reports whether each step is validly
//! filled.
//!
//! Component stack (leaf first):
//! - [`tier`]: source tier table and `PriorityResolver`
//! - [`store`]: `StepStore`, the authoritative step snapshot
//! - [`payload`]: typed per-step payloads
//! - [`validation`]: schema registry and `StepValidator`
//! - [`sync`]: `CrossStepSynchronizer` for the coupled step pair
//! - [`candidates`]: shaping catalog/template/profile/echo data into candidates
//! - [`controller`]: `ConstructorController`, the only entry point
//!
//! The engine is synchronous and does no I/O. Hosts that share a controller
//! across threads wrap it in a single mutex.

pub mod candidates;
pub mod controller;
pub mod payload;
pub mod store;
pub mod sync;
pub mod tier;
pub mod validation;

pub use candidates::{Candidate, CandidateSource};
pub use controller::{ConstructorController, SubmitOutcome};
pub use pcon_common::{EngineConfig, Error, Result, SourceTier};
pub use store::{StepId, StepSnapshot, StepState, StepStore};
pub use sync::{CrossStepSynchronizer, Reconciliation, SyncRule};
pub use tier::{Admission, PriorityResolver};
pub use validation::{
    ProgressReport, SchemaRegistry, StepKind, StepSchema, StepStatus, StepValidator,
    ValidationVerdict,
};
