//! Wizard session controller
//!
//! The only entry point into the engine. Every candidate goes through the
//! same path:
//!
//! ```text
//! submit_candidate ─► PriorityResolver ─┬─ reject ─► verdict of unchanged step
//!                                       └─ admit ──► StepStore::write
//!                                                     ─► CrossStepSynchronizer (coupled steps)
//!                                                     ─► StepValidator ─► verdict
//! ```
//!
//! Nothing about the wizard's shape is hard-coded here: the step count,
//! schemas and the coupled pair all come from construction.

use chrono::Utc;
use crate::candidates::{Candidate, CandidateSource};
use crate::store::{StepId, StepSnapshot, StepStore};
use crate::sync::{CrossStepSynchronizer, SyncRule};
use crate::tier::{Admission, AdmissionReason, PriorityResolver};
use crate::validation::{ProgressReport, SchemaRegistry, StepKind, StepValidator, ValidationVerdict};
use pcon_common::events::ReconcileRule;
use pcon_common::{ConstructorEvent, EngineConfig, Error, EventBus, Result, SourceTier};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of one candidate submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    /// False when the candidate lost arbitration (step unchanged)
    pub accepted: bool,
    pub verdict: ValidationVerdict,
}

/// Arbitration engine for one wizard session
pub struct ConstructorController {
    session_id: Uuid,
    store: StepStore,
    resolver: PriorityResolver,
    registry: SchemaRegistry,
    validator: StepValidator,
    sync: Option<CrossStepSynchronizer>,
    event_bus: EventBus,
}

impl ConstructorController {
    /// Wire a controller
    ///
    /// # Errors
    /// - `Config` if the configuration is inconsistent
    /// - `SchemaNotRegistered` if any step 1..=step_count lacks a schema
    /// - `UnknownStep` if the sync rule names a step outside the wizard
    /// - `InvalidSyncRule` if the sync rule's steps do not hold payment
    ///   method and requisites payloads
    pub fn new(
        config: &EngineConfig,
        registry: SchemaRegistry,
        sync_rule: Option<SyncRule>,
        event_bus: EventBus,
    ) -> Result<Self> {
        config.validate()?;
        let validator = StepValidator::new(
            &registry,
            config.step_count,
            config.partial_error_threshold,
        )?;

        if let Some(rule) = &sync_rule {
            Self::check_sync_rule(&validator, rule)?;
        }

        let session_id = Uuid::new_v4();
        info!(
            "Constructor session {} started: {} steps, coupling={:?}",
            session_id,
            config.step_count,
            sync_rule
                .as_ref()
                .map(|r| (r.method_step.get(), r.requisites_step.get()))
        );

        Ok(Self {
            session_id,
            store: StepStore::new(config.step_count),
            resolver: PriorityResolver,
            registry,
            validator,
            sync: sync_rule.map(CrossStepSynchronizer::new),
            event_bus,
        })
    }

    /// Reference 7-step wizard with the standard payment coupling from
    /// `config.sync`
    pub fn standard(config: &EngineConfig) -> Result<Self> {
        let sync_rule = config
            .coupling()
            .map(|(method, requisites)| SyncRule::standard(StepId(method), StepId(requisites)));
        Self::new(
            config,
            SchemaRegistry::standard(),
            sync_rule,
            EventBus::new(config.event_capacity),
        )
    }

    fn check_sync_rule(validator: &StepValidator, rule: &SyncRule) -> Result<()> {
        if rule.method_step == rule.requisites_step {
            return Err(Error::InvalidSyncRule(format!(
                "{} cannot be coupled with itself",
                rule.method_step
            )));
        }

        for (step, expected) in [
            (rule.method_step, StepKind::PaymentMethod),
            (rule.requisites_step, StepKind::Requisites),
        ] {
            let schema = validator.schema(step)?;
            if schema.kind != expected {
                return Err(Error::InvalidSyncRule(format!(
                    "{} holds {:?} payloads, expected {:?}",
                    step, schema.kind, expected
                )));
            }
        }

        if rule.compatibility.is_empty() {
            return Err(Error::InvalidSyncRule(
                "compatibility table is empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Subscribe to arbitration events for this session
    pub fn subscribe(&self) -> broadcast::Receiver<ConstructorEvent> {
        self.event_bus.subscribe()
    }

    /// Offer a value for a step
    ///
    /// Losing arbitration is a normal outcome (`accepted: false`) and leaves
    /// the snapshot untouched. The only error is an unknown step id.
    pub fn submit_candidate(
        &mut self,
        step: StepId,
        payload: Value,
        tier: SourceTier,
    ) -> Result<SubmitOutcome> {
        let state = self.store.get(step)?;
        let previous_tier = state.current_tier;

        match self.resolver.decide(state, tier) {
            Admission::Reject(reason) => {
                debug!(
                    "{} rejected candidate from {:?} (current {:?}): {:?}",
                    step, tier, previous_tier, reason
                );
                self.event_bus.emit_lossy(ConstructorEvent::CandidateRejected {
                    session_id: self.session_id,
                    step: step.get(),
                    tier,
                    current_tier: previous_tier,
                    reason,
                    timestamp: Utc::now(),
                });
                let verdict = self.validator.validate(step, state)?;
                Ok(SubmitOutcome {
                    accepted: false,
                    verdict,
                })
            }
            Admission::Admit(reason) => {
                self.store.write(step, payload, tier)?;
                info!(
                    "{} filled from {:?} (was {:?}, {:?})",
                    step, tier, previous_tier, reason
                );
                self.event_bus.emit_lossy(ConstructorEvent::CandidateAdmitted {
                    session_id: self.session_id,
                    step: step.get(),
                    tier,
                    previous_tier,
                    reason,
                    timestamp: Utc::now(),
                });

                self.reconcile_after(step)?;
                let verdict = self.get_verdict(step)?;
                Ok(SubmitOutcome {
                    accepted: true,
                    verdict,
                })
            }
        }
    }

    /// Record a direct user edit
    ///
    /// Always applied: locks the step, writes the payload as `Manual`, then
    /// reconciles the coupled pair. A locked step stays locked for the rest
    /// of the session.
    pub fn mark_manual_edit(&mut self, step: StepId, payload: Value) -> Result<ValidationVerdict> {
        let state = self.store.get(step)?;
        let previous_tier = state.current_tier;
        let was_locked = state.user_locked;

        self.store.mark_user_locked(step)?;
        self.store.write(step, payload, SourceTier::Manual)?;

        if !was_locked {
            info!("{} locked by manual edit", step);
            self.event_bus.emit_lossy(ConstructorEvent::StepLocked {
                session_id: self.session_id,
                step: step.get(),
                timestamp: Utc::now(),
            });
        } else {
            debug!("{} edited again by user", step);
        }
        self.event_bus.emit_lossy(ConstructorEvent::CandidateAdmitted {
            session_id: self.session_id,
            step: step.get(),
            tier: SourceTier::Manual,
            previous_tier,
            reason: AdmissionReason::ManualEdit,
            timestamp: Utc::now(),
        });

        self.reconcile_after(step)?;
        self.get_verdict(step)
    }

    /// Submit candidates in order, one outcome per candidate
    pub fn submit_all(
        &mut self,
        candidates: impl IntoIterator<Item = Candidate>,
    ) -> Result<Vec<SubmitOutcome>> {
        candidates
            .into_iter()
            .map(|c| self.submit_candidate(c.step, c.payload, c.tier))
            .collect()
    }

    /// Shape a collaborator's data into candidates and submit them
    pub fn submit_from(&mut self, source: &dyn CandidateSource) -> Result<Vec<SubmitOutcome>> {
        let candidates = source.candidates(&self.registry);
        debug!(
            "Submitting {} candidate(s) from {} ({:?})",
            candidates.len(),
            source.name(),
            source.tier()
        );
        self.submit_all(candidates)
    }

    pub fn get_snapshot(&self) -> StepSnapshot {
        self.store.snapshot()
    }

    /// Verdict of a step's current state (recomputed on every call)
    pub fn get_verdict(&self, step: StepId) -> Result<ValidationVerdict> {
        self.validator.validate(step, self.store.get(step)?)
    }

    /// Verdicts of every step
    pub fn verdicts(&self) -> Result<BTreeMap<StepId, ValidationVerdict>> {
        self.store
            .snapshot()
            .iter()
            .map(|(step, state)| self.validator.validate(step, state).map(|v| (step, v)))
            .collect()
    }

    /// Fill progress over `required` steps
    pub fn progress(&self, required: &[StepId]) -> ProgressReport {
        self.validator.progress(&self.store.snapshot(), required)
    }

    /// Fill progress over every step whose schema is required
    pub fn summary_progress(&self) -> ProgressReport {
        self.progress(&self.validator.required_steps())
    }

    /// Bring the coupled pair back into agreement after a write to `step`
    fn reconcile_after(&mut self, step: StepId) -> Result<()> {
        let (method_step, requisites_step, result) = match &self.sync {
            Some(sync) if sync.rule().couples(step) => {
                let rule = sync.rule();
                let result = sync.reconcile(
                    self.store.get(rule.method_step)?,
                    self.store.get(rule.requisites_step)?,
                );
                (rule.method_step, rule.requisites_step, result)
            }
            _ => return Ok(()),
        };

        for (blocked, rule) in result.blocked {
            warn!(
                "{} is user-locked; {:?} reconciliation not applied",
                blocked, rule
            );
            self.event_bus.emit_lossy(ConstructorEvent::SyncBlocked {
                session_id: self.session_id,
                step: blocked.get(),
                rule,
                timestamp: Utc::now(),
            });
        }

        if let Some(payload) = result.requisites {
            self.apply_reconciled(requisites_step, payload, ReconcileRule::MethodToRequisites)?;
        }
        if let Some(payload) = result.method {
            self.apply_reconciled(method_step, payload, ReconcileRule::RequisitesToMethod)?;
        }
        Ok(())
    }

    /// Rewrite a coupled step, keeping the tier it already had
    fn apply_reconciled(&mut self, step: StepId, payload: Value, rule: ReconcileRule) -> Result<()> {
        let Some(tier) = self.store.get(step)?.current_tier else {
            return Ok(());
        };

        self.store.write(step, payload, tier)?;
        info!("{} reconciled ({:?}), tier kept at {:?}", step, rule, tier);
        self.event_bus.emit_lossy(ConstructorEvent::StepReconciled {
            session_id: self.session_id,
            step: step.get(),
            tier: Some(tier),
            rule,
            timestamp: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{StepSchema, StepStatus};
    use pcon_common::events::RejectionReason;
    use pcon_common::SyncConfig;
    use serde_json::json;

    fn controller() -> ConstructorController {
        ConstructorController::standard(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_standard_wiring() {
        let controller = controller();
        assert_eq!(controller.get_snapshot().len(), 7);
        assert_eq!(controller.verdicts().unwrap().len(), 7);
    }

    #[test]
    fn test_unknown_step_is_the_only_error() {
        let mut controller = controller();
        assert!(matches!(
            controller.submit_candidate(StepId(8), json!({}), SourceTier::Manual),
            Err(Error::UnknownStep(8))
        ));
        assert!(matches!(
            controller.mark_manual_edit(StepId(0), json!({})),
            Err(Error::UnknownStep(0))
        ));
        assert!(matches!(controller.get_verdict(StepId(9)), Err(Error::UnknownStep(9))));
    }

    #[test]
    fn test_missing_schema_fails_construction() {
        let registry = SchemaRegistry::new().register(StepId(1), StepSchema::new(StepKind::Company));
        let config = EngineConfig {
            step_count: 2,
            sync: SyncConfig {
                enabled: false,
                ..SyncConfig::default()
            },
            ..EngineConfig::default()
        };
        let result = ConstructorController::new(&config, registry, None, EventBus::new(8));
        assert!(matches!(result, Err(Error::SchemaNotRegistered(2))));
    }

    #[test]
    fn test_sync_rule_must_name_payment_steps() {
        let result = ConstructorController::new(
            &EngineConfig::default(),
            SchemaRegistry::standard(),
            Some(SyncRule::standard(StepId(3), StepId(5))),
            EventBus::new(8),
        );
        assert!(matches!(result, Err(Error::InvalidSyncRule(_))));

        let result = ConstructorController::new(
            &EngineConfig::default(),
            SchemaRegistry::standard(),
            Some(SyncRule::standard(StepId(4), StepId(9))),
            EventBus::new(8),
        );
        assert!(matches!(result, Err(Error::UnknownStep(9))));
    }

    #[test]
    fn test_rejection_emits_event() {
        let mut controller = controller();
        let mut rx = controller.subscribe();

        controller
            .submit_candidate(StepId(1), json!({"name": "Acme"}), SourceTier::Template)
            .unwrap();
        let outcome = controller
            .submit_candidate(StepId(1), json!({"name": "Other"}), SourceTier::Profile)
            .unwrap();
        assert!(!outcome.accepted);

        assert!(matches!(
            rx.try_recv().unwrap(),
            ConstructorEvent::CandidateAdmitted {
                reason: AdmissionReason::FirstFill,
                ..
            }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            ConstructorEvent::CandidateRejected {
                reason: RejectionReason::NotHigher,
                current_tier: Some(SourceTier::Template),
                ..
            }
        ));
    }

    #[test]
    fn test_manual_edit_locks_once() {
        let mut controller = controller();
        let mut rx = controller.subscribe();

        controller
            .mark_manual_edit(StepId(1), json!({"name": "Acme"}))
            .unwrap();
        controller
            .mark_manual_edit(StepId(1), json!({"name": "Acme LLC"}))
            .unwrap();

        let events: Vec<ConstructorEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        let locks = events
            .iter()
            .filter(|e| matches!(e, ConstructorEvent::StepLocked { .. }))
            .count();
        assert_eq!(locks, 1);
        assert_eq!(events.len(), 3);

        let state = controller.get_snapshot();
        assert_eq!(
            state.get(StepId(1)).unwrap().payload,
            Some(json!({"name": "Acme LLC"}))
        );
    }

    #[test]
    fn test_sync_disabled_leaves_pair_alone() {
        let config = EngineConfig::from_toml_str("[sync]\nenabled = false").unwrap();
        let mut controller = ConstructorController::standard(&config).unwrap();

        controller
            .submit_candidate(StepId(4), json!({"methods": ["bank_transfer"]}), SourceTier::Template)
            .unwrap();
        controller
            .submit_candidate(
                StepId(5),
                json!({"requisites": [{"kind": "crypto_wallet", "currency": "USDT", "wallet_address": "T9x"}]}),
                SourceTier::Template,
            )
            .unwrap();

        let snapshot = controller.get_snapshot();
        let requisites = snapshot.get(StepId(5)).unwrap().payload.as_ref().unwrap();
        assert_eq!(requisites["requisites"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_summary_progress_skips_optional_step() {
        let mut controller = controller();
        controller
            .submit_candidate(StepId(1), json!({"name": "Acme"}), SourceTier::Profile)
            .unwrap();
        let report = controller.summary_progress();
        assert_eq!(report.filled_steps, vec![StepId(1)]);
        assert_eq!(report.progress_percent, 17);
        assert!(!report.all_filled);
    }

    #[test]
    fn test_malformed_write_is_kept() {
        let mut controller = controller();
        let outcome = controller
            .submit_candidate(StepId(2), json!({"items": "pump"}), SourceTier::UploadExtraction)
            .unwrap();
        assert!(outcome.accepted);
        assert_eq!(outcome.verdict.status, StepStatus::Error);
        assert_eq!(
            controller.get_snapshot().get(StepId(2)).unwrap().payload,
            Some(json!({"items": "pump"}))
        );
    }
}
