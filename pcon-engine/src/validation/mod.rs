//! Per-step validation
//!
//! Each step id is registered once with a `StepSchema` naming its payload
//! kind. Validation decodes the stored payload into that kind's typed
//! payload and runs the kind's rules, producing a `ValidationVerdict`.
//!
//! Fill state and validity are computed separately: a step with half-entered
//! data is `partial`, not `error`, as long as it has few enough errors.
//!
//! The verdict depends only on the step's state (payload plus provenance),
//! so it is recomputed on every read and never stored.

mod banking;
mod company;
mod documents;
mod payment;
mod specification;

use crate::payload::StepPayload;
use crate::store::{StepId, StepSnapshot, StepState};
use pcon_common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

// ============================================================================
// Verdict types
// ============================================================================

/// Coarse fill status shown next to each step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Empty,
    Partial,
    Complete,
    Error,
}

impl StepStatus {
    fn describe(self) -> &'static str {
        match self {
            Self::Empty => "not filled",
            Self::Partial => "partially filled",
            Self::Complete => "complete",
            Self::Error => "validation error",
        }
    }
}

/// Computed fill/validity status of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub is_filled: bool,
    pub is_valid: bool,
    pub status: StepStatus,
    pub errors: Vec<String>,
    /// Advisory only; never affects `is_valid`
    pub warnings: Vec<String>,
    /// Human-readable fill status, e.g. "Payment method: complete"
    pub message: String,
}

/// Errors and warnings collected by a step's rules
#[derive(Debug, Default)]
pub(crate) struct Findings {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Findings {
    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(format!("{}: {}", field, message.into()));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Rules a typed payload enforces on itself
pub(crate) trait StepRules {
    /// Coarse presence check used for progress indicators
    fn is_filled(&self) -> bool;

    /// Structural checks; push errors and advisory warnings
    fn check(&self, findings: &mut Findings);
}

impl StepPayload {
    fn rules(&self) -> &dyn StepRules {
        match self {
            StepPayload::Company(data) => data,
            StepPayload::Specification(data) => data,
            StepPayload::Bank(data) => data,
            StepPayload::PaymentMethod(data) => data,
            StepPayload::Requisites(data) => data,
            StepPayload::Documents(data) => data,
            StepPayload::ClientRequisites(data) => data,
        }
    }
}

// ============================================================================
// Schema registry
// ============================================================================

/// Payload kind a step holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Company,
    Specification,
    Bank,
    PaymentMethod,
    Requisites,
    Documents,
    ClientRequisites,
}

impl StepKind {
    /// Decode a raw payload into this kind's typed payload
    pub fn decode(self, raw: &Value) -> std::result::Result<StepPayload, serde_json::Error> {
        let raw = raw.clone();
        Ok(match self {
            Self::Company => StepPayload::Company(serde_json::from_value(raw)?),
            Self::Specification => StepPayload::Specification(serde_json::from_value(raw)?),
            Self::Bank => StepPayload::Bank(serde_json::from_value(raw)?),
            Self::PaymentMethod => StepPayload::PaymentMethod(serde_json::from_value(raw)?),
            Self::Requisites => StepPayload::Requisites(serde_json::from_value(raw)?),
            Self::Documents => StepPayload::Documents(serde_json::from_value(raw)?),
            Self::ClientRequisites => StepPayload::ClientRequisites(serde_json::from_value(raw)?),
        })
    }

    fn default_name(self) -> &'static str {
        match self {
            Self::Company => "Company data",
            Self::Specification => "Specification",
            Self::Bank => "Bank details",
            Self::PaymentMethod => "Payment method",
            Self::Requisites => "Payment requisites",
            Self::Documents => "Documents",
            Self::ClientRequisites => "Client requisites",
        }
    }
}

/// Validation schema for one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSchema {
    pub kind: StepKind,
    /// Display name used in status messages
    pub name: String,
    /// Required steps report an error while empty
    pub required: bool,
}

impl StepSchema {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            name: kind.default_name().to_string(),
            required: true,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Mapping from step id to schema, wired once by the host
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<StepId, StepSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference 7-step wizard
    ///
    /// 1 company, 2 specification, 3 bank details, 4 payment method,
    /// 5 payment requisites, 6 documents, 7 client requisites.
    pub fn standard() -> Self {
        Self::new()
            .register(StepId(1), StepSchema::new(StepKind::Company))
            .register(StepId(2), StepSchema::new(StepKind::Specification))
            .register(StepId(3), StepSchema::new(StepKind::Bank))
            .register(StepId(4), StepSchema::new(StepKind::PaymentMethod))
            .register(StepId(5), StepSchema::new(StepKind::Requisites))
            .register(StepId(6), StepSchema::new(StepKind::Documents).optional())
            .register(StepId(7), StepSchema::new(StepKind::ClientRequisites))
    }

    pub fn register(mut self, step: StepId, schema: StepSchema) -> Self {
        self.schemas.insert(step, schema);
        self
    }

    pub fn get(&self, step: StepId) -> Option<&StepSchema> {
        self.schemas.get(&step)
    }

    /// Lowest step id holding payloads of `kind`
    pub fn step_of(&self, kind: StepKind) -> Option<StepId> {
        self.schemas
            .iter()
            .find(|(_, schema)| schema.kind == kind)
            .map(|(id, _)| *id)
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Computes verdicts for every step of one wizard shape
#[derive(Debug, Clone)]
pub struct StepValidator {
    schemas: BTreeMap<StepId, StepSchema>,
    partial_error_threshold: usize,
}

impl StepValidator {
    /// Resolve the registry against steps 1..=step_count
    ///
    /// Fails fast with `SchemaNotRegistered` on the first step that has no
    /// schema: a wiring defect, not a data problem.
    pub fn new(
        registry: &SchemaRegistry,
        step_count: u8,
        partial_error_threshold: usize,
    ) -> Result<Self> {
        let mut schemas = BTreeMap::new();
        for id in 1..=step_count {
            let schema = registry
                .get(StepId(id))
                .ok_or(Error::SchemaNotRegistered(id))?;
            schemas.insert(StepId(id), schema.clone());
        }
        Ok(Self {
            schemas,
            partial_error_threshold,
        })
    }

    pub fn schema(&self, step: StepId) -> Result<&StepSchema> {
        self.schemas.get(&step).ok_or(Error::UnknownStep(step.0))
    }

    /// Steps whose schema is marked required, in order
    pub fn required_steps(&self) -> Vec<StepId> {
        self.schemas
            .iter()
            .filter(|(_, schema)| schema.required)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Validate a step's current state
    pub fn validate(&self, step: StepId, state: &StepState) -> Result<ValidationVerdict> {
        let schema = self.schema(step)?;
        Ok(self.validate_with(schema, state))
    }

    fn validate_with(&self, schema: &StepSchema, state: &StepState) -> ValidationVerdict {
        let mut warnings = Vec::new();
        if state.auto_filled {
            if let Some(tier) = state.current_tier {
                warnings.push(format!(
                    "Filled automatically from {}; please review",
                    tier.label()
                ));
            }
        }

        let raw = match state.payload.as_ref() {
            Some(raw) if !raw.is_null() => raw,
            _ => {
                let errors = if schema.required {
                    vec![format!("{} is required", schema.name)]
                } else {
                    Vec::new()
                };
                return self.verdict(schema, false, errors, warnings);
            }
        };

        let payload = match schema.kind.decode(raw) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Malformed {} payload: {}", schema.name, e);
                return ValidationVerdict {
                    is_filled: true,
                    is_valid: false,
                    status: StepStatus::Error,
                    errors: vec![format!("malformed payload: {}", e)],
                    warnings,
                    message: format!("{}: {}", schema.name, StepStatus::Error.describe()),
                };
            }
        };

        let rules = payload.rules();
        let mut findings = Findings::default();
        rules.check(&mut findings);
        warnings.extend(findings.warnings);

        self.verdict(schema, rules.is_filled(), findings.errors, warnings)
    }

    fn verdict(
        &self,
        schema: &StepSchema,
        is_filled: bool,
        errors: Vec<String>,
        warnings: Vec<String>,
    ) -> ValidationVerdict {
        let is_valid = errors.is_empty();
        let status = if !is_filled {
            StepStatus::Empty
        } else if is_valid {
            StepStatus::Complete
        } else if errors.len() <= self.partial_error_threshold {
            StepStatus::Partial
        } else {
            StepStatus::Error
        };

        ValidationVerdict {
            is_filled,
            is_valid,
            status,
            errors,
            warnings,
            message: format!("{}: {}", schema.name, status.describe()),
        }
    }

    /// Summary readiness over the given required steps
    pub fn progress(&self, snapshot: &StepSnapshot, required: &[StepId]) -> ProgressReport {
        let filled_steps: Vec<StepId> = required
            .iter()
            .copied()
            .filter(|step| {
                snapshot
                    .get(*step)
                    .and_then(|state| self.validate(*step, state).ok())
                    .is_some_and(|verdict| verdict.is_filled)
            })
            .collect();

        let progress_percent = if required.is_empty() {
            100
        } else {
            ((filled_steps.len() * 100 + required.len() / 2) / required.len()) as u8
        };

        ProgressReport {
            all_filled: filled_steps.len() == required.len(),
            filled_steps,
            progress_percent,
        }
    }
}

/// How far the wizard is from a complete summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    pub filled_steps: Vec<StepId>,
    pub all_filled: bool,
    /// Rounded to the nearest percent
    pub progress_percent: u8,
}

// ============================================================================
// Shared field checks
// ============================================================================

/// True if `value` is exactly `len` ASCII digits
pub(crate) fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcon_common::SourceTier;
    use serde_json::json;

    fn validator() -> StepValidator {
        StepValidator::new(&SchemaRegistry::standard(), 7, 2).unwrap()
    }

    fn state_with(payload: Value, tier: SourceTier) -> StepState {
        StepState {
            current_tier: Some(tier),
            payload: Some(payload),
            user_locked: false,
            auto_filled: tier != SourceTier::Manual,
            filled_at: None,
        }
    }

    #[test]
    fn test_missing_schema_fails_fast() {
        let registry = SchemaRegistry::new()
            .register(StepId(1), StepSchema::new(StepKind::Company))
            .register(StepId(3), StepSchema::new(StepKind::Bank));
        let err = StepValidator::new(&registry, 3, 2).unwrap_err();
        assert!(matches!(err, Error::SchemaNotRegistered(2)));
    }

    #[test]
    fn test_empty_required_step() {
        let verdict = validator().validate(StepId(1), &StepState::default()).unwrap();
        assert_eq!(verdict.status, StepStatus::Empty);
        assert!(!verdict.is_filled);
        assert!(!verdict.is_valid);
        assert_eq!(verdict.errors, vec!["Company data is required".to_string()]);
        assert_eq!(verdict.message, "Company data: not filled");
    }

    #[test]
    fn test_empty_optional_step_is_valid() {
        let verdict = validator().validate(StepId(6), &StepState::default()).unwrap();
        assert_eq!(verdict.status, StepStatus::Empty);
        assert!(verdict.is_valid);
        assert!(verdict.errors.is_empty());
    }

    #[test]
    fn test_malformed_payload_is_error_not_crash() {
        let state = state_with(json!({"methods": "bank_transfer"}), SourceTier::Manual);
        let verdict = validator().validate(StepId(4), &state).unwrap();
        assert_eq!(verdict.status, StepStatus::Error);
        assert!(verdict.is_filled);
        assert!(!verdict.is_valid);
        assert_eq!(verdict.errors.len(), 1);
        assert!(verdict.errors[0].starts_with("malformed payload"));
    }

    #[test]
    fn test_partial_vs_error_threshold() {
        // Two errors: missing name, malformed email
        let two = state_with(json!({"name": "", "email": "invalid-email"}), SourceTier::Manual);
        let verdict = validator().validate(StepId(1), &two).unwrap();
        assert_eq!(verdict.errors.len(), 2);
        assert_eq!(verdict.status, StepStatus::Partial);

        // Three errors: same plus malformed website
        let three = state_with(
            json!({"name": "", "email": "invalid-email", "website": "not a url"}),
            SourceTier::Manual,
        );
        let verdict = validator().validate(StepId(1), &three).unwrap();
        assert_eq!(verdict.errors.len(), 3);
        assert_eq!(verdict.status, StepStatus::Error);
    }

    #[test]
    fn test_auto_filled_warning_names_tier() {
        let state = state_with(
            json!({"methods": ["p2p"], "primary_method": "p2p"}),
            SourceTier::Catalog,
        );
        let verdict = validator().validate(StepId(4), &state).unwrap();
        assert_eq!(verdict.status, StepStatus::Complete);
        assert!(verdict.is_valid);
        assert_eq!(verdict.warnings.len(), 1);
        assert!(verdict.warnings[0].contains("catalog"));
    }

    #[test]
    fn test_manual_data_has_no_provenance_warning() {
        let state = state_with(
            json!({"methods": ["p2p"], "primary_method": "p2p"}),
            SourceTier::Manual,
        );
        let verdict = validator().validate(StepId(4), &state).unwrap();
        assert!(verdict.warnings.is_empty());
    }

    #[test]
    fn test_unknown_step() {
        assert!(matches!(
            validator().validate(StepId(9), &StepState::default()),
            Err(Error::UnknownStep(9))
        ));
    }

    #[test]
    fn test_custom_schema_name_and_threshold() {
        let registry = SchemaRegistry::new()
            .register(StepId(1), StepSchema::new(StepKind::Company).named("Buyer"));
        let validator = StepValidator::new(&registry, 1, 0).unwrap();
        let state = state_with(json!({"name": "Acme"}), SourceTier::Manual);
        let verdict = validator.validate(StepId(1), &state).unwrap();
        // One error (no tax id / legal name) above a zero threshold
        assert_eq!(verdict.status, StepStatus::Error);
        assert_eq!(verdict.message, "Buyer: validation error");
    }

    #[test]
    fn test_is_digits() {
        assert!(is_digits("044525225", 9));
        assert!(!is_digits("04452522", 9));
        assert!(!is_digits("04452522a", 9));
    }
}
