//! Candidate shaping
//!
//! External collaborators fetch catalog suppliers, templates, client profiles,
//! past deals and document extractions. This module turns that data into
//! per-step candidates tagged with the right tier; the controller arbitrates
//! them like any other submission.
//!
//! Sources name payload kinds, not step numbers. Step ids are resolved
//! against the schema registry, and kinds the wizard does not have are
//! skipped.

use crate::payload::{
    BankData, ClientRequisitesData, CompanyData, DocumentsData, PaymentMethod, PaymentMethodData,
    Requisite, RequisiteKind, RequisitesData, SpecificationData,
};
use crate::store::StepId;
use crate::validation::{SchemaRegistry, StepKind};
use pcon_common::SourceTier;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Proposed value for one step
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub step: StepId,
    pub payload: Value,
    pub tier: SourceTier,
}

impl Candidate {
    pub fn new(step: impl Into<StepId>, payload: Value, tier: SourceTier) -> Self {
        Self {
            step: step.into(),
            payload,
            tier,
        }
    }
}

/// A collaborator's data, shaped into step payloads
pub trait CandidateSource {
    /// Source name for logging
    fn name(&self) -> &str;

    /// Tier every candidate from this source carries
    fn tier(&self) -> SourceTier;

    /// Payloads this source can offer, by step kind
    fn payloads(&self) -> Vec<(StepKind, Value)>;

    /// Resolve payloads to candidates for the registered steps
    fn candidates(&self, registry: &SchemaRegistry) -> Vec<Candidate> {
        let tier = self.tier();
        self.payloads()
            .into_iter()
            .filter_map(|(kind, payload)| match registry.step_of(kind) {
                Some(step) => Some(Candidate { step, payload, tier }),
                None => {
                    debug!("{}: no {:?} step registered, skipping", self.name(), kind);
                    None
                }
            })
            .collect()
    }
}

fn encode<T: Serialize>(kind: StepKind, data: &T) -> Option<(StepKind, Value)> {
    match serde_json::to_value(data) {
        Ok(value) => Some((kind, value)),
        Err(e) => {
            warn!("Failed to encode {:?} candidate: {}", kind, e);
            None
        }
    }
}

// ============================================================================
// Catalog suppliers
// ============================================================================

/// Where a supplier card comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplierOrigin {
    #[default]
    Catalog,
    /// The user's own supplier list
    Personal,
    /// Platform-verified supplier
    Verified,
}

impl SupplierOrigin {
    pub fn tier(self) -> SourceTier {
        match self {
            Self::Catalog => SourceTier::Catalog,
            Self::Personal => SourceTier::PersonalSupplier,
            Self::Verified => SourceTier::VerifiedSupplier,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplierBankAccount {
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub bik: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplierCard {
    pub bank_name: Option<String>,
    pub card_number: Option<String>,
    pub holder_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplierWallet {
    pub currency: Option<String>,
    pub address: Option<String>,
    pub network: Option<String>,
}

/// Supplier card with its payment options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSupplier {
    pub name: String,
    #[serde(default)]
    pub origin: SupplierOrigin,
    /// Methods the supplier declares; empty means "whatever the accounts allow"
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
    #[serde(default)]
    pub bank_accounts: Vec<SupplierBankAccount>,
    #[serde(default)]
    pub p2p_cards: Vec<SupplierCard>,
    #[serde(default)]
    pub crypto_wallets: Vec<SupplierWallet>,
}

impl CatalogSupplier {
    /// True if the supplier has an account backing `method`
    ///
    /// Card and cash need no account; the supplier only has to declare them.
    pub fn offers(&self, method: PaymentMethod) -> bool {
        match method {
            PaymentMethod::BankTransfer => !self.bank_accounts.is_empty(),
            PaymentMethod::P2p => !self.p2p_cards.is_empty(),
            PaymentMethod::Crypto => !self.crypto_wallets.is_empty(),
            PaymentMethod::Card | PaymentMethod::Cash => self.payment_methods.contains(&method),
        }
    }

    /// Available methods; the first one becomes primary
    pub fn methods(&self) -> Vec<PaymentMethod> {
        let declared: &[PaymentMethod] = if self.payment_methods.is_empty() {
            &[
                PaymentMethod::BankTransfer,
                PaymentMethod::P2p,
                PaymentMethod::Crypto,
            ]
        } else {
            &self.payment_methods
        };

        let mut methods = Vec::new();
        for method in declared {
            if self.offers(*method) && !methods.contains(method) {
                methods.push(*method);
            }
        }
        methods
    }

    /// Bank accounts, then p2p cards, then crypto wallets; first is primary
    pub fn requisites(&self) -> Vec<Requisite> {
        let accounts = self.bank_accounts.iter().map(|account| Requisite {
            name: Some(
                account
                    .bank_name
                    .clone()
                    .unwrap_or_else(|| "Bank account".to_string()),
            ),
            bank_name: account.bank_name.clone(),
            account_number: account.account_number.clone(),
            bik: account.bik.clone(),
            ..Requisite::new(RequisiteKind::BankAccount)
        });

        let cards = self.p2p_cards.iter().map(|card| Requisite {
            name: Some(card.bank_name.clone().unwrap_or_else(|| "P2P card".to_string())),
            bank_name: card.bank_name.clone(),
            card_number: card.card_number.clone(),
            card_holder: card.holder_name.clone(),
            ..Requisite::new(RequisiteKind::P2pCard)
        });

        let wallets = self.crypto_wallets.iter().map(|wallet| Requisite {
            name: Some(
                wallet
                    .currency
                    .clone()
                    .unwrap_or_else(|| "Crypto wallet".to_string()),
            ),
            currency: wallet.currency.clone(),
            wallet_address: wallet.address.clone(),
            network: wallet.network.clone(),
            ..Requisite::new(RequisiteKind::CryptoWallet)
        });

        let mut requisites: Vec<Requisite> = accounts.chain(cards).chain(wallets).collect();
        if let Some(first) = requisites.first_mut() {
            first.primary = true;
        }
        requisites
    }
}

impl CandidateSource for CatalogSupplier {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> SourceTier {
        self.origin.tier()
    }

    fn payloads(&self) -> Vec<(StepKind, Value)> {
        let mut out = Vec::new();

        let methods = self.methods();
        if let Some(primary) = methods.first().copied() {
            let data = PaymentMethodData {
                methods,
                primary_method: Some(primary),
                ..PaymentMethodData::default()
            };
            out.extend(encode(StepKind::PaymentMethod, &data));
        }

        let requisites = self.requisites();
        if !requisites.is_empty() {
            let data = RequisitesData {
                requisites,
                ..RequisitesData::default()
            };
            out.extend(encode(StepKind::Requisites, &data));
        }

        out
    }
}

// ============================================================================
// Templates, profiles, echo history
// ============================================================================

/// Saved project template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectTemplate {
    pub name: String,
    #[serde(default)]
    pub company: Option<CompanyData>,
    #[serde(default)]
    pub specification: Option<SpecificationData>,
}

impl CandidateSource for ProjectTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Template
    }

    fn payloads(&self) -> Vec<(StepKind, Value)> {
        let mut out = Vec::new();
        if let Some(company) = &self.company {
            out.extend(encode(StepKind::Company, company));
        }
        if let Some(specification) = &self.specification {
            out.extend(encode(StepKind::Specification, specification));
        }
        out
    }
}

/// Stored client profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientProfile {
    pub name: String,
    pub company: CompanyData,
    #[serde(default)]
    pub bank: Option<BankData>,
}

impl CandidateSource for ClientProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Profile
    }

    fn payloads(&self) -> Vec<(StepKind, Value)> {
        let mut out: Vec<_> = encode(StepKind::Company, &self.company).into_iter().collect();
        if let Some(bank) = &self.bank {
            out.extend(encode(StepKind::Bank, bank));
        }
        out
    }
}

/// Step data captured from a past completed deal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EchoCard {
    /// Identifier of the deal the data came from
    pub deal_id: String,
    #[serde(default)]
    pub company: Option<CompanyData>,
    #[serde(default)]
    pub specification: Option<SpecificationData>,
    #[serde(default)]
    pub bank: Option<BankData>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethodData>,
    #[serde(default)]
    pub requisites: Option<RequisitesData>,
    #[serde(default)]
    pub documents: Option<DocumentsData>,
    #[serde(default)]
    pub client_requisites: Option<ClientRequisitesData>,
}

impl CandidateSource for EchoCard {
    fn name(&self) -> &str {
        &self.deal_id
    }

    fn tier(&self) -> SourceTier {
        SourceTier::EchoHistory
    }

    fn payloads(&self) -> Vec<(StepKind, Value)> {
        let mut out = Vec::new();
        if let Some(data) = &self.company {
            out.extend(encode(StepKind::Company, data));
        }
        if let Some(data) = &self.specification {
            out.extend(encode(StepKind::Specification, data));
        }
        if let Some(data) = &self.bank {
            out.extend(encode(StepKind::Bank, data));
        }
        if let Some(data) = &self.payment_method {
            out.extend(encode(StepKind::PaymentMethod, data));
        }
        if let Some(data) = &self.requisites {
            out.extend(encode(StepKind::Requisites, data));
        }
        if let Some(data) = &self.documents {
            out.extend(encode(StepKind::Documents, data));
        }
        if let Some(data) = &self.client_requisites {
            out.extend(encode(StepKind::ClientRequisites, data));
        }
        out
    }
}

// ============================================================================
// Document extraction
// ============================================================================

/// How an extraction was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// OCR over an image or scan
    Ocr,
    /// Structured parse of an uploaded file
    Upload,
}

/// Data extracted from a document for a single step
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub method: ExtractionMethod,
    pub kind: StepKind,
    /// Extracted fields, passed through unchanged
    pub payload: Value,
}

impl CandidateSource for Extraction {
    fn name(&self) -> &str {
        match self.method {
            ExtractionMethod::Ocr => "ocr",
            ExtractionMethod::Upload => "upload",
        }
    }

    fn tier(&self) -> SourceTier {
        match self.method {
            ExtractionMethod::Ocr => SourceTier::OcrSuggestion,
            ExtractionMethod::Upload => SourceTier::UploadExtraction,
        }
    }

    fn payloads(&self) -> Vec<(StepKind, Value)> {
        vec![(self.kind, self.payload.clone())]
    }
}
