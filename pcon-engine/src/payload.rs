//! Typed per-step payloads
//!
//! Candidates arrive as `serde_json::Value`. Each step kind decodes that value
//! into its own payload type; a value that does not decode is a malformed
//! payload (validation status `error`), never a crash.
//!
//! Every payload keeps fields it does not know about in a flattened `extra`
//! map so decode → modify → encode round trips lose nothing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Step 1: Company
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,
    /// Tax id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ogrn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Step 2: Specification
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecificationItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecificationData {
    #[serde(default)]
    pub items: Vec<SpecificationItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Step 3: Bank
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corr_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bik: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Steps 4-5: Payment method and requisites (coupled pair)
// ============================================================================

/// How the client pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    P2p,
    Crypto,
    Card,
    Cash,
}

/// What a requisite describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequisiteKind {
    BankAccount,
    P2pCard,
    CryptoWallet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodData {
    #[serde(default)]
    pub methods: Vec<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_method: Option<PaymentMethod>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PaymentMethodData {
    pub fn has_method(&self, method: PaymentMethod) -> bool {
        self.methods.contains(&method)
    }
}

/// One payment destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requisite {
    #[serde(alias = "type")]
    pub kind: RequisiteKind,
    /// Display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bik: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_holder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Inline primary marker (alternative to `RequisitesData::primary_requisite`)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub primary: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Requisite {
    /// Requisite of `kind` with no details filled in
    pub fn new(kind: RequisiteKind) -> Self {
        Self {
            kind,
            name: None,
            bank_name: None,
            account_number: None,
            bik: None,
            card_number: None,
            card_holder: None,
            currency: None,
            wallet_address: None,
            network: None,
            primary: false,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequisitesData {
    #[serde(default)]
    pub requisites: Vec<Requisite>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_requisite: Option<Requisite>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequisitesData {
    /// Designated primary requisite: the explicit `primary_requisite`, else
    /// the first list entry marked `primary`
    pub fn primary(&self) -> Option<&Requisite> {
        self.primary_requisite
            .as_ref()
            .or_else(|| self.requisites.iter().find(|r| r.primary))
    }
}

// ============================================================================
// Step 6: Documents
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentsData {
    #[serde(default)]
    pub files: Vec<DocumentFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Step 7: Client requisites
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientRequisitesData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_inn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_bik: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_purpose: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Tagged union
// ============================================================================

/// Decoded payload of any step kind
#[derive(Debug, Clone, PartialEq)]
pub enum StepPayload {
    Company(CompanyData),
    Specification(SpecificationData),
    Bank(BankData),
    PaymentMethod(PaymentMethodData),
    Requisites(RequisitesData),
    Documents(DocumentsData),
    ClientRequisites(ClientRequisitesData),
}

/// True if the optional string holds something other than whitespace
pub(crate) fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}
