//! Payment method and requisites rules

use super::{Findings, StepRules};
use crate::payload::{present, PaymentMethodData, Requisite, RequisiteKind, RequisitesData};
use std::collections::HashSet;

impl StepRules for PaymentMethodData {
    fn is_filled(&self) -> bool {
        !self.methods.is_empty()
    }

    fn check(&self, findings: &mut Findings) {
        if self.methods.is_empty() {
            findings.error("methods", "select at least one payment method");
            return;
        }

        let mut seen = HashSet::new();
        for method in &self.methods {
            if !seen.insert(*method) {
                findings.error("methods", format!("{:?} selected more than once", method));
            }
        }

        match self.primary_method {
            None => findings.error("primary_method", "choose a primary payment method"),
            Some(primary) if !self.has_method(primary) => findings.error(
                "primary_method",
                "primary payment method must be one of the selected methods",
            ),
            Some(_) => {}
        }
    }
}

/// Kind-specific detail checks for one requisite
fn check_requisite(field: &str, requisite: &Requisite, findings: &mut Findings) {
    let required: [(&str, &Option<String>); 2] = match requisite.kind {
        RequisiteKind::BankAccount => [
            ("bank_name", &requisite.bank_name),
            ("account_number", &requisite.account_number),
        ],
        RequisiteKind::P2pCard => [
            ("card_number", &requisite.card_number),
            ("card_holder", &requisite.card_holder),
        ],
        RequisiteKind::CryptoWallet => [
            ("wallet_address", &requisite.wallet_address),
            ("currency", &requisite.currency),
        ],
    };

    for (name, value) in required {
        if !present(value) {
            findings.error(&format!("{}.{}", field, name), "is required");
        }
    }
}

impl StepRules for RequisitesData {
    fn is_filled(&self) -> bool {
        !self.requisites.is_empty()
    }

    fn check(&self, findings: &mut Findings) {
        if self.requisites.is_empty() {
            findings.error("requisites", "add at least one payment requisite");
        }

        for (i, requisite) in self.requisites.iter().enumerate() {
            check_requisite(&format!("requisites[{}]", i), requisite, findings);
        }

        if let Some(primary) = &self.primary_requisite {
            check_requisite("primary_requisite", primary, findings);
        }
    }
}
