//! Bank details and client requisites rules

use super::{is_digits, Findings, StepRules};
use crate::payload::{present, BankData, ClientRequisitesData};

/// Russian bank identifier code length
const BIK_LEN: usize = 9;

fn check_bik(field: &str, bik: &Option<String>, findings: &mut Findings) {
    match bik.as_deref().map(str::trim) {
        Some(bik) if is_digits(bik, BIK_LEN) => {}
        Some(bik) if !bik.is_empty() => findings.error(field, "BIK must be 9 digits"),
        _ => findings.error(field, "BIK is required"),
    }
}

impl StepRules for BankData {
    fn is_filled(&self) -> bool {
        present(&self.bank_name) && present(&self.bank_account)
    }

    fn check(&self, findings: &mut Findings) {
        if !present(&self.bank_name) {
            findings.error("bank_name", "bank name is required");
        }
        if !present(&self.bank_account) {
            findings.error("bank_account", "account number is required");
        }
        if !present(&self.corr_account) {
            findings.error("corr_account", "correspondent account is required");
        }
        check_bik("bik", &self.bik, findings);
    }
}

impl StepRules for ClientRequisitesData {
    fn is_filled(&self) -> bool {
        present(&self.recipient_bank_name) && present(&self.recipient_account)
    }

    fn check(&self, findings: &mut Findings) {
        if !present(&self.recipient_name) {
            findings.error("recipient_name", "recipient name is required");
        }
        if !present(&self.recipient_bank_name) {
            findings.error("recipient_bank_name", "recipient bank is required");
        }
        if !present(&self.recipient_account) {
            findings.error("recipient_account", "recipient account is required");
        }
        check_bik("recipient_bik", &self.recipient_bik, findings);
        if !present(&self.payment_purpose) {
            findings.error("payment_purpose", "payment purpose is required");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bank_details() {
        let data: BankData = serde_json::from_value(json!({
            "bank_name": "Sber",
            "bank_account": "40702810900000000001",
            "corr_account": "30101810400000000225",
            "bik": "044525225"
        }))
        .unwrap();
        assert!(data.is_filled());
        let mut findings = Findings::default();
        data.check(&mut findings);
        assert!(findings.errors.is_empty());
    }

    #[test]
    fn test_bank_bad_bik_and_missing_corr() {
        let data: BankData = serde_json::from_value(json!({
            "bank_name": "Sber",
            "bank_account": "4070",
            "bik": "0445"
        }))
        .unwrap();
        let mut findings = Findings::default();
        data.check(&mut findings);
        assert_eq!(
            findings.errors,
            vec![
                "corr_account: correspondent account is required".to_string(),
                "bik: BIK must be 9 digits".to_string(),
            ]
        );
    }

    #[test]
    fn test_client_requisites_partial() {
        let data: ClientRequisitesData = serde_json::from_value(json!({
            "recipient_name": "Ivanov",
            "recipient_bank_name": "Tinkoff",
            "recipient_account": "40817810000000000001"
        }))
        .unwrap();
        assert!(data.is_filled());
        let mut findings = Findings::default();
        data.check(&mut findings);
        assert_eq!(findings.errors.len(), 2);
    }
}
