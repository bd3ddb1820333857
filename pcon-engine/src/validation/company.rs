//! Company data rules

use super::{is_digits, Findings, StepRules};
use crate::payload::{present, CompanyData};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// True if `value` parses as an absolute http(s) URL
pub(crate) fn is_web_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}

impl StepRules for CompanyData {
    fn is_filled(&self) -> bool {
        [
            &self.name,
            &self.legal_name,
            &self.inn,
            &self.kpp,
            &self.ogrn,
            &self.legal_address,
            &self.email,
            &self.phone,
            &self.website,
        ]
        .into_iter()
        .any(present)
    }

    fn check(&self, findings: &mut Findings) {
        // Name first; the tax id / legal name requirement only reports once a
        // name exists so one missing identity counts as one error.
        if !present(&self.name) {
            findings.error("name", "company name is required");
        } else if !present(&self.inn) && !present(&self.legal_name) {
            findings.error("inn", "tax id or legal name is required");
        }

        if let Some(inn) = self.inn.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !(is_digits(inn, 10) || is_digits(inn, 12)) {
                findings.error("inn", "tax id must be 10 or 12 digits");
            }
        }

        if let Some(email) = self.email.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !EMAIL_RE.is_match(email) {
                findings.error("email", "invalid email format");
            }
        }

        if let Some(website) = self.website.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !is_web_url(website) {
                findings.error("website", "invalid URL format");
            }
        }

        if present(&self.name) && !present(&self.email) && !present(&self.phone) {
            findings.warning("No contact email or phone for the company");
        }
    }
}
