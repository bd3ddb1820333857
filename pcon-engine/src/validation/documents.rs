//! Documents rules

use super::{Findings, StepRules};
use crate::payload::{present, DocumentsData};

impl StepRules for DocumentsData {
    fn is_filled(&self) -> bool {
        !self.files.is_empty()
    }

    fn check(&self, findings: &mut Findings) {
        for (i, file) in self.files.iter().enumerate() {
            if !present(&file.name) {
                findings.error(&format!("files[{}].name", i), "file name is required");
            }
            if !present(&file.url) {
                findings.error(&format!("files[{}].url", i), "file URL is required");
            }
        }
    }
}
