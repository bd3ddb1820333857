//! Data source tiers
//!
//! Every candidate value carries the kind of source that produced it. The
//! rank table is closed: adding a tier forces every `match` below to be
//! updated, so no source can end up unranked.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of data source a candidate value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    /// Direct user input
    Manual,
    /// Product catalog supplier card
    Catalog,
    /// Supplier from the user's personal list
    PersonalSupplier,
    /// Platform-verified supplier
    VerifiedSupplier,
    /// OCR text extraction suggestion
    OcrSuggestion,
    /// Structured extraction from an uploaded document
    UploadExtraction,
    /// Saved project template
    Template,
    /// Stored client profile
    Profile,
    /// Historical data from past completed deals
    EchoHistory,
}

impl SourceTier {
    /// All tiers, highest rank first
    pub const ALL: [SourceTier; 9] = [
        SourceTier::Manual,
        SourceTier::Catalog,
        SourceTier::PersonalSupplier,
        SourceTier::VerifiedSupplier,
        SourceTier::OcrSuggestion,
        SourceTier::UploadExtraction,
        SourceTier::Template,
        SourceTier::Profile,
        SourceTier::EchoHistory,
    ];

    /// Arbitration rank (higher wins)
    pub const fn rank(self) -> u8 {
        match self {
            Self::Manual => 6,
            Self::Catalog | Self::PersonalSupplier | Self::VerifiedSupplier => 5,
            Self::OcrSuggestion | Self::UploadExtraction => 4,
            Self::Template => 3,
            Self::Profile => 2,
            Self::EchoHistory => 1,
        }
    }

    /// True if this tier strictly outranks `other`
    pub const fn outranks(self, other: SourceTier) -> bool {
        self.rank() > other.rank()
    }

    /// Human-readable source name for warnings and status messages
    pub fn label(self) -> &'static str {
        match self {
            Self::Manual => "manual entry",
            Self::Catalog => "catalog",
            Self::PersonalSupplier => "personal supplier list",
            Self::VerifiedSupplier => "verified supplier",
            Self::OcrSuggestion => "OCR suggestion",
            Self::UploadExtraction => "uploaded document",
            Self::Template => "template",
            Self::Profile => "client profile",
            Self::EchoHistory => "echo history",
        }
    }
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_table() {
        assert_eq!(SourceTier::Manual.rank(), 6);
        assert_eq!(SourceTier::Catalog.rank(), 5);
        assert_eq!(SourceTier::PersonalSupplier.rank(), 5);
        assert_eq!(SourceTier::VerifiedSupplier.rank(), 5);
        assert_eq!(SourceTier::OcrSuggestion.rank(), 4);
        assert_eq!(SourceTier::UploadExtraction.rank(), 4);
        assert_eq!(SourceTier::Template.rank(), 3);
        assert_eq!(SourceTier::Profile.rank(), 2);
        assert_eq!(SourceTier::EchoHistory.rank(), 1);
    }

    #[test]
    fn test_all_is_sorted_by_rank() {
        for pair in SourceTier::ALL.windows(2) {
            assert!(pair[0].rank() >= pair[1].rank());
        }
    }

    #[test]
    fn test_equal_ranks_do_not_outrank() {
        assert!(!SourceTier::Catalog.outranks(SourceTier::VerifiedSupplier));
        assert!(!SourceTier::VerifiedSupplier.outranks(SourceTier::Catalog));
        assert!(!SourceTier::OcrSuggestion.outranks(SourceTier::UploadExtraction));
        assert!(!SourceTier::Template.outranks(SourceTier::Template));
    }

    #[test]
    fn test_manual_outranks_everything_else() {
        for tier in SourceTier::ALL.iter().skip(1) {
            assert!(SourceTier::Manual.outranks(*tier), "{:?}", tier);
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&SourceTier::PersonalSupplier).unwrap(),
            "\"personal_supplier\""
        );
        let tier: SourceTier = serde_json::from_str("\"echo_history\"").unwrap();
        assert_eq!(tier, SourceTier::EchoHistory);
    }
}
