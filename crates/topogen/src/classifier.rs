//! Rule-based sector classification
//!
//! Deterministic keyword rules over the lowercased description. Used whenever
//! generative profile extraction is unavailable or returns unusable output.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Industry sector recognised by the keyword rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
pub enum Sector {
    Banking,
    Healthcare,
    #[serde(rename = "Social Media")]
    SocialMedia,
    Retail,
    Defense,
    Logistics,
    Technology,
}

impl Sector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Banking => "Banking",
            Sector::Healthcare => "Healthcare",
            Sector::SocialMedia => "Social Media",
            Sector::Retail => "Retail",
            Sector::Defense => "Defense",
            Sector::Logistics => "Logistics",
            Sector::Technology => "Technology",
        }
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checked in order; the first family with a matching keyword wins
const SECTOR_RULES: &[(&[&str], Sector)] = &[
    (&["bank", "payment"], Sector::Banking),
    (&["health", "hospital"], Sector::Healthcare),
    (&["social", "media"], Sector::SocialMedia),
    (&["retail", "shop"], Sector::Retail),
    (&["defense", "military"], Sector::Defense),
    (&["logistics", "shipping"], Sector::Logistics),
];

const BASE_FUNCTION: &str = "Customer Management";

const FUNCTION_RULES: &[(&str, &str)] = &[
    ("payment", "Payment Processing"),
    ("onboarding", "Customer Onboarding"),
    ("api", "API Services"),
    ("data", "Data Management"),
    ("security", "Security Services"),
];

/// Every triggered group contributes its requirements
const REGULATORY_RULES: &[(&[&str], &[&str])] = &[
    (&["bank", "payment", "financ"], &["PCI-DSS", "SOX", "Basel III"]),
    (&["health", "hospital", "medical", "patient"], &["HIPAA", "FDA", "GDPR"]),
    (&["data", "customer", "personal"], &["GDPR", "CCPA"]),
    (&["defense", "military", "government"], &["FISMA", "NIST", "FedRAMP"]),
];

const DEFAULT_REGULATIONS: &[&str] = &["GDPR", "ISO 27001"];

/// Output of the keyword rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub sector: Sector,
    /// Never empty: always starts with the base function
    pub core_functions: Vec<String>,
    /// Never empty: falls back to the default set
    pub regulatory_requirements: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SectorClassifier;

impl SectorClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, description: &str) -> Classification {
        let text = description.to_lowercase();

        Classification {
            sector: Self::sector(&text),
            core_functions: Self::core_functions(&text),
            regulatory_requirements: Self::regulatory_requirements(&text),
        }
    }

    fn sector(text: &str) -> Sector {
        SECTOR_RULES
            .iter()
            .find(|(keywords, _)| mentions_any(text, keywords))
            .map(|(_, sector)| *sector)
            .unwrap_or(Sector::Technology)
    }

    fn core_functions(text: &str) -> Vec<String> {
        std::iter::once(BASE_FUNCTION)
            .chain(
                FUNCTION_RULES
                    .iter()
                    .filter(|(keyword, _)| text.contains(keyword))
                    .map(|(_, function)| *function),
            )
            .map(str::to_string)
            .collect()
    }

    fn regulatory_requirements(text: &str) -> Vec<String> {
        let mut requirements: IndexSet<&str> = REGULATORY_RULES
            .iter()
            .filter(|(keywords, _)| mentions_any(text, keywords))
            .flat_map(|(_, regulations)| regulations.iter().copied())
            .collect();

        if requirements.is_empty() {
            requirements.extend(DEFAULT_REGULATIONS.iter().copied());
        }

        requirements.into_iter().map(str::to_string).collect()
    }
}

fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(description: &str) -> Classification {
        SectorClassifier::new().classify(description)
    }

    #[test]
    fn test_payment_bank_is_banking() {
        let result = classify("A payment processing bank");

        assert_eq!(result.sector, Sector::Banking);
        assert_eq!(
            result.core_functions,
            vec!["Customer Management", "Payment Processing"]
        );
        for required in ["PCI-DSS", "SOX", "Basel III"] {
            assert!(result.regulatory_requirements.iter().any(|r| r == required));
        }
    }

    #[test]
    fn test_first_sector_family_wins() {
        // Banking is checked before Healthcare.
        let result = classify("Hospital billing and payment gateway");
        assert_eq!(result.sector, Sector::Banking);
    }

    #[test]
    fn test_unmatched_text_uses_defaults() {
        let result = classify("We make widgets");

        assert_eq!(result.sector, Sector::Technology);
        assert_eq!(result.core_functions, vec!["Customer Management"]);
        assert_eq!(result.regulatory_requirements, vec!["GDPR", "ISO 27001"]);
    }

    #[test]
    fn test_regulations_are_a_deduplicated_union() {
        let result = classify("Health records platform handling personal data");

        assert_eq!(result.sector, Sector::Healthcare);
        assert_eq!(
            result.regulatory_requirements,
            vec!["HIPAA", "FDA", "GDPR", "CCPA"]
        );
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let result = classify("MILITARY logistics with API SECURITY");

        assert_eq!(result.sector, Sector::Defense);
        assert!(result.core_functions.contains(&"API Services".to_string()));
        assert!(result.core_functions.contains(&"Security Services".to_string()));
        assert!(result.regulatory_requirements.contains(&"FedRAMP".to_string()));
    }

    #[test]
    fn test_core_function_order_follows_rules() {
        let result = classify("security first, then data, then onboarding");
        assert_eq!(
            result.core_functions,
            vec![
                "Customer Management",
                "Customer Onboarding",
                "Data Management",
                "Security Services"
            ]
        );
    }
}
