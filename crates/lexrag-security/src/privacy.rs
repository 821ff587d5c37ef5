//! Privacy pattern checks.
//!
//! The [`PrivacyScanner`] runs every registered [`PrivacyCheck`] against a
//! piece of text and reports one [`PrivacyFinding`] per matching check. Any
//! finding means the text must not be displayed.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Kind of personal data a check looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyCategory {
    /// Ten-digit mobile number.
    PhoneNumber,
    /// Twelve-digit Aadhaar number.
    NationalId,
    /// PAN card number (`ABCDE1234F`).
    TaxId,
    /// Email address.
    Email,
}

impl fmt::Display for PrivacyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PhoneNumber => write!(f, "Phone Number"),
            Self::NationalId => write!(f, "National ID"),
            Self::TaxId => write!(f, "Tax ID"),
            Self::Email => write!(f, "Email Address"),
        }
    }
}

/// A single privacy check definition.
#[derive(Debug, Clone)]
pub struct PrivacyCheck {
    /// Check identifier (e.g., "PV-001").
    pub id: String,
    /// Human-readable name.
    pub name: String,
    pub category: PrivacyCategory,
    /// Pattern matched against the text.
    pub pattern: Regex,
}

/// A check that matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyFinding {
    pub check_id: String,
    pub check_name: String,
    pub category: PrivacyCategory,
    /// The first matched span.
    pub matched_content: String,
}

fn check(id: &str, name: &str, category: PrivacyCategory, pattern: &str) -> Option<PrivacyCheck> {
    match Regex::new(pattern) {
        Ok(pattern) => Some(PrivacyCheck {
            id: id.to_string(),
            name: name.to_string(),
            category,
            pattern,
        }),
        Err(e) => {
            warn!(check = id, error = %e, "privacy pattern failed to compile");
            None
        }
    }
}

/// The default privacy checks.
pub fn all_checks() -> Vec<PrivacyCheck> {
    [
        check(
            "PV-001",
            "Ten-digit phone number",
            PrivacyCategory::PhoneNumber,
            r"\b\d{10}\b",
        ),
        check(
            "PV-002",
            "Email address",
            PrivacyCategory::Email,
            r"\b[\w.-]+@[\w.-]+\.\w+\b",
        ),
        check(
            "PV-003",
            "PAN number",
            PrivacyCategory::TaxId,
            r"\b[A-Z]{5}[0-9]{4}[A-Z]\b",
        ),
        check(
            "PV-004",
            "Aadhaar number",
            PrivacyCategory::NationalId,
            r"\b\d{12}\b",
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Scanner that runs all registered privacy checks.
#[derive(Debug, Clone)]
pub struct PrivacyScanner {
    checks: Vec<PrivacyCheck>,
}

impl PrivacyScanner {
    /// Create a scanner with the default checks loaded.
    pub fn new() -> Self {
        Self {
            checks: all_checks(),
        }
    }

    /// Create a scanner from an explicit check list.
    pub fn with_checks(checks: Vec<PrivacyCheck>) -> Self {
        Self { checks }
    }

    pub fn check_count(&self) -> usize {
        self.checks.len()
    }

    /// Run every check against `text`, in registration order.
    pub fn scan(&self, text: &str) -> Vec<PrivacyFinding> {
        self.checks
            .iter()
            .filter_map(|check| {
                check.pattern.find(text).map(|mat| PrivacyFinding {
                    check_id: check.id.clone(),
                    check_name: check.name.clone(),
                    category: check.category,
                    matched_content: mat.as_str().to_string(),
                })
            })
            .collect()
    }

    /// Whether any check matches.
    pub fn is_compliant(&self, text: &str) -> bool {
        !self.checks.iter().any(|c| c.pattern.is_match(text))
    }

    /// Categories covered by the registered checks, without duplicates.
    pub fn categories(&self) -> Vec<PrivacyCategory> {
        let mut cats = Vec::new();
        for check in &self.checks {
            if !cats.contains(&check.category) {
                cats.push(check.category);
            }
        }
        cats
    }
}

impl Default for PrivacyScanner {
    fn default() -> Self {
        Self::new()
    }
}
