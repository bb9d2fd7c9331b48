//! Password assessment types. Derived values only - neither the password
//! nor any assessment of it is ever persisted.

use serde::{Deserialize, Serialize};

/// Strength band derived from the 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    VeryWeak,
    Weak,
    Medium,
    Strong,
}

/// One failed rule. Closed set so callers branch without string matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum PasswordIssue {
    TooShort { min_length: usize, actual_length: usize },
    MissingUppercase,
    MissingLowercase,
    MissingNumber,
    MissingSpecial,
    CommonPassword,
}

impl std::fmt::Display for PasswordIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PasswordIssue::TooShort {
                min_length,
                actual_length,
            } => write!(
                f,
                "Password must be at least {} characters (got {})",
                min_length, actual_length
            ),
            PasswordIssue::MissingUppercase => {
                write!(f, "Password must contain at least one uppercase letter")
            }
            PasswordIssue::MissingLowercase => {
                write!(f, "Password must contain at least one lowercase letter")
            }
            PasswordIssue::MissingNumber => {
                write!(f, "Password must contain at least one number")
            }
            PasswordIssue::MissingSpecial => {
                write!(f, "Password must contain at least one special character")
            }
            PasswordIssue::CommonPassword => {
                write!(f, "Password is too common")
            }
        }
    }
}

/// Result of scoring one candidate password against the active rules.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordAssessment {
    pub valid: bool,
    pub score: u8,
    pub strength: Strength,
    pub issues: Vec<PasswordIssue>,
}

/// Outcome of the k-anonymity breach query. `Unverified` means the corpus
/// could not be reached within the timeout; it is distinct from a clean
/// pass so the audit trail can tell "verified not leaked" from "could not
/// verify".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreachStatus {
    NotLeaked,
    Leaked { count: u64 },
    Unverified,
}

impl BreachStatus {
    pub fn is_leaked(&self) -> bool {
        matches!(self, BreachStatus::Leaked { .. })
    }
}
