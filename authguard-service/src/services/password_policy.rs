//! Password validation and scoring.
//!
//! Each rule is an independent predicate; the assessment carries every
//! failed rule, not just the first. The score is a weighted blend of length
//! and an entropy estimate, so a long lowercase-only password can outscore
//! a short one that merely ticks every character-class box. `valid` is
//! strictly a function of the mandatory rules: any failure makes the
//! password invalid regardless of score.

use crate::config::PasswordPolicyConfig;
use crate::models::{PasswordAssessment, PasswordIssue, Strength};

/// Exact-match denylist of passwords seen in every leak ever published.
/// Checked lowercased. Small on purpose: the breach corpus covers the long
/// tail.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "passw0rd",
    "123456",
    "1234567",
    "12345678",
    "123456789",
    "1234567890",
    "qwerty",
    "qwerty123",
    "abc123",
    "letmein",
    "welcome",
    "welcome1",
    "admin",
    "admin123",
    "iloveyou",
    "monkey",
    "dragon",
    "sunshine",
    "princess",
    "football",
    "baseball",
    "superman",
    "trustno1",
];

/// Stateless engine; the active rules come in with each call so different
/// organizations can run different policies.
#[derive(Debug, Clone)]
pub struct PasswordPolicyEngine;

impl PasswordPolicyEngine {
    /// Evaluate every rule and aggregate the failures into `issues`.
    pub fn validate(password: &str, rules: &PasswordPolicyConfig) -> PasswordAssessment {
        let mut issues = Vec::new();
        let length = password.chars().count();

        if length < rules.min_length {
            issues.push(PasswordIssue::TooShort {
                min_length: rules.min_length,
                actual_length: length,
            });
        }

        if rules.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            issues.push(PasswordIssue::MissingUppercase);
        }

        if rules.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            issues.push(PasswordIssue::MissingLowercase);
        }

        if rules.require_number && !password.chars().any(|c| c.is_ascii_digit()) {
            issues.push(PasswordIssue::MissingNumber);
        }

        if rules.require_special && !password.chars().any(is_special) {
            issues.push(PasswordIssue::MissingSpecial);
        }

        if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
            issues.push(PasswordIssue::CommonPassword);
        }

        let score = score_password(password);

        PasswordAssessment {
            valid: issues.is_empty(),
            score,
            strength: strength_band(score),
            issues,
        }
    }
}

fn is_special(c: char) -> bool {
    !c.is_ascii_alphanumeric() && !c.is_whitespace()
}

/// Weighted length + entropy estimate, clamped to 0-100.
///
/// Entropy is estimated as `length * log2(pool)` where the pool is the sum
/// of the character classes actually present (26 + 26 + 10 + 33). Length
/// contributes up to 40 points (4 per character above nothing, saturating
/// at 10 chars beyond which entropy dominates); estimated bits contribute
/// up to 60 (full marks at ~80 bits).
fn score_password(password: &str) -> u8 {
    let length = password.chars().count();
    if length == 0 {
        return 0;
    }

    let mut pool: f64 = 0.0;
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        pool += 26.0;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        pool += 26.0;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        pool += 10.0;
    }
    if password.chars().any(is_special) {
        pool += 33.0;
    }
    if pool == 0.0 {
        // Non-ASCII only; treat as a mid-sized pool rather than zero.
        pool = 64.0;
    }

    let length_points = (length as f64 * 4.0).min(40.0);
    let bits = length as f64 * pool.log2();
    let entropy_points = (bits / 80.0 * 60.0).min(60.0);

    (length_points + entropy_points).round().min(100.0) as u8
}

fn strength_band(score: u8) -> Strength {
    match score {
        0..=24 => Strength::VeryWeak,
        25..=49 => Strength::Weak,
        50..=74 => Strength::Medium,
        _ => Strength::Strong,
    }
}
