//! Password strength policy enforced by the driver before a password change.
//!
//! The device core accepts whatever password it is handed; this check runs
//! at the trust boundary in front of it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum length required by the remediation walkthrough.
const DEFAULT_MIN_LENGTH: usize = 12;

/// A single unmet rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("must be at least {0} characters long")]
    TooShort(usize),
    #[error("must contain an uppercase letter (A-Z)")]
    MissingUppercase,
    #[error("must contain a lowercase letter (a-z)")]
    MissingLowercase,
    #[error("must contain a digit (0-9)")]
    MissingDigit,
    #[error("must contain a symbol (anything other than A-Z, a-z, 0-9)")]
    MissingSymbol,
}

/// Password strength rules (`[policy]` in the config file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    /// Minimum length in characters.
    pub min_length: usize,
    pub require_upper: bool,
    pub require_lower: bool,
    pub require_digit: bool,
    pub require_symbol: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            require_upper: true,
            require_lower: true,
            require_digit: true,
            require_symbol: true,
        }
    }
}

impl PasswordPolicy {
    /// Return every rule the password breaks, in a stable order.
    pub fn check(&self, password: &str) -> Vec<PolicyViolation> {
        let mut violations = Vec::new();

        if password.chars().count() < self.min_length {
            violations.push(PolicyViolation::TooShort(self.min_length));
        }
        if self.require_upper && !password.chars().any(|c| c.is_ascii_uppercase()) {
            violations.push(PolicyViolation::MissingUppercase);
        }
        if self.require_lower && !password.chars().any(|c| c.is_ascii_lowercase()) {
            violations.push(PolicyViolation::MissingLowercase);
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push(PolicyViolation::MissingDigit);
        }
        if self.require_symbol && !password.chars().any(|c| !c.is_ascii_alphanumeric()) {
            violations.push(PolicyViolation::MissingSymbol);
        }

        violations
    }

    /// Whether the password satisfies every rule.
    pub fn is_satisfied(&self, password: &str) -> bool {
        self.check(password).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_password_passes() {
        let policy = PasswordPolicy::default();
        assert!(policy.is_satisfied("Str0ng!Passw0rd"));
        assert!(policy.is_satisfied("Aa1 aaaaaaaaa"));
    }

    #[test]
    fn default_credential_fails_every_rule_but_lowercase() {
        let violations = PasswordPolicy::default().check("admin");
        assert_eq!(
            violations,
            vec![
                PolicyViolation::TooShort(12),
                PolicyViolation::MissingUppercase,
                PolicyViolation::MissingDigit,
                PolicyViolation::MissingSymbol,
            ]
        );
    }

    #[test]
    fn eleven_characters_is_too_short() {
        let violations = PasswordPolicy::default().check("Str0ng!Pass");
        assert_eq!(violations, vec![PolicyViolation::TooShort(12)]);
        assert!(PasswordPolicy::default().is_satisfied("Str0ng!Passw"));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let policy = PasswordPolicy::default();
        // 11 chars, but more than 12 bytes.
        assert!(policy.check("Ñandú1!abcd").contains(&PolicyViolation::TooShort(12)));
        // Non-ASCII letters count as symbols.
        assert!(policy.is_satisfied("Ñandúñandú1A"));
    }

    #[test]
    fn missing_symbol_detected() {
        let violations = PasswordPolicy::default().check("Str0ngPassw0rd");
        assert_eq!(violations, vec![PolicyViolation::MissingSymbol]);
    }

    #[test]
    fn rules_can_be_relaxed() {
        let policy = PasswordPolicy {
            min_length: 4,
            require_upper: false,
            require_lower: true,
            require_digit: false,
            require_symbol: false,
        };
        assert!(policy.is_satisfied("admin"));
        assert!(!policy.is_satisfied("ADMIN"));
    }

    #[test]
    fn violation_messages_are_readable() {
        assert_eq!(
            PolicyViolation::TooShort(12).to_string(),
            "must be at least 12 characters long"
        );
        assert!(PolicyViolation::MissingSymbol.to_string().contains("symbol"));
    }
}
