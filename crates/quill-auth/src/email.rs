//! Email normalization and format checks

use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex is valid")
});

/// How emails are turned into account keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailPolicy {
    /// Fold case so `Ada@Example.com` and `ada@example.com` are one account
    pub case_insensitive: bool,
}

impl Default for EmailPolicy {
    fn default() -> Self {
        Self {
            case_insensitive: true,
        }
    }
}

impl EmailPolicy {
    /// Normalize an email into its uniqueness key
    pub fn normalize(&self, email: &str) -> String {
        let trimmed = email.trim();
        if self.case_insensitive {
            trimmed.to_lowercase()
        } else {
            trimmed.to_string()
        }
    }
}

/// Structural check on an already trimmed email
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_folds() {
        let policy = EmailPolicy::default();
        assert_eq!(policy.normalize("  Ada@Example.COM \n"), "ada@example.com");
    }

    #[test]
    fn test_normalize_case_sensitive() {
        let policy = EmailPolicy {
            case_insensitive: false,
        };
        assert_eq!(policy.normalize("  Ada@Example.COM "), "Ada@Example.COM");
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));

        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email(" a@b.com"));
        assert!(!is_valid_email("a@b.c"));
    }
}
