//! Input validation and normalization.
//!
//! Two kinds of untrusted text reach SQL here: identifiers from
//! configuration (which cannot be bound as parameters and are therefore
//! checked against a strict character set), and project labels from the
//! external ledger (which are always bound, but are trimmed and
//! deduplicated before they are inserted).

use crate::error::{Error, Result};
use std::collections::HashSet;

/// Validate a plain SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`.
///
/// # Errors
///
/// Returns `InvalidIdentifier` for empty names, names starting with a
/// digit, or names containing anything other than ASCII alphanumerics
/// and underscores.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}

/// Normalize a project label: trim surrounding whitespace.
///
/// Returns `None` when nothing is left after trimming.
#[must_use]
pub fn normalize_label(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// Normalize and deduplicate labels, keeping first-seen order.
///
/// Equality is exact and case-sensitive after trimming, so `"Trip"` and
/// `" Trip "` collapse while `"trip"` stays distinct.
#[must_use]
pub fn dedupe_labels<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut labels = Vec::new();

    for label in raw {
        if let Some(label) = normalize_label(label.as_ref()) {
            if seen.insert(label.to_string()) {
                labels.push(label.to_string());
            }
        }
    }

    labels
}
