//! Per-account inclusion preferences.
//!
//! Each ledger account can be included in the savings calculation, the
//! spending (checking) calculation, both, or neither. Older stores kept a
//! single `excluded` flag meaning "exclude from both".

use serde::{Deserialize, Serialize};

/// Inclusion flags for one external account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPreference {
    /// Account identifier in the external ledger
    pub account_id: String,
    /// Cached display name
    pub account_name: Option<String>,
    pub include_savings: bool,
    pub include_checking: bool,
}

impl AccountPreference {
    /// Translate the legacy single flag.
    ///
    /// `excluded` maps to both flags off; not excluded maps to both on.
    #[must_use]
    pub fn from_legacy(account_id: String, account_name: Option<String>, excluded: bool) -> Self {
        Self {
            account_id,
            account_name,
            include_savings: !excluded,
            include_checking: !excluded,
        }
    }
}
