//! Session model and related functionality

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Identity bound to this browser context
///
/// A session always carries a non-empty, lowercased `login`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    login: String,
    #[serde(default)]
    pub display_name: String,
    pub access_token: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub obtained_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub implicit: bool,
}

impl Session {
    /// Build a session captured through the implicit flow
    ///
    /// `obtained_at` is truncated to whole milliseconds, the precision of
    /// the persisted record.
    pub fn from_implicit(
        login: &str,
        display_name: &str,
        token: &ImplicitToken,
        obtained_at: DateTime<Utc>,
    ) -> AuthResult<Self> {
        let login = login.trim().to_lowercase();
        if login.is_empty() {
            return Err(AuthError::Exchange("profile has no login".to_string()));
        }

        Ok(Self {
            login,
            display_name: display_name.trim().to_string(),
            access_token: token.access_token.clone(),
            obtained_at: obtained_at.trunc_subsecs(3),
            expires_in: token.expires_in,
            implicit: true,
        })
    }

    /// Lowercased platform handle
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Human label, falling back to the login
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.login
        } else {
            &self.display_name
        }
    }

    /// Whether a restored record satisfies the session invariant
    pub fn is_valid(&self) -> bool {
        !self.login.trim().is_empty()
    }
}

/// Access token captured from the navigation fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitToken {
    pub access_token: String,
    pub expires_in: Option<u64>,
}
