//! Identity configuration

use serde::Deserialize;

use crate::error::{AuthError, AuthResult};

/// Identity provider and session storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Public OAuth client identifier, also sent as `Client-ID` to the profile API
    #[serde(default = "default_client_id")]
    pub twitch_client_id: String,
    /// Authorization endpoint of the implicit flow
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    /// Profile endpoint returning `{data: [{login, display_name}]}`
    #[serde(default = "default_profile_url")]
    pub profile_url: String,
    /// Space-separated scopes; empty requests none
    #[serde(default)]
    pub scopes: String,
    /// Storage key of the persisted session record
    #[serde(default = "default_storage_key")]
    pub auth_storage_key: String,
    /// Timeout of the profile request in seconds
    #[serde(default = "default_profile_timeout")]
    pub profile_timeout_secs: u64,
}

fn default_client_id() -> String {
    "89zu7axvj9y80avfsn6a5l20mv5kjq".to_string()
}

fn default_authorize_url() -> String {
    "https://id.twitch.tv/oauth2/authorize".to_string()
}

fn default_profile_url() -> String {
    "https://api.twitch.tv/helix/users".to_string()
}

fn default_storage_key() -> String {
    "yammy_twitch_auth_v2".to_string()
}

fn default_profile_timeout() -> u64 {
    12
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            twitch_client_id: default_client_id(),
            authorize_url: default_authorize_url(),
            profile_url: default_profile_url(),
            scopes: String::new(),
            auth_storage_key: default_storage_key(),
            profile_timeout_secs: default_profile_timeout(),
        }
    }
}

impl AuthConfig {
    /// Create a new AuthConfig from environment variables
    ///
    /// # Environment Variables
    /// - `STOREFRONT_TWITCH_CLIENT_ID`: OAuth client id
    /// - `STOREFRONT_AUTHORIZE_URL`: authorization endpoint
    /// - `STOREFRONT_PROFILE_URL`: profile endpoint
    /// - `STOREFRONT_SCOPES`: requested scopes (default: none)
    /// - `STOREFRONT_AUTH_STORAGE_KEY`: session storage key
    /// - `STOREFRONT_PROFILE_TIMEOUT_SECS`: profile request timeout (default: 12)
    pub fn from_env() -> AuthResult<Self> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("STOREFRONT"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AuthError::Config(e.to_string()))
    }

    /// Requested scopes as a list
    pub fn scope_list(&self) -> Vec<String> {
        self.scopes.split_whitespace().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_auth_config_defaults() {
        let config = AuthConfig::from_env().expect("Failed to create auth config");
        assert_eq!(config.profile_timeout_secs, 12);
        assert_eq!(config.auth_storage_key, "yammy_twitch_auth_v2");
        assert!(config.scope_list().is_empty());
    }

    #[test]
    #[serial]
    fn test_auth_config_from_env_overrides() {
        // SAFETY: serialized with every other environment-touching test
        unsafe {
            std::env::set_var("STOREFRONT_PROFILE_TIMEOUT_SECS", "3");
            std::env::set_var("STOREFRONT_SCOPES", "user:read:email chat:read");
        }

        let config = AuthConfig::from_env();

        unsafe {
            std::env::remove_var("STOREFRONT_PROFILE_TIMEOUT_SECS");
            std::env::remove_var("STOREFRONT_SCOPES");
        }

        let config = config.expect("Failed to create auth config");
        assert_eq!(config.profile_timeout_secs, 3);
        assert_eq!(config.scope_list(), vec!["user:read:email", "chat:read"]);
    }
}
