//! Identity provider profile lookup

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};

/// Profile of the authenticated viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerProfile {
    pub login: String,
    pub display_name: String,
}

/// Exchanges a bearer token for the viewer's profile
pub trait ProfileProvider: Send + Sync {
    /// Fetch the profile behind `access_token`
    ///
    /// Returns `Ok(None)` when the provider answers but yields no login.
    fn fetch_profile(
        &self,
        access_token: &str,
    ) -> impl Future<Output = AuthResult<Option<ViewerProfile>>> + Send;
}

/// Helix users response
#[derive(Debug, Deserialize)]
struct HelixUsers {
    #[serde(default)]
    data: Vec<HelixUser>,
}

#[derive(Debug, Deserialize)]
struct HelixUser {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

/// Profile client for the Helix users endpoint
#[derive(Clone)]
pub struct HelixClient {
    http: reqwest::Client,
    profile_url: String,
    client_id: String,
}

impl HelixClient {
    /// Create a new profile client with the configured request timeout
    pub fn new(config: &AuthConfig) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.profile_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            profile_url: config.profile_url.clone(),
            client_id: config.twitch_client_id.clone(),
        })
    }
}

impl ProfileProvider for HelixClient {
    async fn fetch_profile(&self, access_token: &str) -> AuthResult<Option<ViewerProfile>> {
        info!("Fetching viewer profile");

        let response = self
            .http
            .get(&self.profile_url)
            .bearer_auth(access_token)
            .header("Client-ID", &self.client_id)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = error_detail(&body);
            warn!("Profile request failed with {}: {}", status, detail);
            return Err(AuthError::Exchange(format!("Failed to fetch user: {detail}")));
        }

        let users: HelixUsers = serde_json::from_str(&body)
            .map_err(|e| AuthError::Exchange(format!("Bad profile payload: {e}")))?;
        Ok(users.data.into_iter().next().and_then(profile_from_user))
    }
}

fn profile_from_user(user: HelixUser) -> Option<ViewerProfile> {
    let login = user.login.unwrap_or_default().trim().to_string();
    if login.is_empty() {
        return None;
    }

    let display_name = user
        .display_name
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| login.clone());

    Some(ViewerProfile {
        login,
        display_name,
    })
}

/// Provider `message`/`error` field, else the first 200 characters of the body
fn error_detail(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|json| {
            ["message", "error"]
                .iter()
                .filter_map(|key| json.get(*key).and_then(Value::as_str))
                .find(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| common::format::truncate_chars(body, 200))
}
