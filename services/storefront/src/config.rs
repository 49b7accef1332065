//! Storefront configuration

use serde::Deserialize;

use crate::error::OrderError;

/// Backend endpoints and order settings
#[derive(Debug, Clone, Deserialize)]
pub struct StorefrontConfig {
    /// Spreadsheet web app serving the ledger (GET) and deductions (POST)
    #[serde(default = "default_balance_api_url")]
    pub balance_api_url: String,
    /// Operator notification web app
    #[serde(default = "default_relay_api_url")]
    pub relay_api_url: String,
    /// Whether priced orders check and deduct points
    #[serde(default = "default_spend_enabled")]
    pub spend_enabled: bool,
    /// Shared secret sent with deduction requests
    #[serde(default = "default_spend_token")]
    pub spend_token: String,
    /// Where viewers reach the operator when relaying fails
    #[serde(default = "default_operator_contact")]
    pub operator_contact: String,
    /// Directory of the durable session storage
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    /// Page address standing in for the browser location
    #[serde(default = "default_page_url")]
    pub page_url: String,
    /// User agent reported to the login flow
    #[serde(default)]
    pub user_agent: String,
}

fn default_balance_api_url() -> String {
    "https://script.google.com/macros/s/AKfycbxv93RskaQaMSQ4t41bpKLhUfx1RQHiwPl-tdYicJ12lvDJ7ZCZhSCAwR2PjSYqZDo/exec"
        .to_string()
}

fn default_relay_api_url() -> String {
    "https://script.google.com/macros/s/AKfycbzn3wvaFYwSWkopLZP1ueRb52pJnbWM7sB2Ay4DOx3FPPvBQITpaLF-cx2hflnZ10-_Xg/exec"
        .to_string()
}

fn default_spend_enabled() -> bool {
    true
}

fn default_spend_token() -> String {
    "yammy_spend_v1".to_string()
}

fn default_operator_contact() -> String {
    "@YammyTanuki".to_string()
}

fn default_state_dir() -> String {
    ".storefront".to_string()
}

fn default_page_url() -> String {
    "http://localhost/".to_string()
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            balance_api_url: default_balance_api_url(),
            relay_api_url: default_relay_api_url(),
            spend_enabled: default_spend_enabled(),
            spend_token: default_spend_token(),
            operator_contact: default_operator_contact(),
            state_dir: default_state_dir(),
            page_url: default_page_url(),
            user_agent: String::new(),
        }
    }
}

impl StorefrontConfig {
    /// Create a new StorefrontConfig from environment variables
    ///
    /// # Environment Variables
    /// - `STOREFRONT_BALANCE_API_URL`: ledger endpoint
    /// - `STOREFRONT_RELAY_API_URL`: operator notification endpoint
    /// - `STOREFRONT_SPEND_ENABLED`: check and deduct points for priced orders (default: true)
    /// - `STOREFRONT_SPEND_TOKEN`: deduction shared secret
    /// - `STOREFRONT_OPERATOR_CONTACT`: contact shown when relaying fails
    /// - `STOREFRONT_STATE_DIR`: durable session storage directory (default: .storefront)
    /// - `STOREFRONT_PAGE_URL`: page address used as the login redirect target
    /// - `STOREFRONT_USER_AGENT`: user agent reported to the login flow
    pub fn from_env() -> Result<Self, OrderError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("STOREFRONT"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| OrderError::Config(e.to_string()))
    }
}
