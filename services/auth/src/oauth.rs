//! OAuth2 implicit-flow integration for the streaming platform
//!
//! Builds authorization requests that return a bearer token directly in the
//! redirect fragment, captures that token on the way back, and classifies
//! user agents whose in-app browsers break the redirect.

use std::sync::OnceLock;

use oauth2::{AuthUrl, ClientId, CsrfToken, RedirectUrl, Scope, basic::BasicClient};
use regex::Regex;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::models::ImplicitToken;

/// Authorization redirect prepared for one login attempt
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization endpoint URL with all query parameters
    pub url: String,
    /// Fresh per-attempt state token
    pub state: String,
    /// Android intent URL opening the authorization page in an external browser
    pub intent_url: Option<String>,
}

/// Outcome of starting a login
#[derive(Debug, Clone)]
pub enum LoginStart {
    /// Navigate to the authorization endpoint
    Redirect(AuthorizationRequest),
    /// The in-app browser is known to break the redirect; offer the page
    /// address for manual opening elsewhere instead
    InAppWarning { page_url: String },
}

/// User agent classification relevant to the login redirect
#[derive(Debug, Clone, Copy)]
pub struct UserAgent<'a>(pub &'a str);

impl UserAgent<'_> {
    /// Telegram, Instagram or Facebook in-app browser
    pub fn is_problem_in_app(&self) -> bool {
        static IN_APP_REGEX: OnceLock<Regex> = OnceLock::new();
        IN_APP_REGEX
            .get_or_init(|| {
                Regex::new(r"(?i)telegram|instagram|fbav|fban")
                    .expect("Failed to compile in-app regex")
            })
            .is_match(self.0)
    }

    /// Telegram in-app browser
    pub fn is_telegram(&self) -> bool {
        static TELEGRAM_REGEX: OnceLock<Regex> = OnceLock::new();
        TELEGRAM_REGEX
            .get_or_init(|| Regex::new(r"(?i)telegram").expect("Failed to compile telegram regex"))
            .is_match(self.0)
    }

    /// Any Android browser
    pub fn is_android(&self) -> bool {
        static ANDROID_REGEX: OnceLock<Regex> = OnceLock::new();
        ANDROID_REGEX
            .get_or_init(|| Regex::new(r"(?i)android").expect("Failed to compile android regex"))
            .is_match(self.0)
    }
}

/// Implicit-flow OAuth2 client
#[derive(Clone)]
pub struct ImplicitFlowClient {
    client_id: String,
    auth_url: AuthUrl,
    scopes: Vec<String>,
}

impl ImplicitFlowClient {
    /// Create a new implicit-flow client
    pub fn new(config: &AuthConfig) -> AuthResult<Self> {
        let auth_url = AuthUrl::new(config.authorize_url.clone())
            .map_err(|e| AuthError::InvalidUrl(format!("authorize_url: {e}")))?;

        Ok(Self {
            client_id: config.twitch_client_id.clone(),
            auth_url,
            scopes: config.scope_list(),
        })
    }

    /// Start a login from the page at `location`
    pub fn begin_login(&self, location: &Url, user_agent: UserAgent<'_>) -> AuthResult<LoginStart> {
        if user_agent.is_telegram() {
            info!("Telegram in-app browser detected, offering link copy instead of redirect");
            return Ok(LoginStart::InAppWarning {
                page_url: location.to_string(),
            });
        }

        let mut request = self.authorization_request(&redirect_target(location))?;
        if user_agent.is_android() {
            request.intent_url = Some(android_intent_url(&request.url)?);
        }

        Ok(LoginStart::Redirect(request))
    }

    /// Generate the authorization URL for the implicit flow
    pub fn authorization_request(&self, redirect_uri: &str) -> AuthResult<AuthorizationRequest> {
        let redirect = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| AuthError::InvalidUrl(format!("redirect_uri: {e}")))?;
        let client = BasicClient::new(
            ClientId::new(self.client_id.clone()),
            None,
            self.auth_url.clone(),
            None,
        )
        .set_redirect_uri(redirect);

        let state = format!("implicit_{}", Uuid::new_v4().simple());
        let mut request = client
            .authorize_url(|| CsrfToken::new(state))
            .use_implicit_flow();

        if self.scopes.is_empty() {
            request = request.add_extra_param("scope", "");
        } else {
            for scope in &self.scopes {
                request = request.add_scope(Scope::new(scope.clone()));
            }
        }

        let (url, csrf_token) = request.url();
        info!("Prepared implicit-flow authorization request");

        Ok(AuthorizationRequest {
            url: url.to_string(),
            state: csrf_token.secret().clone(),
            intent_url: None,
        })
    }
}

/// Redirect target for the current page: origin plus path
pub fn redirect_target(location: &Url) -> String {
    let mut target = location.clone();
    target.set_query(None);
    target.set_fragment(None);
    target.to_string()
}

/// Parse an implicit-flow token out of a navigation fragment
///
/// Returns `None` unless the fragment carries a non-empty `access_token`.
pub fn parse_implicit_fragment(fragment: &str) -> Option<ImplicitToken> {
    if !fragment.contains("access_token=") {
        return None;
    }

    let mut access_token = None;
    let mut expires_in = None;
    for (key, value) in url::form_urlencoded::parse(fragment.trim_start_matches('#').as_bytes()) {
        match key.as_ref() {
            "access_token" if access_token.is_none() => access_token = Some(value.into_owned()),
            "expires_in" if expires_in.is_none() => expires_in = value.trim().parse().ok(),
            _ => {}
        }
    }

    access_token
        .filter(|token| !token.is_empty())
        .map(|access_token| ImplicitToken {
            access_token,
            expires_in,
        })
}

/// Capture an implicit-flow token from `location` and strip the fragment
///
/// The fragment is removed only when it carried a token, so the credential
/// does not leak through copy, share or back-navigation.
pub fn take_implicit_token(location: &mut Url) -> Option<ImplicitToken> {
    let token = parse_implicit_fragment(location.fragment()?)?;
    location.set_fragment(None);
    Some(token)
}

fn android_intent_url(auth_url: &str) -> AuthResult<String> {
    let parsed = Url::parse(auth_url).map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| AuthError::InvalidUrl(format!("{auth_url} has no host")))?;
    let query = parsed.query().unwrap_or_default();
    let fallback: String = url::form_urlencoded::byte_serialize(auth_url.as_bytes()).collect();

    Ok(format!(
        "intent://{host}{path}?{query}#Intent;scheme=https;action=android.intent.action.VIEW;S.browser_fallback_url={fallback};end;;",
        path = parsed.path(),
    ))
}
