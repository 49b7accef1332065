//! Identity session state machine
//!
//! `IdentityManager` is the single owner of the viewer's session. Every
//! change to it goes through one of the named triggers below: page load,
//! display-name refresh, remember toggle and logout.

use chrono::Utc;
use tracing::{error, info, warn};
use url::Url;

use crate::error::AuthResult;
use crate::models::{ImplicitToken, Session};
use crate::oauth::{ImplicitFlowClient, LoginStart, UserAgent, take_implicit_token};
use crate::profile::ProfileProvider;
use crate::session::SessionStore;

/// Where the identity handshake currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityState {
    Anonymous,
    RestoringSession,
    ExchangingToken,
    Authenticated(Session),
    ExchangeFailed(String),
}

/// Identity session manager
pub struct IdentityManager<P> {
    provider: P,
    store: SessionStore,
    oauth: ImplicitFlowClient,
    state: IdentityState,
}

impl<P: ProfileProvider> IdentityManager<P> {
    /// Create a new identity manager in the `Anonymous` state
    pub fn new(provider: P, store: SessionStore, oauth: ImplicitFlowClient) -> Self {
        Self {
            provider,
            store,
            oauth,
            state: IdentityState::Anonymous,
        }
    }

    /// Current state
    pub fn state(&self) -> &IdentityState {
        &self.state
    }

    /// Authenticated session, if any
    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            IdentityState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// Whether sessions are persisted durably
    pub fn remember(&self) -> bool {
        self.store.remember()
    }

    /// Session store backing this manager
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Page-load trigger
    ///
    /// A token in the fragment is captured (and stripped from `location`)
    /// and exchanged for a profile. Without one, a persisted session is
    /// restored.
    pub async fn initialize(&mut self, location: &mut Url) -> &IdentityState {
        match take_implicit_token(location) {
            Some(token) => self.exchange(token).await,
            None => self.restore(),
        }
        &self.state
    }

    async fn exchange(&mut self, token: ImplicitToken) {
        self.state = IdentityState::ExchangingToken;
        info!("Exchanging implicit-flow token for a profile");

        let reason = match self.provider.fetch_profile(&token.access_token).await {
            Ok(Some(profile)) => {
                match Session::from_implicit(&profile.login, &profile.display_name, &token, Utc::now())
                {
                    Ok(session) => {
                        if let Err(e) = self.store.persist(&session) {
                            warn!("Failed to persist session: {}", e);
                        }
                        info!("Signed in as {}", session.login());
                        self.state = IdentityState::Authenticated(session);
                        return;
                    }
                    Err(e) => e.to_string(),
                }
            }
            Ok(None) => "No login".to_string(),
            Err(e) => e.to_string(),
        };

        error!("Identity exchange failed: {}", reason);
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear session after exchange failure: {}", e);
        }
        self.state = IdentityState::ExchangeFailed(reason);
    }

    fn restore(&mut self) {
        self.state = IdentityState::RestoringSession;
        self.state = match self.store.restore() {
            Some(session) => IdentityState::Authenticated(session),
            None => IdentityState::Anonymous,
        };
    }

    /// Whether a restored session lacks a display name worth re-fetching
    pub fn needs_display_name(&self) -> bool {
        self.session()
            .is_some_and(|s| s.display_name.is_empty() && !s.access_token.is_empty())
    }

    /// Re-fetch a missing display name; failures are logged and ignored
    ///
    /// Returns whether the session was updated.
    pub async fn refresh_display_name(&mut self) -> bool {
        if !self.needs_display_name() {
            return false;
        }
        let Some(token) = self.session().map(|s| s.access_token.clone()) else {
            return false;
        };

        let profile = match self.provider.fetch_profile(&token).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return false,
            Err(e) => {
                warn!("Display name refresh failed: {}", e);
                return false;
            }
        };

        let IdentityState::Authenticated(session) = &mut self.state else {
            return false;
        };
        session.display_name = profile.display_name;
        if let Err(e) = self.store.persist(session) {
            warn!("Failed to persist refreshed session: {}", e);
        }
        true
    }

    /// Toggle the remember preference, migrating a stored session
    pub fn set_remember(&mut self, remember: bool) -> AuthResult<()> {
        let current = match &self.state {
            IdentityState::Authenticated(session) => Some(session),
            _ => None,
        };
        self.store.set_remember(remember, current)
    }

    /// Start a login from the page at `location`
    pub fn begin_login(&self, location: &Url, user_agent: &str) -> AuthResult<LoginStart> {
        self.oauth.begin_login(location, UserAgent(user_agent))
    }

    /// Logout trigger; valid from any state
    pub fn logout(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear stored session on logout: {}", e);
        }
        self.state = IdentityState::Anonymous;
        info!("Signed out");
    }
}
