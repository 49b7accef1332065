//! Identity service for the points storefront
//!
//! Captures implicit-flow tokens, exchanges them for the viewer's profile,
//! and keeps the resulting session in one of two storage scopes.

pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod oauth;
pub mod profile;
pub mod session;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use identity::{IdentityManager, IdentityState};
pub use models::{ImplicitToken, Session};
pub use oauth::{AuthorizationRequest, ImplicitFlowClient, LoginStart, UserAgent};
pub use profile::{HelixClient, ProfileProvider, ViewerProfile};
pub use session::SessionStore;
