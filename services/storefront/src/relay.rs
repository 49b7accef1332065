//! Order relay gateway
//!
//! Forwards an order summary to the operator's notification bot. Relaying
//! never fails with an error: every problem comes back as
//! [`RelayOutcome::Failed`].

use std::future::Future;

use common::error::{StorefrontError, StorefrontResult};
use common::format::is_truthy;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

const MISSING_TEXT: &str = "not specified";
const MISSING_PRICE: &str = "—";
const MISSING_COMMENT: &str = "none";

/// Flat order notification
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RelayRequest {
    pub nick: String,
    pub item: String,
    pub price: String,
    pub comment: String,
}

impl RelayRequest {
    /// Build a notification, substituting placeholders for empty fields
    ///
    /// Only empty strings are replaced; callers trim beforehand.
    pub fn new(nick: &str, item: &str, price: &str, comment: &str) -> Self {
        fn or_placeholder(value: &str, placeholder: &str) -> String {
            if value.is_empty() {
                placeholder.to_string()
            } else {
                value.to_string()
            }
        }

        Self {
            nick: or_placeholder(nick, MISSING_TEXT),
            item: or_placeholder(item, MISSING_TEXT),
            price: or_placeholder(price, MISSING_PRICE),
            comment: or_placeholder(comment, MISSING_COMMENT),
        }
    }
}

/// Outcome of relaying an order
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    /// The endpoint acknowledged with a truthy `ok`
    Delivered(Value),
    /// Transport failure, unreadable reply or missing acknowledgement
    Failed { error: String, raw: Option<String> },
}

impl RelayOutcome {
    /// Whether the order reached the operator
    pub fn is_ok(&self) -> bool {
        matches!(self, RelayOutcome::Delivered(_))
    }
}

/// Transport to the operator notification endpoint
pub trait RelayBackend: Send + Sync {
    /// Post a notification and return the raw reply body
    fn post_order(
        &self,
        request: &RelayRequest,
    ) -> impl Future<Output = StorefrontResult<String>> + Send;
}

/// Order relay gateway
#[derive(Clone)]
pub struct RelayGateway<B> {
    backend: B,
}

impl<B: RelayBackend> RelayGateway<B> {
    /// Create a new relay gateway
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Backend behind this gateway
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Relay an order to the operator
    pub async fn relay(&self, nick: &str, item: &str, price: &str, comment: &str) -> RelayOutcome {
        let request = RelayRequest::new(nick, item, price, comment);
        info!("Relaying order for {}: {}", request.nick, request.item);

        let raw = match self.backend.post_order(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Order relay failed: {}", e);
                return RelayOutcome::Failed {
                    error: e.to_string(),
                    raw: None,
                };
            }
        };

        let outcome = interpret_reply(raw);
        if let RelayOutcome::Failed { error, .. } = &outcome {
            error!("Order relay not acknowledged: {}", error);
        }
        outcome
    }
}

fn interpret_reply(raw: String) -> RelayOutcome {
    let reply: Value = match serde_json::from_str(&raw) {
        Ok(reply) => reply,
        Err(_) => {
            return RelayOutcome::Failed {
                error: "Invalid server response format".to_string(),
                raw: Some(raw),
            };
        }
    };

    if reply.get("ok").is_some_and(is_truthy) {
        return RelayOutcome::Delivered(reply);
    }

    let error = reply
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("order was not acknowledged")
        .to_string();
    RelayOutcome::Failed {
        error,
        raw: Some(raw),
    }
}

/// HTTP transport to the operator bot web app
#[derive(Clone)]
pub struct HttpRelay {
    http: reqwest::Client,
    url: String,
}

impl HttpRelay {
    /// Create a new HTTP relay transport
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Use a custom HTTP client
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }
}

impl RelayBackend for HttpRelay {
    async fn post_order(&self, request: &RelayRequest) -> StorefrontResult<String> {
        let body = serde_json::to_string(request).map_err(StorefrontError::backend)?;
        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await
            .map_err(|e| StorefrontError::Relay(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| StorefrontError::Relay(e.to_string()))
    }
}
