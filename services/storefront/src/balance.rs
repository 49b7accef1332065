//! Balance gateway over the spreadsheet-backed points ledger
//!
//! The ledger is read with a plain GET returning `{ok: true, data: [row]}`
//! and debited with a POST of a `spend` action to the same endpoint. Rows
//! come from a spreadsheet whose headers have several legacy spellings, so
//! both the nickname and the points column are looked up through aliases.

use std::future::Future;

use chrono::Utc;
use common::error::{StorefrontError, StorefrontResult};
use common::format::{leading_integer, nick_from_cell, normalize_nick, parse_points, truncate_chars};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Accepted spellings of the nickname column, in lookup order
pub const NICK_KEYS: [&str; 6] = ["Никнейм", "никнейм", "Nick", "nick", "Ник", "ник"];

/// Accepted spellings of the points column, in lookup order
pub const POINTS_KEYS: [&str; 6] = [
    "Итоговые баллы",
    "итоговые баллы",
    "Баллы",
    "баллы",
    "Points",
    "points",
];

const MAX_ITEM_CHARS: usize = 200;
const MAX_COMMENT_CHARS: usize = 500;
const MAX_RAW_CHARS: usize = 200;

/// One ledger row as delivered by the backend
pub type LedgerRow = Map<String, Value>;

/// Ledger row matched by nickname
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    /// Nickname as written in the ledger
    pub nick: String,
    /// Raw points cell
    pub points: Option<Value>,
    /// Parsed points, `NaN` when the cell is not numeric
    pub points_num: f64,
}

impl LedgerEntry {
    /// Balance used for spending decisions: rounded points, or 0
    pub fn balance(&self) -> i64 {
        if self.points_num.is_finite() {
            self.points_num.round() as i64
        } else {
            0
        }
    }

    /// Balance shown to the viewer, salvaging a leading integer from the raw cell
    pub fn display_points(&self) -> i64 {
        if self.points_num.is_finite() {
            return self.points_num.round() as i64;
        }
        let raw = match &self.points {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "0".to_string(),
            Some(other) => other.to_string(),
        };
        leading_integer(&raw).unwrap_or(0)
    }
}

/// Why a lookup found nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMiss {
    /// The query normalized to an empty nickname; no request was made
    Empty,
    /// No row matched
    NotFound,
}

/// Result of a nickname lookup
#[derive(Debug, Clone, PartialEq)]
pub enum BalanceLookup {
    Found(LedgerEntry),
    Missing(LookupMiss),
}

/// Deduction request body
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpendRequest {
    pub action: &'static str,
    pub token: String,
    pub nick: String,
    pub amount: u64,
    pub item: String,
    pub comment: String,
    /// Client timestamp, epoch milliseconds
    pub at: i64,
}

/// Local rejection of a deduction, or an unreadable reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpendRejection {
    NoNick,
    BadAmount,
    BadJson { raw: String },
}

impl SpendRejection {
    /// Wire reason tag
    pub fn reason(&self) -> &'static str {
        match self {
            SpendRejection::NoNick => "nonick",
            SpendRejection::BadAmount => "badamount",
            SpendRejection::BadJson { .. } => "badjson",
        }
    }
}

/// Outcome of a deduction
#[derive(Debug, Clone, PartialEq)]
pub enum SpendOutcome {
    /// Backend reply with a truthy `ok`
    Applied(Value),
    /// Backend reply without a truthy `ok`
    Declined(Value),
    /// Rejected before or after the request
    Rejected(SpendRejection),
}

impl SpendOutcome {
    /// Whether the deduction was acknowledged
    pub fn is_ok(&self) -> bool {
        matches!(self, SpendOutcome::Applied(_))
    }
}

/// Transport to the ledger endpoint
pub trait LedgerBackend: Send + Sync {
    /// Retrieve every ledger row
    fn fetch_ledger(&self) -> impl Future<Output = StorefrontResult<Vec<LedgerRow>>> + Send;

    /// Post a deduction and return the raw reply body
    fn post_spend(
        &self,
        request: &SpendRequest,
    ) -> impl Future<Output = StorefrontResult<String>> + Send;
}

/// Validate the ledger envelope and extract its rows
///
/// Non-object rows are skipped.
pub fn parse_ledger(body: Value) -> StorefrontResult<Vec<LedgerRow>> {
    let Value::Object(mut envelope) = body else {
        return Err(StorefrontError::Backend("Bad API payload".to_string()));
    };
    if envelope.get("ok") != Some(&Value::Bool(true)) {
        return Err(StorefrontError::Backend("Bad API payload".to_string()));
    }
    let Some(Value::Array(rows)) = envelope.remove("data") else {
        return Err(StorefrontError::Backend("Bad API payload".to_string()));
    };

    Ok(rows
        .into_iter()
        .filter_map(|row| match row {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect())
}

fn first_present<'a>(row: &'a LedgerRow, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| row.get(*key))
}

/// First row whose normalized nickname equals `needle` (already normalized)
pub fn find_in_rows(rows: &[LedgerRow], needle: &str) -> Option<LedgerEntry> {
    rows.iter().find_map(|row| {
        let nick_cell = first_present(row, &NICK_KEYS);
        let row_nick = nick_from_cell(nick_cell);
        if row_nick.is_empty() || row_nick != needle {
            return None;
        }

        let points = first_present(row, &POINTS_KEYS).cloned();
        Some(LedgerEntry {
            nick: nick_cell
                .and_then(Value::as_str)
                .unwrap_or(needle)
                .to_string(),
            points_num: parse_points(points.as_ref()),
            points,
        })
    })
}

/// Balance gateway
#[derive(Clone)]
pub struct BalanceGateway<B> {
    backend: B,
    spend_token: String,
}

impl<B: LedgerBackend> BalanceGateway<B> {
    /// Create a new balance gateway
    pub fn new(backend: B, spend_token: impl Into<String>) -> Self {
        Self {
            backend,
            spend_token: spend_token.into(),
        }
    }

    /// Backend behind this gateway
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Retrieve every ledger row
    pub async fn fetch_ledger(&self) -> StorefrontResult<Vec<LedgerRow>> {
        self.backend.fetch_ledger().await
    }

    /// Look up a viewer's row by case- and whitespace-insensitive nickname
    pub async fn find_by_nick(&self, nick: &str) -> StorefrontResult<BalanceLookup> {
        let needle = normalize_nick(nick);
        if needle.is_empty() {
            return Ok(BalanceLookup::Missing(LookupMiss::Empty));
        }

        let rows = self.backend.fetch_ledger().await?;
        debug!("Scanning {} ledger rows for {}", rows.len(), needle);

        Ok(match find_in_rows(&rows, &needle) {
            Some(entry) => BalanceLookup::Found(entry),
            None => BalanceLookup::Missing(LookupMiss::NotFound),
        })
    }

    /// Deduct `amount` points from `nick`
    pub async fn spend(
        &self,
        nick: &str,
        amount: u64,
        item: &str,
        comment: &str,
    ) -> StorefrontResult<SpendOutcome> {
        let nick = nick.trim();
        if nick.is_empty() {
            return Ok(SpendOutcome::Rejected(SpendRejection::NoNick));
        }
        if amount == 0 {
            return Ok(SpendOutcome::Rejected(SpendRejection::BadAmount));
        }

        let request = SpendRequest {
            action: "spend",
            token: self.spend_token.clone(),
            nick: nick.to_string(),
            amount,
            item: truncate_chars(item, MAX_ITEM_CHARS),
            comment: truncate_chars(comment, MAX_COMMENT_CHARS),
            at: Utc::now().timestamp_millis(),
        };

        info!("Deducting {} points from {}", amount, nick);
        let raw = self.backend.post_spend(&request).await?;

        Ok(match serde_json::from_str::<Value>(&raw) {
            Ok(reply) if reply.get("ok").is_some_and(common::format::is_truthy) => {
                SpendOutcome::Applied(reply)
            }
            Ok(reply) => {
                warn!("Deduction declined: {}", reply);
                SpendOutcome::Declined(reply)
            }
            Err(_) => {
                warn!("Deduction reply is not JSON");
                SpendOutcome::Rejected(SpendRejection::BadJson {
                    raw: truncate_chars(&raw, MAX_RAW_CHARS),
                })
            }
        })
    }
}

/// HTTP transport to the ledger web app
#[derive(Clone)]
pub struct HttpLedger {
    http: reqwest::Client,
    url: String,
}

impl HttpLedger {
    /// Create a new HTTP ledger transport
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

impl LedgerBackend for HttpLedger {
    async fn fetch_ledger(&self) -> StorefrontResult<Vec<LedgerRow>> {
        info!("Fetching points ledger");

        let response = self
            .http
            .get(&self.url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(StorefrontError::backend)?;

        if !response.status().is_success() {
            return Err(StorefrontError::Backend(format!(
                "API request failed: {}",
                response.status()
            )));
        }

        let body: Value = response.json().await.map_err(StorefrontError::backend)?;
        parse_ledger(body)
    }

    async fn post_spend(&self, request: &SpendRequest) -> StorefrontResult<String> {
        let body = serde_json::to_string(request).map_err(StorefrontError::backend)?;
        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(StorefrontError::backend)?;

        response.text().await.map_err(StorefrontError::backend)
    }
}
