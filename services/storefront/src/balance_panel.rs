//! Balance panel shown next to the catalog

use auth::Session;
use tracing::warn;

use crate::balance::{BalanceGateway, BalanceLookup, LedgerBackend};

/// What the balance panel currently displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceView {
    SignedOut,
    Loading,
    Known { label: String, points: i64 },
    Empty { label: String },
    Unavailable,
}

impl BalanceView {
    /// Main line of the panel
    pub fn text(&self) -> String {
        match self {
            BalanceView::SignedOut => "—".to_string(),
            BalanceView::Loading => "Loading…".to_string(),
            BalanceView::Known { label, points } => format!("{label} — {points} 🪙"),
            BalanceView::Empty { label } => format!("{label} — 0 🪙 😢"),
            BalanceView::Unavailable => "Failed to load.".to_string(),
        }
    }

    /// Secondary line of the panel
    pub fn hint(&self) -> &'static str {
        match self {
            BalanceView::SignedOut => "Sign in with Twitch to see your balance.",
            BalanceView::Loading => "Fetching data from the points ledger.",
            BalanceView::Known { .. } => {
                "If the points look off, check that the ledger has been updated."
            }
            BalanceView::Empty { .. } => "You have 0 points 😢",
            BalanceView::Unavailable => "Check that the ledger web app is shared with everyone.",
        }
    }
}

/// Look up the session's balance and render it
pub async fn load_balance<B: LedgerBackend>(
    gateway: &BalanceGateway<B>,
    session: Option<&Session>,
) -> BalanceView {
    let Some(session) = session else {
        return BalanceView::SignedOut;
    };
    let label = session.label().to_string();

    match gateway.find_by_nick(session.login()).await {
        Ok(BalanceLookup::Found(entry)) => BalanceView::Known {
            label,
            points: entry.display_points(),
        },
        Ok(BalanceLookup::Missing(_)) => BalanceView::Empty { label },
        Err(e) => {
            warn!("Balance refresh failed: {}", e);
            BalanceView::Unavailable
        }
    }
}
