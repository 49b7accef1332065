//! Order workflow orchestrator
//!
//! Sequences one order attempt: identity check, selection check, balance
//! check, relay, deduction and balance refresh. Each step gates the next and
//! every stage change is published on a watch channel, as is every change
//! of the balance panel.
//!
//! The balance check and the deduction are two independent requests against
//! a ledger without compare-and-swap, so two concurrent redemptions by the
//! same viewer can overspend. A deduction failure after a successful relay
//! leaves the order relayed with no points removed. Both are known
//! limitations of the backend and are not corrected here.

use auth::Session;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::balance::{BalanceGateway, BalanceLookup, LedgerBackend, SpendOutcome};
use crate::balance_panel::{BalanceView, load_balance};
use crate::catalog::Selection;
use crate::config::StorefrontConfig;
use crate::error::OrderError;
use crate::relay::{RelayBackend, RelayGateway, RelayOutcome};

/// Step of an order in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStep {
    Preparing,
    CheckingBalance,
    SendingOrder,
    DeductingPoints,
}

impl ProcessingStep {
    /// Progress line
    pub fn text(&self) -> &'static str {
        match self {
            ProcessingStep::Preparing => "⏳ Processing the order…",
            ProcessingStep::CheckingBalance => "💰 Checking the balance…",
            ProcessingStep::SendingOrder => "📨 Sending to the streamer…",
            ProcessingStep::DeductingPoints => "💰 Deducting points…",
        }
    }
}

/// Stage of the order form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStage {
    Form,
    Processing(ProcessingStep),
    Success,
    Error { title: String, text: String },
}

/// Follow-up action offered with a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeAction {
    Login,
}

/// Blocking warning shown over the form when a precondition is missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderNotice {
    pub title: &'static str,
    pub text: &'static str,
    pub action: Option<NoticeAction>,
}

impl OrderNotice {
    fn login_required() -> Self {
        Self {
            title: "Sign in with Twitch first",
            text: "To place an order, sign in with Twitch in the balance panel.",
            action: Some(NoticeAction::Login),
        }
    }

    fn selection_required() -> Self {
        Self {
            title: "Pick a reward",
            text: "Choose a reward from the catalog first.",
            action: None,
        }
    }
}

/// Order workflow orchestrator
pub struct OrderWorkflow<L, R> {
    ledger: BalanceGateway<L>,
    relay: RelayGateway<R>,
    spend_enabled: bool,
    operator_contact: String,
    selection: Option<Selection>,
    comment: String,
    notice: Option<OrderNotice>,
    balance: watch::Sender<BalanceView>,
    stage: watch::Sender<OrderStage>,
}

impl<L: LedgerBackend, R: RelayBackend> OrderWorkflow<L, R> {
    /// Create a new workflow in the `Form` stage
    pub fn new(ledger: BalanceGateway<L>, relay: RelayGateway<R>, config: &StorefrontConfig) -> Self {
        let (stage, _) = watch::channel(OrderStage::Form);
        let (balance, _) = watch::channel(BalanceView::SignedOut);
        Self {
            ledger,
            relay,
            spend_enabled: config.spend_enabled,
            operator_contact: config.operator_contact.clone(),
            selection: None,
            comment: String::new(),
            notice: None,
            balance,
            stage,
        }
    }

    /// Watch every stage change
    pub fn subscribe(&self) -> watch::Receiver<OrderStage> {
        self.stage.subscribe()
    }

    /// Watch every balance panel change
    pub fn subscribe_balance(&self) -> watch::Receiver<BalanceView> {
        self.balance.subscribe()
    }

    /// Current stage
    pub fn stage(&self) -> OrderStage {
        self.stage.borrow().clone()
    }

    /// Current selection
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Replace the selection
    pub fn select(&mut self, selection: Selection) {
        info!("Selected {}", selection.title);
        self.selection = Some(selection);
    }

    /// Order comment as typed
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Replace the order comment
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    /// Pending precondition warning
    pub fn notice(&self) -> Option<&OrderNotice> {
        self.notice.as_ref()
    }

    /// Balance panel contents
    pub fn balance(&self) -> BalanceView {
        self.balance.borrow().clone()
    }

    /// Balance gateway
    pub fn ledger(&self) -> &BalanceGateway<L> {
        &self.ledger
    }

    /// Relay gateway
    pub fn relay(&self) -> &RelayGateway<R> {
        &self.relay
    }

    /// Back to an empty form from any stage
    pub fn reset(&mut self) {
        self.notice = None;
        self.comment.clear();
        self.selection = None;
        self.set_stage(OrderStage::Form);
    }

    /// Reload the balance panel for `session`
    ///
    /// Watchers see `Loading` while the ledger is being read.
    pub async fn refresh_balance(&self, session: Option<&Session>) -> BalanceView {
        if session.is_some() {
            self.balance.send_replace(BalanceView::Loading);
        }
        let view = load_balance(&self.ledger, session).await;
        self.balance.send_replace(view.clone());
        view
    }

    /// Place an order for the current selection
    ///
    /// Always settles in a terminal stage: `Form` with a notice when a
    /// precondition is missing, otherwise `Success` or `Error`.
    pub async fn place_order(&mut self, session: Option<&Session>) -> OrderStage {
        self.notice = None;

        let Some(session) = session else {
            self.notice = Some(OrderNotice::login_required());
            self.set_stage(OrderStage::Form);
            return OrderStage::Form;
        };
        let Some(selection) = self.selection.clone() else {
            self.notice = Some(OrderNotice::selection_required());
            self.set_stage(OrderStage::Form);
            return OrderStage::Form;
        };

        self.set_stage(OrderStage::Processing(ProcessingStep::Preparing));
        let comment = self.comment.trim().to_string();

        let stage = match self.run_order(session, &selection, &comment).await {
            Ok(()) => {
                info!("Order placed by {}: {}", session.login(), selection.item_text);
                self.selection = None;
                self.comment.clear();
                OrderStage::Success
            }
            Err(e) => {
                error!("Order by {} failed: {}", session.login(), e);
                OrderStage::Error {
                    title: e.title().to_string(),
                    text: e.text(&self.operator_contact),
                }
            }
        };

        self.set_stage(stage.clone());
        stage
    }

    async fn run_order(
        &mut self,
        session: &Session,
        selection: &Selection,
        comment: &str,
    ) -> Result<(), OrderError> {
        let price = selection.price.filter(|p| *p > 0);
        let spend = price.filter(|_| self.spend_enabled);

        self.set_stage(OrderStage::Processing(ProcessingStep::CheckingBalance));
        if let Some(required) = spend {
            let entry = match self.ledger.find_by_nick(session.login()).await? {
                BalanceLookup::Found(entry) => entry,
                BalanceLookup::Missing(_) => return Err(OrderError::NotInLedger),
            };

            let available = entry.balance();
            if available < required as i64 {
                return Err(OrderError::Insufficient {
                    required,
                    available,
                });
            }
        }

        self.set_stage(OrderStage::Processing(ProcessingStep::SendingOrder));
        let price_text = price.map_or_else(|| "—".to_string(), |p| format!("{p} 🪙"));
        let outcome = self
            .relay
            .relay(session.label(), &selection.item_text, &price_text, comment)
            .await;
        if let RelayOutcome::Failed { error, .. } = outcome {
            return Err(OrderError::RelayFailed(error));
        }

        if let Some(amount) = spend {
            self.set_stage(OrderStage::Processing(ProcessingStep::DeductingPoints));
            let outcome = self
                .ledger
                .spend(session.login(), amount, &selection.item_text, comment)
                .await?;

            match outcome {
                SpendOutcome::Applied(_) => {
                    self.refresh_balance(Some(session)).await;
                }
                SpendOutcome::Declined(reply) => {
                    warn!("Order relayed but the deduction was declined: {}", reply);
                }
                SpendOutcome::Rejected(rejection) => {
                    warn!(
                        "Order relayed but the deduction was rejected: {}",
                        rejection.reason()
                    );
                }
            }
        }

        Ok(())
    }

    fn set_stage(&self, stage: OrderStage) {
        self.stage.send_replace(stage);
    }
}
