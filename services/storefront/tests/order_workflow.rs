//! Integration tests for the order workflow
//!
//! Both backends are in-memory fakes that count their calls, so each test can
//! assert which network steps an order attempt actually reached.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use auth::{ImplicitToken, Session};
use chrono::Utc;
use common::error::{StorefrontError, StorefrontResult};
use serde_json::{Value, json};
use storefront::balance::{
    BalanceLookup, LedgerRow, LookupMiss, SpendOutcome, SpendRejection, SpendRequest, parse_ledger,
};
use storefront::relay::RelayRequest;
use storefront::workflow::NoticeAction;
use storefront::{
    BalanceGateway, BalanceView, LedgerBackend, OrderStage, OrderWorkflow, RelayBackend,
    RelayGateway, StorefrontConfig, catalog,
};

struct FakeLedger {
    body: Option<Value>,
    fetches: AtomicUsize,
    spends: Mutex<Vec<SpendRequest>>,
    spend_reply: String,
}

impl FakeLedger {
    fn with_rows(rows: Value) -> Self {
        Self {
            body: Some(json!({ "ok": true, "data": rows })),
            fetches: AtomicUsize::new(0),
            spends: Mutex::new(Vec::new()),
            spend_reply: r#"{"ok":true,"left":0}"#.to_string(),
        }
    }

    fn unreachable() -> Self {
        Self {
            body: None,
            fetches: AtomicUsize::new(0),
            spends: Mutex::new(Vec::new()),
            spend_reply: String::new(),
        }
    }

    fn answering_spend(mut self, reply: impl Into<String>) -> Self {
        self.spend_reply = reply.into();
        self
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn spends(&self) -> Vec<SpendRequest> {
        self.spends.lock().expect("spends lock").clone()
    }
}

impl LedgerBackend for FakeLedger {
    async fn fetch_ledger(&self) -> StorefrontResult<Vec<LedgerRow>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        match &self.body {
            Some(body) => parse_ledger(body.clone()),
            None => Err(StorefrontError::Backend("connection reset".into())),
        }
    }

    async fn post_spend(&self, request: &SpendRequest) -> StorefrontResult<String> {
        self.spends.lock().expect("spends lock").push(request.clone());
        Ok(self.spend_reply.clone())
    }
}

struct FakeRelay {
    reply: &'static str,
    orders: Mutex<Vec<RelayRequest>>,
}

impl FakeRelay {
    fn replying(reply: &'static str) -> Self {
        Self {
            reply,
            orders: Mutex::new(Vec::new()),
        }
    }

    fn orders(&self) -> Vec<RelayRequest> {
        self.orders.lock().expect("orders lock").clone()
    }
}

impl RelayBackend for FakeRelay {
    async fn post_order(&self, request: &RelayRequest) -> StorefrontResult<String> {
        self.orders.lock().expect("orders lock").push(request.clone());
        Ok(self.reply.to_string())
    }
}

fn session(login: &str, display_name: &str) -> Session {
    let token = ImplicitToken {
        access_token: "tok".to_string(),
        expires_in: Some(3600),
    };
    Session::from_implicit(login, display_name, &token, Utc::now()).expect("valid session")
}

fn workflow(ledger: FakeLedger, relay: FakeRelay) -> OrderWorkflow<FakeLedger, FakeRelay> {
    let config = StorefrontConfig::default();
    OrderWorkflow::new(
        BalanceGateway::new(ledger, "secret"),
        RelayGateway::new(relay),
        &config,
    )
}

fn error_parts(stage: &OrderStage) -> (&str, &str) {
    match stage {
        OrderStage::Error { title, text } => (title.as_str(), text.as_str()),
        other => panic!("expected error stage, got {other:?}"),
    }
}

#[tokio::test]
async fn test_exact_balance_places_order_and_deducts() {
    let mut flow = workflow(
        FakeLedger::with_rows(json!([{ "Nick": "Yammy", "Points": 750 }])),
        FakeRelay::replying(r#"{"ok":true}"#),
    );
    let viewer = session("Yammy", "Yammy");
    flow.select(catalog::select(1, 0).expect("movie option"));
    flow.set_comment("  Spirited Away  ");

    let stage = flow.place_order(Some(&viewer)).await;
    assert_eq!(stage, OrderStage::Success);
    assert_eq!(flow.stage(), OrderStage::Success);

    let orders = flow.relay().backend().orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].nick, "Yammy");
    assert_eq!(orders[0].price, "750 🪙");
    assert_eq!(orders[0].comment, "Spirited Away");
    assert!(orders[0].item.contains("Movie / Cartoon (750 🪙)"));

    let spends = flow.ledger().backend().spends();
    assert_eq!(spends.len(), 1);
    assert_eq!(spends[0].nick, "yammy");
    assert_eq!(spends[0].amount, 750);
    assert_eq!(spends[0].token, "secret");
    assert_eq!(spends[0].action, "spend");

    // balance check plus the refresh after deduction
    assert_eq!(flow.ledger().backend().fetches(), 2);
    assert!(matches!(flow.balance(), BalanceView::Known { points: 750, .. }));
    assert!(flow.selection().is_none());
    assert!(flow.comment().is_empty());
}

#[tokio::test]
async fn test_insufficient_balance_stops_before_relay() {
    let mut flow = workflow(
        FakeLedger::with_rows(json!([{ "nick": "yammy", "points": 500 }])),
        FakeRelay::replying(r#"{"ok":true}"#),
    );
    flow.select(catalog::select(1, 0).expect("movie option"));

    let stage = flow.place_order(Some(&session("yammy", ""))).await;
    let (title, text) = error_parts(&stage);
    assert_eq!(title, "Not enough points");
    assert!(text.contains("750"));
    assert!(text.contains("500"));

    assert!(flow.relay().backend().orders().is_empty());
    assert!(flow.ledger().backend().spends().is_empty());
    assert!(flow.selection().is_some());
}

#[tokio::test]
async fn test_viewer_missing_from_ledger() {
    let mut flow = workflow(
        FakeLedger::with_rows(json!([{ "Nick": "someone", "Points": 9000 }])),
        FakeRelay::replying(r#"{"ok":true}"#),
    );
    flow.select(catalog::select(0, 0).expect("memes option"));

    let stage = flow.place_order(Some(&session("yammy", "Yammy"))).await;
    assert_eq!(error_parts(&stage).0, "You have 0 points");
    assert!(flow.relay().backend().orders().is_empty());
}

#[tokio::test]
async fn test_padded_ledger_nick_matches_login() {
    let mut flow = workflow(
        FakeLedger::with_rows(json!([{ "Nick": "Foo ", "Points": "250" }])),
        FakeRelay::replying(r#"{"ok":true}"#),
    );
    flow.select(catalog::select(0, 0).expect("memes option"));

    let stage = flow.place_order(Some(&session("foo", "Foo"))).await;
    assert_eq!(stage, OrderStage::Success);
    assert_eq!(flow.ledger().backend().spends()[0].amount, 200);
}

#[tokio::test]
async fn test_negotiated_option_only_relays() {
    let mut flow = workflow(
        FakeLedger::with_rows(json!([])),
        FakeRelay::replying(r#"{"ok":true}"#),
    );
    flow.select(catalog::select(6, 0).expect("custom order"));

    let stage = flow.place_order(Some(&session("yammy", "Yammy"))).await;
    assert_eq!(stage, OrderStage::Success);

    let orders = flow.relay().backend().orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].price, "—");
    assert_eq!(orders[0].comment, "none");
    assert_eq!(flow.ledger().backend().fetches(), 0);
    assert!(flow.ledger().backend().spends().is_empty());
}

#[tokio::test]
async fn test_relay_failure_skips_deduction() {
    let mut flow = workflow(
        FakeLedger::with_rows(json!([{ "Nick": "yammy", "Points": 1000 }])),
        FakeRelay::replying(r#"{"ok":false,"error":"bot offline"}"#),
    );
    flow.select(catalog::select(0, 1).expect("memes option"));

    let stage = flow.place_order(Some(&session("yammy", "Yammy"))).await;
    let (title, text) = error_parts(&stage);
    assert_eq!(title, "Send failed");
    assert!(text.contains("@YammyTanuki"));

    assert_eq!(flow.relay().backend().orders().len(), 1);
    assert!(flow.ledger().backend().spends().is_empty());
}

#[tokio::test]
async fn test_unreachable_ledger_is_a_connection_error() {
    let mut flow = workflow(FakeLedger::unreachable(), FakeRelay::replying(r#"{"ok":true}"#));
    flow.select(catalog::select(3, 0).expect("game option"));

    let stage = flow.place_order(Some(&session("yammy", "Yammy"))).await;
    assert_eq!(error_parts(&stage).0, "Connection error");
    assert!(flow.relay().backend().orders().is_empty());
}

#[tokio::test]
async fn test_preconditions_raise_notices_without_network() {
    let mut flow = workflow(
        FakeLedger::with_rows(json!([])),
        FakeRelay::replying(r#"{"ok":true}"#),
    );

    flow.select(catalog::select(0, 0).expect("memes option"));
    assert_eq!(flow.place_order(None).await, OrderStage::Form);
    let notice = flow.notice().expect("login notice");
    assert_eq!(notice.action, Some(NoticeAction::Login));

    flow.reset();
    assert!(flow.notice().is_none());
    assert_eq!(
        flow.place_order(Some(&session("yammy", "Yammy"))).await,
        OrderStage::Form
    );
    assert!(flow.notice().is_some_and(|n| n.action.is_none()));

    assert_eq!(flow.ledger().backend().fetches(), 0);
    assert!(flow.relay().backend().orders().is_empty());
}

#[tokio::test]
async fn test_spending_disabled_skips_balance_steps() {
    let config = StorefrontConfig {
        spend_enabled: false,
        ..StorefrontConfig::default()
    };
    let mut flow = OrderWorkflow::new(
        BalanceGateway::new(FakeLedger::with_rows(json!([])), "secret"),
        RelayGateway::new(FakeRelay::replying(r#"{"ok":true}"#)),
        &config,
    );
    flow.select(catalog::select(4, 0).expect("marathon option"));

    let stage = flow.place_order(Some(&session("yammy", "Yammy"))).await;
    assert_eq!(stage, OrderStage::Success);
    assert_eq!(flow.relay().backend().orders()[0].price, "5000 🪙");
    assert_eq!(flow.ledger().backend().fetches(), 0);
    assert!(flow.ledger().backend().spends().is_empty());
}

#[tokio::test]
async fn test_stage_watchers_see_the_final_stage() {
    let mut flow = workflow(
        FakeLedger::with_rows(json!([{ "Nick": "yammy", "Points": 10 }])),
        FakeRelay::replying(r#"{"ok":true}"#),
    );
    let mut stages = flow.subscribe();
    flow.select(catalog::select(5, 0).expect("doodle option"));

    flow.place_order(Some(&session("yammy", "Yammy"))).await;
    assert!(stages.has_changed().expect("sender alive"));
    assert!(matches!(*stages.borrow_and_update(), OrderStage::Error { .. }));

    flow.reset();
    assert_eq!(*stages.borrow_and_update(), OrderStage::Form);
}

#[tokio::test]
async fn test_declined_deduction_still_completes_the_order() {
    let mut flow = workflow(
        FakeLedger::with_rows(json!([{ "Nick": "yammy", "Points": 1000 }]))
            .answering_spend(r#"{"ok":false,"error":"bad token"}"#),
        FakeRelay::replying(r#"{"ok":true}"#),
    );
    flow.select(catalog::select(0, 0).expect("memes option"));

    let stage = flow.place_order(Some(&session("yammy", "Yammy"))).await;
    assert_eq!(stage, OrderStage::Success);
    assert_eq!(flow.relay().backend().orders().len(), 1);
    assert_eq!(flow.ledger().backend().spends().len(), 1);

    // only the balance check; no refresh after a declined deduction
    assert_eq!(flow.ledger().backend().fetches(), 1);
    assert_eq!(flow.balance(), BalanceView::SignedOut);
}

#[tokio::test]
async fn test_spend_rejects_locally_without_network() {
    let gateway = BalanceGateway::new(FakeLedger::with_rows(json!([])), "secret");

    let outcome = gateway.spend("   ", 100, "Memes", "").await.expect("no error");
    assert_eq!(outcome, SpendOutcome::Rejected(SpendRejection::NoNick));

    let outcome = gateway.spend("yammy", 0, "Memes", "").await.expect("no error");
    assert_eq!(outcome, SpendOutcome::Rejected(SpendRejection::BadAmount));

    assert!(gateway.backend().spends().is_empty());
}

#[tokio::test]
async fn test_spend_truncates_item_and_comment() {
    let gateway = BalanceGateway::new(FakeLedger::with_rows(json!([])), "secret");
    let item = "🍿".repeat(250);
    let comment = "y".repeat(600);

    let outcome = gateway.spend(" yammy ", 200, &item, &comment).await.expect("no error");
    assert!(outcome.is_ok());

    let spends = gateway.backend().spends();
    assert_eq!(spends.len(), 1);
    assert_eq!(spends[0].nick, "yammy");
    assert_eq!(spends[0].item.chars().count(), 200);
    assert_eq!(spends[0].comment.chars().count(), 500);
}

#[tokio::test]
async fn test_spend_reply_interpretation() {
    let raw = format!("<html>{}</html>", "x".repeat(300));
    let gateway = BalanceGateway::new(
        FakeLedger::with_rows(json!([])).answering_spend(raw.clone()),
        "secret",
    );
    match gateway.spend("yammy", 10, "Memes", "").await.expect("no error") {
        SpendOutcome::Rejected(SpendRejection::BadJson { raw: kept }) => {
            assert_eq!(kept.chars().count(), 200);
            assert!(raw.starts_with(&kept));
        }
        other => panic!("expected badjson, got {other:?}"),
    }

    let gateway = BalanceGateway::new(
        FakeLedger::with_rows(json!([])).answering_spend(r#"{"ok":0,"error":"bad token"}"#),
        "secret",
    );
    let outcome = gateway.spend("yammy", 10, "Memes", "").await.expect("no error");
    assert_eq!(
        outcome,
        SpendOutcome::Declined(json!({ "ok": 0, "error": "bad token" }))
    );
    assert!(!outcome.is_ok());
}

#[tokio::test]
async fn test_blank_nick_lookup_skips_fetch() {
    let gateway = BalanceGateway::new(
        FakeLedger::with_rows(json!([{ "Nick": "", "Points": 5 }])),
        "secret",
    );

    let lookup = gateway.find_by_nick("  ").await.expect("no error");
    assert!(matches!(lookup, BalanceLookup::Missing(LookupMiss::Empty)));
    assert_eq!(gateway.backend().fetches(), 0);
}

#[tokio::test]
async fn test_balance_watchers_see_loading_then_result() {
    let flow = workflow(
        FakeLedger::with_rows(json!([{ "Nick": "yammy", "Points": 42 }])),
        FakeRelay::replying(r#"{"ok":true}"#),
    );
    let mut views = flow.subscribe_balance();
    let viewer = session("yammy", "Yammy");

    let watch_loading = async {
        views.changed().await.expect("sender alive");
        views.borrow_and_update().clone()
    };
    let (view, seen) = tokio::join!(flow.refresh_balance(Some(&viewer)), watch_loading);

    assert_eq!(seen, BalanceView::Loading);
    assert_eq!(
        view,
        BalanceView::Known {
            label: "Yammy".into(),
            points: 42
        }
    );
    assert_eq!(flow.balance(), view);
    assert_eq!(flow.refresh_balance(None).await, BalanceView::SignedOut);
}

#[tokio::test]
async fn test_unreadable_deduction_reply_still_completes_the_order() {
    let mut flow = workflow(
        FakeLedger::with_rows(json!([{ "Nick": "yammy", "Points": 1000 }]))
            .answering_spend("<html>502 Bad Gateway</html>"),
        FakeRelay::replying(r#"{"ok":true}"#),
    );
    flow.select(catalog::select(0, 1).expect("memes option"));

    let stage = flow.place_order(Some(&session("yammy", "Yammy"))).await;
    assert_eq!(stage, OrderStage::Success);
    assert_eq!(flow.ledger().backend().spends().len(), 1);
    assert_eq!(flow.ledger().backend().fetches(), 1);
    assert_eq!(SpendRejection::BadJson { raw: String::new() }.reason(), "badjson");
}
