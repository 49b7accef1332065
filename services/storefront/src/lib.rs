//! Points storefront
//!
//! Viewers redeem loyalty points for stream rewards: the ledger is checked,
//! the order is relayed to the operator and the price is deducted.

pub mod balance;
pub mod balance_panel;
pub mod catalog;
pub mod config;
pub mod error;
pub mod relay;
pub mod workflow;

pub use balance::{BalanceGateway, BalanceLookup, HttpLedger, LedgerBackend, SpendOutcome};
pub use balance_panel::BalanceView;
pub use catalog::{CATALOG, Selection};
pub use config::StorefrontConfig;
pub use error::OrderError;
pub use relay::{HttpRelay, RelayBackend, RelayGateway, RelayOutcome};
pub use workflow::{OrderNotice, OrderStage, OrderWorkflow, ProcessingStep};
