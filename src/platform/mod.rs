//! Trading platform flows on top of the browser layer
//!
//! - `targets`: locator catalog for the platform's pages
//! - `auth`: login state machine
//! - `market`: balance and price reads
//! - `executor`: trade submission
//! - `account`: cookie banner and demo-account switch

pub mod account;
pub mod auth;
pub mod executor;
pub mod market;
pub mod targets;

pub use auth::{AuthOutcome, AuthSettings, AuthSignal, AuthState, AuthenticationFlow, Credentials};
pub use executor::{Direction, TradeExecutor, TradeOrder};
pub use market::{parse_amount, MarketDataReader};
