//! Wire types exchanged with the webhook service.
//!
//! Field names follow the service's snake_case JSON; optional fields are
//! omitted when serializing so partial bodies stay partial.

pub mod auth;
pub mod pair;
pub mod signal;
pub mod stock;

pub use auth::{LoginRequest, LoginResponse, MessageResponse};
pub use pair::{Pair, PairList};
pub use signal::{OrderStatus, Signal, SignalList, WebhookSignal};
pub use stock::{Stock, StockList};
