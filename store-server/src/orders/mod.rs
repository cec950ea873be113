//! Order lifecycle module
//!
//! - **checkout**: builds the order aggregate (item snapshots, totals,
//!   order number) and reserves stock
//! - **money**: decimal totals computation
//! - **state_machine**: status transitions and their side effects

pub mod checkout;
pub mod money;
pub mod state_machine;

pub use checkout::{CheckoutItem, CheckoutRequest, CheckoutService};
pub use state_machine::OrderStateMachine;
