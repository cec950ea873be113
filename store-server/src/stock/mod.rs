//! Stock ledger
//!
//! Reservation, restoration and administrative adjustment of product
//! stock, every mutation paired with an append-only audit entry in the
//! same commit.

pub mod ledger;

pub use ledger::StockLedger;
