//! Payment processing module
//!
//! - **orchestrator**: initiation, webhooks, manual verification,
//!   refunds - the only writer of Transaction documents
//! - **providers**: per-method initializers behind the
//!   `ProviderInitializer` seam
//! - **webhook**: payload parsing and provider status mapping

pub mod orchestrator;
pub mod providers;
pub mod webhook;

pub use orchestrator::{
    ManualTransferDetails, ManualVerificationRequest, PaymentInitRequest, PaymentInstructions,
    PaymentService, WebhookOutcome,
};
