//! Payment provider initializers
//!
//! One initializer per supported method. An initializer fills the
//! transaction's provider detail block and produces the client-facing
//! instructions (redirect URL, reference codes, or manual transfer
//! instructions - never secrets). Gateways themselves are out of scope;
//! these implementations stand in for the real integrations.

mod bank_transfer;
mod card;
mod mobile_money;
mod wallet;
mod wire_transfer;

use async_trait::async_trait;

use shared::AppResult;
use shared::models::{Order, PaymentMethod, ProviderDetails, Transaction};

use crate::config::Config;
use crate::payments::orchestrator::{PaymentInitRequest, PaymentInstructions};

pub use bank_transfer::BankTransferInitializer;
pub use card::CardInitializer;
pub use mobile_money::MobileMoneyInitializer;
pub use wallet::WalletInitializer;
pub use wire_transfer::WireTransferInitializer;

/// Provider-specific payment initiation seam
#[async_trait]
pub trait ProviderInitializer: Send + Sync {
    fn method(&self) -> PaymentMethod;

    /// Populate the provider detail block and build the client-facing
    /// instructions. A failure here is a dispatch failure: the
    /// orchestrator moves the order to `payment_failed`.
    async fn initialize(
        &self,
        order: &Order,
        transaction: &Transaction,
        request: &PaymentInitRequest,
        config: &Config,
    ) -> AppResult<(ProviderDetails, PaymentInstructions)>;
}

/// Resolve the initializer for a payment method
pub fn initializer_for(method: PaymentMethod) -> Box<dyn ProviderInitializer> {
    match method {
        PaymentMethod::Card => Box::new(CardInitializer),
        PaymentMethod::MobileMoney => Box::new(MobileMoneyInitializer),
        PaymentMethod::Wallet => Box::new(WalletInitializer),
        PaymentMethod::BankTransfer => Box::new(BankTransferInitializer),
        PaymentMethod::WireTransfer => Box::new(WireTransferInitializer),
    }
}
