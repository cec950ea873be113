//! Hosted wallet gateway initializer

use async_trait::async_trait;

use shared::AppResult;
use shared::models::{Order, PaymentMethod, ProviderDetails, Transaction};
use shared::util::rand_suffix;

use crate::config::Config;
use crate::payments::orchestrator::{PaymentInitRequest, PaymentInstructions};
use crate::payments::providers::ProviderInitializer;

pub struct WalletInitializer;

#[async_trait]
impl ProviderInitializer for WalletInitializer {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Wallet
    }

    async fn initialize(
        &self,
        _order: &Order,
        transaction: &Transaction,
        _request: &PaymentInitRequest,
        _config: &Config,
    ) -> AppResult<(ProviderDetails, PaymentInstructions)> {
        let wallet_reference = format!("WP-{}", rand_suffix(10));
        let redirect_url = format!("https://pay.walletgo.example/checkout/{wallet_reference}");

        let details = ProviderDetails::Wallet {
            wallet_reference: wallet_reference.clone(),
            redirect_url: redirect_url.clone(),
        };

        let instructions = PaymentInstructions {
            transaction_id: transaction.id.clone(),
            method: PaymentMethod::Wallet,
            amount: transaction.amount,
            currency: transaction.currency.clone(),
            expires_at: transaction.expires_at,
            reference: wallet_reference,
            message: "Redirect the customer to their wallet to authorize the payment".to_string(),
            redirect_url: Some(redirect_url),
            transfer_details: None,
        };

        Ok((details, instructions))
    }
}
