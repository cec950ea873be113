//! Hosted card gateway initializer

use async_trait::async_trait;

use shared::AppResult;
use shared::models::{Order, PaymentMethod, ProviderDetails, Transaction};
use shared::util::rand_suffix;

use crate::config::Config;
use crate::payments::orchestrator::{PaymentInitRequest, PaymentInstructions};
use crate::payments::providers::ProviderInitializer;

pub struct CardInitializer;

#[async_trait]
impl ProviderInitializer for CardInitializer {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Card
    }

    async fn initialize(
        &self,
        _order: &Order,
        transaction: &Transaction,
        request: &PaymentInitRequest,
        _config: &Config,
    ) -> AppResult<(ProviderDetails, PaymentInstructions)> {
        let gateway_reference = format!("GW-{}", rand_suffix(10));
        let mut redirect_url =
            format!("https://checkout.cardpay.example/session/{gateway_reference}");
        if let Some(return_url) = &request.return_url {
            redirect_url.push_str("?return_to=");
            redirect_url.push_str(return_url);
        }

        let details = ProviderDetails::Card {
            gateway_reference: gateway_reference.clone(),
            redirect_url: redirect_url.clone(),
            card_last4: None,
            authorized_at: None,
        };

        let instructions = PaymentInstructions {
            transaction_id: transaction.id.clone(),
            method: PaymentMethod::Card,
            amount: transaction.amount,
            currency: transaction.currency.clone(),
            expires_at: transaction.expires_at,
            reference: gateway_reference,
            message: "Redirect the customer to the gateway to complete the card payment"
                .to_string(),
            redirect_url: Some(redirect_url),
            transfer_details: None,
        };

        Ok((details, instructions))
    }
}
