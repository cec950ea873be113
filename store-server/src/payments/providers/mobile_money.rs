//! Mobile money initializer
//!
//! Pushes a payment prompt to the subscriber's handset; the customer
//! approves on-device and the network confirms via webhook.

use async_trait::async_trait;

use shared::models::{Order, PaymentMethod, ProviderDetails, Transaction};
use shared::util::rand_suffix;
use shared::{AppError, AppResult};

use crate::config::Config;
use crate::payments::orchestrator::{PaymentInitRequest, PaymentInstructions};
use crate::payments::providers::ProviderInitializer;

pub struct MobileMoneyInitializer;

#[async_trait]
impl ProviderInitializer for MobileMoneyInitializer {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::MobileMoney
    }

    async fn initialize(
        &self,
        _order: &Order,
        transaction: &Transaction,
        request: &PaymentInitRequest,
        _config: &Config,
    ) -> AppResult<(ProviderDetails, PaymentInstructions)> {
        let phone_number = request.phone_number.clone().ok_or_else(|| {
            AppError::payment("Mobile money dispatch failed: subscriber phone number is required")
        })?;

        let prompt_reference = format!("MM-{}", rand_suffix(8));

        let details = ProviderDetails::MobileMoney {
            phone_number: phone_number.clone(),
            network: request.network.clone(),
            prompt_reference: prompt_reference.clone(),
        };

        let instructions = PaymentInstructions {
            transaction_id: transaction.id.clone(),
            method: PaymentMethod::MobileMoney,
            amount: transaction.amount,
            currency: transaction.currency.clone(),
            expires_at: transaction.expires_at,
            reference: prompt_reference,
            message: format!("Approve the payment prompt sent to {phone_number}"),
            redirect_url: None,
            transfer_details: None,
        };

        Ok((details, instructions))
    }
}
