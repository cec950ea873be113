//! Bank transfer initializer
//!
//! Manual-settlement method: the customer transfers to the vendor
//! account carrying the generated reference, then submits the reference
//! and receipt number for admin verification.

use async_trait::async_trait;

use shared::AppResult;
use shared::models::{Order, PaymentMethod, ProviderDetails, Transaction};
use shared::util::rand_suffix;

use crate::config::Config;
use crate::payments::orchestrator::{ManualTransferDetails, PaymentInitRequest, PaymentInstructions};
use crate::payments::providers::ProviderInitializer;

const BANK_NAME: &str = "Meridian Commercial Bank";
const ACCOUNT_NAME: &str = "SupplyVend Ltd";
const ACCOUNT_NUMBER: &str = "0448-220-117";

pub struct BankTransferInitializer;

#[async_trait]
impl ProviderInitializer for BankTransferInitializer {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::BankTransfer
    }

    async fn initialize(
        &self,
        _order: &Order,
        transaction: &Transaction,
        _request: &PaymentInitRequest,
        _config: &Config,
    ) -> AppResult<(ProviderDetails, PaymentInstructions)> {
        let reference = format!("BT-{}", rand_suffix(8));

        let details = ProviderDetails::BankTransfer {
            bank_name: BANK_NAME.to_string(),
            account_name: ACCOUNT_NAME.to_string(),
            account_number: ACCOUNT_NUMBER.to_string(),
            reference: reference.clone(),
            submitted_reference: None,
            receipt_number: None,
            verified: false,
            verification_method: None,
            verified_by: None,
            verified_at: None,
        };

        let instructions = PaymentInstructions {
            transaction_id: transaction.id.clone(),
            method: PaymentMethod::BankTransfer,
            amount: transaction.amount,
            currency: transaction.currency.clone(),
            expires_at: transaction.expires_at,
            reference: reference.clone(),
            message: format!(
                "Transfer the exact amount to the account below and include reference {reference}, \
                 then submit the reference and receipt number for verification"
            ),
            redirect_url: None,
            transfer_details: Some(ManualTransferDetails {
                bank_name: Some(BANK_NAME.to_string()),
                account_name: Some(ACCOUNT_NAME.to_string()),
                account_number: Some(ACCOUNT_NUMBER.to_string()),
                beneficiary: None,
                iban: None,
                swift_code: None,
            }),
        };

        Ok((details, instructions))
    }
}
