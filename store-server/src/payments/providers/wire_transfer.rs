//! Wire transfer initializer
//!
//! Manual-settlement method for institutional buyers: international
//! wire to the vendor account, verified by an admin against the sender
//! identity the customer submits.

use async_trait::async_trait;

use shared::AppResult;
use shared::models::{Order, PaymentMethod, ProviderDetails, Transaction};
use shared::util::rand_suffix;

use crate::config::Config;
use crate::payments::orchestrator::{ManualTransferDetails, PaymentInitRequest, PaymentInstructions};
use crate::payments::providers::ProviderInitializer;

const BENEFICIARY: &str = "SupplyVend Ltd";
const IBAN: &str = "GB82 WEST 1234 5698 7654 32";
const SWIFT_CODE: &str = "WESTGB2L";

pub struct WireTransferInitializer;

#[async_trait]
impl ProviderInitializer for WireTransferInitializer {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::WireTransfer
    }

    async fn initialize(
        &self,
        _order: &Order,
        transaction: &Transaction,
        _request: &PaymentInitRequest,
        _config: &Config,
    ) -> AppResult<(ProviderDetails, PaymentInstructions)> {
        let reference = format!("WT-{}", rand_suffix(8));

        let details = ProviderDetails::WireTransfer {
            beneficiary: BENEFICIARY.to_string(),
            iban: IBAN.to_string(),
            swift_code: SWIFT_CODE.to_string(),
            reference: reference.clone(),
            submitted_reference: None,
            sender_name: None,
            verified: false,
            verification_method: None,
            verified_by: None,
            verified_at: None,
        };

        let instructions = PaymentInstructions {
            transaction_id: transaction.id.clone(),
            method: PaymentMethod::WireTransfer,
            amount: transaction.amount,
            currency: transaction.currency.clone(),
            expires_at: transaction.expires_at,
            reference: reference.clone(),
            message: format!(
                "Wire the exact amount to the beneficiary below with reference {reference}, \
                 then submit the reference and sender name for verification"
            ),
            redirect_url: None,
            transfer_details: Some(ManualTransferDetails {
                bank_name: None,
                account_name: None,
                account_number: None,
                beneficiary: Some(BENEFICIARY.to_string()),
                iban: Some(IBAN.to_string()),
                swift_code: Some(SWIFT_CODE.to_string()),
            }),
        };

        Ok((details, instructions))
    }
}
