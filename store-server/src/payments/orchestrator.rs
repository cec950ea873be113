//! Payment orchestrator
//!
//! Coordinates the payment lifecycle across Transaction and Order:
//! provider-specific initiation, inbound webhook processing, the manual
//! verification path for settlement methods, and refund bookkeeping.
//! Order and Transaction never cascade writes into each other - every
//! synchronization point goes through the order state machine and is
//! explicit in this module.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use shared::models::{
    OrderStatus, PaymentMethod, PaymentState, ProviderDetails, Refund, RefundStatus, Transaction,
    TransactionStatus, WebhookLogEntry,
};
use shared::util::{now_millis, rand_suffix};
use shared::{AppError, AppResult};

use crate::auth::Actor;
use crate::config::Config;
use crate::db::StoreStorage;
use crate::orders::state_machine::OrderStateMachine;
use crate::payments::{providers, webhook};

/// Payment initiation payload
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInitRequest {
    pub order_id: String,
    pub method: PaymentMethod,
    /// Mobile money subscriber number
    pub phone_number: Option<String>,
    /// Mobile money network hint
    pub network: Option<String>,
    /// Where the gateway should send the customer afterwards
    pub return_url: Option<String>,
}

/// Manual transfer account details shown to the customer
#[derive(Debug, Clone, Serialize)]
pub struct ManualTransferDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beneficiary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swift_code: Option<String>,
}

/// Client-facing payment instructions - never carries secrets
#[derive(Debug, Clone, Serialize)]
pub struct PaymentInstructions {
    pub transaction_id: String,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub currency: String,
    pub expires_at: i64,
    pub reference: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_details: Option<ManualTransferDetails>,
}

/// Customer-submitted proof for a manual settlement method
#[derive(Debug, Clone, Deserialize)]
pub struct ManualVerificationRequest {
    pub reference: String,
    /// Required for bank transfers
    pub receipt_number: Option<String>,
    /// Required for wire transfers
    pub sender_name: Option<String>,
}

/// What happened to an inbound webhook (the HTTP response is a success
/// acknowledgment either way)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed,
    Unmatched,
}

pub struct PaymentService {
    storage: StoreStorage,
    config: Arc<Config>,
}

impl PaymentService {
    pub fn new(storage: StoreStorage, config: Arc<Config>) -> Self {
        Self { storage, config }
    }

    fn state_machine(&self) -> OrderStateMachine {
        OrderStateMachine::new(self.storage.clone(), self.config.clone())
    }

    // ========== Initiation ==========

    /// Initiate a payment attempt for an order.
    ///
    /// Creates the transaction, moves the order into `payment_pending`,
    /// then dispatches to the provider initializer. A dispatch failure
    /// moves the order to `payment_failed` and surfaces a payment error.
    pub async fn initiate(
        &self,
        request: PaymentInitRequest,
        actor: &Actor,
    ) -> AppResult<PaymentInstructions> {
        let mut order = self
            .storage
            .get_order(&request.order_id)?
            .ok_or_else(|| AppError::not_found(format!("Order {}", request.order_id)))?;

        if !actor.can_access(&order.user_id) {
            return Err(AppError::forbidden("You do not own this order"));
        }

        match order.status {
            OrderStatus::Pending | OrderStatus::PaymentPending | OrderStatus::PaymentFailed => {}
            status => {
                return Err(AppError::business_rule(format!(
                    "Cannot initiate payment for an order in {status} status"
                )));
            }
        }

        let method = request.method;
        let transaction_id = self.generate_transaction_id(method)?;
        let expires_at = now_millis() + self.config.transaction_ttl_minutes * 60_000;

        let mut transaction = Transaction::new(
            transaction_id.clone(),
            order.id.clone(),
            order.user_id.clone(),
            order.total_amount,
            order.payment.currency.clone(),
            method,
            expires_at,
        );
        self.storage.save_transaction(&transaction)?;

        order.payment.method = Some(method);
        order.payment.transaction_id = Some(transaction_id.clone());
        order.payment.status = PaymentState::Pending;

        if order.status == OrderStatus::PaymentPending {
            // Retry on an order already awaiting payment
            self.storage.save_order(&order)?;
        } else {
            self.state_machine().transition(
                &mut order,
                OrderStatus::PaymentPending,
                Some(format!("Payment initiated via {method}")),
                actor,
            )?;
        }

        let initializer = providers::initializer_for(method);
        match initializer
            .initialize(&order, &transaction, &request, &self.config)
            .await
        {
            Ok((details, instructions)) => {
                let merchant_reference = details.merchant_reference().to_string();
                transaction.provider = Some(details);

                let write = self.storage.begin_write()?;
                self.storage.store_transaction(&write, &transaction)?;
                if let Some(provider) = method.webhook_provider() {
                    self.storage.index_provider_ref(
                        &write,
                        provider,
                        &merchant_reference,
                        &transaction.id,
                    )?;
                }
                write.commit().map_err(crate::db::StorageError::from)?;

                info!(
                    transaction_id = %transaction.id,
                    order_id = %order.id,
                    method = %method,
                    "Payment initiated"
                );
                Ok(instructions)
            }
            Err(dispatch_err) => {
                transaction.set_status(TransactionStatus::Failed, Some(dispatch_err.to_string()));
                self.storage.save_transaction(&transaction)?;

                if let Err(e) = self.state_machine().transition(
                    &mut order,
                    OrderStatus::PaymentFailed,
                    Some("Payment initiation failed".to_string()),
                    actor,
                ) {
                    error!(
                        order_id = %order.id,
                        error = %e,
                        "Failed to mark order payment_failed after dispatch failure"
                    );
                }
                Err(dispatch_err)
            }
        }
    }

    /// `<3-letter method prefix>-<last 8 digits of ms timestamp>-<4-char
    /// random suffix>`, checked against the store for uniqueness
    fn generate_transaction_id(&self, method: PaymentMethod) -> AppResult<String> {
        for _ in 0..5 {
            let tail = now_millis() % 100_000_000;
            let id = format!("{}-{:08}-{}", method.id_prefix(), tail, rand_suffix(4));
            if self.storage.get_transaction(&id)?.is_none() {
                return Ok(id);
            }
        }
        Err(AppError::internal(
            "Could not allocate a unique transaction id",
        ))
    }

    // ========== Webhooks ==========

    /// Record an inbound provider webhook.
    ///
    /// Correlates by our transaction id first, then by the provider's
    /// merchant reference. Unmatched deliveries are accepted and dropped
    /// so providers never see an error. On a match the delivery is
    /// logged unconditionally, the provider status is mapped onto ours,
    /// and a completed payment drives the order to `paid`.
    pub fn record_webhook(
        &self,
        provider: &str,
        payload: Value,
        source_ip: Option<String>,
    ) -> AppResult<WebhookOutcome> {
        let parsed = webhook::parse_payload(provider, &payload);

        let mut transaction = match self.correlate(provider, &parsed)? {
            Some(transaction) => transaction,
            None => {
                warn!(
                    provider = %provider,
                    event = %parsed.event,
                    "Webhook matched no transaction, dropping"
                );
                return Ok(WebhookOutcome::Unmatched);
            }
        };

        transaction.log_webhook(WebhookLogEntry {
            provider: provider.to_string(),
            event: parsed.event.clone(),
            payload,
            source_ip,
            received_at: now_millis(),
        });

        let mapped = webhook::map_provider_status(&parsed.provider_status);

        if mapped == TransactionStatus::Completed && transaction.is_expired(now_millis()) {
            transaction.set_status(
                TransactionStatus::Expired,
                Some("Confirmation received after expiry".to_string()),
            );
            self.storage.save_transaction(&transaction)?;
            warn!(
                transaction_id = %transaction.id,
                "Completed webhook for an expired transaction"
            );
            return Ok(WebhookOutcome::Processed);
        }

        transaction.set_status(mapped, Some(format!("Webhook {}", parsed.event)));
        self.storage.save_transaction(&transaction)?;

        info!(
            transaction_id = %transaction.id,
            provider = %provider,
            status = %mapped,
            "Webhook processed"
        );

        if mapped == TransactionStatus::Completed {
            self.sync_order_paid(&transaction, provider);
        }

        Ok(WebhookOutcome::Processed)
    }

    fn correlate(
        &self,
        provider: &str,
        parsed: &webhook::ParsedWebhook,
    ) -> AppResult<Option<Transaction>> {
        if let Some(id) = &parsed.transaction_id
            && let Some(transaction) = self.storage.get_transaction(id)?
        {
            return Ok(Some(transaction));
        }

        if let Some(reference) = &parsed.merchant_reference
            && let Some(id) = self
                .storage
                .find_transaction_by_provider_ref(provider, reference)?
            && let Some(transaction) = self.storage.get_transaction(&id)?
        {
            return Ok(Some(transaction));
        }

        Ok(None)
    }

    /// Drive the owning order to `paid` after a completed payment.
    ///
    /// Failures are logged and swallowed: the transaction update already
    /// committed and the webhook boundary always acknowledges.
    fn sync_order_paid(&self, transaction: &Transaction, source: &str) {
        let actor = Actor::system(source);
        match self.storage.get_order(&transaction.order_id) {
            Ok(Some(mut order)) => {
                if let Err(e) = self.state_machine().transition(
                    &mut order,
                    OrderStatus::Paid,
                    Some(format!("Payment confirmed via {source}")),
                    &actor,
                ) {
                    warn!(
                        order_id = %transaction.order_id,
                        error = %e,
                        "Order not moved to paid after payment completion"
                    );
                }
            }
            Ok(None) => error!(
                order_id = %transaction.order_id,
                "Completed transaction references a missing order"
            ),
            Err(e) => error!(
                order_id = %transaction.order_id,
                error = %e,
                "Failed to load order after payment completion"
            ),
        }
    }

    // ========== Manual settlement ==========

    /// Record customer-submitted transfer proof and queue the
    /// transaction for admin review.
    pub fn submit_manual_verification(
        &self,
        transaction_id: &str,
        request: ManualVerificationRequest,
        actor: &Actor,
    ) -> AppResult<Transaction> {
        let mut transaction = self
            .storage
            .get_transaction(transaction_id)?
            .ok_or_else(|| AppError::not_found(format!("Transaction {transaction_id}")))?;

        if !actor.can_access(&transaction.user_id) {
            return Err(AppError::forbidden("You do not own this transaction"));
        }
        if !transaction.method.is_manual_settlement() {
            return Err(AppError::validation(format!(
                "{} payments are confirmed by the provider, not manually",
                transaction.method
            )));
        }
        if request.reference.trim().is_empty() {
            return Err(AppError::validation("A transfer reference is required"));
        }

        match transaction.provider.as_mut() {
            Some(ProviderDetails::BankTransfer {
                submitted_reference,
                receipt_number,
                ..
            }) => {
                let receipt = request
                    .receipt_number
                    .clone()
                    .filter(|r| !r.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::validation("A receipt number is required for bank transfers")
                    })?;
                *submitted_reference = Some(request.reference.clone());
                *receipt_number = Some(receipt);
            }
            Some(ProviderDetails::WireTransfer {
                submitted_reference,
                sender_name,
                ..
            }) => {
                let sender = request
                    .sender_name
                    .clone()
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::validation("The sender name is required for wire transfers")
                    })?;
                *submitted_reference = Some(request.reference.clone());
                *sender_name = Some(sender);
            }
            _ => {
                return Err(AppError::business_rule(
                    "Transaction has no manual settlement details",
                ));
            }
        }

        transaction.set_status(
            TransactionStatus::Pending,
            Some("Manual verification submitted, awaiting review".to_string()),
        );
        self.storage.save_transaction(&transaction)?;

        let mut order = self
            .storage
            .get_order(&transaction.order_id)?
            .ok_or_else(|| AppError::not_found(format!("Order {}", transaction.order_id)))?;
        if order.status != OrderStatus::PaymentPending {
            self.state_machine().transition(
                &mut order,
                OrderStatus::PaymentPending,
                Some("Manual payment proof submitted".to_string()),
                actor,
            )?;
        }

        info!(
            transaction_id = %transaction.id,
            "Manual verification submitted"
        );
        Ok(transaction)
    }

    /// Terminal human decision on a manual-settlement transaction.
    pub fn admin_verify(
        &self,
        transaction_id: &str,
        approved: bool,
        note: Option<String>,
        actor: &Actor,
    ) -> AppResult<Transaction> {
        if !actor.is_elevated() {
            return Err(AppError::forbidden(
                "Manual verification requires an elevated role",
            ));
        }

        let mut transaction = self
            .storage
            .get_transaction(transaction_id)?
            .ok_or_else(|| AppError::not_found(format!("Transaction {transaction_id}")))?;

        if !transaction.method.is_manual_settlement() {
            return Err(AppError::validation(format!(
                "{} payments are not manually verified",
                transaction.method
            )));
        }

        let mut order = self
            .storage
            .get_order(&transaction.order_id)?
            .ok_or_else(|| AppError::not_found(format!("Order {}", transaction.order_id)))?;

        if approved {
            if transaction.is_expired(now_millis()) {
                return Err(AppError::validation(
                    "Transaction has expired; initiate a new payment",
                ));
            }

            let now = now_millis();
            match transaction.provider.as_mut() {
                Some(ProviderDetails::BankTransfer {
                    verified,
                    verification_method,
                    verified_by,
                    verified_at,
                    ..
                })
                | Some(ProviderDetails::WireTransfer {
                    verified,
                    verification_method,
                    verified_by,
                    verified_at,
                    ..
                }) => {
                    *verified = true;
                    *verification_method = Some("manual".to_string());
                    *verified_by = Some(actor.user_id.clone());
                    *verified_at = Some(now);
                }
                _ => {
                    return Err(AppError::business_rule(
                        "Transaction has no manual settlement details",
                    ));
                }
            }

            transaction.set_status(
                TransactionStatus::Completed,
                note.or_else(|| Some("Manual verification approved".to_string())),
            );
            self.storage.save_transaction(&transaction)?;

            self.state_machine().transition(
                &mut order,
                OrderStatus::Paid,
                Some("Manual payment verified".to_string()),
                actor,
            )?;
        } else {
            let reject_note =
                note.unwrap_or_else(|| "Manual verification rejected".to_string());
            transaction.set_status(TransactionStatus::Failed, Some(reject_note.clone()));
            self.storage.save_transaction(&transaction)?;

            self.state_machine().transition(
                &mut order,
                OrderStatus::PaymentFailed,
                Some(reject_note),
                actor,
            )?;
        }

        info!(
            transaction_id = %transaction.id,
            approved,
            "Manual verification decided"
        );
        Ok(transaction)
    }

    // ========== Refunds ==========

    /// Record a refund against a transaction.
    ///
    /// When the refund fully covers the order total the order is moved
    /// to `refunded`; an order that cannot legally move there keeps its
    /// status and the mismatch is logged (refund bookkeeping stands).
    pub fn refund(
        &self,
        transaction_id: &str,
        amount: Decimal,
        reason: String,
        actor: &Actor,
    ) -> AppResult<Transaction> {
        if !actor.is_elevated() {
            return Err(AppError::forbidden("Refunds require an elevated role"));
        }

        let mut transaction = self
            .storage
            .get_transaction(transaction_id)?
            .ok_or_else(|| AppError::not_found(format!("Transaction {transaction_id}")))?;

        if amount <= Decimal::ZERO {
            return Err(AppError::validation("Refund amount must be positive"));
        }
        if amount > transaction.remaining_amount() {
            return Err(AppError::validation(format!(
                "Refund amount {} exceeds refundable {}",
                amount,
                transaction.remaining_amount()
            )));
        }

        transaction.refunds.push(Refund {
            id: uuid::Uuid::new_v4().to_string(),
            amount,
            reason: reason.clone(),
            status: RefundStatus::Pending,
            actor: actor.user_id.clone(),
            created_at: now_millis(),
        });
        transaction.total_refunded += amount;

        if transaction.total_refunded >= transaction.amount {
            transaction.set_status(TransactionStatus::Refunded, Some(reason.clone()));
        } else {
            transaction.set_status(TransactionStatus::PartiallyRefunded, Some(reason.clone()));
        }
        self.storage.save_transaction(&transaction)?;

        info!(
            transaction_id = %transaction.id,
            amount = %amount,
            total_refunded = %transaction.total_refunded,
            "Refund recorded"
        );

        if transaction.status == TransactionStatus::Refunded {
            match self.storage.get_order(&transaction.order_id) {
                Ok(Some(mut order)) if transaction.total_refunded >= order.total_amount => {
                    if let Err(e) = self.state_machine().transition(
                        &mut order,
                        OrderStatus::Refunded,
                        Some(reason),
                        actor,
                    ) {
                        warn!(
                            order_id = %transaction.order_id,
                            error = %e,
                            "Order not moved to refunded after full refund"
                        );
                    }
                }
                Ok(_) => {}
                Err(e) => error!(
                    order_id = %transaction.order_id,
                    error = %e,
                    "Failed to load order after refund"
                ),
            }
        }

        Ok(transaction)
    }
}
