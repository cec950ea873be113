//! Transaction Model
//!
//! One payment attempt against an order. A transaction owns its refund
//! sequence and webhook log; it references the order by id only. Unlike
//! the order status, transaction status is not table-enforced: providers
//! drive sequences the order lifecycle never would (a dispute after
//! completion, a late failure notification), so every status set is
//! recorded in the history instead of rejected.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::util::now_millis;

/// Payment method across the supported provider set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    MobileMoney,
    Wallet,
    BankTransfer,
    WireTransfer,
}

impl PaymentMethod {
    /// 3-letter prefix used in transaction ids
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Card => "CRD",
            Self::MobileMoney => "MOM",
            Self::Wallet => "WLT",
            Self::BankTransfer => "BNK",
            Self::WireTransfer => "WIR",
        }
    }

    /// Manual-settlement methods need human-submitted proof plus admin
    /// approval instead of gateway confirmation
    pub fn is_manual_settlement(&self) -> bool {
        matches!(self, Self::BankTransfer | Self::WireTransfer)
    }

    /// Webhook ingress route segment for gateway-confirmed methods
    pub fn webhook_provider(&self) -> Option<&'static str> {
        match self {
            Self::Card => Some("card"),
            Self::MobileMoney => Some("mobile_money"),
            Self::Wallet => Some("wallet"),
            Self::BankTransfer | Self::WireTransfer => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::MobileMoney => "mobile_money",
            Self::Wallet => "wallet",
            Self::BankTransfer => "bank_transfer",
            Self::WireTransfer => "wire_transfer",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Initiated,
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    PartiallyRefunded,
    Cancelled,
    Expired,
    Disputed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Disputed => "disputed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-specific detail block - exactly one variant per method
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderDetails {
    Card {
        /// Gateway-assigned merchant reference
        gateway_reference: String,
        redirect_url: String,
        card_last4: Option<String>,
        authorized_at: Option<i64>,
    },
    MobileMoney {
        phone_number: String,
        network: Option<String>,
        /// Reference shown in the subscriber's payment prompt
        prompt_reference: String,
    },
    Wallet {
        wallet_reference: String,
        redirect_url: String,
    },
    BankTransfer {
        bank_name: String,
        account_name: String,
        account_number: String,
        /// Reference the customer must attach to the transfer
        reference: String,
        submitted_reference: Option<String>,
        receipt_number: Option<String>,
        verified: bool,
        verification_method: Option<String>,
        verified_by: Option<String>,
        verified_at: Option<i64>,
    },
    WireTransfer {
        beneficiary: String,
        iban: String,
        swift_code: String,
        reference: String,
        submitted_reference: Option<String>,
        sender_name: Option<String>,
        verified: bool,
        verification_method: Option<String>,
        verified_by: Option<String>,
        verified_at: Option<i64>,
    },
}

impl ProviderDetails {
    /// Provider-assigned reference used as the secondary webhook
    /// correlation key
    pub fn merchant_reference(&self) -> &str {
        match self {
            Self::Card {
                gateway_reference, ..
            } => gateway_reference,
            Self::MobileMoney {
                prompt_reference, ..
            } => prompt_reference,
            Self::Wallet {
                wallet_reference, ..
            } => wallet_reference,
            Self::BankTransfer { reference, .. } => reference,
            Self::WireTransfer { reference, .. } => reference,
        }
    }
}

/// Refund state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Completed,
    Failed,
}

/// One refund against a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub amount: Decimal,
    pub reason: String,
    pub status: RefundStatus,
    pub actor: String,
    pub created_at: i64,
}

/// Append-only webhook log entry, kept even when the delivery matched
/// nothing actionable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookLogEntry {
    pub provider: String,
    pub event: String,
    pub payload: serde_json::Value,
    pub source_ip: Option<String>,
    pub received_at: i64,
}

/// Append-only status history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatusEntry {
    pub status: TransactionStatus,
    pub timestamp: i64,
    pub note: Option<String>,
}

/// Transaction entity - never deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub order_id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub status_history: Vec<TransactionStatusEntry>,
    /// Populated by the provider initializer at dispatch; None only for
    /// a transaction whose dispatch failed
    pub provider: Option<ProviderDetails>,
    pub refunds: Vec<Refund>,
    pub total_refunded: Decimal,
    pub webhook_log: Vec<WebhookLogEntry>,
    pub expires_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Transaction {
    /// New transaction in `initiated` state
    pub fn new(
        id: String,
        order_id: String,
        user_id: String,
        amount: Decimal,
        currency: String,
        method: PaymentMethod,
        expires_at: i64,
    ) -> Self {
        let now = now_millis();
        Self {
            id,
            order_id,
            user_id,
            amount,
            currency,
            method,
            status: TransactionStatus::Initiated,
            status_history: vec![TransactionStatusEntry {
                status: TransactionStatus::Initiated,
                timestamp: now,
                note: None,
            }],
            provider: None,
            refunds: Vec::new(),
            total_refunded: Decimal::ZERO,
            webhook_log: Vec::new(),
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Amount still refundable
    pub fn remaining_amount(&self) -> Decimal {
        self.amount - self.total_refunded
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }

    /// Set the status, always appending a history entry.
    ///
    /// Repeated sets of the same status still append - webhook
    /// deliveries are at-least-once and each one is auditable.
    pub fn set_status(&mut self, status: TransactionStatus, note: Option<String>) {
        let now = now_millis();
        self.status_history.push(TransactionStatusEntry {
            status,
            timestamp: now,
            note,
        });
        self.status = status;
        self.updated_at = now;
    }

    pub fn log_webhook(&mut self, entry: WebhookLogEntry) {
        self.webhook_log.push(entry);
        self.updated_at = now_millis();
    }
}
