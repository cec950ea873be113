//! Webhook payload parsing and status mapping
//!
//! Each gateway posts its own payload shape; what the orchestrator needs
//! from any of them is the correlation pair (our transaction id, the
//! provider's merchant reference), the event name, and the provider's
//! status word. Unknown providers fall back to generic field names so an
//! unmatched delivery can still be logged meaningfully.

use serde_json::Value;
use shared::models::TransactionStatus;

/// Correlation and status fields extracted from a provider payload
#[derive(Debug, Clone)]
pub struct ParsedWebhook {
    pub event: String,
    /// Our transaction id, when the provider echoes it
    pub transaction_id: Option<String>,
    /// Provider-assigned merchant reference
    pub merchant_reference: Option<String>,
    /// Provider status vocabulary, unmapped
    pub provider_status: String,
}

fn str_field(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Extract correlation fields per provider
pub fn parse_payload(provider: &str, payload: &Value) -> ParsedWebhook {
    match provider {
        "card" => ParsedWebhook {
            event: str_field(payload, "event").unwrap_or_else(|| "charge.update".to_string()),
            transaction_id: str_field(payload, "reference"),
            merchant_reference: str_field(payload, "gateway_reference"),
            provider_status: str_field(payload, "status").unwrap_or_default(),
        },
        "mobile_money" => ParsedWebhook {
            event: str_field(payload, "event_type")
                .unwrap_or_else(|| "collection.update".to_string()),
            transaction_id: str_field(payload, "external_id"),
            merchant_reference: str_field(payload, "prompt_reference"),
            provider_status: str_field(payload, "status").unwrap_or_default(),
        },
        "wallet" => ParsedWebhook {
            event: str_field(payload, "type").unwrap_or_else(|| "payment.update".to_string()),
            transaction_id: str_field(payload, "client_reference"),
            merchant_reference: str_field(payload, "wallet_reference"),
            provider_status: str_field(payload, "state").unwrap_or_default(),
        },
        _ => ParsedWebhook {
            event: str_field(payload, "event").unwrap_or_else(|| "unknown".to_string()),
            transaction_id: str_field(payload, "transaction_id"),
            merchant_reference: str_field(payload, "reference"),
            provider_status: str_field(payload, "status").unwrap_or_default(),
        },
    }
}

/// Map the provider's status vocabulary onto ours: success variants
/// become `completed`, failure variants `failed`, pending stays
/// `pending`, anything else is treated as in-flight.
pub fn map_provider_status(raw: &str) -> TransactionStatus {
    match raw.to_ascii_lowercase().as_str() {
        "success" | "successful" | "succeeded" | "completed" | "paid" => {
            TransactionStatus::Completed
        }
        "failed" | "failure" | "declined" | "error" | "rejected" => TransactionStatus::Failed,
        "pending" | "awaiting" => TransactionStatus::Pending,
        _ => TransactionStatus::Processing,
    }
}
