//! Digital delivery
//!
//! Generates the download links granted when a digital-only order
//! completes. Links are deterministic per (order, product) and carry a
//! SHA-256 token over the order id, product id and the server secret;
//! the download endpoint recomputes the token before serving.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{error, info};

use shared::models::{DeliveryStatus, Order};
use shared::util::now_millis;

use crate::config::Config;

const DAY_MILLIS: i64 = 86_400_000;

pub struct DeliveryService {
    config: Arc<Config>,
}

impl DeliveryService {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Signing token for a (order, product) pair
    pub fn download_token(&self, order_id: &str, product_id: &str) -> String {
        token_for(&self.config.download_secret, order_id, product_id)
    }

    /// Verify a presented token against the expected one
    pub fn verify_token(&self, order_id: &str, product_id: &str, token: &str) -> bool {
        self.download_token(order_id, product_id) == token
    }

    /// Full download URL for a (order, product) pair
    pub fn build_download_link(&self, order_id: &str, product_id: &str) -> String {
        format!(
            "{}/downloads/{}/{}?token={}",
            self.config.download_base_url,
            order_id,
            product_id,
            self.download_token(order_id, product_id)
        )
    }

    /// Mark every digital/both item of the order delivered, attaching
    /// its download link and stamping the access expiry.
    ///
    /// Items without a delivery sub-record are marked failed and logged;
    /// the caller persists the order either way.
    pub fn deliver_digital_items(&self, order: &mut Order) {
        let now = now_millis();
        let order_id = order.id.clone();

        for item in order
            .items
            .iter_mut()
            .filter(|i| i.kind.grants_digital_access())
        {
            let link = format!(
                "{}/downloads/{}/{}?token={}",
                self.config.download_base_url,
                order_id,
                item.product_id,
                token_for(&self.config.download_secret, &order_id, &item.product_id)
            );

            match item.digital.as_mut() {
                Some(delivery) => {
                    delivery.download_link = Some(link);
                    delivery.delivery_status = DeliveryStatus::Delivered;
                    delivery.access_expires_at = delivery
                        .access_days
                        .map(|days| now + i64::from(days) * DAY_MILLIS);
                    info!(
                        order_id = %order_id,
                        product_id = %item.product_id,
                        "Digital item delivered"
                    );
                }
                None => {
                    // Snapshot was built without a delivery record; keep
                    // the failure visible instead of silently granting
                    item.digital = Some(shared::models::DigitalDelivery {
                        delivery_status: DeliveryStatus::Failed,
                        download_link: None,
                        download_count: 0,
                        download_limit: None,
                        access_days: None,
                        access_expires_at: None,
                    });
                    error!(
                        order_id = %order_id,
                        product_id = %item.product_id,
                        "Digital item had no delivery record, marked failed"
                    );
                }
            }
        }
    }
}

fn token_for(secret: &str, order_id: &str, product_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(order_id.as_bytes());
    hasher.update(b":");
    hasher.update(product_id.as_bytes());
    hasher.update(b":");
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{
        DigitalDelivery, OrderItem, OrderPayment, OrderStatus, PaymentState, ProductKind,
    };

    fn test_config() -> Arc<Config> {
        let mut config = Config::from_env();
        config.download_base_url = "http://localhost:3000".to_string();
        config.download_secret = "test-secret".to_string();
        Arc::new(config)
    }

    fn digital_order() -> Order {
        Order {
            id: "o-1".to_string(),
            order_number: "SV-250101-0001".to_string(),
            user_id: "u-1".to_string(),
            items: vec![OrderItem {
                product_id: "p-1".to_string(),
                name: "Algebra Workbook PDF".to_string(),
                sku: "WB-ALG".to_string(),
                unit_price: Decimal::new(999, 2),
                quantity: 1,
                kind: ProductKind::Digital,
                digital: Some(DigitalDelivery::pending(Some(3), Some(30))),
            }],
            items_count: 1,
            subtotal: Decimal::new(999, 2),
            tax_rate: Decimal::from(5),
            tax_amount: Decimal::new(50, 2),
            shipping_amount: Decimal::ZERO,
            total_amount: Decimal::new(1049, 2),
            status: OrderStatus::Paid,
            status_history: vec![],
            payment: OrderPayment {
                method: None,
                amount: Decimal::new(1049, 2),
                currency: "USD".to_string(),
                status: PaymentState::Completed,
                transaction_id: None,
                paid_at: None,
            },
            shipping: None,
            has_digital_items: true,
            has_physical_items: false,
            stock_reserved: false,
            created_at: 0,
            updated_at: 0,
            completed_at: None,
        }
    }

    #[test]
    fn test_token_deterministic_and_verifiable() {
        let service = DeliveryService::new(test_config());
        let token = service.download_token("o-1", "p-1");
        assert_eq!(token, service.download_token("o-1", "p-1"));
        assert!(service.verify_token("o-1", "p-1", &token));
        assert!(!service.verify_token("o-1", "p-2", &token));
        assert!(!service.verify_token("o-1", "p-1", "forged"));
    }

    #[test]
    fn test_build_download_link_contains_token() {
        let service = DeliveryService::new(test_config());
        let link = service.build_download_link("o-1", "p-1");
        let token = service.download_token("o-1", "p-1");
        assert!(link.starts_with("http://localhost:3000/downloads/o-1/p-1?token="));
        assert!(link.ends_with(&token));
    }

    #[test]
    fn test_deliver_digital_items() {
        let service = DeliveryService::new(test_config());
        let mut order = digital_order();

        service.deliver_digital_items(&mut order);

        let delivery = order.items[0].digital.as_ref().unwrap();
        assert_eq!(delivery.delivery_status, DeliveryStatus::Delivered);
        assert!(delivery.download_link.as_ref().unwrap().contains("/downloads/o-1/p-1"));
        // 30-day access stamped from delivery time
        assert!(delivery.access_expires_at.unwrap() > now_millis());
    }
}
