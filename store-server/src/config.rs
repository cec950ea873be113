//! Server configuration
//!
//! All knobs come from environment variables with sensible defaults:
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | DATA_DIR | ./data | Database + log files |
//! | HTTP_PORT | 3000 | HTTP API port |
//! | ENVIRONMENT | development | development \| staging \| production |
//! | CURRENCY | USD | Default order/transaction currency |
//! | TAX_RATE_PERCENT | 5 | Checkout tax rate |
//! | SHIPPING_STANDARD | 25.00 | Flat standard shipping |
//! | SHIPPING_EXPRESS | 45.00 | Flat express shipping |
//! | DOWNLOAD_BASE_URL | http://localhost:3000 | Digital delivery link base |
//! | DOWNLOAD_SECRET | (dev default) | Download link signing secret |
//! | TRANSACTION_TTL_MINUTES | 90 | Payment attempt expiry |

use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the database and log files
    pub data_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Default currency carried on orders and transactions
    pub currency: String,
    /// Tax rate in percent applied at checkout
    pub tax_rate_percent: Decimal,
    /// Flat shipping amounts per method
    pub shipping_standard: Decimal,
    pub shipping_express: Decimal,
    /// Base URL for digital delivery links
    pub download_base_url: String,
    /// Secret for download link signing tokens
    pub download_secret: String,
    /// Transaction expiry window in minutes (1-2 hours in production)
    pub transaction_ttl_minutes: i64,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn env_decimal_or(name: &str, default: Decimal) -> Decimal {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        Self {
            data_dir: env_or("DATA_DIR", "./data"),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: env_or("ENVIRONMENT", "development"),
            currency: env_or("CURRENCY", "USD"),
            tax_rate_percent: env_decimal_or("TAX_RATE_PERCENT", Decimal::from(5)),
            shipping_standard: env_decimal_or("SHIPPING_STANDARD", Decimal::new(2500, 2)),
            shipping_express: env_decimal_or("SHIPPING_EXPRESS", Decimal::new(4500, 2)),
            download_base_url: env_or("DOWNLOAD_BASE_URL", "http://localhost:3000"),
            download_secret: env_or("DOWNLOAD_SECRET", "dev-download-secret"),
            transaction_ttl_minutes: std::env::var("TRANSACTION_TTL_MINUTES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(90),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
