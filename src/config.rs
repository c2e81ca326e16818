use std::env;

use anyhow::Context;

use crate::intent::ShippingRules;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    pub frontend_url: String,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    pub default_currency: String,
    pub shipping_fee: i64,
    pub free_shipping_threshold: Option<i64>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let stripe_secret_key =
            env::var("STRIPE_SECRET_KEY").context("STRIPE_SECRET_KEY is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let stripe_api_base =
            env::var("STRIPE_API_BASE").unwrap_or_else(|_| "https://api.stripe.com".to_string());
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let resend_api_key = env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty());
        let email_from =
            env::var("EMAIL_FROM").unwrap_or_else(|_| "orders@example.com".to_string());
        let default_currency = env::var("DEFAULT_CURRENCY").unwrap_or_else(|_| "sek".to_string());
        let shipping_fee = match env::var("SHIPPING_FEE") {
            Ok(raw) => raw
                .parse::<i64>()
                .with_context(|| format!("SHIPPING_FEE must be an integer, got '{raw}'"))?,
            Err(_) => 49,
        };
        let free_shipping_threshold = env::var("FREE_SHIPPING_THRESHOLD")
            .ok()
            .map(|raw| {
                raw.parse::<i64>().with_context(|| {
                    format!("FREE_SHIPPING_THRESHOLD must be an integer, got '{raw}'")
                })
            })
            .transpose()?;

        Ok(Self {
            port,
            database_url,
            host,
            stripe_secret_key,
            stripe_api_base,
            frontend_url,
            resend_api_key,
            email_from,
            default_currency,
            shipping_fee,
            free_shipping_threshold,
        })
    }

    pub fn shipping_rules(&self) -> ShippingRules {
        ShippingRules {
            flat_fee: self.shipping_fee,
            free_threshold: self.free_shipping_threshold,
        }
    }
}
