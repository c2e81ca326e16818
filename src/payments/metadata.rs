//! Versioned schema for the order data carried in checkout session metadata.
//!
//! The processor only stores a flat string map (max 50 keys, 500 characters
//! per value), so line items are serialized as compact JSON and split across
//! `items_0..items_{n-1}`. Decoding is strict: an unknown version or any
//! missing or inconsistent field is rejected instead of guessed at.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::Metadata;
use crate::{
    intent::CheckoutIntent,
    models::{NewOrder, NewOrderItem, OrderStatus, ShippingDetails},
};

pub const SCHEMA_VERSION: &str = "1";
pub const PAYMENT_METHOD_CARD: &str = "card";

const MAX_VALUE_LEN: usize = 500;
const MAX_KEYS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "p")]
    pub product_id: Uuid,
    #[serde(rename = "q")]
    pub quantity: i32,
    #[serde(rename = "u")]
    pub unit_price: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionMetadata {
    pub currency: String,
    pub subtotal: i64,
    pub shipping_cost: i64,
    pub total: i64,
    pub discount_code: Option<String>,
    pub discount_amount: Option<i64>,
    pub user_id: Option<Uuid>,
    pub shipping: ShippingDetails,
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("unsupported metadata version {0:?}")]
    UnsupportedVersion(Option<String>),

    #[error("missing metadata field '{0}'")]
    MissingField(String),

    #[error("invalid metadata field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("malformed line items: {0}")]
    MalformedItems(String),

    #[error("total {total} does not equal subtotal + shipping - discount ({expected})")]
    TotalMismatch { total: i64, expected: i64 },

    #[error("metadata too large: {0}")]
    TooLarge(String),
}

impl From<&CheckoutIntent> for SessionMetadata {
    fn from(intent: &CheckoutIntent) -> Self {
        Self {
            currency: intent.currency.clone(),
            subtotal: intent.subtotal,
            shipping_cost: intent.shipping_cost,
            total: intent.total,
            discount_code: intent.discount_code.clone(),
            discount_amount: (intent.discount_amount > 0).then_some(intent.discount_amount),
            user_id: intent.user_id,
            shipping: intent.shipping.clone(),
            items: intent
                .lines
                .iter()
                .map(|line| MetadataItem {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
        }
    }
}

impl SessionMetadata {
    pub fn encode(&self) -> Result<Metadata, MetadataError> {
        let mut map = Metadata::new();
        map.insert("v".into(), SCHEMA_VERSION.into());
        map.insert("currency".into(), self.currency.clone());
        map.insert("subtotal".into(), self.subtotal.to_string());
        map.insert("shipping_cost".into(), self.shipping_cost.to_string());
        map.insert("total".into(), self.total.to_string());
        if let Some(code) = &self.discount_code {
            map.insert("discount_code".into(), code.clone());
        }
        if let Some(amount) = self.discount_amount {
            map.insert("discount_amount".into(), amount.to_string());
        }
        if let Some(user_id) = self.user_id {
            map.insert("user_id".into(), user_id.to_string());
        }

        let shipping = &self.shipping;
        map.insert("shipping_name".into(), shipping.name.clone());
        map.insert("shipping_email".into(), shipping.email.clone());
        if let Some(phone) = &shipping.phone {
            map.insert("shipping_phone".into(), phone.clone());
        }
        map.insert("shipping_address".into(), shipping.address.clone());
        map.insert("shipping_city".into(), shipping.city.clone());
        map.insert("shipping_postal_code".into(), shipping.postal_code.clone());
        map.insert("shipping_country".into(), shipping.country.clone());

        let items_json = serde_json::to_string(&self.items)
            .map_err(|err| MetadataError::MalformedItems(err.to_string()))?;
        let chars: Vec<char> = items_json.chars().collect();
        let chunks: Vec<String> = chars
            .chunks(MAX_VALUE_LEN)
            .map(|chunk| chunk.iter().collect())
            .collect();
        map.insert("items_chunks".into(), chunks.len().to_string());
        for (index, chunk) in chunks.into_iter().enumerate() {
            map.insert(format!("items_{index}"), chunk);
        }

        if map.len() > MAX_KEYS {
            return Err(MetadataError::TooLarge(format!(
                "{} keys, the limit is {MAX_KEYS}",
                map.len()
            )));
        }
        if let Some((key, _)) = map.iter().find(|(_, v)| v.chars().count() > MAX_VALUE_LEN) {
            return Err(MetadataError::TooLarge(format!(
                "value of '{key}' exceeds {MAX_VALUE_LEN} characters"
            )));
        }

        Ok(map)
    }

    pub fn decode(map: &Metadata) -> Result<Self, MetadataError> {
        match map.get("v") {
            Some(version) if version == SCHEMA_VERSION => {}
            other => return Err(MetadataError::UnsupportedVersion(other.cloned())),
        }

        let currency = required(map, "currency")?.to_string();
        let subtotal = amount(map, "subtotal")?;
        let shipping_cost = amount(map, "shipping_cost")?;
        let total = amount(map, "total")?;
        let discount_code = optional(map, "discount_code").map(str::to_string);
        let discount_amount = match optional(map, "discount_amount") {
            Some(_) => Some(amount(map, "discount_amount")?),
            None => None,
        };
        let user_id = optional(map, "user_id")
            .map(|raw| {
                Uuid::parse_str(raw).map_err(|err| MetadataError::InvalidField {
                    field: "user_id".into(),
                    reason: err.to_string(),
                })
            })
            .transpose()?;

        let shipping = ShippingDetails {
            name: required(map, "shipping_name")?.to_string(),
            email: required(map, "shipping_email")?.to_string(),
            phone: optional(map, "shipping_phone").map(str::to_string),
            address: required(map, "shipping_address")?.to_string(),
            city: required(map, "shipping_city")?.to_string(),
            postal_code: required(map, "shipping_postal_code")?.to_string(),
            country: required(map, "shipping_country")?.to_string(),
        };

        let chunk_count: usize =
            required(map, "items_chunks")?
                .parse()
                .map_err(|_| MetadataError::InvalidField {
                    field: "items_chunks".into(),
                    reason: "not a number".into(),
                })?;
        if chunk_count == 0 {
            return Err(MetadataError::MalformedItems("no item chunks".into()));
        }
        let mut items_json = String::new();
        for index in 0..chunk_count {
            items_json.push_str(required(map, &format!("items_{index}"))?);
        }
        let items: Vec<MetadataItem> = serde_json::from_str(&items_json)
            .map_err(|err| MetadataError::MalformedItems(err.to_string()))?;

        if items.is_empty() {
            return Err(MetadataError::MalformedItems("no line items".into()));
        }
        if let Some(item) = items.iter().find(|i| i.quantity <= 0) {
            return Err(MetadataError::MalformedItems(format!(
                "non-positive quantity for product {}",
                item.product_id
            )));
        }
        if let Some(item) = items.iter().find(|i| i.unit_price < 0) {
            return Err(MetadataError::MalformedItems(format!(
                "negative unit price for product {}",
                item.product_id
            )));
        }

        let items_total = items
            .iter()
            .try_fold(0i64, |acc, i| {
                i.unit_price
                    .checked_mul(i64::from(i.quantity))
                    .and_then(|line| acc.checked_add(line))
            })
            .ok_or_else(|| MetadataError::InvalidField {
                field: "items".into(),
                reason: "line item amounts overflow".into(),
            })?;
        if items_total != subtotal {
            return Err(MetadataError::InvalidField {
                field: "subtotal".into(),
                reason: format!("{subtotal} does not match line items ({items_total})"),
            });
        }
        let expected = subtotal
            .checked_add(shipping_cost)
            .and_then(|gross| gross.checked_sub(discount_amount.unwrap_or(0)))
            .ok_or_else(|| MetadataError::InvalidField {
                field: "total".into(),
                reason: "subtotal and shipping overflow".into(),
            })?;
        if total != expected {
            return Err(MetadataError::TotalMismatch { total, expected });
        }

        Ok(Self {
            currency,
            subtotal,
            shipping_cost,
            total,
            discount_code,
            discount_amount,
            user_id,
            shipping,
            items,
        })
    }

    /// Order row for a confirmed payment on `session_id`.
    pub fn to_new_order(&self, session_id: &str) -> NewOrder {
        NewOrder {
            user_id: self.user_id,
            total_amount: self.total,
            currency: self.currency.clone(),
            shipping: self.shipping.clone(),
            status: OrderStatus::Processing,
            discount_code: self.discount_code.clone(),
            discount_amount: self.discount_amount,
            stripe_session_id: Some(session_id.to_string()),
            payment_method: PAYMENT_METHOD_CARD.into(),
        }
    }

    pub fn to_items(&self, order_id: Uuid) -> Vec<NewOrderItem> {
        self.items
            .iter()
            .map(|item| NewOrderItem {
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect()
    }
}

fn optional<'a>(map: &'a Metadata, key: &str) -> Option<&'a str> {
    map.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn required<'a>(map: &'a Metadata, key: &str) -> Result<&'a str, MetadataError> {
    optional(map, key).ok_or_else(|| MetadataError::MissingField(key.to_string()))
}

fn amount(map: &Metadata, key: &str) -> Result<i64, MetadataError> {
    let raw = required(map, key)?;
    let value: i64 = raw.parse().map_err(|_| MetadataError::InvalidField {
        field: key.to_string(),
        reason: format!("'{raw}' is not an integer amount"),
    })?;
    if value < 0 {
        return Err(MetadataError::InvalidField {
            field: key.to_string(),
            reason: "amount cannot be negative".into(),
        });
    }
    Ok(value)
}
