use uuid::Uuid;

use crate::{
    dto::checkout::CreateSessionRequest,
    error::{AppError, AppResult},
    models::ShippingDetails,
    pricing,
};

#[derive(Debug, Clone, Copy)]
pub struct ShippingRules {
    pub flat_fee: i64,
    pub free_threshold: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntentLine {
    pub product_id: Uuid,
    pub name: String,
    pub base_price: i64,
    pub quantity: i32,
    pub discount_percent: f64,
    pub unit_price: i64,
}

impl IntentLine {
    /// `None` when the line does not fit in an `i64`.
    pub fn line_total(&self) -> Option<i64> {
        self.unit_price.checked_mul(i64::from(self.quantity))
    }
}

/// Validated, priced description of a purchase, built before any payment
/// happens and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutIntent {
    pub lines: Vec<IntentLine>,
    pub shipping: ShippingDetails,
    pub currency: String,
    pub discount_code: Option<String>,
    pub discount_amount: i64,
    pub user_id: Option<Uuid>,
    pub subtotal: i64,
    pub shipping_cost: i64,
    pub total: i64,
}

impl CheckoutIntent {
    pub fn build(
        request: CreateSessionRequest,
        default_currency: &str,
        rules: ShippingRules,
    ) -> AppResult<Self> {
        if request.items.is_empty() {
            return Err(AppError::BadRequest("Missing items".into()));
        }
        let shipping = request
            .shipping
            .ok_or_else(|| AppError::BadRequest("Missing shipping details".into()))?;
        let shipping = normalize_shipping(shipping)?;

        let mut lines = Vec::with_capacity(request.items.len());
        for item in request.items {
            if item.quantity <= 0 {
                return Err(AppError::BadRequest(format!(
                    "Invalid quantity for product {}",
                    item.product_id
                )));
            }
            if item.price < 0 {
                return Err(AppError::BadRequest(format!(
                    "Invalid price for product {}",
                    item.product_id
                )));
            }
            if item.name.trim().is_empty() {
                return Err(AppError::BadRequest(format!(
                    "Missing name for product {}",
                    item.product_id
                )));
            }
            let product_discount = item.product_discount.unwrap_or(0.0);
            let event_discount = item.event_discount.unwrap_or(0.0);
            for pct in [product_discount, event_discount] {
                if !(0.0..=100.0).contains(&pct) {
                    return Err(AppError::BadRequest(format!(
                        "Discount for product {} must be between 0 and 100",
                        item.product_id
                    )));
                }
            }

            lines.push(IntentLine {
                product_id: item.product_id,
                name: item.name.trim().to_string(),
                base_price: item.price,
                quantity: item.quantity,
                discount_percent: pricing::applicable_discount(product_discount, event_discount),
                unit_price: pricing::unit_price(item.price, product_discount, event_discount),
            });
        }

        let currency = request
            .currency
            .map(|c| c.trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| default_currency.to_ascii_lowercase());
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::BadRequest(format!("Invalid currency '{currency}'")));
        }

        let subtotal = lines
            .iter()
            .try_fold(0i64, |acc, line| line.line_total().and_then(|t| acc.checked_add(t)))
            .ok_or_else(|| AppError::BadRequest("Order amount is too large".into()))?;
        let shipping_cost = pricing::shipping_cost(subtotal, rules.flat_fee, rules.free_threshold);
        let gross = subtotal
            .checked_add(shipping_cost)
            .ok_or_else(|| AppError::BadRequest("Order amount is too large".into()))?;

        let discount_amount = request.discount_amount.unwrap_or(0);
        if discount_amount < 0 {
            return Err(AppError::BadRequest("Discount amount cannot be negative".into()));
        }
        // A zero total is never reported as paid, so no order could follow it.
        if discount_amount >= gross {
            return Err(AppError::BadRequest("Order total must be greater than zero".into()));
        }
        let discount_code = request
            .discount_code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(Self {
            lines,
            shipping,
            currency,
            discount_code,
            discount_amount,
            user_id: request.user_id,
            subtotal,
            shipping_cost,
            total: gross - discount_amount,
        })
    }
}

fn normalize_shipping(shipping: ShippingDetails) -> AppResult<ShippingDetails> {
    let required = [
        ("name", &shipping.name),
        ("email", &shipping.email),
        ("address", &shipping.address),
        ("city", &shipping.city),
        ("postal_code", &shipping.postal_code),
        ("country", &shipping.country),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("Missing shipping {field}")));
        }
    }
    if !shipping.email.contains('@') {
        return Err(AppError::BadRequest("Invalid shipping email".into()));
    }

    Ok(ShippingDetails {
        name: shipping.name.trim().to_string(),
        email: shipping.email.trim().to_string(),
        phone: shipping
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
        address: shipping.address.trim().to_string(),
        city: shipping.city.trim().to_string(),
        postal_code: shipping.postal_code.trim().to_string(),
        country: shipping.country.trim().to_string(),
    })
}
