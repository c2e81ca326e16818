//! Unit price and shipping rules. All amounts are integer minor units.

/// Picks the discount that applies to a line: a product-level discount wins
/// over an event-wide one, and non-positive values count as "no discount".
pub fn applicable_discount(product_discount: f64, event_discount: f64) -> f64 {
    if product_discount > 0.0 {
        product_discount
    } else if event_discount > 0.0 {
        event_discount
    } else {
        0.0
    }
}

pub fn unit_price(base_price: i64, product_discount: f64, event_discount: f64) -> i64 {
    let discount = applicable_discount(product_discount, event_discount);
    if discount <= 0.0 {
        return base_price;
    }
    (base_price as f64 * (1.0 - discount / 100.0)).round() as i64
}

pub fn shipping_cost(subtotal: i64, flat_fee: i64, free_threshold: Option<i64>) -> i64 {
    match free_threshold {
        Some(threshold) if subtotal >= threshold => 0,
        _ => flat_fee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_discount_takes_precedence() {
        assert_eq!(unit_price(1000, 10.0, 20.0), 900);
    }

    #[test]
    fn event_discount_applies_without_product_discount() {
        assert_eq!(unit_price(1000, 0.0, 20.0), 800);
    }

    #[test]
    fn no_discount_keeps_base_price() {
        assert_eq!(unit_price(1000, 0.0, 0.0), 1000);
        assert_eq!(unit_price(1000, -5.0, 0.0), 1000);
    }

    #[test]
    fn rounds_to_nearest_minor_unit() {
        // 999 * 0.85 = 849.15
        assert_eq!(unit_price(999, 15.0, 0.0), 849);
        // 1999 * 0.75 = 1499.25
        assert_eq!(unit_price(1999, 25.0, 0.0), 1499);
        // 1998 * 0.75 = 1498.5
        assert_eq!(unit_price(1998, 25.0, 0.0), 1499);
    }

    #[test]
    fn shipping_is_free_at_threshold() {
        assert_eq!(shipping_cost(1800, 49, None), 49);
        assert_eq!(shipping_cost(1800, 49, Some(2000)), 49);
        assert_eq!(shipping_cost(2000, 49, Some(2000)), 0);
    }
}
