use std::fmt::Write;

use html_escape::encode_text;

use crate::{
    dto::orders::OrderWithItems,
    models::{Order, OrderStatus},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Minor units to a display amount, e.g. `1849, "sek"` -> `18.49 SEK`.
pub fn format_amount(minor: i64, currency: &str) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!(
        "{sign}{}.{:02} {}",
        abs / 100,
        abs % 100,
        currency.to_ascii_uppercase()
    )
}

/// Human-facing order number, e.g. `ORD-20250101-1A2B3C4D`.
pub fn order_reference(order: &Order) -> String {
    let id = order.id.simple().to_string();
    format!(
        "ORD-{}-{}",
        order.created_at.format("%Y%m%d"),
        id[..8].to_ascii_uppercase()
    )
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Pending",
        OrderStatus::Processing => "Processing",
        OrderStatus::Shipped => "Shipped",
        OrderStatus::Delivered => "Delivered",
        OrderStatus::Cancelled => "Cancelled",
    }
}

fn status_message(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "We are waiting for your payment to be confirmed.",
        OrderStatus::Processing => "Your payment is confirmed and we are preparing your order.",
        OrderStatus::Shipped => "Your order is on its way.",
        OrderStatus::Delivered => "Your order has been delivered. Enjoy!",
        OrderStatus::Cancelled => {
            "Your order has been cancelled. Contact us if you have any questions."
        }
    }
}

struct Totals {
    subtotal: i64,
    shipping: Option<i64>,
    discount: Option<i64>,
    total: i64,
}

fn totals(order: &OrderWithItems) -> Totals {
    let subtotal = order
        .items
        .iter()
        .fold(0i64, |acc, item| acc.saturating_add(item.line_total()));
    let discount = order.order.discount_amount.filter(|d| *d > 0);
    // Shipping is not stored separately; it is whatever the total holds beyond
    // the discounted items. Without items it cannot be derived.
    let shipping = (!order.items.is_empty())
        .then(|| {
            order
                .order
                .total_amount
                .saturating_add(discount.unwrap_or(0))
                .saturating_sub(subtotal)
        })
        .filter(|s| *s >= 0);
    Totals {
        subtotal,
        shipping,
        discount,
        total: order.order.total_amount,
    }
}

fn summary_text(order: &OrderWithItems) -> String {
    let currency = &order.order.currency;
    let mut text = String::new();
    for item in &order.items {
        let _ = writeln!(
            text,
            "- {} x{} @ {} = {}",
            item.product_id,
            item.quantity,
            format_amount(item.unit_price, currency),
            format_amount(item.line_total(), currency)
        );
    }

    let totals = totals(order);
    let _ = writeln!(text, "\nSubtotal: {}", format_amount(totals.subtotal, currency));
    if let Some(shipping) = totals.shipping {
        let _ = writeln!(text, "Shipping: {}", format_amount(shipping, currency));
    }
    if let Some(discount) = totals.discount {
        let code = order.order.discount_code.as_deref().unwrap_or("discount");
        let _ = writeln!(
            text,
            "Discount ({code}): -{}",
            format_amount(discount, currency)
        );
    }
    let _ = writeln!(text, "Total: {}", format_amount(totals.total, currency));

    let shipping = &order.order.shipping;
    let _ = write!(
        text,
        "\nShipping to:\n{}\n{}\n{} {}\n{}\n",
        shipping.name, shipping.address, shipping.postal_code, shipping.city, shipping.country
    );
    text
}

fn summary_html(order: &OrderWithItems) -> String {
    let currency = &order.order.currency;
    let mut html = String::from(
        "<table style=\"width:100%;border-collapse:collapse\">\
         <tr><th align=\"left\">Product</th><th>Qty</th><th align=\"right\">Price</th><th align=\"right\">Total</th></tr>",
    );
    for item in &order.items {
        let _ = write!(
            html,
            "<tr><td>{}</td><td align=\"center\">{}</td><td align=\"right\">{}</td><td align=\"right\">{}</td></tr>",
            item.product_id,
            item.quantity,
            format_amount(item.unit_price, currency),
            format_amount(item.line_total(), currency)
        );
    }
    html.push_str("</table>");

    let totals = totals(order);
    let _ = write!(
        html,
        "<p>Subtotal: {}</p>",
        format_amount(totals.subtotal, currency)
    );
    if let Some(shipping) = totals.shipping {
        let _ = write!(html, "<p>Shipping: {}</p>", format_amount(shipping, currency));
    }
    if let Some(discount) = totals.discount {
        let code = order.order.discount_code.as_deref().unwrap_or("discount");
        let _ = write!(
            html,
            "<p>Discount ({}): -{}</p>",
            encode_text(code),
            format_amount(discount, currency)
        );
    }
    let _ = write!(
        html,
        "<p><strong>Total: {}</strong></p>",
        format_amount(totals.total, currency)
    );

    let shipping = &order.order.shipping;
    let _ = write!(
        html,
        "<h3>Shipping to</h3><p>{}<br>{}<br>{} {}<br>{}</p>",
        encode_text(&shipping.name),
        encode_text(&shipping.address),
        encode_text(&shipping.postal_code),
        encode_text(&shipping.city),
        encode_text(&shipping.country)
    );
    html
}

pub fn confirmation(order: &OrderWithItems, session_id: Option<&str>) -> RenderedEmail {
    let reference = order_reference(&order.order);
    let name = &order.order.shipping.name;

    let mut text = format!(
        "Hi {name},\n\nThank you for your order! Your order number is {reference}.\n\n"
    );
    text.push_str(&summary_text(order));
    if let Some(session_id) = session_id {
        let _ = write!(text, "\nPayment reference: {session_id}\n");
    }

    let mut html = format!(
        "<h2>Thank you for your order!</h2><p>Hi {},</p><p>Your order number is <strong>{reference}</strong>.</p>",
        encode_text(name)
    );
    html.push_str(&summary_html(order));
    if let Some(session_id) = session_id {
        let _ = write!(
            html,
            "<p style=\"color:#888\">Payment reference: {}</p>",
            encode_text(session_id)
        );
    }

    RenderedEmail {
        subject: format!("Order confirmation {reference}"),
        text,
        html,
    }
}

pub fn status_update(
    order: &OrderWithItems,
    new_status: OrderStatus,
    old_status: Option<OrderStatus>,
) -> RenderedEmail {
    let reference = order_reference(&order.order);
    let name = &order.order.shipping.name;
    let change = match old_status {
        Some(old) if old != new_status => format!(
            "has changed from {} to {}",
            status_label(old),
            status_label(new_status)
        ),
        _ => format!("is {}", status_label(new_status)),
    };

    let mut text = format!(
        "Hi {name},\n\nThe status of order {reference} {change}.\n{}\n\n",
        status_message(new_status)
    );
    text.push_str(&summary_text(order));

    let mut html = format!(
        "<h2>Order update</h2><p>Hi {},</p><p>The status of order <strong>{reference}</strong> {change}.</p><p>{}</p>",
        encode_text(name),
        status_message(new_status)
    );
    html.push_str(&summary_html(order));

    RenderedEmail {
        subject: format!("Order {reference}: {}", status_label(new_status)),
        text,
        html,
    }
}
