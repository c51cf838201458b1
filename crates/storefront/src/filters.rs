//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats an amount with exactly two decimal places.
///
/// Usage in templates: `₹{{ product.price|money }}`
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format!("{value:.2}"))
}

#[cfg(test)]
mod tests {
    use askama::Template;
    use rust_decimal::Decimal;

    use crate::filters;

    #[derive(Template)]
    #[template(source = "{{ amount|money }}", ext = "txt")]
    struct Amount {
        amount: Decimal,
    }

    #[test]
    fn test_money_pads_to_cents() {
        let rendered = Amount {
            amount: Decimal::new(5995, 1),
        }
        .render()
        .unwrap_or_default();
        assert_eq!(rendered, "599.50");
    }
}
