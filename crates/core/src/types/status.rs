//! Status and attribute enums.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Orders are created as `Paid` once payment is verified; the remaining
/// transitions are driven by fulfilment outside the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Human-readable label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether the order counts toward revenue.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Paid | Self::Shipped | Self::Delivered)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Garment size offered for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "storefront.product_size"))]
pub enum ProductSize {
    #[serde(rename = "XS")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "XS"))]
    ExtraSmall,
    #[serde(rename = "S")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "S"))]
    Small,
    #[default]
    #[serde(rename = "M")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "M"))]
    Medium,
    #[serde(rename = "L")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "L"))]
    Large,
    #[serde(rename = "XL")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "XL"))]
    ExtraLarge,
    #[serde(rename = "XXL")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "XXL"))]
    DoubleExtraLarge,
    #[serde(rename = "3XL")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "3XL"))]
    TripleExtraLarge,
}

impl ProductSize {
    /// All sizes, smallest first.
    pub const ALL: [Self; 7] = [
        Self::ExtraSmall,
        Self::Small,
        Self::Medium,
        Self::Large,
        Self::ExtraLarge,
        Self::DoubleExtraLarge,
        Self::TripleExtraLarge,
    ];

    /// Short size code as printed on the tag.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ExtraSmall => "XS",
            Self::Small => "S",
            Self::Medium => "M",
            Self::Large => "L",
            Self::ExtraLarge => "XL",
            Self::DoubleExtraLarge => "XXL",
            Self::TripleExtraLarge => "3XL",
        }
    }
}

impl std::fmt::Display for ProductSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for ProductSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("invalid product size: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_round_trips_through_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("refunded".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_settled_statuses() {
        assert!(OrderStatus::Paid.is_settled());
        assert!(!OrderStatus::Pending.is_settled());
        assert!(!OrderStatus::Cancelled.is_settled());
    }

    #[test]
    fn test_size_labels() {
        assert_eq!("3xl".parse::<ProductSize>().unwrap(), ProductSize::TripleExtraLarge);
        assert_eq!(ProductSize::DoubleExtraLarge.to_string(), "XXL");
        assert_eq!(
            serde_json::to_string(&ProductSize::ExtraSmall).unwrap(),
            "\"XS\""
        );
    }
}
