//! Status enums for orders and payments.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Orders are created `pending`, move to `processing` once the customer
/// confirms payment details, and are closed as `completed` or `cancelled` by
/// the caterer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Wire value stored in the `orders.status` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Localized label shown in the order history.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Menunggu",
            Self::Processing => "Diproses",
            Self::Completed => "Selesai",
            Self::Cancelled => "Dibatalkan",
        }
    }

    /// Badge color (hex RGB) shown next to the label.
    #[must_use]
    pub const fn color(&self) -> &'static str {
        match self {
            Self::Pending => "#FFA500",
            Self::Processing => "#007AFF",
            Self::Completed => "#34C759",
            Self::Cancelled => "#FF3B30",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Payment method chosen at confirmation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cash,
    /// Bank transfer.
    Transfer,
    /// E-wallet.
    Ewallet,
}

impl PaymentMethod {
    /// All payment methods, in the order they are offered.
    pub const ALL: [Self; 3] = [Self::Cash, Self::Transfer, Self::Ewallet];

    /// Wire value stored in the `orders.payment_method` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Transfer => "transfer",
            Self::Ewallet => "ewallet",
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Cash on Delivery",
            Self::Transfer => "Transfer Bank",
            Self::Ewallet => "E-Wallet",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Self::Cash),
            "transfer" => Ok(Self::Transfer),
            "ewallet" => Ok(Self::Ewallet),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_values() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("ewallet".parse::<PaymentMethod>().unwrap(), PaymentMethod::Ewallet);
        assert!("credit".parse::<PaymentMethod>().is_err());
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Transfer).unwrap(),
            "\"transfer\""
        );
    }
}
