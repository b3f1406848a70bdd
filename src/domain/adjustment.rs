use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a stock adjustment adds or removes stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonType {
    /// Adds stock (e.g. transfer in).
    Credit,
    /// Removes stock (e.g. expiry, damage).
    Debit,
}

/// A configured reason for adjusting stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustmentReason {
    /// Stable identifier.
    pub id: Uuid,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Direction of the adjustment.
    pub reason_type: ReasonType,
}

/// A single loss or adjustment recorded against a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    /// The reason for the adjustment.
    pub reason_id: Uuid,
    /// The adjusted quantity, always positive; the sign comes from the reason.
    pub quantity: i64,
}

impl StockAdjustment {
    /// The signed effect of this adjustment on stock, given its reason.
    #[must_use]
    pub const fn signed_quantity(&self, reason: &StockAdjustmentReason) -> i64 {
        match reason.reason_type {
            ReasonType::Credit => self.quantity,
            ReasonType::Debit => -self.quantity,
        }
    }
}
