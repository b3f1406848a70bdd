use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product that can be ordered through a requisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Orderable {
    /// Stable identifier.
    pub id: Uuid,
    /// Short product code.
    pub product_code: String,
    /// Full product name.
    #[serde(default)]
    pub full_product_name: String,
    /// Unit in which the product is dispensed.
    #[serde(default)]
    pub dispensing_unit: Option<String>,
    /// Number of dispensing units in one pack.
    #[serde(default = "default_net_content")]
    pub net_content: i64,
    /// Remainder above which a partial pack is rounded up.
    #[serde(default)]
    pub pack_rounding_threshold: i64,
    /// Whether a quantity smaller than one pack may round down to zero packs.
    #[serde(default)]
    pub round_to_zero: bool,
    /// Per-program settings for this product.
    #[serde(default)]
    pub programs: Vec<ProgramOrderable>,
}

const fn default_net_content() -> i64 {
    1
}

impl Orderable {
    /// The settings of this product in the given program.
    #[must_use]
    pub fn program(&self, program_id: Uuid) -> Option<&ProgramOrderable> {
        self.programs
            .iter()
            .find(|program| program.program_id == program_id)
    }

    /// Packs needed to supply `quantity` dispensing units.
    ///
    /// Partial packs are rounded up once the remainder exceeds the rounding
    /// threshold. A positive quantity never rounds down to zero packs unless
    /// the product allows it.
    #[must_use]
    pub fn packs_for(&self, quantity: i64) -> i64 {
        if quantity <= 0 || self.net_content <= 0 {
            return 0;
        }

        let mut packs = quantity / self.net_content;
        let remainder = quantity % self.net_content;

        if remainder > 0 && remainder > self.pack_rounding_threshold {
            packs += 1;
        }

        if packs == 0 && !self.round_to_zero {
            packs = 1;
        }

        packs
    }
}

/// Program-specific settings for an orderable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramOrderable {
    /// The program these settings apply to.
    pub program_id: Uuid,
    /// Whether the product is full supply in this program.
    #[serde(default)]
    pub full_supply: bool,
    /// Category heading used to group line items.
    #[serde(default)]
    pub orderable_category_display_name: Option<String>,
    /// Sort key of the category.
    #[serde(default)]
    pub orderable_category_display_order: i32,
    /// Sort key of the product within its category.
    #[serde(default)]
    pub display_order: i32,
    /// Price of one pack.
    #[serde(default)]
    pub price_per_pack: Option<Decimal>,
}
