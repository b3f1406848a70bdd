use std::{fmt, str::FromStr};

/// The columns the engine knows how to calculate, validate or wire together.
///
/// Templates may contain columns with other names; those have no
/// calculation, no column-specific validation and no dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnKind {
    /// Stock at the start of the period (A).
    BeginningBalance,
    /// Quantity received during the period (B).
    TotalReceivedQuantity,
    /// Quantity dispensed or used during the period (C).
    TotalConsumedQuantity,
    /// Net of all losses and adjustments (D).
    TotalLossesAndAdjustments,
    /// Stock at the end of the period (E).
    StockOnHand,
    /// New patients enrolled during the period (F).
    NumberOfNewPatientsAdded,
    /// Ideal stock amount for the facility (G).
    IdealStockAmount,
    /// Maximum stock the facility should hold (H).
    MaximumStockQuantity,
    /// Quantity needed to reach the maximum stock (I).
    CalculatedOrderQuantity,
    /// Quantity the facility asks for (J).
    RequestedQuantity,
    /// Quantity granted by the approver (K).
    ApprovedQuantity,
    /// Approver comments (L).
    Remarks,
    /// Consumption adjusted for stockout days (N).
    AdjustedConsumption,
    /// Product code (O).
    ProductCode,
    /// Average of adjusted consumption over recent periods (P).
    AverageConsumption,
    /// Cost of the packs to ship (Q).
    TotalCost,
    /// Full product name (R).
    ProductName,
    /// Quantity needed to reach the ideal stock amount (S).
    CalculatedOrderQuantityIsa,
    /// Price of one pack (T).
    PricePerPack,
    /// Dispensing unit of the product (U).
    DispensingUnit,
    /// Packs needed to satisfy the order quantity (V).
    PacksToShip,
    /// Reason the requested quantity differs from the calculated one (W).
    RequestedQuantityExplanation,
    /// Days without stock during the period (X).
    TotalStockoutDays,
    /// Beginning balance plus receipts (Y).
    Total,
    /// Extra quantity requested on top of consumption (Z).
    AdditionalQuantityRequired,
    /// Marks the line item as not applicable for the period.
    Skipped,
}

impl ColumnKind {
    /// Every known column kind.
    pub const ALL: [Self; 26] = [
        Self::BeginningBalance,
        Self::TotalReceivedQuantity,
        Self::TotalConsumedQuantity,
        Self::TotalLossesAndAdjustments,
        Self::StockOnHand,
        Self::NumberOfNewPatientsAdded,
        Self::IdealStockAmount,
        Self::MaximumStockQuantity,
        Self::CalculatedOrderQuantity,
        Self::RequestedQuantity,
        Self::ApprovedQuantity,
        Self::Remarks,
        Self::AdjustedConsumption,
        Self::ProductCode,
        Self::AverageConsumption,
        Self::TotalCost,
        Self::ProductName,
        Self::CalculatedOrderQuantityIsa,
        Self::PricePerPack,
        Self::DispensingUnit,
        Self::PacksToShip,
        Self::RequestedQuantityExplanation,
        Self::TotalStockoutDays,
        Self::Total,
        Self::AdditionalQuantityRequired,
        Self::Skipped,
    ];

    /// The column name used in templates and line item documents.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BeginningBalance => "beginningBalance",
            Self::TotalReceivedQuantity => "totalReceivedQuantity",
            Self::TotalConsumedQuantity => "totalConsumedQuantity",
            Self::TotalLossesAndAdjustments => "totalLossesAndAdjustments",
            Self::StockOnHand => "stockOnHand",
            Self::NumberOfNewPatientsAdded => "numberOfNewPatientsAdded",
            Self::IdealStockAmount => "idealStockAmount",
            Self::MaximumStockQuantity => "maximumStockQuantity",
            Self::CalculatedOrderQuantity => "calculatedOrderQuantity",
            Self::RequestedQuantity => "requestedQuantity",
            Self::ApprovedQuantity => "approvedQuantity",
            Self::Remarks => "remarks",
            Self::AdjustedConsumption => "adjustedConsumption",
            Self::ProductCode => "orderable.productCode",
            Self::AverageConsumption => "averageConsumption",
            Self::TotalCost => "totalCost",
            Self::ProductName => "orderable.fullProductName",
            Self::CalculatedOrderQuantityIsa => "calculatedOrderQuantityIsa",
            Self::PricePerPack => "pricePerPack",
            Self::DispensingUnit => "orderable.dispensingUnit",
            Self::PacksToShip => "packsToShip",
            Self::RequestedQuantityExplanation => "requestedQuantityExplanation",
            Self::TotalStockoutDays => "totalStockoutDays",
            Self::Total => "total",
            Self::AdditionalQuantityRequired => "additionalQuantityRequired",
            Self::Skipped => "skipped",
        }
    }

    /// Looks up a kind by its column name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// The columns whose edits must trigger recomputation of this one.
    ///
    /// `StockOnHand` and `TotalConsumedQuantity` depend on each other. Only
    /// one of them may be calculated in a given template.
    #[must_use]
    pub const fn dependencies(self) -> &'static [Self] {
        match self {
            Self::TotalConsumedQuantity => &[
                Self::BeginningBalance,
                Self::TotalReceivedQuantity,
                Self::TotalLossesAndAdjustments,
                Self::StockOnHand,
            ],
            Self::StockOnHand => &[
                Self::BeginningBalance,
                Self::TotalReceivedQuantity,
                Self::TotalConsumedQuantity,
                Self::TotalLossesAndAdjustments,
            ],
            Self::Total => &[Self::BeginningBalance, Self::TotalReceivedQuantity],
            Self::AdjustedConsumption => &[
                Self::TotalConsumedQuantity,
                Self::TotalStockoutDays,
                Self::AdditionalQuantityRequired,
            ],
            Self::AverageConsumption => &[Self::AdjustedConsumption],
            Self::MaximumStockQuantity => &[Self::AverageConsumption],
            Self::CalculatedOrderQuantity => &[Self::MaximumStockQuantity, Self::StockOnHand],
            Self::CalculatedOrderQuantityIsa => &[Self::IdealStockAmount, Self::StockOnHand],
            Self::PacksToShip => &[
                Self::RequestedQuantity,
                Self::ApprovedQuantity,
                Self::CalculatedOrderQuantity,
            ],
            Self::TotalCost => &[Self::PacksToShip, Self::PricePerPack],
            Self::BeginningBalance
            | Self::TotalReceivedQuantity
            | Self::TotalLossesAndAdjustments
            | Self::NumberOfNewPatientsAdded
            | Self::IdealStockAmount
            | Self::RequestedQuantity
            | Self::ApprovedQuantity
            | Self::Remarks
            | Self::ProductCode
            | Self::ProductName
            | Self::PricePerPack
            | Self::DispensingUnit
            | Self::RequestedQuantityExplanation
            | Self::TotalStockoutDays
            | Self::AdditionalQuantityRequired
            | Self::Skipped => &[],
        }
    }

    /// Columns that only make sense once the requisition reaches approval.
    #[must_use]
    pub const fn is_approval_stage(self) -> bool {
        matches!(self, Self::ApprovedQuantity | Self::Remarks)
    }

    /// Whether the column belongs to the reduced set shown for non-full
    /// supply products and emergency requisitions.
    #[must_use]
    pub const fn is_non_full_supply(self) -> bool {
        matches!(
            self,
            Self::ProductCode
                | Self::ProductName
                | Self::DispensingUnit
                | Self::RequestedQuantity
                | Self::RequestedQuantityExplanation
                | Self::ApprovedQuantity
                | Self::Remarks
                | Self::PacksToShip
                | Self::PricePerPack
                | Self::TotalCost
        )
    }

    /// Columns owned by the stock ledger when a template populates stock on
    /// hand from stock cards.
    #[must_use]
    pub const fn is_stock_based(self) -> bool {
        matches!(
            self,
            Self::BeginningBalance
                | Self::TotalReceivedQuantity
                | Self::TotalConsumedQuantity
                | Self::TotalLossesAndAdjustments
                | Self::StockOnHand
                | Self::TotalStockoutDays
        )
    }

    /// The column that can be derived from this one when the template lets
    /// users enter both.
    #[must_use]
    pub const fn counterpart(self) -> Option<Self> {
        match self {
            Self::StockOnHand => Some(Self::TotalConsumedQuantity),
            Self::TotalConsumedQuantity => Some(Self::StockOnHand),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a name does not match any known column.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown column '{0}'")]
pub struct UnknownColumnError(String);

impl FromStr for ColumnKind {
    type Err = UnknownColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownColumnError(s.to_string()))
    }
}
