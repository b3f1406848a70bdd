//! Template columns.
//!
//! A [`ColumnDefinition`] is the deployment-level description of a column as
//! configured in a template. A [`Column`] decorates a definition with flags
//! that depend on the owning requisition: whether it is displayed, whether it
//! is required, and which other columns feed its value.

use std::{borrow::Borrow, fmt, ops::Deref};

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};

use crate::domain::{ColumnKind, RequisitionStatus};

/// A validated, non-empty column name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnName(NonEmptyString);

impl ColumnName {
    /// Creates a column name.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyColumnNameError`] if the name is empty.
    pub fn new(name: String) -> Result<Self, EmptyColumnNameError> {
        NonEmptyString::new(name)
            .map(Self)
            .map_err(|_| EmptyColumnNameError)
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Error returned when a column name is empty.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("column name must not be empty")]
pub struct EmptyColumnNameError;

impl TryFrom<String> for ColumnName {
    type Error = EmptyColumnNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ColumnName {
    type Error = EmptyColumnNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl From<ColumnKind> for ColumnName {
    fn from(kind: ColumnKind) -> Self {
        Self(NonEmptyString::new(kind.name().to_string()).expect("known column names are never empty"))
    }
}

impl From<ColumnName> for String {
    fn from(name: ColumnName) -> Self {
        name.as_str().to_owned()
    }
}

impl Borrow<str> for ColumnName {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl Deref for ColumnName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a column's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnSource {
    /// Entered by the user.
    UserInput,
    /// Derived from other columns.
    Calculated,
    /// Static product metadata.
    ReferenceData,
    /// Maintained by the external stock ledger.
    StockCards,
}

/// The type of value a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    /// Free text.
    Text,
    /// Whole numbers.
    Numeric,
    /// Monetary amounts.
    Currency,
    /// Flags.
    Boolean,
}

impl ValueType {
    /// Whether values of this type are numbers.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Numeric | Self::Currency)
    }
}

/// Named behaviour modifiers a column may be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionName {
    /// Skipped line items are removed from the grid.
    HideSkippedLineItems,
    /// Skipped line items stay visible with their inputs disabled.
    DisableSkippedLineItems,
    /// Packs to ship are only shown on the approval pages.
    ShowPackToShipInApprovalPage,
    /// Packs to ship are shown on every page.
    ShowPackToShipInAllPages,
    /// An option the engine does not act on.
    #[serde(other)]
    Unrecognised,
}

/// The option selected for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnOption {
    /// The selected behaviour.
    pub option_name: OptionName,
}

/// Deployment-level description of a template column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    /// Unique key of the column within a template.
    pub name: ColumnName,
    /// Human readable heading.
    #[serde(default)]
    pub label: String,
    /// Sort letter shown next to the heading.
    #[serde(default)]
    pub indicator: Option<String>,
    /// Help text.
    #[serde(default)]
    pub definition: Option<String>,
    /// Where the value comes from.
    pub source: ColumnSource,
    /// The type of value held.
    pub value_type: ValueType,
    /// Whether user input is mandatory.
    #[serde(default)]
    pub mandatory: bool,
    /// Whether administrators may reorder the column.
    #[serde(default)]
    pub can_change_order: bool,
    /// Ordering key among columns of the same supply type.
    #[serde(default)]
    pub display_order: i32,
    /// Behaviour modifier.
    #[serde(default)]
    pub option: Option<ColumnOption>,
    /// Deployment-level on/off switch.
    #[serde(default = "default_displayed")]
    pub is_displayed: bool,
    /// Grouping tag for calculated columns.
    #[serde(default)]
    pub tag: Option<String>,
}

const fn default_displayed() -> bool {
    true
}

impl ColumnDefinition {
    /// Creates a displayed, optional column definition.
    #[must_use]
    pub fn new(name: ColumnName, source: ColumnSource, value_type: ValueType) -> Self {
        Self {
            label: name.to_string(),
            name,
            indicator: None,
            definition: None,
            source,
            value_type,
            mandatory: false,
            can_change_order: true,
            display_order: 0,
            option: None,
            is_displayed: true,
            tag: None,
        }
    }

    /// The selected option name, if any.
    #[must_use]
    pub fn option_name(&self) -> Option<OptionName> {
        self.option.map(|option| option.option_name)
    }
}

/// A template column decorated with requisition-dependent flags.
///
/// The flags are computed once at construction. If the requisition moves to
/// another status a new column must be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    definition: ColumnDefinition,
    kind: Option<ColumnKind>,
    display: bool,
    required: bool,
    full_supply_only: bool,
}

impl Column {
    /// Decorates a definition for a requisition in the given status.
    #[must_use]
    pub fn new(definition: ColumnDefinition, status: RequisitionStatus) -> Self {
        let kind = ColumnKind::from_name(definition.name.as_str());
        let display = is_displayed(&definition, kind, status);
        let required = definition.source == ColumnSource::UserInput && definition.mandatory;
        let full_supply_only = !kind.is_some_and(ColumnKind::is_non_full_supply);

        Self {
            definition,
            kind,
            display,
            required,
            full_supply_only,
        }
    }

    /// The underlying definition.
    #[must_use]
    pub const fn definition(&self) -> &ColumnDefinition {
        &self.definition
    }

    /// The column name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.definition.name.as_str()
    }

    /// The known kind of this column, if the engine recognises its name.
    #[must_use]
    pub const fn kind(&self) -> Option<ColumnKind> {
        self.kind
    }

    /// Where the value comes from.
    #[must_use]
    pub const fn source(&self) -> ColumnSource {
        self.definition.source
    }

    /// The type of value held.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.definition.value_type
    }

    /// Ordering key among columns of the same supply type.
    #[must_use]
    pub const fn display_order(&self) -> i32 {
        self.definition.display_order
    }

    /// Whether the column is currently shown.
    #[must_use]
    pub const fn is_displayed(&self) -> bool {
        self.display
    }

    /// Whether a value must be entered.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the column only appears for full supply products on regular
    /// requisitions.
    #[must_use]
    pub const fn is_full_supply_only(&self) -> bool {
        self.full_supply_only
    }

    /// Whether this is the column used to mark line items as skipped.
    #[must_use]
    pub fn is_skip_column(&self) -> bool {
        self.kind == Some(ColumnKind::Skipped)
    }

    /// Names of the columns whose edits must trigger recomputation of this
    /// one.
    pub fn dependencies(&self) -> impl Iterator<Item = &'static str> + use<> {
        self.kind
            .map_or(&[][..], ColumnKind::dependencies)
            .iter()
            .map(|kind| kind.name())
    }

    /// Whether edits to the named column must trigger recomputation of this
    /// one.
    #[must_use]
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies().any(|dependency| dependency == name)
    }
}

fn is_displayed(
    definition: &ColumnDefinition,
    kind: Option<ColumnKind>,
    status: RequisitionStatus,
) -> bool {
    if !definition.is_displayed {
        return false;
    }

    match kind {
        Some(kind) if kind.is_approval_stage() => status.is_after_authorize(),
        Some(ColumnKind::PacksToShip) => match definition.option_name() {
            Some(OptionName::ShowPackToShipInApprovalPage) => status.is_after_authorize(),
            _ => true,
        },
        _ => true,
    }
}
