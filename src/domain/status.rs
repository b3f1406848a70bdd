//! Requisition lifecycle states and the rules that gate line item mutation.
//!
//! Every component asks this module rather than comparing statuses itself.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::LineItem;

/// The lifecycle state of a requisition.
///
/// This is not a strict total order: a requisition can be rejected and
/// resubmitted any number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequisitionStatus {
    /// Created and being filled in by the facility.
    Initiated,
    /// Sent back to the facility by an approver.
    Rejected,
    /// Submitted for authorization.
    Submitted,
    /// Authorized at the facility, awaiting approval.
    Authorized,
    /// Part-way through a multi-level approval.
    InApproval,
    /// Fully approved.
    Approved,
    /// Converted into an order.
    Released,
    /// Closed without generating an order.
    ReleasedWithoutOrder,
    /// The period was skipped entirely.
    Skipped,
}

impl RequisitionStatus {
    /// Whether the requisition has passed authorization.
    ///
    /// Approval-stage columns are only shown from this point on.
    #[must_use]
    pub const fn is_after_authorize(self) -> bool {
        matches!(
            self,
            Self::Authorized
                | Self::InApproval
                | Self::Approved
                | Self::Released
                | Self::ReleasedWithoutOrder
        )
    }

    /// Whether the facility is still editing the requisition.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Initiated | Self::Submitted | Self::Rejected)
    }

    /// Whether the requisition is in one of the approval stages where only
    /// approval columns can change.
    #[must_use]
    pub const fn is_in_approval(self) -> bool {
        matches!(self, Self::Authorized | Self::InApproval)
    }

    /// Whether every field is frozen regardless of the actor's rights.
    #[must_use]
    pub const fn is_locked(self) -> bool {
        matches!(self, Self::Approved | Self::Released)
    }

    /// Whether line items may be marked as skipped in this state.
    #[must_use]
    pub const fn allows_skipping(self) -> bool {
        !matches!(
            self,
            Self::Approved | Self::Authorized | Self::InApproval | Self::Released
        )
    }

    /// The wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initiated => "INITIATED",
            Self::Rejected => "REJECTED",
            Self::Submitted => "SUBMITTED",
            Self::Authorized => "AUTHORIZED",
            Self::InApproval => "IN_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Released => "RELEASED",
            Self::ReleasedWithoutOrder => "RELEASED_WITHOUT_ORDER",
            Self::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for RequisitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a line item may be added to a requisition in this state.
#[must_use]
pub const fn can_add_line_item(status: RequisitionStatus) -> bool {
    status.is_editable()
}

/// Whether the given line item may be removed from a requisition in this
/// state. Full supply rows are fixed at initiation.
#[must_use]
pub fn can_delete_line_item(status: RequisitionStatus, line_item: &LineItem) -> bool {
    status.is_editable() && !line_item.is_full_supply()
}
