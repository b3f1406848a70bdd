use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

/// Rights an actor can hold for a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Right {
    /// Initiate and fill in requisitions.
    RequisitionCreate,
    /// Delete requisitions.
    RequisitionDelete,
    /// Authorize submitted requisitions.
    RequisitionAuthorize,
    /// Approve authorized requisitions.
    RequisitionApprove,
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::RequisitionCreate => "REQUISITION_CREATE",
            Self::RequisitionDelete => "REQUISITION_DELETE",
            Self::RequisitionAuthorize => "REQUISITION_AUTHORIZE",
            Self::RequisitionApprove => "REQUISITION_APPROVE",
        })
    }
}

/// Answers whether the current actor holds a right for a program.
///
/// The engine never manages sessions; it only asks this question
/// synchronously.
pub trait RightsProvider {
    /// Whether the actor holds `right` for the program with this code.
    fn has_right(&self, right: Right, program_code: &str) -> bool;
}

impl<F> RightsProvider for F
where
    F: Fn(Right, &str) -> bool,
{
    fn has_right(&self, right: Right, program_code: &str) -> bool {
        self(right, program_code)
    }
}

/// A fixed set of granted rights.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantedRights {
    grants: BTreeSet<(Right, String)>,
}

impl GrantedRights {
    /// Grants a right for a program.
    ///
    /// Returns `true` if the grant is new.
    pub fn grant(&mut self, right: Right, program_code: impl Into<String>) -> bool {
        self.grants.insert((right, program_code.into()))
    }

    /// Whether no rights have been granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Iterates over the granted rights.
    pub fn iter(&self) -> impl Iterator<Item = (Right, &str)> {
        self.grants
            .iter()
            .map(|(right, program)| (*right, program.as_str()))
    }
}

impl FromIterator<(Right, String)> for GrantedRights {
    fn from_iter<T: IntoIterator<Item = (Right, String)>>(iter: T) -> Self {
        Self {
            grants: iter.into_iter().collect(),
        }
    }
}

impl RightsProvider for GrantedRights {
    fn has_right(&self, right: Right, program_code: &str) -> bool {
        self.grants
            .iter()
            .any(|(granted, program)| *granted == right && program == program_code)
    }
}
