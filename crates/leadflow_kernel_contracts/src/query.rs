#![forbid(unsafe_code)]

use crate::lead::{LeadId, LeadRecord, PipelineStatus};
use crate::principal::PrincipalId;
use crate::{ContractViolation, Validate};

pub const LIST_LIMIT_CAP: u16 = 100;
pub const LIST_LIMIT_DEFAULT: u16 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssigneeFilter {
    /// No constraint on the assignee field.
    Any,
    /// Unclaimed leads only (`assigned_employee_id` is null).
    Unassigned,
    /// Leads assigned to exactly this principal.
    Principal(PrincipalId),
}

/// Client-requested list filters, exactly as supplied. Never executed
/// directly: the access filter turns this into a `LeadQuery` first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedLeadQuery {
    pub search: Option<String>,
    pub status: Option<PipelineStatus>,
    pub assigned: AssigneeFilter,
    pub cursor: Option<LeadId>,
    pub limit: u16,
}

impl RequestedLeadQuery {
    pub fn unfiltered() -> Self {
        Self {
            search: None,
            status: None,
            assigned: AssigneeFilter::Any,
            cursor: None,
            limit: LIST_LIMIT_DEFAULT,
        }
    }
}

/// Sanitized filters the store is allowed to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadQuery {
    pub search: Option<String>,
    pub status: Option<PipelineStatus>,
    pub assigned: AssigneeFilter,
    pub cursor: Option<LeadId>,
    pub limit: u16,
}

impl Validate for LeadQuery {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.limit == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "lead_query.limit",
                reason: "must be at least 1",
            });
        }
        if self.limit > 5000 {
            return Err(ContractViolation::InvalidValue {
                field: "lead_query.limit",
                reason: "must be <= 5000",
            });
        }
        if let Some(cursor) = &self.cursor {
            cursor.validate()?;
        }
        if let AssigneeFilter::Principal(id) = &self.assigned {
            id.validate()?;
        }
        Ok(())
    }
}

/// One page of list results. `total` is the full matching count, not the
/// page length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadPage {
    pub documents: Vec<LeadRecord>,
    pub total: u64,
}
