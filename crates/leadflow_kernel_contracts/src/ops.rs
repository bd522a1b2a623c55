#![forbid(unsafe_code)]

use crate::lead::LeadId;
use crate::principal::Principal;
use crate::{ContractViolation, MonotonicTimeNs, Validate};

/// One claim attempt: the single Unassigned -> assigned-to-principal
/// transition. `now` is resolved by the adapter, never ambiently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    pub lead_id: LeadId,
    pub principal: Principal,
    pub now: MonotonicTimeNs,
}

impl Validate for ClaimRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.lead_id.validate()?;
        self.principal.validate()
    }
}

/// One pipeline-stage move. The status arrives as the raw wire string and
/// is parsed against the fixed enum inside the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdateRequest {
    pub lead_id: LeadId,
    pub principal: Principal,
    pub new_status_raw: String,
    pub now: MonotonicTimeNs,
}

impl Validate for StatusUpdateRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.lead_id.validate()?;
        self.principal.validate()
    }
}
