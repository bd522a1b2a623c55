#![forbid(unsafe_code)]

use leadflow_engines::access::{AccessFilterConfig, AccessFilterRuntime};
use leadflow_kernel_contracts::lead::{LeadId, LeadRecord};
use leadflow_kernel_contracts::principal::Principal;
use leadflow_kernel_contracts::query::{LeadPage, RequestedLeadQuery};
use leadflow_kernel_contracts::ContractViolation;
use leadflow_storage::leads::StorageError;
use leadflow_storage::repo::LeadRepo;

use crate::error::OpError;

pub mod reason_codes {
    use leadflow_kernel_contracts::ReasonCodeId;

    pub const LEAD_VIEW_FORBIDDEN: ReasonCodeId = ReasonCodeId(0x4C41_00F1);
    pub const LEAD_NOT_FOUND: ReasonCodeId = ReasonCodeId(0x4C41_00F2);
    pub const LEAD_LIST_BAD_CURSOR: ReasonCodeId = ReasonCodeId(0x4C41_00F3);
}

/// Read paths: filtered listing and single-document fetch. Every request
/// passes through the access filter before the store sees it.
#[derive(Debug, Clone)]
pub struct LeadDirectoryRuntime {
    access: AccessFilterRuntime,
}

impl Default for LeadDirectoryRuntime {
    fn default() -> Self {
        Self {
            access: AccessFilterRuntime::new(AccessFilterConfig::mvp_v1()),
        }
    }
}

impl LeadDirectoryRuntime {
    pub fn list<R: LeadRepo>(
        &self,
        store: &R,
        principal: &Principal,
        requested: &RequestedLeadQuery,
    ) -> Result<LeadPage, OpError> {
        let query = self.access.sanitize_list_query(principal, requested);
        match store.list_leads(&query) {
            Ok(page) => Ok(page),
            // An unknown pagination cursor is client input, not a missing
            // resource.
            Err(StorageError::NotFound { .. }) => Err(OpError::Validation {
                code: reason_codes::LEAD_LIST_BAD_CURSOR,
                violation: ContractViolation::InvalidValue {
                    field: "cursor",
                    reason: "cursor does not reference a listed document",
                },
            }),
            Err(other) => Err(other.into()),
        }
    }

    pub fn get<R: LeadRepo>(
        &self,
        store: &R,
        principal: &Principal,
        lead_id: &LeadId,
    ) -> Result<LeadRecord, OpError> {
        let lead = store
            .get_lead(lead_id)
            .cloned()
            .ok_or_else(|| OpError::NotFound {
                code: reason_codes::LEAD_NOT_FOUND,
                what: "lead",
                key: lead_id.as_str().to_string(),
            })?;
        if !self.access.can_view(principal, &lead) {
            return Err(OpError::Authorization {
                code: reason_codes::LEAD_VIEW_FORBIDDEN,
                reason: "lead is assigned to another employee",
            });
        }
        Ok(lead)
    }
}
