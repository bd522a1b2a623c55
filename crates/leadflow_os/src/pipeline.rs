#![forbid(unsafe_code)]

use std::cmp::max;

use leadflow_engines::access::{AccessFilterConfig, AccessFilterRuntime};
use leadflow_kernel_contracts::lead::{HistoryActor, HistoryEvent, LeadRecord, PipelineStatus};
use leadflow_kernel_contracts::ops::StatusUpdateRequest;
use leadflow_kernel_contracts::Validate;
use leadflow_storage::repo::LeadRepo;

use crate::error::OpError;

pub mod reason_codes {
    use leadflow_kernel_contracts::ReasonCodeId;

    pub const STATUS_UNKNOWN_VALUE: ReasonCodeId = ReasonCodeId(0x4C50_00F1);
    pub const STATUS_NOT_OWNER: ReasonCodeId = ReasonCodeId(0x4C50_00F2);
    pub const STATUS_LEAD_NOT_FOUND: ReasonCodeId = ReasonCodeId(0x4C50_00F3);
}

/// Pipeline stage moves on a single lead. The only transition rule is
/// membership in the fixed enum; any authorized actor may move a lead to
/// any stage at any time.
#[derive(Debug, Clone)]
pub struct StatusUpdateRuntime {
    access: AccessFilterRuntime,
}

impl Default for StatusUpdateRuntime {
    fn default() -> Self {
        Self {
            access: AccessFilterRuntime::new(AccessFilterConfig::mvp_v1()),
        }
    }
}

impl StatusUpdateRuntime {
    pub fn run<R: LeadRepo>(
        &self,
        store: &mut R,
        req: &StatusUpdateRequest,
    ) -> Result<LeadRecord, OpError> {
        req.validate()?;

        // Enum guard first: arbitrary strings must never reach the stored
        // status field, regardless of the caller's role.
        let new_status =
            PipelineStatus::parse(&req.new_status_raw).map_err(|violation| {
                OpError::Validation {
                    code: reason_codes::STATUS_UNKNOWN_VALUE,
                    violation,
                }
            })?;

        let lead = store
            .get_lead(&req.lead_id)
            .cloned()
            .ok_or_else(|| OpError::NotFound {
                code: reason_codes::STATUS_LEAD_NOT_FOUND,
                what: "lead",
                key: req.lead_id.as_str().to_string(),
            })?;

        if !self.access.can_update(&req.principal, &lead) {
            return Err(OpError::Authorization {
                code: reason_codes::STATUS_NOT_OWNER,
                reason: "only the assigned employee or an admin may update this lead",
            });
        }

        let mut next = lead;
        let at = max(req.now, next.history.last().map(|e| e.at).unwrap_or(req.now));
        next.pipeline_status = new_status;
        next.history.push(HistoryEvent::v1(
            HistoryActor::Principal(req.principal.id.clone()),
            format!("moved to {}", new_status.as_str()),
            at,
        )?);
        Ok(store.update_lead(next)?)
    }
}
