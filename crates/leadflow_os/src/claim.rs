#![forbid(unsafe_code)]

use std::cmp::max;

use leadflow_kernel_contracts::lead::{HistoryActor, HistoryEvent, LeadRecord, PipelineStatus};
use leadflow_kernel_contracts::ops::ClaimRequest;
use leadflow_kernel_contracts::Validate;
use leadflow_storage::repo::LeadRepo;

use crate::error::OpError;

pub mod reason_codes {
    use leadflow_kernel_contracts::ReasonCodeId;

    pub const CLAIM_ALREADY_ASSIGNED: ReasonCodeId = ReasonCodeId(0x4C43_00F1);
    pub const CLAIM_LOST_RACE: ReasonCodeId = ReasonCodeId(0x4C43_00F2);
    pub const CLAIM_LEAD_NOT_FOUND: ReasonCodeId = ReasonCodeId(0x4C43_00F3);
}

pub const CLAIM_HISTORY_ACTION: &str = "claimed";

/// The at-most-one-winner assignment transition.
///
/// The store has no conditional write, so the protocol approximates one
/// with a read, a pre-check, a whole-document write, and a verifying
/// re-read. A window remains between the read and the write where two
/// callers can both pass the pre-check; the re-read detects the loser
/// after the fact under the store's last-write-wins ordering. A store
/// with a real version-conditioned update should replace this whole
/// sequence with one conditional write.
#[derive(Debug, Clone, Default)]
pub struct ClaimRuntime;

impl ClaimRuntime {
    pub fn run<R: LeadRepo>(
        &self,
        store: &mut R,
        req: &ClaimRequest,
    ) -> Result<LeadRecord, OpError> {
        req.validate()?;

        let lead = store
            .get_lead(&req.lead_id)
            .cloned()
            .ok_or_else(|| OpError::NotFound {
                code: reason_codes::CLAIM_LEAD_NOT_FOUND,
                what: "lead",
                key: req.lead_id.as_str().to_string(),
            })?;

        // Pre-check: no write at all when the lead is already taken.
        if lead.assigned_employee_id.is_some() {
            return Err(OpError::Conflict {
                code: reason_codes::CLAIM_ALREADY_ASSIGNED,
                reason: "lead already claimed",
            });
        }

        let mut attempt = lead;
        let at = max(
            req.now,
            attempt.history.last().map(|e| e.at).unwrap_or(req.now),
        );
        attempt.assigned_employee_id = Some(req.principal.id.clone());
        attempt.pipeline_status = PipelineStatus::EmailSent;
        attempt.history.push(HistoryEvent::v1(
            HistoryActor::Principal(req.principal.id.clone()),
            CLAIM_HISTORY_ACTION,
            at,
        )?);
        store.update_lead(attempt)?;

        // Verify our write persisted; a later-arriving competitor wins
        // under last-write-wins.
        let observed = store
            .get_lead(&req.lead_id)
            .cloned()
            .ok_or_else(|| OpError::NotFound {
                code: reason_codes::CLAIM_LEAD_NOT_FOUND,
                what: "lead",
                key: req.lead_id.as_str().to_string(),
            })?;
        if observed.assigned_employee_id.as_ref() == Some(&req.principal.id) {
            Ok(observed)
        } else {
            Err(OpError::Conflict {
                code: reason_codes::CLAIM_LOST_RACE,
                reason: "lead already claimed",
            })
        }
    }
}
