#![forbid(unsafe_code)]

use crate::common::validate_id;
use crate::principal::PrincipalId;
use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const LEAD_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeadId(String);

impl LeadId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for LeadId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("lead_id", &self.0, 64)
    }
}

/// Business registration code: the lead's natural key. Exactly 10 ASCII
/// digits; uniqueness is enforced by the importer, not the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frn(String);

impl Frn {
    pub fn new(frn: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(frn.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for Frn {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.len() != 10 || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ContractViolation::InvalidValue {
                field: "frn",
                reason: "must be exactly 10 digits",
            });
        }
        Ok(())
    }
}

/// Fixed sales-pipeline stages. `Unassigned` is entered only at creation;
/// a successful claim moves the lead to `EmailSent`. No other ordering is
/// enforced between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStatus {
    Unassigned,
    EmailSent,
    ClientReplied,
    PlanSent,
    RateFinalized,
    DocsSigned,
    Testing,
    Approved,
    Rejected,
}

pub const PIPELINE_STATUSES: [PipelineStatus; 9] = [
    PipelineStatus::Unassigned,
    PipelineStatus::EmailSent,
    PipelineStatus::ClientReplied,
    PipelineStatus::PlanSent,
    PipelineStatus::RateFinalized,
    PipelineStatus::DocsSigned,
    PipelineStatus::Testing,
    PipelineStatus::Approved,
    PipelineStatus::Rejected,
];

impl PipelineStatus {
    /// Wire names match the persisted document schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Unassigned => "Unassigned",
            PipelineStatus::EmailSent => "Email Sent",
            PipelineStatus::ClientReplied => "Client Replied",
            PipelineStatus::PlanSent => "Plan Sent",
            PipelineStatus::RateFinalized => "Rate Finalized",
            PipelineStatus::DocsSigned => "Docs Signed",
            PipelineStatus::Testing => "Testing",
            PipelineStatus::Approved => "Approved",
            PipelineStatus::Rejected => "Rejected",
        }
    }

    /// Strict membership parse: arbitrary strings must never reach the
    /// stored status field.
    pub fn parse(raw: &str) -> Result<PipelineStatus, ContractViolation> {
        PIPELINE_STATUSES
            .iter()
            .copied()
            .find(|s| s.as_str() == raw)
            .ok_or(ContractViolation::InvalidValue {
                field: "pipeline_status",
                reason: "not a member of the pipeline status enum",
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryActor {
    Principal(PrincipalId),
    System,
}

impl HistoryActor {
    pub fn as_str(&self) -> &str {
        match self {
            HistoryActor::Principal(id) => id.as_str(),
            HistoryActor::System => "system",
        }
    }
}

/// One append-only history entry. Structured at rest and on the wire;
/// never re-parsed from opaque text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEvent {
    pub actor: HistoryActor,
    pub action: String,
    pub at: MonotonicTimeNs,
}

impl HistoryEvent {
    pub fn v1(
        actor: HistoryActor,
        action: impl Into<String>,
        at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let v = Self {
            actor,
            action: action.into(),
            at,
        };
        v.validate()?;
        Ok(v)
    }
}

impl Validate for HistoryEvent {
    fn validate(&self) -> Result<(), ContractViolation> {
        if let HistoryActor::Principal(id) = &self.actor {
            id.validate()?;
        }
        validate_id("history_event.action", &self.action, 128)
    }
}

/// Descriptive fields accepted at creation time. The store assigns the
/// id, `created_at`, and the write sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadCreateInput {
    pub frn: Frn,
    pub company_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub service_type: Option<String>,
    pub website: Option<String>,
}

impl LeadCreateInput {
    pub fn v1(
        frn: Frn,
        company_name: impl Into<String>,
        contact_email: Option<String>,
        contact_phone: Option<String>,
        service_type: Option<String>,
        website: Option<String>,
    ) -> Result<Self, ContractViolation> {
        let v = Self {
            frn,
            company_name: company_name.into(),
            contact_email,
            contact_phone,
            service_type,
            website,
        };
        v.validate()?;
        Ok(v)
    }
}

impl Validate for LeadCreateInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.frn.validate()?;
        if self.company_name.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "lead_create_input.company_name",
                reason: "must not be empty",
            });
        }
        if self.company_name.len() > 256 {
            return Err(ContractViolation::InvalidValue {
                field: "lead_create_input.company_name",
                reason: "too long",
            });
        }
        Ok(())
    }
}

/// The whole persisted lead document. Mutated only through whole-document
/// writes; `sequence` is bumped by the store on every write and is
/// observational only (the store exposes no conditional write keyed on it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadRecord {
    pub id: LeadId,
    pub frn: Frn,
    pub company_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub service_type: Option<String>,
    pub website: Option<String>,
    pub assigned_employee_id: Option<PrincipalId>,
    pub pipeline_status: PipelineStatus,
    pub history: Vec<HistoryEvent>,
    pub created_at: MonotonicTimeNs,
    pub sequence: u64,
}

impl LeadRecord {
    pub fn is_unclaimed(&self) -> bool {
        self.assigned_employee_id.is_none()
    }
}

impl Validate for LeadRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.id.validate()?;
        self.frn.validate()?;
        if self.company_name.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "lead_record.company_name",
                reason: "must not be empty",
            });
        }
        if let Some(a) = &self.assigned_employee_id {
            a.validate()?;
        }
        // Unclaimed leads must sit in the Unassigned stage.
        if self.assigned_employee_id.is_none()
            && self.pipeline_status != PipelineStatus::Unassigned
        {
            return Err(ContractViolation::InvalidValue {
                field: "lead_record.pipeline_status",
                reason: "unclaimed lead must be Unassigned",
            });
        }
        let mut last = MonotonicTimeNs(0);
        for event in &self.history {
            event.validate()?;
            if event.at < last {
                return Err(ContractViolation::InvalidValue {
                    field: "lead_record.history",
                    reason: "history timestamps must be non-decreasing",
                });
            }
            last = event.at;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_lead_01_frn_requires_exactly_ten_digits() {
        assert!(Frn::new("1234567890").is_ok());
        assert!(Frn::new("123456789").is_err());
        assert!(Frn::new("12345678901").is_err());
        assert!(Frn::new("12345678AB").is_err());
        assert!(Frn::new("").is_err());
    }

    #[test]
    fn at_lead_02_status_parse_round_trips_all_nine_values() {
        for status in PIPELINE_STATUSES {
            assert_eq!(PipelineStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn at_lead_03_status_parse_rejects_arbitrary_strings() {
        assert!(PipelineStatus::parse("Hacked").is_err());
        assert!(PipelineStatus::parse("email sent").is_err());
        assert!(PipelineStatus::parse("").is_err());
    }

    #[test]
    fn at_lead_04_unclaimed_record_must_be_unassigned_stage() {
        let record = LeadRecord {
            id: LeadId::new("lead_1").unwrap(),
            frn: Frn::new("1234567890").unwrap(),
            company_name: "Acme".to_string(),
            contact_email: None,
            contact_phone: None,
            service_type: None,
            website: None,
            assigned_employee_id: None,
            pipeline_status: PipelineStatus::EmailSent,
            history: vec![],
            created_at: MonotonicTimeNs(1),
            sequence: 1,
        };
        assert!(record.validate().is_err());
    }

    #[test]
    fn at_lead_05_history_timestamps_must_not_regress() {
        let actor = HistoryActor::System;
        let record = LeadRecord {
            id: LeadId::new("lead_2").unwrap(),
            frn: Frn::new("1234567890").unwrap(),
            company_name: "Acme".to_string(),
            contact_email: None,
            contact_phone: None,
            service_type: None,
            website: None,
            assigned_employee_id: None,
            pipeline_status: PipelineStatus::Unassigned,
            history: vec![
                HistoryEvent::v1(actor.clone(), "csv_import", MonotonicTimeNs(20)).unwrap(),
                HistoryEvent::v1(actor, "claimed", MonotonicTimeNs(10)).unwrap(),
            ],
            created_at: MonotonicTimeNs(1),
            sequence: 1,
        };
        assert!(record.validate().is_err());
    }
}
