#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};

use leadflow_kernel_contracts::lead::{
    Frn, HistoryActor, HistoryEvent, LeadCreateInput, LeadId, LeadRecord, PipelineStatus,
};
use leadflow_kernel_contracts::principal::PrincipalId;
use leadflow_kernel_contracts::query::{AssigneeFilter, LeadPage, LeadQuery};
use leadflow_kernel_contracts::{ContractViolation, MonotonicTimeNs, Validate};

use crate::repo::LeadRepo;

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    NotFound { table: &'static str, key: String },
    DuplicateKey { table: &'static str, key: String },
    WriteRejected { table: &'static str, key: String },
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

const LEADS_TABLE: &str = "leads";

/// In-memory model of the external lead collection. Deliberately as weak
/// as the real store: whole-document last-write-wins updates, no
/// conditional write, no cross-document transaction, no uniqueness on
/// `frn`.
#[derive(Debug, Default)]
pub struct LeadStore {
    docs: BTreeMap<LeadId, LeadRecord>,
    creation_order: Vec<LeadId>,
    create_counter: u64,
    rejected_frns: BTreeSet<Frn>,
    queued_race_write: Option<PrincipalId>,
}

impl LeadStore {
    pub fn new_in_memory() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Test support: the next creations carrying this frn are refused by
    /// the store, modeling a transport or quota failure for that row.
    pub fn inject_create_failure(&mut self, frn: Frn) {
        self.rejected_frns.insert(frn);
    }

    /// Test support: models a concurrent claimant whose write arrives at
    /// the store immediately after the next update and therefore wins
    /// under last-write-wins ordering.
    pub fn queue_race_overwrite(&mut self, winner: PrincipalId) {
        self.queued_race_write = Some(winner);
    }

    fn assign_id(&mut self, frn: &Frn) -> LeadId {
        loop {
            self.create_counter += 1;
            let mut hasher = Sha256::new();
            hasher.update(frn.as_str().as_bytes());
            hasher.update(self.create_counter.to_be_bytes());
            let digest = hasher.finalize();
            let mut hex = String::with_capacity(16);
            for byte in digest.iter().take(8) {
                hex.push_str(&format!("{byte:02x}"));
            }
            let id = LeadId::new(format!("lead_{hex}"))
                .expect("generated lead id is short non-empty ASCII");
            if !self.docs.contains_key(&id) {
                return id;
            }
        }
    }
}

impl LeadRepo for LeadStore {
    fn get_lead(&self, id: &LeadId) -> Option<&LeadRecord> {
        self.docs.get(id)
    }

    fn create_lead(
        &mut self,
        input: LeadCreateInput,
        history_seed: Vec<HistoryEvent>,
        now: MonotonicTimeNs,
    ) -> Result<LeadRecord, StorageError> {
        input.validate()?;
        if self.rejected_frns.contains(&input.frn) {
            return Err(StorageError::WriteRejected {
                table: LEADS_TABLE,
                key: input.frn.as_str().to_string(),
            });
        }
        let id = self.assign_id(&input.frn);
        let record = LeadRecord {
            id: id.clone(),
            frn: input.frn,
            company_name: input.company_name,
            contact_email: input.contact_email,
            contact_phone: input.contact_phone,
            service_type: input.service_type,
            website: input.website,
            assigned_employee_id: None,
            pipeline_status: PipelineStatus::Unassigned,
            history: history_seed,
            created_at: now,
            sequence: 1,
        };
        record.validate()?;
        self.docs.insert(id.clone(), record.clone());
        self.creation_order.push(id);
        Ok(record)
    }

    fn update_lead(&mut self, record: LeadRecord) -> Result<LeadRecord, StorageError> {
        record.validate()?;
        let stored = self
            .docs
            .get_mut(&record.id)
            .ok_or_else(|| StorageError::NotFound {
                table: LEADS_TABLE,
                key: record.id.as_str().to_string(),
            })?;
        let mut next = record;
        next.sequence = stored.sequence + 1;
        *stored = next.clone();

        // A queued competing write lands right behind ours and, being the
        // later arrival, persists under last-write-wins.
        if let Some(winner) = self.queued_race_write.take() {
            let competing_at = stored
                .history
                .last()
                .map(|e| e.at)
                .unwrap_or(stored.created_at);
            stored.assigned_employee_id = Some(winner.clone());
            stored.pipeline_status = PipelineStatus::EmailSent;
            stored.history.push(
                HistoryEvent::v1(HistoryActor::Principal(winner), "claimed", competing_at)
                    .expect("race overwrite history entry is valid"),
            );
            stored.sequence += 1;
        }
        Ok(next)
    }

    fn list_leads(&self, query: &LeadQuery) -> Result<LeadPage, StorageError> {
        query.validate()?;
        let matches: Vec<&LeadRecord> = self
            .creation_order
            .iter()
            .rev()
            .filter_map(|id| self.docs.get(id))
            .filter(|lead| {
                if let Some(needle) = &query.search {
                    let haystack = lead.company_name.to_lowercase();
                    if !haystack.contains(&needle.to_lowercase()) {
                        return false;
                    }
                }
                if let Some(status) = query.status {
                    if lead.pipeline_status != status {
                        return false;
                    }
                }
                match &query.assigned {
                    AssigneeFilter::Any => true,
                    AssigneeFilter::Unassigned => lead.assigned_employee_id.is_none(),
                    AssigneeFilter::Principal(id) => {
                        lead.assigned_employee_id.as_ref() == Some(id)
                    }
                }
            })
            .collect();
        let total = matches.len() as u64;

        let skip = match &query.cursor {
            Some(cursor) => match matches.iter().position(|l| l.id == *cursor) {
                Some(pos) => pos + 1,
                None => {
                    return Err(StorageError::NotFound {
                        table: LEADS_TABLE,
                        key: cursor.as_str().to_string(),
                    })
                }
            },
            None => 0,
        };
        let documents = matches
            .into_iter()
            .skip(skip)
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok(LeadPage { documents, total })
    }
}
