#![forbid(unsafe_code)]

use leadflow_kernel_contracts::lead::{HistoryEvent, LeadCreateInput, LeadId, LeadRecord};
use leadflow_kernel_contracts::query::{LeadPage, LeadQuery};
use leadflow_kernel_contracts::MonotonicTimeNs;

use crate::leads::StorageError;

/// Typed repository interface over the external lead document collection.
///
/// The collection offers per-document read, create, and whole-document
/// update plus filtered/paginated listing — and nothing stronger: no
/// multi-document transactions and no conditional write. Updates are
/// last-write-wins by arrival order. Orchestration runtimes are generic
/// over this trait so they can be driven against a fake store in tests.
pub trait LeadRepo {
    fn get_lead(&self, id: &LeadId) -> Option<&LeadRecord>;

    /// Create a new document. The store assigns the id, stamps
    /// `created_at`, and seeds the history with the given entries.
    fn create_lead(
        &mut self,
        input: LeadCreateInput,
        history_seed: Vec<HistoryEvent>,
        now: MonotonicTimeNs,
    ) -> Result<LeadRecord, StorageError>;

    /// Whole-document replacement. Last write wins; no version check.
    fn update_lead(&mut self, record: LeadRecord) -> Result<LeadRecord, StorageError>;

    /// Filtered, cursor-paginated listing, newest first. `total` counts
    /// every matching document, not just the returned page.
    fn list_leads(&self, query: &LeadQuery) -> Result<LeadPage, StorageError>;
}
