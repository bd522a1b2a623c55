#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use leadflow_engines::csv_import::{CsvImportConfig, CsvImportRuntime};
use leadflow_kernel_contracts::import::{
    FailedCreate, ImportDetails, ImportReport, ImportSummary, ValidatedRow, CREATE_CHUNK_SIZE,
    DEDUP_SCAN_PAGE_SIZE, REPORT_DETAIL_CAP,
};
use leadflow_kernel_contracts::lead::{Frn, HistoryActor, HistoryEvent};
use leadflow_kernel_contracts::query::{AssigneeFilter, LeadQuery};
use leadflow_kernel_contracts::{MonotonicTimeNs, Validate};
use leadflow_storage::repo::LeadRepo;

use crate::error::{storage_error_message, OpError};

pub const IMPORT_HISTORY_ACTION: &str = "csv_import";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportConfig {
    pub scan_page_size: u16,
    pub create_chunk_size: usize,
    pub detail_cap: usize,
}

impl ImportConfig {
    pub fn mvp_v1() -> Self {
        Self {
            scan_page_size: DEDUP_SCAN_PAGE_SIZE,
            create_chunk_size: CREATE_CHUNK_SIZE,
            detail_cap: REPORT_DETAIL_CAP,
        }
    }
}

/// Batch ingestion: parse, validate, deduplicate, create. Per-row
/// validation failures, duplicates, and creation failures are collected
/// into the report and never abort the remaining rows; only a malformed
/// file is fatal.
#[derive(Debug, Clone)]
pub struct ImportRuntime {
    config: ImportConfig,
    csv: CsvImportRuntime,
}

impl Default for ImportRuntime {
    fn default() -> Self {
        Self {
            config: ImportConfig::mvp_v1(),
            csv: CsvImportRuntime::new(CsvImportConfig::mvp_v1()),
        }
    }
}

impl ImportRuntime {
    pub fn run<R: LeadRepo>(
        &self,
        store: &mut R,
        raw: &[u8],
        now: MonotonicTimeNs,
    ) -> Result<ImportReport, OpError> {
        let rows = self.csv.parse(raw)?;
        let total = rows.len();
        let (valid, validation_errors) = self.csv.validate_rows(&rows);

        let existing = self.scan_existing_frns(store)?;

        // Rows duplicating the store's key space are skipped, and so is a
        // second occurrence of an frn within the same upload.
        let mut seen: BTreeSet<Frn> = existing;
        let mut skipped_duplicates: Vec<String> = Vec::new();
        let mut to_create: Vec<ValidatedRow> = Vec::new();
        for row in valid {
            if seen.contains(&row.input.frn) {
                skipped_duplicates.push(row.input.frn.as_str().to_string());
            } else {
                seen.insert(row.input.frn.clone());
                to_create.push(row);
            }
        }

        let mut created: Vec<String> = Vec::new();
        let mut failed: Vec<FailedCreate> = Vec::new();
        for chunk in to_create.chunks(self.config.create_chunk_size) {
            for row in chunk {
                let frn = row.input.frn.as_str().to_string();
                let seed = vec![HistoryEvent::v1(
                    HistoryActor::System,
                    IMPORT_HISTORY_ACTION,
                    now,
                )?];
                match store.create_lead(row.input.clone(), seed, now) {
                    Ok(_) => created.push(frn),
                    Err(e) => failed.push(FailedCreate {
                        frn,
                        message: storage_error_message(&e),
                    }),
                }
            }
        }

        let summary = ImportSummary {
            total,
            created: created.len(),
            duplicates: skipped_duplicates.len(),
            validation_errors: validation_errors.len(),
            failed: failed.len(),
        };
        let mut capped_validation_errors = validation_errors;
        capped_validation_errors.truncate(self.config.detail_cap);
        let mut capped_failed = failed;
        capped_failed.truncate(self.config.detail_cap);

        let report = ImportReport {
            summary,
            details: ImportDetails {
                created,
                skipped_duplicates,
                validation_errors: capped_validation_errors,
                failed: capped_failed,
            },
        };
        report.validate()?;
        Ok(report)
    }

    /// Exhaustive paginated walk of the existing key space. The store has
    /// no batch key-existence query, so every page is visited until a
    /// short page signals the end.
    fn scan_existing_frns<R: LeadRepo>(&self, store: &R) -> Result<BTreeSet<Frn>, OpError> {
        let mut existing = BTreeSet::new();
        let mut cursor = None;
        loop {
            let query = LeadQuery {
                search: None,
                status: None,
                assigned: AssigneeFilter::Any,
                cursor: cursor.clone(),
                limit: self.config.scan_page_size,
            };
            let page = store.list_leads(&query)?;
            let short = page.documents.len() < self.config.scan_page_size as usize;
            for doc in page.documents {
                existing.insert(doc.frn.clone());
                cursor = Some(doc.id);
            }
            if short {
                return Ok(existing);
            }
        }
    }
}
