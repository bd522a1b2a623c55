#![forbid(unsafe_code)]

use serde::Serialize;

use crate::lead::LeadCreateInput;
use crate::{ContractViolation, Validate};

/// Existing-key scan page size for the duplicate check. The store offers
/// no batch key-existence query, so the importer walks every page.
pub const DEDUP_SCAN_PAGE_SIZE: u16 = 5000;
/// Creations issued per chunk; chunks run one after another.
pub const CREATE_CHUNK_SIZE: usize = 100;
/// Detail lists in the report are capped; counts stay truthful.
pub const REPORT_DETAIL_CAP: usize = 10;

/// One raw CSV data row, untyped except for header mapping. Field values
/// are trimmed by the parser but otherwise unvalidated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsvLeadRow {
    pub frn: String,
    pub company_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub service_type: String,
    pub website: String,
}

/// A row rejected by validation. `row` is the user-visible CSV line
/// number: data index + 2 (1-indexed plus the header line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowValidationError {
    pub row: usize,
    pub field: &'static str,
    pub value: String,
    #[serde(rename = "error")]
    pub message: &'static str,
}

/// A syntactically valid row the store refused to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedCreate {
    pub frn: String,
    #[serde(rename = "error")]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub created: usize,
    pub duplicates: usize,
    pub validation_errors: usize,
    pub failed: usize,
}

/// Truncated per-row detail. `validation_errors` and `failed` keep only
/// the first `REPORT_DETAIL_CAP` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportDetails {
    pub created: Vec<String>,
    pub skipped_duplicates: Vec<String>,
    pub validation_errors: Vec<RowValidationError>,
    pub failed: Vec<FailedCreate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub summary: ImportSummary,
    pub details: ImportDetails,
}

impl Validate for ImportReport {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.details.validation_errors.len() > REPORT_DETAIL_CAP {
            return Err(ContractViolation::InvalidValue {
                field: "import_report.details.validation_errors",
                reason: "detail list exceeds cap",
            });
        }
        if self.details.failed.len() > REPORT_DETAIL_CAP {
            return Err(ContractViolation::InvalidValue {
                field: "import_report.details.failed",
                reason: "detail list exceeds cap",
            });
        }
        if self.summary.validation_errors < self.details.validation_errors.len()
            || self.summary.failed < self.details.failed.len()
        {
            return Err(ContractViolation::InvalidValue {
                field: "import_report.summary",
                reason: "summary counts must cover detail lists",
            });
        }
        Ok(())
    }
}

/// A row that passed every validation rule and is ready for creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRow {
    pub row: usize,
    pub input: LeadCreateInput,
}
