#![forbid(unsafe_code)]

use leadflow_kernel_contracts::{ContractViolation, ReasonCodeId};
use leadflow_storage::leads::StorageError;

pub mod reason_codes {
    use leadflow_kernel_contracts::ReasonCodeId;

    pub const OP_CONTRACT_INVALID: ReasonCodeId = ReasonCodeId(0x4C00_00F1);
}

/// Operation-level error taxonomy. Each variant maps to exactly one HTTP
/// status at the adapter edge; within the batch importer, per-row
/// validation and duplicate detection never surface here.
#[derive(Debug, Clone, PartialEq)]
pub enum OpError {
    Authentication {
        code: ReasonCodeId,
        reason: &'static str,
    },
    Authorization {
        code: ReasonCodeId,
        reason: &'static str,
    },
    Validation {
        code: ReasonCodeId,
        violation: ContractViolation,
    },
    Conflict {
        code: ReasonCodeId,
        reason: &'static str,
    },
    NotFound {
        code: ReasonCodeId,
        what: &'static str,
        key: String,
    },
    /// Unexpected failure from the store or transport.
    Storage(StorageError),
}

impl From<ContractViolation> for OpError {
    fn from(violation: ContractViolation) -> Self {
        OpError::Validation {
            code: reason_codes::OP_CONTRACT_INVALID,
            violation,
        }
    }
}

impl From<StorageError> for OpError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::ContractViolation(v) => v.into(),
            other => OpError::Storage(other),
        }
    }
}

pub(crate) fn storage_error_message(e: &StorageError) -> String {
    match e {
        StorageError::NotFound { table, key } => format!("{table}: {key} not found"),
        StorageError::DuplicateKey { table, key } => format!("{table}: duplicate key {key}"),
        StorageError::WriteRejected { table, key } => {
            format!("{table}: write rejected for {key}")
        }
        StorageError::ContractViolation(_) => "document failed contract validation".to_string(),
    }
}
