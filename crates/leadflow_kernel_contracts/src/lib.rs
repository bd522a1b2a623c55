#![forbid(unsafe_code)]

pub mod common;
pub mod import;
pub mod lead;
pub mod ops;
pub mod principal;
pub mod query;

pub use common::{ContractViolation, MonotonicTimeNs, ReasonCodeId, SchemaVersion, Validate};
