#![forbid(unsafe_code)]

pub mod claim;
pub mod error;
pub mod export;
pub mod import;
pub mod leads;
pub mod metrics;
pub mod pipeline;
