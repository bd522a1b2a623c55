#![forbid(unsafe_code)]

pub mod leads;
pub mod repo;
