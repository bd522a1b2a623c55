#![forbid(unsafe_code)]

pub mod access;
pub mod csv_import;
