//! Domain models

pub mod record;
pub mod workload;
