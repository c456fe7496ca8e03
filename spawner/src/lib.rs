//! Spawner Library
//!
//! Deployment orchestration for benchmark VM fleets on a decentralized
//! compute grid: per-farm target sizing, paired network+VM workload
//! construction, batch deployment with pluggable failure recovery, and
//! concurrent cross-farm enumeration and teardown.

pub mod config;
pub mod errors;
pub mod grid;
pub mod logs;
pub mod models;
pub mod ops;
pub mod shutdown;
pub mod utils;
