//! Grid client surface
//!
//! The orchestration engine only ever talks to the grid through the
//! [`GridSession`] trait; `http` provides the gateway-backed implementation
//! used by the CLI.

pub mod http;
pub mod session;

pub use session::{Contract, DeploymentRecord, EligibleNode, GridSession, NodeFilter};
