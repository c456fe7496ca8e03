//! Enumeration results and deployment metadata

use serde::{Deserialize, Serialize};

/// One live VM discovered on the grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmRecord {
    /// Farm the VM belongs to
    pub farm: u64,

    /// Node hosting the VM
    pub node: u32,

    /// VM name from the deployment metadata
    pub name: String,

    /// Contract backing the deployment
    pub contract: u64,

    /// Project name the deployment is grouped under
    pub project_name: String,
}

/// Side-channel payload attached to a grid deployment record.
/// Only deployments with `type == "vm"` are counted during enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentMetadata {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub project_name: String,
}
