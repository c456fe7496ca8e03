//! Grid session trait and discovery types

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::SpawnerError;
use crate::models::workload::{DeploymentPair, NetworkDef};

/// Criteria for selecting eligible nodes within one farm
#[derive(Debug, Clone, Serialize)]
pub struct NodeFilter {
    /// Farm to search
    pub farm_id: u64,

    /// Minimum free memory in bytes
    pub free_mru: u64,

    /// Minimum free storage in bytes
    pub free_sru: u64,
}

/// Candidate compute host returned by node discovery
#[derive(Debug, Clone, Deserialize)]
pub struct EligibleNode {
    pub node_id: u32,
    pub farm_id: u64,

    /// Free memory in bytes at discovery time
    #[serde(default)]
    pub free_mru: u64,

    /// Free storage in bytes at discovery time
    #[serde(default)]
    pub free_sru: u64,
}

/// Node contract belonging to a project
#[derive(Debug, Clone, Deserialize)]
pub struct Contract {
    pub contract_id: u64,
    pub node_id: u32,
}

/// Deployment record retrieved for one contract
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentRecord {
    pub contract_id: u64,

    /// JSON-encoded metadata payload, see
    /// [`DeploymentMetadata`](crate::models::record::DeploymentMetadata)
    pub metadata: String,

    /// Per-node deployment ids backing this record
    #[serde(default)]
    pub node_deployment_ids: HashMap<u32, u64>,
}

/// An open session against the grid.
///
/// Batch deploys are partial-failure tolerant: each call records the
/// grid-assigned identifiers on the pairs that succeeded and returns an
/// aggregated error covering the pairs that did not. Failures and successes
/// coexist in the same batch and nothing is rolled back here.
#[async_trait]
pub trait GridSession: Send + Sync {
    /// Discover nodes that are up, healthy and meet the filter thresholds
    async fn filter_nodes(&self, filter: &NodeFilter) -> Result<Vec<EligibleNode>, SpawnerError>;

    /// Deploy the network half of every pair as one batch
    async fn deploy_networks(&self, pairs: &mut [DeploymentPair]) -> Result<(), SpawnerError>;

    /// Deploy the VM half of every pair as one batch
    async fn deploy_vms(&self, pairs: &mut [DeploymentPair]) -> Result<(), SpawnerError>;

    /// Cancel the given network workloads as one batch
    async fn cancel_networks(&self, networks: &[NetworkDef]) -> Result<(), SpawnerError>;

    /// Cancel every resource grouped under a project name.
    /// A name with no matching resources is a no-op, not an error.
    async fn cancel_by_project(&self, project: &str) -> Result<(), SpawnerError>;

    /// List the node contracts grouped under a project name
    async fn list_contracts(&self, project: &str) -> Result<Vec<Contract>, SpawnerError>;

    /// Retrieve the deployment record backing a contract
    async fn get_deployment(&self, contract_id: u64) -> Result<DeploymentRecord, SpawnerError>;
}
