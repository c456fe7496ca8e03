//! Workload definitions deployed to the grid
//!
//! Each target node receives one network workload and one VM workload. The
//! two are carried together as a [`DeploymentPair`] so they can never fall
//! out of step during retries.

use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

pub const GB: u64 = 1024 * 1024 * 1024;

/// Fixed per-VM resource template
pub const CPU_COUNT: u32 = 4;
pub const MEMORY_GB: u64 = 8;
pub const ROOT_SIZE_GB: u64 = 40;

/// Boot image and entry command for the benchmark VMs
pub const BOOT_IMAGE: &str = "https://hub.grid.tf/amryassir.3bot/benchmark.flist";
pub const ENTRYPOINT: &str = "/sbin/zinit init";

/// Project name grouping all resources of one farm's campaign
pub fn project_name(farm_id: u64) -> String {
    format!("vm/{}", farm_id)
}

/// Private address block assigned to every network workload
pub fn default_ip_range() -> Ipv4Net {
    Ipv4Net::new(Ipv4Addr::new(10, 20, 0, 0), 16).expect("/16 is a valid prefix length")
}

/// Network workload scoped to a single node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDef {
    /// Deterministic name, derived from the node id
    pub name: String,

    /// The one node this network spans
    pub node_id: u32,

    /// Private address block
    pub ip_range: Ipv4Net,

    /// WireGuard access is never needed for benchmark VMs
    pub add_wg_access: bool,

    /// Project name tying the network to its farm campaign
    pub project_name: String,

    /// Per-node deployment ids, filled in by the grid on successful deploy.
    /// Empty means the network never made it onto the node.
    #[serde(default)]
    pub node_deployment_ids: HashMap<u32, u64>,
}

/// VM workload referencing its paired network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmDef {
    /// Deterministic name, derived from the node id
    pub name: String,

    /// Target node
    pub node_id: u32,

    /// Project name tying the VM to its farm campaign
    pub project_name: String,

    /// Name of the paired network workload
    pub network_name: String,

    /// Boot image
    pub flist: String,

    /// Entry command
    pub entrypoint: String,

    /// vCPU count
    pub cpu: u32,

    /// Memory in MB
    pub memory_mb: u64,

    /// Root filesystem size in MB
    pub rootfs_mb: u64,

    /// Attach the VM to the planetary network so it is reachable without
    /// WireGuard access
    pub planetary: bool,

    /// Environment injected into the VM
    pub env: BTreeMap<String, String>,

    /// Contract id, filled in by the grid on successful deploy.
    /// None means the VM never made it onto the node.
    #[serde(default)]
    pub contract_id: Option<u64>,
}

/// One network plus one VM deployed together for a single target node
#[derive(Debug, Clone)]
pub struct DeploymentPair {
    pub network: NetworkDef,
    pub vm: VmDef,
}

impl DeploymentPair {
    /// The node both halves of the pair target
    pub fn node_id(&self) -> u32 {
        self.vm.node_id
    }

    /// A pair is failing when either half is missing its grid-assigned
    /// identifier after a batch deploy returned
    pub fn is_failed(&self) -> bool {
        self.vm.contract_id.is_none() || self.network.node_deployment_ids.is_empty()
    }
}
