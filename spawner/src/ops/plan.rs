//! Deployment planning: target sizing and workload pair construction

use std::collections::BTreeMap;

use secrecy::ExposeSecret;

use crate::config::Config;
use crate::errors::SpawnerError;
use crate::grid::{EligibleNode, GridSession, NodeFilter};
use crate::models::workload::{
    default_ip_range, project_name, DeploymentPair, NetworkDef, VmDef, BOOT_IMAGE, CPU_COUNT,
    ENTRYPOINT, GB, MEMORY_GB, ROOT_SIZE_GB,
};

/// Discover the eligible nodes of one farm.
///
/// The free-memory/free-storage thresholds equal the fixed VM template, so
/// every returned node can host exactly one deployment pair.
pub async fn select_nodes(
    session: &dyn GridSession,
    farm: u64,
) -> Result<Vec<EligibleNode>, SpawnerError> {
    let filter = NodeFilter {
        farm_id: farm,
        free_mru: MEMORY_GB * GB,
        free_sru: ROOT_SIZE_GB * GB,
    };

    session.filter_nodes(&filter).await
}

/// Number of deployment pairs to request: `floor(nodes * strategy)`.
/// The strategy fraction is validated to lie in [0, 1] at config load.
pub fn target_count(node_count: usize, strategy: f64) -> usize {
    (node_count as f64 * strategy) as usize
}

/// Build one deployment pair per node, in discovery order.
/// Performs no I/O and cannot fail.
pub fn build_pairs(config: &Config, nodes: &[EligibleNode]) -> Vec<DeploymentPair> {
    nodes.iter().map(|node| build_pair(config, node)).collect()
}

fn build_pair(config: &Config, node: &EligibleNode) -> DeploymentPair {
    let project = project_name(node.farm_id);
    let network_name = format!("network_{}", node.node_id);

    let network = NetworkDef {
        name: network_name.clone(),
        node_id: node.node_id,
        ip_range: default_ip_range(),
        add_wg_access: false,
        project_name: project.clone(),
        node_deployment_ids: Default::default(),
    };

    let mut env = BTreeMap::new();
    env.insert("INFLUX_URL".to_string(), config.influx.url.clone());
    env.insert("INFLUX_ORG".to_string(), config.influx.org.clone());
    env.insert(
        "INFLUX_TOKEN".to_string(),
        config.influx.token.expose_secret().to_string(),
    );
    env.insert("INFLUX_BUCKET".to_string(), config.influx.bucket.clone());
    env.insert("NODE_ID".to_string(), node.node_id.to_string());
    env.insert("FARM_ID".to_string(), node.farm_id.to_string());
    env.insert(
        "SSH_KEY".to_string(),
        config.ssh_key.expose_secret().to_string(),
    );

    let vm = VmDef {
        name: format!("vm_{}", node.node_id),
        node_id: node.node_id,
        project_name: project,
        network_name,
        flist: BOOT_IMAGE.to_string(),
        entrypoint: ENTRYPOINT.to_string(),
        cpu: CPU_COUNT,
        memory_mb: MEMORY_GB * 1024,
        rootfs_mb: ROOT_SIZE_GB * 1024,
        planetary: true,
        env,
        contract_id: None,
    };

    DeploymentPair { network, vm }
}
