//! Shared test fixtures: a scriptable in-memory grid session

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use secrecy::SecretString;

use spawner::config::{Config, FailureStrategy, GridSettings, InfluxSettings};
use spawner::errors::{ErrorStack, SpawnerError};
use spawner::grid::{Contract, DeploymentRecord, EligibleNode, GridSession, NodeFilter};
use spawner::models::workload::{DeploymentPair, NetworkDef};
use spawner::shutdown::ShutdownToken;

/// In-memory grid session with scriptable failures.
///
/// Deploy failures are scripted per attempt: each batch call pops the front
/// entry of the corresponding queue and fails the pairs whose node ids it
/// names. An empty queue means every pair succeeds.
#[derive(Default)]
pub struct MockSession {
    pub nodes: HashMap<u64, Vec<EligibleNode>>,
    pub fail_discovery: HashSet<u64>,

    pub network_failures: Mutex<VecDeque<HashSet<u32>>>,
    pub vm_failures: Mutex<VecDeque<HashSet<u32>>>,

    /// Node ids submitted per network batch call
    pub network_calls: Mutex<Vec<Vec<u32>>>,
    /// Node ids submitted per VM batch call
    pub vm_calls: Mutex<Vec<Vec<u32>>>,

    pub cancelled_projects: Mutex<Vec<String>>,
    pub fail_cancel: HashSet<String>,

    /// Network names submitted per cancel-networks call
    pub cancelled_networks: Mutex<Vec<Vec<String>>>,

    pub contracts: HashMap<String, Vec<Contract>>,
    pub fail_contracts: HashSet<String>,

    pub records: HashMap<u64, DeploymentRecord>,
    pub fail_records: HashSet<u64>,

    /// Token cancelled from inside the next VM batch call, simulating a
    /// shutdown signal arriving while a deployment is in flight
    pub cancel_during_vm_deploy: Mutex<Option<ShutdownToken>>,

    next_id: AtomicU64,
}

impl MockSession {
    pub fn new() -> Self {
        let session = Self::default();
        session.next_id.store(1000, Ordering::SeqCst);
        session
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl GridSession for MockSession {
    async fn filter_nodes(&self, filter: &NodeFilter) -> Result<Vec<EligibleNode>, SpawnerError> {
        if self.fail_discovery.contains(&filter.farm_id) {
            return Err(SpawnerError::DiscoveryError(format!(
                "discovery failed for farm {}",
                filter.farm_id
            )));
        }
        Ok(self.nodes.get(&filter.farm_id).cloned().unwrap_or_default())
    }

    async fn deploy_networks(&self, pairs: &mut [DeploymentPair]) -> Result<(), SpawnerError> {
        self.network_calls
            .lock()
            .unwrap()
            .push(pairs.iter().map(|p| p.node_id()).collect());

        let failures = self
            .network_failures
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();

        let mut errors = ErrorStack::new();
        for pair in pairs.iter_mut() {
            if failures.contains(&pair.node_id()) {
                pair.network.node_deployment_ids.clear();
                errors.push(SpawnerError::GridError(format!(
                    "network {} deploy failed",
                    pair.network.name
                )));
            } else {
                let id = self.next_id();
                pair.network.node_deployment_ids.insert(pair.node_id(), id);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SpawnerError::DeployError(errors))
        }
    }

    async fn deploy_vms(&self, pairs: &mut [DeploymentPair]) -> Result<(), SpawnerError> {
        self.vm_calls
            .lock()
            .unwrap()
            .push(pairs.iter().map(|p| p.node_id()).collect());

        if let Some(token) = self.cancel_during_vm_deploy.lock().unwrap().take() {
            token.cancel();
        }

        let failures = self
            .vm_failures
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();

        let mut errors = ErrorStack::new();
        for pair in pairs.iter_mut() {
            if failures.contains(&pair.node_id()) {
                pair.vm.contract_id = None;
                errors.push(SpawnerError::GridError(format!(
                    "vm {} deploy failed",
                    pair.vm.name
                )));
            } else {
                pair.vm.contract_id = Some(self.next_id());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SpawnerError::DeployError(errors))
        }
    }

    async fn cancel_networks(&self, networks: &[NetworkDef]) -> Result<(), SpawnerError> {
        self.cancelled_networks
            .lock()
            .unwrap()
            .push(networks.iter().map(|n| n.name.clone()).collect());
        Ok(())
    }

    async fn cancel_by_project(&self, project: &str) -> Result<(), SpawnerError> {
        self.cancelled_projects
            .lock()
            .unwrap()
            .push(project.to_string());

        if self.fail_cancel.contains(project) {
            return Err(SpawnerError::GridError(format!(
                "cancel failed for project {}",
                project
            )));
        }
        Ok(())
    }

    async fn list_contracts(&self, project: &str) -> Result<Vec<Contract>, SpawnerError> {
        if self.fail_contracts.contains(project) {
            return Err(SpawnerError::DiscoveryError(format!(
                "contract lookup failed for project {}",
                project
            )));
        }
        Ok(self.contracts.get(project).cloned().unwrap_or_default())
    }

    async fn get_deployment(&self, contract_id: u64) -> Result<DeploymentRecord, SpawnerError> {
        if self.fail_records.contains(&contract_id) {
            return Err(SpawnerError::DiscoveryError(format!(
                "deployment lookup failed for contract {}",
                contract_id
            )));
        }
        self.records.get(&contract_id).cloned().ok_or_else(|| {
            SpawnerError::DiscoveryError(format!("no deployment for contract {}", contract_id))
        })
    }
}

/// A farm's worth of eligible nodes with ids `1..=count`
pub fn eligible_nodes(farm_id: u64, count: u32) -> Vec<EligibleNode> {
    (1..=count)
        .map(|node_id| EligibleNode {
            node_id,
            farm_id,
            free_mru: 8 * 1024 * 1024 * 1024,
            free_sru: 40 * 1024 * 1024 * 1024,
        })
        .collect()
}

/// A deployment record whose metadata marks it as the given type
pub fn record(contract_id: u64, kind: &str, name: &str) -> DeploymentRecord {
    DeploymentRecord {
        contract_id,
        metadata: format!(r#"{{"type":"{}","name":"{}"}}"#, kind, name),
        node_deployment_ids: HashMap::new(),
    }
}

pub fn test_config(farms: Vec<u64>, strategy: f64, failure: FailureStrategy) -> Config {
    Config {
        farms,
        deployment_strategy: strategy,
        failure_strategy: failure,
        max_retries: 5,
        grid: GridSettings {
            gateway: "https://gateway.grid.example".to_string(),
        },
        mnemonic: SecretString::from(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about"
                .to_string(),
        ),
        ssh_key: SecretString::from("ssh-ed25519 AAAA test@host".to_string()),
        influx: InfluxSettings {
            url: "https://influx.example".to_string(),
            org: "bench".to_string(),
            token: SecretString::from("secret-token".to_string()),
            bucket: "vms".to_string(),
        },
    }
}
