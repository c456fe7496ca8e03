//! Resource enumerator
//!
//! Reconstructs the set of live VM deployments across all configured farms.
//! Fan-out is two-level: one task per farm, one future per contract. Every
//! worker returns its own records and a single merge after the join barrier
//! produces the union, so no accumulator is shared while workers run.

use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use crate::config::Config;
use crate::errors::SpawnerError;
use crate::grid::{Contract, GridSession};
use crate::models::record::{DeploymentMetadata, VmRecord};
use crate::models::workload::project_name;

/// List the live VMs of every configured farm.
///
/// Best-effort by design: a failing farm or contract only drops its own
/// contribution, the caller receives the union of everything that resolved.
/// The returned collection carries no ordering.
pub async fn list(
    config: &Config,
    session: Arc<dyn GridSession>,
) -> Result<Vec<VmRecord>, SpawnerError> {
    let mut workers = Vec::with_capacity(config.farms.len());
    for &farm in &config.farms {
        let session = session.clone();
        workers.push(tokio::spawn(async move { list_farm(farm, session).await }));
    }

    let mut records = Vec::new();
    for worker in workers {
        match worker.await {
            Ok(mut farm_records) => records.append(&mut farm_records),
            Err(e) => warn!(error = %e, "farm enumeration worker failed"),
        }
    }

    Ok(records)
}

/// Enumerate one farm's contracts
async fn list_farm(farm: u64, session: Arc<dyn GridSession>) -> Vec<VmRecord> {
    let project = project_name(farm);

    let contracts = match session.list_contracts(&project).await {
        Ok(contracts) => contracts,
        Err(e) => {
            warn!(farm, error = %e, "failed to list contracts, skipping farm");
            return Vec::new();
        }
    };
    if contracts.is_empty() {
        warn!(farm, project = %project, "no VMs found for farm");
        return Vec::new();
    }

    let lookups = contracts.into_iter().map(|contract| {
        let session = session.clone();
        let project = project.clone();
        async move { resolve_contract(farm, project, contract, session).await }
    });

    join_all(lookups).await.into_iter().flatten().collect()
}

/// Resolve one contract into a VM record, if it backs a VM deployment
async fn resolve_contract(
    farm: u64,
    project: String,
    contract: Contract,
    session: Arc<dyn GridSession>,
) -> Option<VmRecord> {
    let record = match session.get_deployment(contract.contract_id).await {
        Ok(record) => record,
        Err(e) => {
            warn!(farm, contract = contract.contract_id, error = %e, "failed to fetch deployment, skipping contract");
            return None;
        }
    };

    let metadata: DeploymentMetadata = match serde_json::from_str(&record.metadata) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(farm, contract = contract.contract_id, error = %e, "failed to decode metadata, skipping contract");
            return None;
        }
    };

    if metadata.kind != "vm" {
        return None;
    }

    Some(VmRecord {
        farm,
        node: contract.node_id,
        name: metadata.name,
        contract: contract.contract_id,
        project_name: project,
    })
}
