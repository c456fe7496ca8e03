//! Deployment orchestrator
//!
//! Drives batch deployment per farm, classifies partial failure and applies
//! the configured recovery strategy. Farms are handled sequentially because
//! a farm's network batch must complete before its VM batch is submitted and
//! its retry loop must observe the previous attempt's outcome.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::{Config, FailureStrategy};
use crate::errors::{ErrorStack, SpawnerError};
use crate::grid::GridSession;
use crate::models::workload::{project_name, DeploymentPair, NetworkDef};
use crate::ops::plan;
use crate::shutdown::ShutdownToken;

/// Fixed pause between retry attempts
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Deploy benchmark VMs across every configured farm.
///
/// A farm whose node discovery fails is logged and skipped; a farm whose
/// deployment fails terminally aborts the run with the aggregated error.
pub async fn spawn(
    config: &Config,
    session: &dyn GridSession,
    shutdown: &ShutdownToken,
) -> Result<(), SpawnerError> {
    let started = Instant::now();

    for &farm in &config.farms {
        if shutdown.is_cancelled() {
            warn!(farm, "cancellation observed, not starting farm");
            return Err(SpawnerError::Cancelled);
        }

        info!(farm, "running deployment");

        let nodes = match plan::select_nodes(session, farm).await {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(farm, error = %e, "failed to discover nodes, skipping farm");
                continue;
            }
        };

        let count = plan::target_count(nodes.len(), config.deployment_strategy);
        if count == 0 {
            warn!(farm, "there is nothing to deploy");
            continue;
        }

        let pairs = plan::build_pairs(config, &nodes[..count]);
        deploy_farm(config, session, farm, pairs, shutdown).await?;
    }

    info!("deployment took {:?}", started.elapsed());
    Ok(())
}

/// Deploy one farm's pairs, recovering from partial failure per the
/// configured strategy
async fn deploy_farm(
    config: &Config,
    session: &dyn GridSession,
    farm: u64,
    mut pairs: Vec<DeploymentPair>,
    shutdown: &ShutdownToken,
) -> Result<(), SpawnerError> {
    let mut errors = ErrorStack::new();

    for attempt in 1..=config.max_retries {
        if attempt > 1 {
            if shutdown.is_cancelled() {
                warn!(farm, "cancellation observed, not retrying");
                return Err(SpawnerError::Cancelled);
            }
            info!(farm, attempt, "retrying deployment");
            tokio::time::sleep(RETRY_DELAY).await;
        }

        let before = errors.len();

        // Networks strictly before VMs; both batches run so every error of
        // the attempt lands in the same aggregate.
        if let Err(e) = session.deploy_networks(&mut pairs).await {
            debug!(farm, error = %e, "network batch reported failures");
            errors.push(e);
        }
        if let Err(e) = session.deploy_vms(&mut pairs).await {
            debug!(farm, error = %e, "vm batch reported failures");
            errors.push(e);
        }

        if errors.len() == before {
            return Ok(());
        }

        debug!(
            farm,
            strategy = config.failure_strategy.as_str(),
            "applying failure strategy"
        );

        match config.failure_strategy {
            FailureStrategy::Stop => return Err(SpawnerError::DeployError(errors)),

            FailureStrategy::DestroyAll => {
                info!(farm, "destroying all farm resources after failure");
                if let Err(e) = session.cancel_by_project(&project_name(farm)).await {
                    let mut cleanup = ErrorStack::new();
                    cleanup.push(e);
                    return Err(SpawnerError::CleanupError(cleanup));
                }
                return Err(SpawnerError::DeployError(errors));
            }

            FailureStrategy::DestroyFailing => {
                destroy_failing_networks(session, &pairs).await?;
                info!(farm, "failing pairs destroyed, partial deployment accepted");
                return Ok(());
            }

            FailureStrategy::Retry => {
                pairs.retain(|pair| pair.is_failed());
                if pairs.is_empty() {
                    // Batch reported an error but every pair carries its
                    // grid identifiers; surface the error rather than loop.
                    return Err(SpawnerError::DeployError(errors));
                }
                debug!(farm, failing = pairs.len(), "retaining failing pairs for retry");
            }
        }
    }

    error!(farm, error = %errors, "deployment failed after retries");
    Err(SpawnerError::RetriesExhausted {
        attempts: config.max_retries,
        errors,
    })
}

/// Cancel the network half of every failing pair that was partially created.
/// Networks with no node mapping never existed on the grid and need no
/// cancellation.
async fn destroy_failing_networks(
    session: &dyn GridSession,
    pairs: &[DeploymentPair],
) -> Result<(), SpawnerError> {
    let failing: Vec<NetworkDef> = pairs
        .iter()
        .filter(|pair| pair.is_failed() && !pair.network.node_deployment_ids.is_empty())
        .map(|pair| pair.network.clone())
        .collect();

    if failing.is_empty() {
        return Ok(());
    }

    session.cancel_networks(&failing).await.map_err(|e| {
        let mut cleanup = ErrorStack::new();
        cleanup.push(e);
        SpawnerError::CleanupError(cleanup)
    })
}
