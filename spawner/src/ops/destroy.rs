//! Destroy cascade
//!
//! Cancels every resource grouped under each configured farm's project name.
//! Every farm is attempted even after an earlier failure; teardown favors
//! maximal cleanup over fail-fast, so cancellation errors are aggregated and
//! returned together.

use tracing::{error, info};

use crate::config::Config;
use crate::errors::{ErrorStack, SpawnerError};
use crate::grid::GridSession;
use crate::models::workload::project_name;

/// Cancel the network and compute resources of every configured farm.
/// A project name with no matching resources is a no-op.
pub async fn destroy(config: &Config, session: &dyn GridSession) -> Result<(), SpawnerError> {
    let mut errors = ErrorStack::new();

    for &farm in &config.farms {
        let project = project_name(farm);
        info!(farm, project = %project, "cancelling project resources");

        if let Err(e) = session.cancel_by_project(&project).await {
            error!(farm, error = %e, "failed to cancel project resources");
            errors.push(e);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SpawnerError::CleanupError(errors))
    }
}
