//! Gateway-backed grid session
//!
//! Talks to the grid gateway REST API. Batch endpoints return one outcome
//! per submitted workload so partial failure maps directly onto the
//! [`GridSession`] contract.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::{ErrorStack, SpawnerError};
use crate::grid::session::{Contract, DeploymentRecord, EligibleNode, GridSession, NodeFilter};
use crate::models::workload::{DeploymentPair, NetworkDef};

/// Grid session backed by the gateway REST API
pub struct GatewaySession {
    client: Client,
    base_url: String,
    token: SecretString,
}

/// Per-item result of a batch deploy or cancel call
#[derive(Debug, Deserialize)]
struct ItemOutcome {
    #[serde(default)]
    contract_id: Option<u64>,

    #[serde(default)]
    node_deployment_ids: HashMap<u32, u64>,

    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchOutcome {
    results: Vec<ItemOutcome>,
}

#[derive(Debug, Deserialize)]
struct ContractListResponse {
    contracts: Vec<Contract>,
}

#[derive(Debug, Deserialize)]
struct NodeListResponse {
    nodes: Vec<EligibleNode>,
}

impl GatewaySession {
    /// Create a new session against a gateway base URL
    pub fn new(base_url: &str, token: SecretString) -> Result<Self, SpawnerError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Make a GET request
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SpawnerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP GET failed: {} - {}", status, body);
            return Err(SpawnerError::GridError(format!("{}: {}", status, body)));
        }

        let body = response.json().await?;
        Ok(body)
    }

    /// Make a POST request
    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SpawnerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP POST failed: {} - {}", status, body);
            return Err(SpawnerError::GridError(format!("{}: {}", status, body)));
        }

        let body = response.json().await?;
        Ok(body)
    }

    /// Make a DELETE request
    async fn delete(&self, path: &str) -> Result<(), SpawnerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("HTTP DELETE failed: {} - {}", status, body);
            return Err(SpawnerError::GridError(format!("{}: {}", status, body)));
        }

        Ok(())
    }
}

fn project_query(project: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("project", project)
        .finish()
}

#[async_trait]
impl GridSession for GatewaySession {
    async fn filter_nodes(&self, filter: &NodeFilter) -> Result<Vec<EligibleNode>, SpawnerError> {
        let path = format!(
            "/v1/nodes?farm_id={}&status=up&healthy=true&free_mru={}&free_sru={}",
            filter.farm_id, filter.free_mru, filter.free_sru
        );
        let response: NodeListResponse = self
            .get(&path)
            .await
            .map_err(|e| SpawnerError::DiscoveryError(e.to_string()))?;
        Ok(response.nodes)
    }

    async fn deploy_networks(&self, pairs: &mut [DeploymentPair]) -> Result<(), SpawnerError> {
        let networks: Vec<&NetworkDef> = pairs.iter().map(|p| &p.network).collect();
        let outcome: BatchOutcome = self.post("/v1/deployments/networks", &networks).await?;

        if outcome.results.len() != pairs.len() {
            return Err(SpawnerError::GridError(format!(
                "gateway returned {} network results for {} workloads",
                outcome.results.len(),
                pairs.len()
            )));
        }

        let mut errors = ErrorStack::new();
        for (pair, result) in pairs.iter_mut().zip(outcome.results) {
            if let Some(err) = result.error {
                errors.push(SpawnerError::GridError(format!(
                    "network {}: {}",
                    pair.network.name, err
                )));
                continue;
            }
            pair.network.node_deployment_ids = result.node_deployment_ids;
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SpawnerError::DeployError(errors))
        }
    }

    async fn deploy_vms(&self, pairs: &mut [DeploymentPair]) -> Result<(), SpawnerError> {
        let vms: Vec<_> = pairs.iter().map(|p| &p.vm).collect();
        let outcome: BatchOutcome = self.post("/v1/deployments/vms", &vms).await?;

        if outcome.results.len() != pairs.len() {
            return Err(SpawnerError::GridError(format!(
                "gateway returned {} VM results for {} workloads",
                outcome.results.len(),
                pairs.len()
            )));
        }

        let mut errors = ErrorStack::new();
        for (pair, result) in pairs.iter_mut().zip(outcome.results) {
            if let Some(err) = result.error {
                errors.push(SpawnerError::GridError(format!(
                    "vm {}: {}",
                    pair.vm.name, err
                )));
                continue;
            }
            pair.vm.contract_id = result.contract_id;
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SpawnerError::DeployError(errors))
        }
    }

    async fn cancel_networks(&self, networks: &[NetworkDef]) -> Result<(), SpawnerError> {
        let _: serde_json::Value = self
            .post("/v1/deployments/networks/cancel", networks)
            .await?;
        Ok(())
    }

    async fn cancel_by_project(&self, project: &str) -> Result<(), SpawnerError> {
        self.delete(&format!("/v1/projects?{}", project_query(project)))
            .await
    }

    async fn list_contracts(&self, project: &str) -> Result<Vec<Contract>, SpawnerError> {
        let response: ContractListResponse = self
            .get(&format!("/v1/contracts?{}", project_query(project)))
            .await?;
        Ok(response.contracts)
    }

    async fn get_deployment(&self, contract_id: u64) -> Result<DeploymentRecord, SpawnerError> {
        self.get(&format!("/v1/deployments/{}", contract_id)).await
    }
}
