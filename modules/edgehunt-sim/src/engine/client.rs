use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::trajectory::TrajectorySample;
use crate::error::{Result, SimError};

/// What the bridge reports about the loaded world.
#[derive(Debug, Clone, Deserialize)]
pub struct WorldInfo {
    pub map: String,
    #[serde(default)]
    pub engine_version: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateScenarioRequest<'a> {
    document: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedScenario {
    pub scenario_id: String,
    #[serde(default)]
    pub actor_ids: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    pub samples: Vec<TrajectorySample>,
    #[serde(default)]
    pub collision: bool,
}

#[derive(Debug, Serialize)]
struct DestroyActorsRequest<'a> {
    actor_ids: &'a [u64],
}

/// JSON-over-HTTP client for the simulator bridge.
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl BridgeClient {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SimError::Connection(format!("failed to build engine client: {e}")))?;

        Ok(Self {
            http,
            base_url: format!("http://{host}:{port}"),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn world(&self) -> Result<WorldInfo> {
        let url = format!("{}/world", self.base_url);
        debug!(url = url.as_str(), "Engine world request");
        let resp = self.http.get(&url).send().await.map_err(|e| self.map_err(e))?;
        self.decode(resp).await
    }

    pub async fn create_scenario(&self, document: &str) -> Result<CreatedScenario> {
        let url = format!("{}/scenarios", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&CreateScenarioRequest { document })
            .send()
            .await
            .map_err(|e| self.map_err(e))?;
        self.decode(resp).await
    }

    pub async fn run_scenario(&self, scenario_id: &str) -> Result<RunResponse> {
        let url = format!("{}/scenarios/{}/run", self.base_url, scenario_id);
        let resp = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;
        self.decode(resp).await
    }

    pub async fn destroy_actors(&self, actor_ids: &[u64]) -> Result<()> {
        let url = format!("{}/actors", self.base_url);
        let resp = self
            .http
            .delete(&url)
            .json(&DestroyActorsRequest { actor_ids })
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SimError::Engine {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    async fn decode<T: serde::de::DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SimError::Engine {
                status: status.as_u16(),
                message,
            });
        }
        resp.json()
            .await
            .map_err(|e| SimError::Protocol(format!("malformed engine response: {e}")))
    }

    fn map_err(&self, e: reqwest::Error) -> SimError {
        if e.is_timeout() {
            SimError::Timeout(self.timeout)
        } else if e.is_connect() {
            SimError::Connection(format!("{}: {e}", self.base_url))
        } else {
            SimError::Protocol(e.to_string())
        }
    }
}
