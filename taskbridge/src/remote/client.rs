//! HTTP client for the remote execution host.
//!
//! Wire contract: `POST {base}/task` to submit, `GET {base}/task/{id}/state`
//! to read the lifecycle snapshot. Network-level retries are the remote
//! collaborator's concern; this client reports errors and lets the poller's
//! hard timeout bound the overall wait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::state::TaskSnapshot;
use super::{RemoteBackend, SubmitAck, SubmitOptions};
use crate::config::RemoteConfig;
use crate::errors::BridgeError;
use crate::types::Task;

pub struct HttpRemoteBackend {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    task_id: &'a str,
    user_text: &'a str,
    options: &'a SubmitOptions,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    task_id: String,
}

impl HttpRemoteBackend {
    pub fn new(config: &RemoteConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| BridgeError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url(),
            client,
        })
    }

    /// Download an artifact (e.g. a screenshot) referenced by a result
    /// payload into `dest_dir`. Returns the local path.
    pub async fn download_artifact(
        &self,
        url: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, BridgeError> {
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| BridgeError::Backend(format!("cannot create {}: {}", dest_dir.display(), e)))?;

        let filename = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("artifact.png");
        let dest_path = dest_dir.join(filename);

        debug!(%url, dest = %dest_path.display(), "downloading artifact");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::Backend(format!("artifact download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BridgeError::Backend(format!(
                "artifact download failed with status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BridgeError::Backend(format!("artifact download failed: {}", e)))?;

        tokio::fs::write(&dest_path, &bytes)
            .await
            .map_err(|e| BridgeError::Backend(format!("cannot write {}: {}", dest_path.display(), e)))?;

        Ok(dest_path)
    }
}

#[async_trait]
impl RemoteBackend for HttpRemoteBackend {
    async fn submit(&self, task: &Task, options: SubmitOptions) -> Result<SubmitAck, BridgeError> {
        let url = format!("{}/task", self.base_url);
        info!(task_id = %task.task_id, %url, "submitting task to remote host");

        let body = SubmitRequest {
            task_id: &task.task_id,
            user_text: task.request.trim(),
            options: &options,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BridgeError::Backend(format!("could not reach remote host: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Backend(format!(
                "submit rejected ({}): {}",
                status, body
            )));
        }

        let ack: SubmitResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::Backend(format!("malformed submit response: {}", e)))?;

        Ok(SubmitAck {
            task_id: ack.task_id,
        })
    }

    async fn get_state(&self, task_id: &str) -> Result<TaskSnapshot, BridgeError> {
        let url = format!("{}/task/{}/state", self.base_url, task_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BridgeError::Backend(format!("could not reach remote host: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Backend(format!(
                "state query rejected ({}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BridgeError::Backend(format!("malformed state response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_comes_from_config() {
        let config = RemoteConfig {
            host: "10.1.2.3".to_string(),
            port: 8001,
            ..RemoteConfig::default()
        };
        let backend = HttpRemoteBackend::new(&config).unwrap();
        assert_eq!(backend.base_url, "http://10.1.2.3:8001");
    }
}
