// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CrawlerSettings;
use crate::domain::models::status::BackendStatus;
use crate::engines::traits::{CrawlerEngine, DiscoveryError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// 主爬虫 REST 控制客户端
///
/// 通过 `{base_url}/jobs/{id}/{action}` 驱动爬虫任务的生命周期。
pub struct RestCrawlerEngine {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct CreateJobRequest<'a> {
    id: &'a str,
    domain: &'a str,
    seeds: Vec<String>,
}

#[derive(Deserialize)]
struct JobStatusResponse {
    state: String,
    #[serde(default)]
    finished: bool,
    #[serde(default)]
    discovered_count: Option<u64>,
}

impl RestCrawlerEngine {
    pub fn new(settings: &CrawlerSettings) -> Result<Self, DiscoveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn job_url(&self, job_id: &str) -> String {
        format!("{}/jobs/{}", self.base_url, job_id)
    }

    async fn post_action(&self, job_id: &str, action: &str) -> Result<(), DiscoveryError> {
        let url = format!("{}/{}", self.job_url(job_id), action);
        debug!("Crawler action {} for job {}", action, job_id);
        let response = self.client.post(&url).send().await?;
        if !response.status().is_success() {
            return Err(DiscoveryError::UnexpectedStatus {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(())
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusResponse, DiscoveryError> {
        let url = self.job_url(job_id);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(DiscoveryError::UnexpectedStatus {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CrawlerEngine for RestCrawlerEngine {
    async fn create_job(&self, job_id: &str, domain: &str) -> Result<(), DiscoveryError> {
        let url = format!("{}/jobs", self.base_url);
        let body = CreateJobRequest {
            id: job_id,
            domain,
            seeds: vec![format!("http://{}", domain), format!("https://{}", domain)],
        };
        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(DiscoveryError::UnexpectedStatus {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(())
    }

    async fn build_job(&self, job_id: &str) -> Result<(), DiscoveryError> {
        self.post_action(job_id, "build").await
    }

    async fn launch_job(&self, job_id: &str) -> Result<(), DiscoveryError> {
        self.post_action(job_id, "launch").await
    }

    async fn pause_job(&self, job_id: &str) -> Result<(), DiscoveryError> {
        self.post_action(job_id, "pause").await
    }

    async fn unpause_job(&self, job_id: &str) -> Result<(), DiscoveryError> {
        self.post_action(job_id, "unpause").await
    }

    async fn is_finished(&self, job_id: &str) -> Result<bool, DiscoveryError> {
        let status = self.fetch_status(job_id).await?;
        Ok(status.finished || status.state.eq_ignore_ascii_case("finished"))
    }

    async fn status(&self, job_id: &str) -> Result<BackendStatus, DiscoveryError> {
        let status = self.fetch_status(job_id).await?;
        let finished = status.finished || status.state.eq_ignore_ascii_case("finished");
        let description = match status.discovered_count {
            Some(count) => format!("{} ({} documents discovered)", status.state, count),
            None => status.state,
        };
        Ok(BackendStatus {
            description,
            finished: Some(finished),
        })
    }

    async fn teardown(&self, job_id: &str) -> Result<(), DiscoveryError> {
        self.post_action(job_id, "teardown").await
    }
}
