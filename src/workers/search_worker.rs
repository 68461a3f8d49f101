// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::config::settings::SearchSettings;
use crate::domain::models::crawl_job::{CrawlJob, CrawlJobStatus, CrawlService};
use crate::domain::models::document::DiscoveredDocument;
use crate::domain::repositories::crawl_job_repository::CrawlJobRepository;
use crate::domain::repositories::document_repository::DocumentRepository;
use crate::domain::repositories::validation_job_repository::ValidationJobRepository;
use crate::domain::services::document_service::DocumentService;
use crate::engines::traits::{JobDiscarder, SearchEngine};
use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::header::{CONTENT_TYPE, LAST_MODIFIED};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 内容类型 → 文件扩展名
const CONTENT_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("application/vnd.oasis.opendocument.text", "odt"),
    ("application/vnd.oasis.opendocument.spreadsheet", "ods"),
    ("application/vnd.oasis.opendocument.presentation", "odp"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    ("application/vnd.ms-powerpoint", "ppt"),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pptx",
    ),
    ("application/vnd.ms-excel", "xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
];

/// 搜索发现工作器
///
/// 轮询 NEW 状态的搜索后端任务，通过搜索引擎查询候选文档，
/// 下载需要校验的文件并登记所有发现的文档。同一时间只处理一个任务。
pub struct SearchWorker<C, D, V>
where
    C: CrawlJobRepository,
    D: DocumentRepository,
    V: ValidationJobRepository,
{
    crawl_jobs: Arc<C>,
    documents: Arc<DocumentService<D, V>>,
    search_engine: Arc<dyn SearchEngine>,
    client: Client,
    settings: SearchSettings,
    current: Mutex<Option<CrawlJob>>,
}

impl<C, D, V> SearchWorker<C, D, V>
where
    C: CrawlJobRepository,
    D: DocumentRepository,
    V: ValidationJobRepository,
{
    /// 创建搜索发现工作器
    ///
    /// # 参数
    ///
    /// * `crawl_jobs` - 爬取任务仓库
    /// * `documents` - 文档登记服务
    /// * `search_engine` - 搜索引擎客户端
    /// * `client` - 下载文档使用的 HTTP 客户端
    /// * `settings` - 搜索后端配置
    pub fn new(
        crawl_jobs: Arc<C>,
        documents: Arc<DocumentService<D, V>>,
        search_engine: Arc<dyn SearchEngine>,
        client: Client,
        settings: SearchSettings,
    ) -> Self {
        Self {
            crawl_jobs,
            documents,
            search_engine,
            client,
            settings,
            current: Mutex::new(None),
        }
    }

    /// 当前正在处理的任务
    pub fn current_job(&self) -> Option<CrawlJob> {
        self.current.lock().clone()
    }

    fn is_current(&self, job_id: Uuid) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|job| job.id == job_id)
    }

    fn job_folder(&self, job: &CrawlJob) -> PathBuf {
        self.settings.temp_folder.join(&job.backend_job_id)
    }

    async fn next_job(&self) -> Result<Option<CrawlJob>, WorkerError> {
        let jobs = self.crawl_jobs.find_by_status(CrawlJobStatus::New).await?;
        Ok(jobs
            .into_iter()
            .find(|job| job.crawl_service == CrawlService::Search))
    }

    #[instrument(skip(self, job), fields(domain = %job.domain))]
    async fn process_job(&self, mut job: CrawlJob) -> Result<(), WorkerError> {
        job.start()
            .map_err(|e| WorkerError::ServiceError(e.to_string()))?;
        let mut job = self.crawl_jobs.save(&job).await?;
        *self.current.lock() = Some(job.clone());
        info!("Search discovery started for {}", job.domain);

        let folder = self.job_folder(&job);
        if let Err(e) = tokio::fs::create_dir_all(&folder).await {
            error!("Failed to create temp folder {}: {}", folder.display(), e);
            self.current.lock().take();
            if job.fail(Utc::now()).is_ok() {
                self.crawl_jobs.save(&job).await?;
            }
            return Err(e.into());
        }

        'file_types: for file_type in &self.settings.file_types {
            if !self.is_current(job.id) {
                break;
            }

            let urls = match self
                .search_engine
                .obtain_candidate_urls(&job.domain, file_type)
                .await
            {
                Ok(urls) => urls,
                Err(e) => {
                    warn!("Search for {} files on {} failed: {}", file_type, job.domain, e);
                    continue;
                }
            };
            debug!("Found {} candidate {} urls", urls.len(), file_type);

            for url in urls {
                if !self.is_current(job.id) {
                    break 'file_types;
                }
                // refresh so documents follow pause/resume of the job
                match self.crawl_jobs.find_by_id(job.id).await? {
                    Some(fresh) => job = fresh,
                    None => break 'file_types,
                }
                if let Err(e) = self.process_url(&job, &folder, file_type, &url).await {
                    warn!("Failed to process {}: {}", url, e);
                }
            }
        }

        let discarded = {
            let mut current = self.current.lock();
            let discarded = !current.as_ref().is_some_and(|j| j.id == job.id);
            if !discarded {
                current.take();
            }
            discarded
        };
        if discarded {
            info!("Search discovery for {} was discarded", job.domain);
            return Ok(());
        }

        if let Some(mut fresh) = self.crawl_jobs.find_by_id(job.id).await? {
            if !fresh.status.is_terminal() {
                fresh.discovery_finished = true;
                self.crawl_jobs.save(&fresh).await?;
            }
        }
        info!("Search discovery finished for {}", job.domain);
        Ok(())
    }

    async fn process_url(
        &self,
        job: &CrawlJob,
        folder: &Path,
        file_type: &str,
        url: &str,
    ) -> Result<(), WorkerError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            debug!("Skipping {} with status {}", url, response.status());
            return Ok(());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());
        if content_type.as_deref().is_some_and(|ct| ct.starts_with("text")) {
            debug!("Skipping text document {}", url);
            return Ok(());
        }

        let extension = content_type
            .as_deref()
            .and_then(extension_for_content_type)
            .map(str::to_string)
            .or_else(|| extension_from_url(url))
            .unwrap_or_else(|| file_type.to_string());

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| match parse_last_modified(v) {
                Some(date) => Some(date),
                None => {
                    warn!("Can't parse Last-Modified '{}' for {}", v, url);
                    None
                }
            });

        let file_path = if self.settings.download_types.contains(&extension) {
            let bytes = response.bytes().await?;
            let path = folder.join(format!("{}.{}", Uuid::new_v4(), extension));
            tokio::fs::write(&path, &bytes).await?;
            Some(path.to_string_lossy().into_owned())
        } else {
            None
        };

        let discovered = DiscoveredDocument {
            url: url.to_string(),
            content_type: Some(extension),
            last_modified,
            file_path,
        };
        self.documents.register(job, discovered).await?;
        Ok(())
    }
}

#[async_trait]
impl<C, D, V> Worker for SearchWorker<C, D, V>
where
    C: CrawlJobRepository,
    D: DocumentRepository,
    V: ValidationJobRepository,
{
    async fn run_once(&self) -> Result<(), WorkerError> {
        match self.next_job().await? {
            Some(job) => self.process_job(job).await,
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "Search discovery worker"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(self.settings.poll_interval_secs.max(1))
    }
}

#[async_trait]
impl<C, D, V> JobDiscarder for SearchWorker<C, D, V>
where
    C: CrawlJobRepository,
    D: DocumentRepository,
    V: ValidationJobRepository,
{
    async fn discard_job(&self, job: &CrawlJob) {
        {
            let mut current = self.current.lock();
            if current.as_ref().is_some_and(|c| c.domain == job.domain) {
                current.take();
            }
        }

        let folder = self.job_folder(job);
        match tokio::fs::remove_dir_all(&folder).await {
            Ok(()) => debug!("Removed temp folder {}", folder.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!("Can't delete search job folder {}: {}", folder.display(), e),
        }
    }
}

fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    CONTENT_TYPE_EXTENSIONS
        .iter()
        .find(|(ct, _)| *ct == content_type)
        .map(|(_, ext)| *ext)
}

fn extension_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let name = parsed.path_segments()?.next_back()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn parse_last_modified(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

#[cfg(test)]
#[path = "search_worker_test.rs"]
mod tests;
