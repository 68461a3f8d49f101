// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_job::{CrawlJob, CrawlJobStatus};
use crate::domain::models::document::{DiscoveredDocument, Document};
use crate::domain::models::validation_job::{ValidationJob, ValidationJobStatus};
use crate::domain::repositories::crawl_job_repository::RepositoryError;
use crate::domain::repositories::document_repository::DocumentRepository;
use crate::domain::repositories::validation_job_repository::ValidationJobRepository;
use crate::domain::services::validation_scheduler::ValidationScheduler;
use std::sync::Arc;
use tracing::debug;

/// 文档登记服务
///
/// 登记发现的文档，并为有本地文件的文档创建校验任务
pub struct DocumentService<D, V>
where
    D: DocumentRepository,
    V: ValidationJobRepository,
{
    documents: Arc<D>,
    validation_jobs: Arc<V>,
    scheduler: Arc<dyn ValidationScheduler>,
}

impl<D, V> DocumentService<D, V>
where
    D: DocumentRepository,
    V: ValidationJobRepository,
{
    pub fn new(
        documents: Arc<D>,
        validation_jobs: Arc<V>,
        scheduler: Arc<dyn ValidationScheduler>,
    ) -> Self {
        Self {
            documents,
            validation_jobs,
            scheduler,
        }
    }

    /// 登记一个发现的文档
    ///
    /// 这是所有发现来源的统一入口：外部爬虫通过重试传输投递的文档元数据，
    /// 以及搜索发现工作器下载的文档，都经由此处落库并进入校验队列。
    ///
    /// # 参数
    ///
    /// * `job` - 发现该文档的爬取任务
    /// * `discovered` - 发现的文档
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 新文档已登记
    /// * `Ok(false)` - 文档已存在
    pub async fn register(
        &self,
        job: &CrawlJob,
        discovered: DiscoveredDocument,
    ) -> Result<bool, RepositoryError> {
        let document = Document::from_discovered(job.id, job.domain.clone(), discovered);
        if !self.documents.insert_if_absent(&document).await? {
            debug!("Document {} already registered", document.url);
            return Ok(false);
        }

        let Some(file_path) = document.file_path.clone() else {
            return Ok(true);
        };

        let mut validation_job = ValidationJob::new(
            document.id,
            job.id,
            job.domain.clone(),
            document.url.clone(),
            Some(file_path),
        )
        .with_priority(job.priority(), job.start_time);
        if job.status == CrawlJobStatus::Paused {
            validation_job.status = ValidationJobStatus::Paused;
        }

        if self.validation_jobs.enqueue(&validation_job).await? {
            debug!("Queued {} for validation", document.url);
            self.scheduler.wake();
        }

        Ok(true)
    }
}
