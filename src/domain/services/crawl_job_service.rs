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

use crate::domain::models::crawl_job::{
    CrawlJob, CrawlJobStatus, CrawlRequest, CrawlService, DomainError,
};
use crate::domain::models::status::{
    BackendStatus, CrawlJobStatusReport, ValidationQueueStatus, STATUS_TOP_N,
};
use crate::domain::models::validation_job::ValidationJobStatus;
use crate::domain::repositories::crawl_job_repository::{CrawlJobRepository, RepositoryError};
use crate::domain::repositories::validation_job_repository::ValidationJobRepository;
use crate::domain::services::notification_service::NotificationService;
use crate::domain::services::validation_scheduler::ValidationScheduler;
use crate::engines::traits::{CrawlerEngine, DiscoveryError, JobDiscarder};
use crate::utils::url_utils::normalize_domain;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// 爬取任务服务错误
#[derive(Error, Debug)]
pub enum CrawlJobError {
    /// 域名没有对应的任务
    #[error("{0}")]
    NotFound(String),
    /// 无法解析的域名
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Backend error: {0}")]
    Backend(#[from] DiscoveryError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// 爬取任务服务
///
/// 管理爬取任务的生命周期，并把暂停、恢复和重启传递给发现后端和校验队列
pub struct CrawlJobService<C, V>
where
    C: CrawlJobRepository,
    V: ValidationJobRepository,
{
    crawl_jobs: Arc<C>,
    validation_jobs: Arc<V>,
    crawler: Arc<dyn CrawlerEngine>,
    discarder: Option<Arc<dyn JobDiscarder>>,
    scheduler: Arc<dyn ValidationScheduler>,
    notifier: Arc<dyn NotificationService>,
}

impl<C, V> CrawlJobService<C, V>
where
    C: CrawlJobRepository,
    V: ValidationJobRepository,
{
    /// 创建新的爬取任务服务
    ///
    /// # 参数
    ///
    /// * `crawl_jobs` - 爬取任务仓库
    /// * `validation_jobs` - 校验任务仓库
    /// * `crawler` - 主爬虫后端
    /// * `scheduler` - 校验调度器
    /// * `notifier` - 完成通知
    pub fn new(
        crawl_jobs: Arc<C>,
        validation_jobs: Arc<V>,
        crawler: Arc<dyn CrawlerEngine>,
        scheduler: Arc<dyn ValidationScheduler>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            crawl_jobs,
            validation_jobs,
            crawler,
            discarder: None,
            scheduler,
            notifier,
        }
    }

    /// 设置搜索后端的任务清理器
    pub fn with_discarder(mut self, discarder: Arc<dyn JobDiscarder>) -> Self {
        self.discarder = Some(discarder);
        self
    }

    /// 根据域名获取任务
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlJob)` - 找到的任务
    /// * `Err(CrawlJobError::NotFound)` - 域名没有任务
    pub async fn get_crawl_job(&self, domain: &str) -> Result<CrawlJob, CrawlJobError> {
        let domain = normalize_domain(domain)
            .ok_or_else(|| CrawlJobError::InvalidDomain(domain.to_string()))?;

        self.crawl_jobs
            .find_by_domain(&domain)
            .await?
            .ok_or_else(|| {
                CrawlJobError::NotFound(format!("crawl job with domain {} not found", domain))
            })
    }

    /// 为域名创建新任务
    ///
    /// 主爬虫任务会立即启动；搜索后端任务保持NEW，由搜索工作器接手。
    #[instrument(skip(self, requests))]
    pub async fn create_job(
        &self,
        domain: &str,
        service: CrawlService,
        requests: Vec<CrawlRequest>,
    ) -> Result<CrawlJob, CrawlJobError> {
        let domain = normalize_domain(domain)
            .ok_or_else(|| CrawlJobError::InvalidDomain(domain.to_string()))?;

        let job = CrawlJob::new(domain, service).with_requests(requests);
        let job = self.crawl_jobs.save(&job).await?;
        info!("Created crawl job {} for {}", job.id, job.domain);

        match service {
            CrawlService::Crawler => self.start_job(job).await,
            CrawlService::Search => Ok(job),
        }
    }

    /// 启动主爬虫任务：创建、构建并启动后端任务
    ///
    /// 后端任何一步失败时任务转为FAILED并记录结束时间，不向调用方返回错误。
    pub async fn start_job(&self, mut job: CrawlJob) -> Result<CrawlJob, CrawlJobError> {
        match self.launch_backend_job(&job).await {
            Ok(()) => {
                job.start()?;
                info!("Crawl job {} for {} is running", job.id, job.domain);
            }
            Err(e) => {
                error!("Failed to start crawl job for {}: {}", job.domain, e);
                job.fail(Utc::now())?;
            }
        }

        Ok(self.crawl_jobs.save(&job).await?)
    }

    async fn launch_backend_job(&self, job: &CrawlJob) -> Result<(), DiscoveryError> {
        let id = job.backend_job_id.as_str();
        self.crawler.create_job(id, &job.domain).await?;
        self.crawler.build_job(id).await?;
        self.crawler.launch_job(id).await
    }

    /// 提交一个请求，覆盖一组域名
    ///
    /// 已有同后端任务的域名直接关联请求；后端不同的任务会被重启；其余域名新建任务。
    ///
    /// # 返回值
    ///
    /// 请求关联的所有任务
    #[instrument(skip(self, request, domains))]
    pub async fn submit_request(
        &self,
        request: CrawlRequest,
        domains: &[String],
        service: CrawlService,
    ) -> Result<Vec<CrawlJob>, CrawlJobError> {
        let mut normalized = Vec::with_capacity(domains.len());
        for domain in domains {
            let domain = normalize_domain(domain)
                .ok_or_else(|| CrawlJobError::InvalidDomain(domain.clone()))?;
            if !normalized.contains(&domain) {
                normalized.push(domain);
            }
        }

        self.crawl_jobs.save_request(&request).await?;

        let mut jobs = Vec::with_capacity(normalized.len());
        for domain in normalized {
            let job = match self.crawl_jobs.find_by_domain(&domain).await? {
                Some(mut existing) if existing.crawl_service == service => {
                    existing.link_request(request.clone());
                    let saved = self.crawl_jobs.save(&existing).await?;
                    self.restamp_priority(&saved).await?;
                    saved
                }
                Some(mut existing) => {
                    info!(
                        "Switching {} from {} to {} backend",
                        domain, existing.crawl_service, service
                    );
                    existing.link_request(request.clone());
                    self.restart_with(existing, service).await?
                }
                None => {
                    self.create_job(&domain, service, vec![request.clone()])
                        .await?
                }
            };
            jobs.push(job);
        }

        Ok(jobs)
    }

    /// 暂停任务
    ///
    /// 通知仍在运行的发现后端暂停，并把该任务所有未开始的校验任务改为暂停。
    #[instrument(skip(self))]
    pub async fn pause(&self, domain: &str) -> Result<CrawlJob, CrawlJobError> {
        let mut job = self.get_crawl_job(domain).await?;
        job.pause()?;

        if self.backend_active(&job).await {
            self.crawler.pause_job(&job.backend_job_id).await?;
        }

        let paused = self
            .validation_jobs
            .bulk_set_status(
                job.id,
                ValidationJobStatus::NotStarted,
                ValidationJobStatus::Paused,
            )
            .await?;
        info!("Paused crawl job {} and {} validation jobs", job.domain, paused);

        Ok(self.crawl_jobs.save(&job).await?)
    }

    /// 恢复任务，暂停的逆操作
    #[instrument(skip(self))]
    pub async fn resume(&self, domain: &str) -> Result<CrawlJob, CrawlJobError> {
        let mut job = self.get_crawl_job(domain).await?;
        job.resume()?;

        if self.backend_active(&job).await {
            self.crawler.unpause_job(&job.backend_job_id).await?;
        }

        let resumed = self
            .validation_jobs
            .bulk_set_status(
                job.id,
                ValidationJobStatus::Paused,
                ValidationJobStatus::NotStarted,
            )
            .await?;
        info!("Resumed crawl job {} and {} validation jobs", job.domain, resumed);

        let job = self.crawl_jobs.save(&job).await?;
        if resumed > 0 {
            self.scheduler.wake();
        }
        Ok(job)
    }

    /// 使用相同后端重启任务
    #[instrument(skip(self))]
    pub async fn restart(&self, domain: &str) -> Result<CrawlJob, CrawlJobError> {
        let job = self.get_crawl_job(domain).await?;
        let service = job.crawl_service;
        self.restart_with(job, service).await
    }

    /// 销毁旧任务并用指定后端新建任务，关联的请求随之迁移
    async fn restart_with(
        &self,
        old: CrawlJob,
        service: CrawlService,
    ) -> Result<CrawlJob, CrawlJobError> {
        match old.crawl_service {
            CrawlService::Crawler => {
                if let Err(e) = self.crawler.teardown(&old.backend_job_id).await {
                    warn!("Failed to tear down crawler job {}: {}", old.backend_job_id, e);
                }
            }
            CrawlService::Search => {
                if let Some(discarder) = &self.discarder {
                    discarder.discard_job(&old).await;
                }
            }
        }

        self.crawl_jobs.delete(&old).await?;

        let aborted = self.scheduler.abort_crawl_job(old.id).await;
        info!(
            "Removed crawl job {} for {} ({} running validations aborted)",
            old.id, old.domain, aborted
        );

        self.create_job(&old.domain, service, old.requests).await
    }

    /// 从任务上解除某个邮箱的所有请求
    pub async fn unlink_requests(
        &self,
        domain: &str,
        email_address: &str,
    ) -> Result<CrawlJob, CrawlJobError> {
        let mut job = self.get_crawl_job(domain).await?;
        job.requests
            .retain(|r| r.email_address.as_deref() != Some(email_address));

        let saved = self.crawl_jobs.save(&job).await?;
        self.restamp_priority(&saved).await?;
        Ok(saved)
    }

    /// 关联请求变化后，把排队中的校验任务改为任务当前的优先级
    async fn restamp_priority(&self, job: &CrawlJob) -> Result<(), CrawlJobError> {
        let updated = self
            .validation_jobs
            .update_priority(job.id, job.priority())
            .await?;
        if updated > 0 {
            debug!(
                "Queued validation jobs of {} now have priority {}",
                job.domain,
                job.priority()
            );
        }
        Ok(())
    }

    /// 查询任务状态
    ///
    /// 后端状态查询失败时以 "Unavailable: ..." 描述代替，不影响整体查询。
    pub async fn status(&self, domain: &str) -> Result<CrawlJobStatusReport, CrawlJobError> {
        let job = self.get_crawl_job(domain).await?;

        let backend_status = match job.crawl_service {
            CrawlService::Crawler => Some(
                self.crawler
                    .status(&job.backend_job_id)
                    .await
                    .unwrap_or_else(BackendStatus::unavailable),
            ),
            CrawlService::Search => None,
        };

        let validation_queue = ValidationQueueStatus {
            pending_count: self.validation_jobs.count_pending(Some(job.id)).await?,
            top_jobs: self
                .validation_jobs
                .top_for_crawl_job(job.id, STATUS_TOP_N)
                .await?,
        };

        Ok(CrawlJobStatusReport {
            crawl_job: job,
            backend_status,
            validation_queue,
        })
    }

    /// 任务完成后尝试收尾
    ///
    /// 发现已完成且没有待处理的校验任务时把任务标记为FINISHED。
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 任务已完成
    /// * `Ok(false)` - 任务仍有工作
    pub async fn try_finish(&self, mut job: CrawlJob) -> Result<bool, CrawlJobError> {
        if job.status != CrawlJobStatus::Running {
            return Ok(false);
        }

        if !job.discovery_finished
            && job.crawl_service == CrawlService::Crawler
            && self.crawler.is_finished(&job.backend_job_id).await?
        {
            job.discovery_finished = true;
            job = self.crawl_jobs.save(&job).await?;
        }

        if !job.discovery_finished {
            return Ok(false);
        }

        if self.validation_jobs.count_pending(Some(job.id)).await? > 0 {
            return Ok(false);
        }

        self.finish_job(job).await?;
        Ok(true)
    }

    /// 标记任务完成，清理后端，更新请求状态并发送通知
    #[instrument(skip(self, job), fields(domain = %job.domain))]
    pub async fn finish_job(&self, mut job: CrawlJob) -> Result<CrawlJob, CrawlJobError> {
        job.finish(Utc::now())?;
        let job = self.crawl_jobs.save(&job).await?;
        info!("Crawl job for {} finished", job.domain);

        if job.crawl_service == CrawlService::Crawler {
            if let Err(e) = self.crawler.teardown(&job.backend_job_id).await {
                warn!("Failed to tear down crawler job {}: {}", job.backend_job_id, e);
            }
        }

        for request in &job.requests {
            let jobs = self.crawl_jobs.find_jobs_for_request(request.id).await?;
            if jobs.iter().all(|j| j.status.is_terminal()) {
                let mut finished = request.clone();
                finished.finished = true;
                self.crawl_jobs.save_request(&finished).await?;
            }
        }

        self.notifier.notify_finished(&job);
        Ok(job)
    }

    async fn backend_active(&self, job: &CrawlJob) -> bool {
        if job.crawl_service != CrawlService::Crawler || job.discovery_finished {
            return false;
        }

        match self.crawler.is_finished(&job.backend_job_id).await {
            Ok(finished) => !finished,
            Err(e) => {
                warn!("Failed to query crawler job {}: {}", job.backend_job_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "crawl_job_service_test.rs"]
mod tests;
