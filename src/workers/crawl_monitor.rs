// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_job::CrawlJobStatus;
use crate::domain::repositories::crawl_job_repository::CrawlJobRepository;
use crate::domain::repositories::validation_job_repository::ValidationJobRepository;
use crate::domain::services::crawl_job_service::CrawlJobService;
use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// 爬取任务监控工作器
///
/// 定期检查 RUNNING 的任务，发现结束且校验队列清空后把任务标记为完成
pub struct CrawlMonitor<C, V>
where
    C: CrawlJobRepository,
    V: ValidationJobRepository,
{
    crawl_jobs: Arc<C>,
    service: Arc<CrawlJobService<C, V>>,
    interval: Duration,
}

impl<C, V> CrawlMonitor<C, V>
where
    C: CrawlJobRepository,
    V: ValidationJobRepository,
{
    pub fn new(crawl_jobs: Arc<C>, service: Arc<CrawlJobService<C, V>>, interval: Duration) -> Self {
        Self {
            crawl_jobs,
            service,
            interval,
        }
    }
}

#[async_trait]
impl<C, V> Worker for CrawlMonitor<C, V>
where
    C: CrawlJobRepository,
    V: ValidationJobRepository,
{
    async fn run_once(&self) -> Result<(), WorkerError> {
        let jobs = self.crawl_jobs.find_by_status(CrawlJobStatus::Running).await?;
        debug!("Checking {} running crawl jobs", jobs.len());

        let mut finished = 0;
        for job in jobs {
            let domain = job.domain.clone();
            match self.service.try_finish(job).await {
                Ok(true) => finished += 1,
                Ok(false) => {}
                // one broken job must not block the others
                Err(e) => error!("Failed to check crawl job for {}: {}", domain, e),
            }
        }

        if finished > 0 {
            info!("Finished {} crawl jobs", finished);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Crawl monitor"
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
#[path = "crawl_monitor_test.rs"]
mod tests;
