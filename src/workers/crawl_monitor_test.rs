// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use crate::domain::models::crawl_job::{CrawlJob, CrawlService};
use crate::domain::models::status::BackendStatus;
use crate::domain::models::validation_job::ValidationJob;
use crate::domain::services::notification_service::NotificationService;
use crate::domain::services::validation_scheduler::ValidationScheduler;
use crate::engines::traits::{CrawlerEngine, DiscoveryError};
use crate::infrastructure::repositories::crawl_job_repo_impl::CrawlJobRepositoryImpl;
use crate::infrastructure::repositories::validation_job_repo_impl::ValidationJobRepositoryImpl;
use migration::{Migrator, MigratorTrait};
use mockall::mock;
use parking_lot::Mutex;
use sea_orm::{ConnectOptions, Database};
use uuid::Uuid;

mock! {
    pub Crawler {}
    #[async_trait]
    impl CrawlerEngine for Crawler {
        async fn create_job(&self, job_id: &str, domain: &str) -> Result<(), DiscoveryError>;
        async fn build_job(&self, job_id: &str) -> Result<(), DiscoveryError>;
        async fn launch_job(&self, job_id: &str) -> Result<(), DiscoveryError>;
        async fn pause_job(&self, job_id: &str) -> Result<(), DiscoveryError>;
        async fn unpause_job(&self, job_id: &str) -> Result<(), DiscoveryError>;
        async fn is_finished(&self, job_id: &str) -> Result<bool, DiscoveryError>;
        async fn status(&self, job_id: &str) -> Result<BackendStatus, DiscoveryError>;
        async fn teardown(&self, job_id: &str) -> Result<(), DiscoveryError>;
    }
}

struct NoopScheduler;

#[async_trait]
impl ValidationScheduler for NoopScheduler {
    async fn abort_crawl_job(&self, _crawl_job_id: Uuid) -> usize {
        0
    }

    fn wake(&self) {}
}

#[derive(Default)]
struct RecordingNotifier {
    finished: Mutex<Vec<String>>,
}

impl NotificationService for RecordingNotifier {
    fn notify_finished(&self, job: &CrawlJob) {
        self.finished.lock().push(job.domain.clone());
    }
}

fn running(domain: &str, service: CrawlService) -> CrawlJob {
    let mut job = CrawlJob::new(domain, service);
    job.start().unwrap();
    job
}

#[tokio::test]
async fn test_monitor_finishes_only_drained_jobs() {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1);
    let db = Database::connect(opt).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let db = Arc::new(db);

    let crawl_jobs = Arc::new(CrawlJobRepositoryImpl::new(db.clone()));
    let validation_jobs = Arc::new(ValidationJobRepositoryImpl::new(db));

    let drained = running("drained.org", CrawlService::Crawler);
    let busy = running("busy.org", CrawlService::Crawler);
    let searching = running("searching.org", CrawlService::Search);
    for job in [&drained, &busy, &searching] {
        crawl_jobs.save(job).await.unwrap();
    }
    let pending = ValidationJob::new(
        Uuid::new_v4(),
        busy.id,
        busy.domain.clone(),
        "https://busy.org/a.pdf".to_string(),
        Some("/tmp/a.pdf".to_string()),
    );
    validation_jobs.enqueue(&pending).await.unwrap();

    let mut crawler = MockCrawler::new();
    crawler.expect_is_finished().returning(|_| Ok(true));
    let drained_handle = drained.backend_job_id.clone();
    crawler
        .expect_teardown()
        .withf(move |id| id == drained_handle)
        .times(1)
        .returning(|_| Ok(()));

    let notifier = Arc::new(RecordingNotifier::default());
    let service = Arc::new(CrawlJobService::new(
        crawl_jobs.clone(),
        validation_jobs.clone(),
        Arc::new(crawler),
        Arc::new(NoopScheduler),
        notifier.clone(),
    ));
    let monitor = CrawlMonitor::new(crawl_jobs.clone(), service, Duration::from_secs(30));

    monitor.run_once().await.unwrap();

    let status = |job: &CrawlJob| {
        let crawl_jobs = crawl_jobs.clone();
        let id = job.id;
        async move { crawl_jobs.find_by_id(id).await.unwrap().unwrap() }
    };
    let drained = status(&drained).await;
    assert_eq!(drained.status, CrawlJobStatus::Finished);
    assert!(drained.finish_time.is_some());

    let busy = status(&busy).await;
    assert_eq!(busy.status, CrawlJobStatus::Running);
    assert!(busy.discovery_finished);

    assert_eq!(status(&searching).await.status, CrawlJobStatus::Running);
    assert_eq!(*notifier.finished.lock(), vec!["drained.org".to_string()]);
}
