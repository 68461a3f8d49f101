// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use crawlcheck::config::settings::ValidatorSettings;
use crawlcheck::domain::models::crawl_job::CrawlJob;
use crawlcheck::domain::models::status::BackendStatus;
use crawlcheck::domain::models::validation_job::{ValidationJob, ValidationJobStatus};
use crawlcheck::domain::repositories::validation_job_repository::ValidationJobRepository;
use crawlcheck::domain::services::crawl_job_service::CrawlJobService;
use crawlcheck::domain::services::document_service::DocumentService;
use crawlcheck::domain::services::notification_service::NotificationService;
use crawlcheck::engines::traits::{CrawlerEngine, DiscoveryError};
use crawlcheck::infrastructure::repositories::crawl_job_repo_impl::CrawlJobRepositoryImpl;
use crawlcheck::infrastructure::repositories::document_repo_impl::DocumentRepositoryImpl;
use crawlcheck::infrastructure::repositories::validation_job_repo_impl::ValidationJobRepositoryImpl;
use crawlcheck::queue::validation_queue::ValidationQueueManager;
use crawlcheck::validator::external::ExternalValidatorFactory;
use migration::{Migrator, MigratorTrait};
use parking_lot::Mutex;
use sea_orm::{ConnectOptions, Database};
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

pub const NON_COMPLIANT_REPORT: &str = r#"<report><jobs><job>
<validationReport isCompliant="false"><details>
<rule specification="ISO 19005-1:2005" clause="6.1.2" testNumber="1" status="failed">
<description>The file header shall begin at byte zero</description>
</rule>
</details></validationReport>
</job></jobs></report>"#;

/// 主爬虫替身：所有调用都成功，任务始终处于已完成状态
pub struct IdleCrawler;

#[async_trait]
impl CrawlerEngine for IdleCrawler {
    async fn create_job(&self, _job_id: &str, _domain: &str) -> Result<(), DiscoveryError> {
        Ok(())
    }
    async fn build_job(&self, _job_id: &str) -> Result<(), DiscoveryError> {
        Ok(())
    }
    async fn launch_job(&self, _job_id: &str) -> Result<(), DiscoveryError> {
        Ok(())
    }
    async fn pause_job(&self, _job_id: &str) -> Result<(), DiscoveryError> {
        Ok(())
    }
    async fn unpause_job(&self, _job_id: &str) -> Result<(), DiscoveryError> {
        Ok(())
    }
    async fn is_finished(&self, _job_id: &str) -> Result<bool, DiscoveryError> {
        Ok(true)
    }
    async fn status(&self, _job_id: &str) -> Result<BackendStatus, DiscoveryError> {
        Ok(BackendStatus {
            description: "FINISHED".to_string(),
            finished: Some(true),
        })
    }
    async fn teardown(&self, _job_id: &str) -> Result<(), DiscoveryError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub finished: Mutex<Vec<String>>,
}

impl NotificationService for RecordingNotifier {
    fn notify_finished(&self, job: &CrawlJob) {
        self.finished.lock().push(job.domain.clone());
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub dir: TempDir,
    pub crawl_jobs: Arc<CrawlJobRepositoryImpl>,
    pub documents: Arc<DocumentRepositoryImpl>,
    pub validation_jobs: Arc<ValidationJobRepositoryImpl>,
    pub queue: Arc<ValidationQueueManager<ValidationJobRepositoryImpl>>,
    pub document_service: DocumentService<DocumentRepositoryImpl, ValidationJobRepositoryImpl>,
    pub crawl_job_service: Arc<CrawlJobService<CrawlJobRepositoryImpl, ValidationJobRepositoryImpl>>,
    pub notifier: Arc<RecordingNotifier>,
}

/// 使用给定的 shell 脚本作为校验工具创建测试应用
pub async fn create_test_app(validator_script: &str, thread_count: usize) -> TestApp {
    let dir = tempfile::tempdir().unwrap();

    let tool_path = dir.path().join("validator.sh");
    fs::write(&tool_path, format!("#!/bin/sh\n{}\n", validator_script)).unwrap();
    fs::set_permissions(&tool_path, fs::Permissions::from_mode(0o755)).unwrap();

    let factory = ExternalValidatorFactory::new(&ValidatorSettings {
        tool_path,
        report_dir: dir.path().join("reports"),
        error_log: dir.path().join("logs/validator-errors.log"),
        timeout_secs: 60,
        required_extension: "pdf".to_string(),
        namespaces: BTreeMap::new(),
        properties: BTreeMap::new(),
    })
    .unwrap();

    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1);
    let db = Database::connect(opt).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let db = Arc::new(db);

    let crawl_jobs = Arc::new(CrawlJobRepositoryImpl::new(db.clone()));
    let documents = Arc::new(DocumentRepositoryImpl::new(db.clone()));
    let validation_jobs = Arc::new(ValidationJobRepositoryImpl::new(db));

    let queue = Arc::new(ValidationQueueManager::new(
        validation_jobs.clone(),
        Arc::new(factory),
        thread_count,
        Duration::from_millis(100),
    ));
    let notifier = Arc::new(RecordingNotifier::default());

    let document_service =
        DocumentService::new(documents.clone(), validation_jobs.clone(), queue.clone());
    let crawl_job_service = Arc::new(CrawlJobService::new(
        crawl_jobs.clone(),
        validation_jobs.clone(),
        Arc::new(IdleCrawler),
        queue.clone(),
        notifier.clone(),
    ));

    TestApp {
        dir,
        crawl_jobs,
        documents,
        validation_jobs,
        queue,
        document_service,
        crawl_job_service,
        notifier,
    }
}

impl TestApp {
    /// 在临时目录中写入一个待校验的文档
    pub fn document(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, b"%PDF-1.4 test document").unwrap();
        path
    }

    /// 查找某个任务下的校验任务
    pub async fn validation_jobs_for(&self, crawl_job_id: Uuid) -> Vec<ValidationJob> {
        self.validation_jobs
            .top_for_crawl_job(crawl_job_id, 100)
            .await
            .unwrap()
    }

    /// 等待校验任务到达指定状态
    pub async fn wait_for_status(&self, id: Uuid, status: ValidationJobStatus) -> ValidationJob {
        tokio::time::timeout(Duration::from_secs(20), async {
            loop {
                if let Some(job) = self.validation_jobs.find_by_id(id).await.unwrap() {
                    if job.status == status {
                        return job;
                    }
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("validation job did not reach the expected status")
    }

    /// 等待正在执行的校验任务清空
    pub async fn wait_until_idle(&self) {
        tokio::time::timeout(Duration::from_secs(20), async {
            while self.queue.in_flight_count().await > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("validation queue did not drain");
    }
}
