// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use crate::domain::models::document::{DiscoveredDocument, Document};
use crate::domain::models::validation_job::ValidationJob;
use crate::domain::models::validation_result::TestResult;
use crate::domain::repositories::document_repository::DocumentRepository;
use crate::infrastructure::repositories::document_repo_impl::DocumentRepositoryImpl;
use crate::infrastructure::repositories::validation_job_repo_impl::ValidationJobRepositoryImpl;
use crate::validator::traits::{RunnerState, ValidatorEngine};
use chrono::{DateTime, Utc};
use migration::{Migrator, MigratorTrait};
use parking_lot::Mutex as SyncMutex;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Observed {
    running: AtomicUsize,
    max_running: AtomicUsize,
    terminated: AtomicUsize,
    started: SyncMutex<Vec<PathBuf>>,
}

struct FakeEngine {
    observed: Arc<Observed>,
    delay: Duration,
    cancel: CancellationToken,
}

#[async_trait]
impl ValidatorEngine for FakeEngine {
    async fn start(&self, document: &Path) {
        self.observed.started.lock().push(document.to_path_buf());
        let now = self.observed.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.observed.max_running.fetch_max(now, Ordering::SeqCst);
    }

    async fn await_result(&self) -> ValidationResult {
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {}
            _ = self.cancel.cancelled() => {}
        }
        self.observed.running.fetch_sub(1, Ordering::SeqCst);
        // an output is produced even when the run was cancelled
        ValidationResult::new(TestResult::Open)
    }

    fn terminate(&self) {
        self.observed.terminated.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
    }

    fn state(&self) -> RunnerState {
        if self.cancel.is_cancelled() {
            RunnerState::Aborted
        } else {
            RunnerState::Running
        }
    }
}

struct FakeFactory {
    observed: Arc<Observed>,
    delay: Duration,
}

impl ValidatorFactory for FakeFactory {
    fn create(&self) -> Arc<dyn ValidatorEngine> {
        Arc::new(FakeEngine {
            observed: self.observed.clone(),
            delay: self.delay,
            cancel: CancellationToken::new(),
        })
    }
}

/// 前 `failures` 次保存结果失败，其余操作交给真实仓库
struct FlakyRepository {
    inner: ValidationJobRepositoryImpl,
    failures: AtomicUsize,
}

#[async_trait]
impl ValidationJobRepository for FlakyRepository {
    async fn enqueue(&self, job: &ValidationJob) -> Result<bool, RepositoryError> {
        self.inner.enqueue(job).await
    }

    async fn acquire_next(&self) -> Result<Option<ValidationJob>, RepositoryError> {
        self.inner.acquire_next().await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ValidationJob>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_status(
        &self,
        status: ValidationJobStatus,
    ) -> Result<Vec<ValidationJob>, RepositoryError> {
        self.inner.find_by_status(status).await
    }

    async fn bulk_set_status(
        &self,
        crawl_job_id: Uuid,
        from: ValidationJobStatus,
        to: ValidationJobStatus,
    ) -> Result<u64, RepositoryError> {
        self.inner.bulk_set_status(crawl_job_id, from, to).await
    }

    async fn update_priority(
        &self,
        crawl_job_id: Uuid,
        priority: i32,
    ) -> Result<u64, RepositoryError> {
        self.inner.update_priority(crawl_job_id, priority).await
    }

    async fn reset_in_progress(&self) -> Result<u64, RepositoryError> {
        self.inner.reset_in_progress().await
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ValidationJobStatus,
    ) -> Result<(), RepositoryError> {
        self.inner.set_status(id, status).await
    }

    async fn save_result(
        &self,
        job: &ValidationJob,
        result: &ValidationResult,
    ) -> Result<bool, RepositoryError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DbErr::Custom("disk full".to_string()).into());
        }
        self.inner.save_result(job, result).await
    }

    async fn count_pending(&self, crawl_job_id: Option<Uuid>) -> Result<u64, RepositoryError> {
        self.inner.count_pending(crawl_job_id).await
    }

    async fn top_for_crawl_job(
        &self,
        crawl_job_id: Uuid,
        limit: u64,
    ) -> Result<Vec<ValidationJob>, RepositoryError> {
        self.inner.top_for_crawl_job(crawl_job_id, limit).await
    }
}

async fn setup_db() -> Arc<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1);
    let db = Database::connect(opt).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    Arc::new(db)
}

fn manager(
    repo: Arc<ValidationJobRepositoryImpl>,
    thread_count: usize,
    delay: Duration,
) -> (Arc<ValidationQueueManager<ValidationJobRepositoryImpl>>, Arc<Observed>) {
    let observed = Arc::new(Observed::default());
    let factory = Arc::new(FakeFactory {
        observed: observed.clone(),
        delay,
    });
    let manager = Arc::new(ValidationQueueManager::new(
        repo,
        factory,
        thread_count,
        Duration::from_millis(20),
    ));
    (manager, observed)
}

async fn enqueue(
    repo: &ValidationJobRepositoryImpl,
    crawl_job_id: Uuid,
    name: &str,
    priority: i32,
    started: DateTime<Utc>,
) -> ValidationJob {
    let job = ValidationJob::new(
        Uuid::new_v4(),
        crawl_job_id,
        "example.com",
        format!("https://example.com/{}", name),
        Some(format!("/data/{}", name)),
    )
    .with_priority(priority, started);
    repo.enqueue(&job).await.unwrap();
    job
}

async fn wait_for_drain(repo: &ValidationJobRepositoryImpl) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while repo.count_pending(None).await.unwrap() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("queue did not drain");
}

#[tokio::test]
async fn test_in_flight_never_exceeds_thread_count() {
    let repo = Arc::new(ValidationJobRepositoryImpl::new(setup_db().await));
    let crawl_job_id = Uuid::new_v4();
    for i in 0..7 {
        enqueue(&repo, crawl_job_id, &format!("{}.pdf", i), 0, Utc::now()).await;
    }

    let (manager, observed) = manager(repo.clone(), 2, Duration::from_millis(50));
    let dispatcher = manager.start();
    wait_for_drain(&repo).await;
    dispatcher.abort();

    assert_eq!(observed.max_running.load(Ordering::SeqCst), 2);
    assert_eq!(observed.started.lock().len(), 7);
    let done = repo.find_by_status(ValidationJobStatus::Done).await.unwrap();
    assert_eq!(done.len(), 7);
}

#[tokio::test]
async fn test_dispatch_order_follows_priority_not_enqueue_order() {
    let repo = Arc::new(ValidationJobRepositoryImpl::new(setup_db().await));
    let now = Utc::now();
    let earlier = now - chrono::Duration::hours(1);
    enqueue(&repo, Uuid::new_v4(), "p5.pdf", 5, earlier).await;
    enqueue(&repo, Uuid::new_v4(), "p1-late.pdf", 1, now).await;
    enqueue(&repo, Uuid::new_v4(), "p1-early.pdf", 1, earlier).await;
    enqueue(&repo, Uuid::new_v4(), "p3.pdf", 3, now).await;

    let (manager, observed) = manager(repo.clone(), 1, Duration::from_millis(5));
    let dispatcher = manager.start();
    wait_for_drain(&repo).await;
    dispatcher.abort();

    let started: Vec<PathBuf> = observed.started.lock().clone();
    let expected: Vec<PathBuf> = ["p1-early.pdf", "p1-late.pdf", "p3.pdf", "p5.pdf"]
        .iter()
        .map(|name| PathBuf::from(format!("/data/{}", name)))
        .collect();
    assert_eq!(started, expected);
}

#[tokio::test]
async fn test_dispatch_next_respects_capacity() {
    let repo = Arc::new(ValidationJobRepositoryImpl::new(setup_db().await));
    let crawl_job_id = Uuid::new_v4();
    enqueue(&repo, crawl_job_id, "a.pdf", 0, Utc::now()).await;
    enqueue(&repo, crawl_job_id, "b.pdf", 0, Utc::now()).await;

    let (manager, _) = manager(repo.clone(), 1, Duration::from_secs(60));

    let first = manager.dispatch_next().await.unwrap();
    assert!(first.is_some());
    assert!(manager.dispatch_next().await.unwrap().is_none());
    assert_eq!(manager.in_flight_count().await, 1);
    assert_eq!(
        repo.find_by_status(ValidationJobStatus::InProgress)
            .await
            .unwrap()
            .len(),
        1
    );

    manager.abort(crawl_job_id).await;
}

#[tokio::test]
async fn test_abort_discards_result_and_marks_job_aborted() {
    let db = setup_db().await;
    let repo = Arc::new(ValidationJobRepositoryImpl::new(db.clone()));
    let documents = DocumentRepositoryImpl::new(db);
    let doomed_crawl = Uuid::new_v4();
    let other_crawl = Uuid::new_v4();

    let document = Document::from_discovered(
        doomed_crawl,
        "example.com",
        DiscoveredDocument {
            url: "https://example.com/doomed.pdf".into(),
            content_type: Some("pdf".into()),
            last_modified: None,
            file_path: Some("/data/doomed.pdf".into()),
        },
    );
    documents.insert_if_absent(&document).await.unwrap();
    let doomed = ValidationJob::new(
        document.id,
        doomed_crawl,
        "example.com",
        document.url.clone(),
        document.file_path.clone(),
    );
    repo.enqueue(&doomed).await.unwrap();
    let survivor = enqueue(&repo, other_crawl, "survivor.pdf", 0, Utc::now()).await;

    let (manager, observed) = manager(repo.clone(), 2, Duration::from_secs(60));
    assert_eq!(manager.fill_free_slots().await, 2);

    assert_eq!(manager.abort(doomed_crawl).await, 1);
    assert_eq!(observed.terminated.load(Ordering::SeqCst), 1);

    tokio::time::timeout(Duration::from_secs(5), async {
        while manager.in_flight_count().await > 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let aborted = repo.find_by_id(doomed.id).await.unwrap().unwrap();
    assert_eq!(aborted.status, ValidationJobStatus::Aborted);
    assert!(documents.find_result(document.id).await.unwrap().is_none());

    let untouched = repo.find_by_id(survivor.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, ValidationJobStatus::InProgress);

    manager.abort(other_crawl).await;
}

#[tokio::test]
async fn test_completed_result_is_persisted() {
    let db = setup_db().await;
    let repo = Arc::new(ValidationJobRepositoryImpl::new(db.clone()));
    let documents = DocumentRepositoryImpl::new(db);
    let document = Document::from_discovered(
        Uuid::new_v4(),
        "example.com",
        DiscoveredDocument {
            url: "https://example.com/ok.pdf".into(),
            content_type: Some("pdf".into()),
            last_modified: None,
            file_path: Some("/data/ok.pdf".into()),
        },
    );
    documents.insert_if_absent(&document).await.unwrap();
    repo.enqueue(&ValidationJob::new(
        document.id,
        document.crawl_job_id,
        "example.com",
        document.url.clone(),
        document.file_path.clone(),
    ))
    .await
    .unwrap();

    let (manager, _) = manager(repo.clone(), 1, Duration::from_millis(5));
    manager.fill_free_slots().await;
    wait_for_drain(&repo).await;

    let result = documents.find_result(document.id).await.unwrap().unwrap();
    assert_eq!(result.test_result, TestResult::Open);
}

#[tokio::test]
async fn test_init_resets_jobs_left_in_progress() {
    let repo = Arc::new(ValidationJobRepositoryImpl::new(setup_db().await));
    let job = enqueue(&repo, Uuid::new_v4(), "stale.pdf", 0, Utc::now()).await;
    repo.acquire_next().await.unwrap().unwrap();

    let (manager, _) = manager(repo.clone(), 1, Duration::from_millis(5));
    assert_eq!(manager.init().await.unwrap(), 1);

    let reset = repo.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(reset.status, ValidationJobStatus::NotStarted);
}

#[tokio::test]
async fn test_failed_result_save_requeues_job() {
    let repo = Arc::new(ValidationJobRepositoryImpl::new(setup_db().await));
    let job = enqueue(&repo, Uuid::new_v4(), "retry.pdf", 0, Utc::now()).await;

    let flaky = Arc::new(FlakyRepository {
        inner: (*repo).clone(),
        failures: AtomicUsize::new(1),
    });
    let observed = Arc::new(Observed::default());
    let factory = Arc::new(FakeFactory {
        observed: observed.clone(),
        delay: Duration::from_millis(5),
    });
    let manager = Arc::new(ValidationQueueManager::new(
        flaky.clone(),
        factory,
        2,
        Duration::from_millis(20),
    ));

    let dispatcher = manager.start();
    wait_for_drain(&repo).await;
    dispatcher.abort();

    assert_eq!(flaky.failures.load(Ordering::SeqCst), 0);
    assert_eq!(observed.started.lock().len(), 2);
    assert_eq!(manager.in_flight_count().await, 0);
    let done = repo.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(done.status, ValidationJobStatus::Done);
}

#[tokio::test]
async fn test_failed_result_save_leaves_job_not_started() {
    let repo = Arc::new(ValidationJobRepositoryImpl::new(setup_db().await));
    let job = enqueue(&repo, Uuid::new_v4(), "broken.pdf", 0, Utc::now()).await;

    let flaky = Arc::new(FlakyRepository {
        inner: (*repo).clone(),
        failures: AtomicUsize::new(usize::MAX),
    });
    let observed = Arc::new(Observed::default());
    let factory = Arc::new(FakeFactory {
        observed,
        delay: Duration::from_millis(5),
    });
    let manager = Arc::new(ValidationQueueManager::new(
        flaky,
        factory,
        2,
        Duration::from_secs(60),
    ));

    assert!(manager.dispatch_next().await.unwrap().is_some());
    tokio::time::timeout(Duration::from_secs(5), async {
        while manager.in_flight_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let requeued = repo.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(requeued.status, ValidationJobStatus::NotStarted);
    assert_eq!(repo.count_pending(None).await.unwrap(), 1);
}
