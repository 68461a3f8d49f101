// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_app;
use crawlcheck::domain::models::crawl_job::{CrawlJob, CrawlJobStatus, CrawlRequest, CrawlService};
use crawlcheck::domain::models::document::DiscoveredDocument;
use crawlcheck::domain::models::validation_job::ValidationJobStatus;
use crawlcheck::domain::repositories::crawl_job_repository::CrawlJobRepository;
use crawlcheck::domain::repositories::document_repository::DocumentRepository;
use crawlcheck::domain::repositories::validation_job_repository::ValidationJobRepository;

async fn register(app: &super::helpers::TestApp, job: &CrawlJob, name: &str) {
    let file = app.document(name);
    app.document_service
        .register(
            job,
            DiscoveredDocument {
                url: format!("https://{}/{}", job.domain, name),
                content_type: Some("pdf".to_string()),
                last_modified: None,
                file_path: Some(file.to_string_lossy().into_owned()),
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_restart_aborts_in_flight_validation() {
    // validator that never finishes on its own
    let app = create_test_app("exec sleep 30", 1).await;

    let request = CrawlRequest::new(Some("owner@example.com".into()), 2);
    let job = app
        .crawl_job_service
        .create_job("example.com", CrawlService::Search, vec![request.clone()])
        .await
        .unwrap();
    let mut job = job;
    job.start().unwrap();
    let job = app.crawl_jobs.save(&job).await.unwrap();

    register(&app, &job, "slow.pdf").await;
    let dispatched = app.queue.dispatch_next().await.unwrap().expect("job dispatched");
    assert_eq!(dispatched.job().crawl_job_id, job.id);
    assert_eq!(app.queue.in_flight_count().await, 1);

    let restarted = app.crawl_job_service.restart("example.com").await.unwrap();
    assert_ne!(restarted.id, job.id);
    assert_eq!(restarted.status, CrawlJobStatus::New);
    assert_eq!(restarted.requests, vec![request]);
    assert!(dispatched.is_aborted());

    app.wait_until_idle().await;
    assert!(app.crawl_jobs.find_by_id(job.id).await.unwrap().is_none());
    assert!(app
        .validation_jobs
        .find_by_id(dispatched.job().id)
        .await
        .unwrap()
        .is_none());
    assert!(app
        .documents
        .find_by_url("example.com", "https://example.com/slow.pdf")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_pause_holds_queued_validations_until_resume() {
    let app = create_test_app("exec sleep 30", 1).await;

    let mut job = CrawlJob::new("example.net", CrawlService::Search);
    job.start().unwrap();
    let job = app.crawl_jobs.save(&job).await.unwrap();
    register(&app, &job, "one.pdf").await;
    register(&app, &job, "two.pdf").await;

    let paused = app.crawl_job_service.pause("example.net").await.unwrap();
    assert_eq!(paused.status, CrawlJobStatus::Paused);
    assert!(app.queue.dispatch_next().await.unwrap().is_none());
    assert_eq!(
        app.validation_jobs
            .find_by_status(ValidationJobStatus::Paused)
            .await
            .unwrap()
            .len(),
        2
    );

    let resumed = app.crawl_job_service.resume("example.net").await.unwrap();
    assert_eq!(resumed.status, CrawlJobStatus::Running);
    let task = app.queue.dispatch_next().await.unwrap().expect("job dispatched");
    assert_eq!(task.job().crawl_job_id, job.id);

    assert_eq!(app.queue.abort(job.id).await, 1);
    app.wait_until_idle().await;
    let aborted = app
        .validation_jobs
        .find_by_status(ValidationJobStatus::Aborted)
        .await
        .unwrap();
    assert_eq!(aborted.len(), 1);
}
