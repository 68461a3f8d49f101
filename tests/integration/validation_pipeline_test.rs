// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, NON_COMPLIANT_REPORT};
use crawlcheck::domain::models::crawl_job::{CrawlJob, CrawlJobStatus, CrawlRequest, CrawlService};
use crawlcheck::domain::models::document::DiscoveredDocument;
use crawlcheck::domain::models::validation_job::ValidationJobStatus;
use crawlcheck::domain::models::validation_result::{TestResult, ValidationError};
use crawlcheck::domain::repositories::crawl_job_repository::CrawlJobRepository;
use crawlcheck::domain::repositories::document_repository::DocumentRepository;
use crawlcheck::workers::crawl_monitor::CrawlMonitor;
use crawlcheck::workers::Worker;
use std::time::Duration;

fn report_script() -> String {
    format!("cat <<'XML'\n{}\nXML", NON_COMPLIANT_REPORT)
}

#[tokio::test]
async fn test_registered_document_is_validated_and_result_persisted() {
    let app = create_test_app(&report_script(), 2).await;
    let dispatcher = app.queue.start();

    let mut job = CrawlJob::new("example.com", CrawlService::Search)
        .with_requests(vec![CrawlRequest::new(Some("owner@example.com".into()), 1)]);
    job.start().unwrap();
    let job = app.crawl_jobs.save(&job).await.unwrap();

    let file = app.document("report.pdf");
    let url = "https://example.com/report.pdf";
    assert!(app
        .document_service
        .register(
            &job,
            DiscoveredDocument {
                url: url.to_string(),
                content_type: Some("pdf".to_string()),
                last_modified: None,
                file_path: Some(file.to_string_lossy().into_owned()),
            },
        )
        .await
        .unwrap());

    let queued = app.validation_jobs_for(job.id).await;
    assert_eq!(queued.len(), 1);
    let done = app.wait_for_status(queued[0].id, ValidationJobStatus::Done).await;
    assert_eq!(done.priority, 1);

    let document = app.documents.find_by_url("example.com", url).await.unwrap().unwrap();
    let result = app.documents.find_result(document.id).await.unwrap().unwrap();
    assert_eq!(result.test_result, TestResult::NotOpen);
    assert_eq!(
        result.errors,
        vec![ValidationError::RuleViolation {
            description: "The file header shall begin at byte zero".into(),
            specification: "ISO 19005-1:2005".into(),
            clause: "6.1.2".into(),
            test_number: "1".into(),
        }]
    );

    dispatcher.abort();
}

#[tokio::test]
async fn test_monitor_finishes_job_once_validation_drains() {
    let app = create_test_app(&report_script(), 1).await;
    let dispatcher = app.queue.start();

    let request = CrawlRequest::new(Some("owner@example.com".into()), 0);
    let mut job = CrawlJob::new("example.org", CrawlService::Search).with_requests(vec![request.clone()]);
    job.start().unwrap();
    job.discovery_finished = true;
    let job = app.crawl_jobs.save(&job).await.unwrap();

    for name in ["a.pdf", "b.pdf", "c.pdf"] {
        let file = app.document(name);
        app.document_service
            .register(
                &job,
                DiscoveredDocument {
                    url: format!("https://example.org/{}", name),
                    content_type: Some("pdf".to_string()),
                    last_modified: None,
                    file_path: Some(file.to_string_lossy().into_owned()),
                },
            )
            .await
            .unwrap();
    }

    let monitor = CrawlMonitor::new(
        app.crawl_jobs.clone(),
        app.crawl_job_service.clone(),
        Duration::from_secs(1),
    );

    for queued in app.validation_jobs_for(job.id).await {
        app.wait_for_status(queued.id, ValidationJobStatus::Done).await;
    }
    app.wait_until_idle().await;

    monitor.run_once().await.unwrap();

    let finished = app.crawl_jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(finished.status, CrawlJobStatus::Finished);
    assert!(finished.finish_time.is_some());
    assert!(finished.requests.iter().all(|r| r.finished));
    assert_eq!(*app.notifier.finished.lock(), vec!["example.org".to_string()]);

    dispatcher.abort();
}
