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

use anyhow::Context;
use crawlcheck::config::settings::Settings;
use crawlcheck::domain::services::crawl_job_service::CrawlJobService;
use crawlcheck::domain::services::document_service::DocumentService;
use crawlcheck::engines::bing_search::BingSearchEngine;
use crawlcheck::engines::rest_crawler::RestCrawlerEngine;
use crawlcheck::infrastructure::database::connection;
use crawlcheck::infrastructure::metrics;
use crawlcheck::infrastructure::repositories::crawl_job_repo_impl::CrawlJobRepositoryImpl;
use crawlcheck::infrastructure::repositories::document_repo_impl::DocumentRepositoryImpl;
use crawlcheck::infrastructure::repositories::validation_job_repo_impl::ValidationJobRepositoryImpl;
use crawlcheck::infrastructure::services::retrying_client::RetryingClient;
use crawlcheck::infrastructure::services::webhook_notifier::WebhookNotifier;
use crawlcheck::queue::validation_queue::ValidationQueueManager;
use crawlcheck::utils::telemetry;
use crawlcheck::validator::external::ExternalValidatorFactory;
use crawlcheck::workers::crawl_monitor::CrawlMonitor;
use crawlcheck::workers::manager::WorkerManager;
use crawlcheck::workers::search_worker::SearchWorker;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动后台工作器
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting crawlcheck...");

    // 2. Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    info!("Configuration loaded");

    metrics::init_metrics(&settings.metrics);

    // 3. Working directories
    std::fs::create_dir_all(&settings.search.temp_folder).with_context(|| {
        format!(
            "failed to create search temp folder {}",
            settings.search.temp_folder.display()
        )
    })?;
    let validator_factory = Arc::new(
        ExternalValidatorFactory::new(&settings.validator)
            .context("failed to initialize validator")?,
    );

    // 4. Connect to database and run migrations
    let db = Arc::new(connection::connect_and_migrate(&settings.database).await?);
    info!("Database connection established");

    let crawl_jobs = Arc::new(CrawlJobRepositoryImpl::new(db.clone()));
    let documents = Arc::new(DocumentRepositoryImpl::new(db.clone()));
    let validation_jobs = Arc::new(ValidationJobRepositoryImpl::new(db));

    // 5. Validation queue
    let queue = Arc::new(ValidationQueueManager::new(
        validation_jobs.clone(),
        validator_factory,
        settings.validation_queue.thread_count,
        settings.validation_queue.tick_interval(),
    ));
    queue.init().await?;

    // 6. Discovery backends and services
    let crawler = Arc::new(RestCrawlerEngine::new(&settings.crawler)?);
    let search_engine = Arc::new(BingSearchEngine::new(&settings.search)?);
    let notifier = Arc::new(WebhookNotifier::new(
        RetryingClient::from_settings(&settings.transport),
        settings.notification.webhook_urls.clone(),
    ));

    let document_service = Arc::new(DocumentService::new(
        documents,
        validation_jobs.clone(),
        queue.clone(),
    ));
    let search_worker = Arc::new(SearchWorker::new(
        crawl_jobs.clone(),
        document_service,
        search_engine,
        reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.crawler.request_timeout_secs))
            .build()?,
        settings.search.clone(),
    ));
    let crawl_job_service = Arc::new(
        CrawlJobService::new(
            crawl_jobs.clone(),
            validation_jobs,
            crawler,
            queue.clone(),
            notifier,
        )
        .with_discarder(search_worker.clone()),
    );

    // 7. Start workers
    let mut worker_manager = WorkerManager::new();
    worker_manager.track(queue.start());
    if settings.search.enabled {
        worker_manager.start_worker(search_worker);
    } else {
        info!("Search discovery disabled");
    }
    worker_manager.start_worker(Arc::new(CrawlMonitor::new(
        crawl_jobs,
        crawl_job_service,
        Duration::from_secs(settings.monitor.interval_secs.max(1)),
    )));
    info!("crawlcheck is running");

    worker_manager.wait_for_shutdown().await;
    Ok(())
}
