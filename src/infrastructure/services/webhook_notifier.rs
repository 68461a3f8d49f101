// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_job::CrawlJob;
use crate::domain::services::notification_service::NotificationService;
use crate::infrastructure::services::retrying_client::RetryingClient;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// 完成通知负载
#[derive(Debug, Clone, Serialize)]
pub struct FinishedPayload {
    pub crawl_job_id: Uuid,
    pub domain: String,
    pub status: String,
    pub finish_time: Option<DateTime<Utc>>,
    pub requests: Vec<RequestSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    pub id: Uuid,
    pub email_address: Option<String>,
}

impl From<&CrawlJob> for FinishedPayload {
    fn from(job: &CrawlJob) -> Self {
        Self {
            crawl_job_id: job.id,
            domain: job.domain.clone(),
            status: job.status.to_string(),
            finish_time: job.finish_time,
            requests: job
                .requests
                .iter()
                .map(|r| RequestSummary {
                    id: r.id,
                    email_address: r.email_address.clone(),
                })
                .collect(),
        }
    }
}

/// 基于Webhook的完成通知实现
///
/// 每次通知在独立的tokio任务中通过重试客户端投递到所有配置的地址。
pub struct WebhookNotifier {
    client: RetryingClient,
    webhook_urls: Arc<Vec<String>>,
}

impl WebhookNotifier {
    /// 创建新的通知器
    ///
    /// # 参数
    ///
    /// * `client` - 重试客户端
    /// * `webhook_urls` - 接收通知的地址
    pub fn new(client: RetryingClient, webhook_urls: Vec<String>) -> Self {
        Self {
            client,
            webhook_urls: Arc::new(webhook_urls),
        }
    }
}

impl NotificationService for WebhookNotifier {
    fn notify_finished(&self, job: &CrawlJob) {
        if self.webhook_urls.is_empty() {
            return;
        }

        let payload = FinishedPayload::from(job);
        let client = self.client.clone();
        let urls = Arc::clone(&self.webhook_urls);

        tokio::spawn(async move {
            for url in urls.iter() {
                match client.post_json(url, &payload).await {
                    Ok(response) if response.status().is_success() => {
                        info!("Delivered finish notification for {} to {}", payload.domain, url);
                    }
                    Ok(response) => warn!(
                        "Finish notification for {} rejected by {} with status {}",
                        payload.domain,
                        url,
                        response.status()
                    ),
                    Err(e) => error!(
                        "Failed to deliver finish notification for {} to {}: {}",
                        payload.domain, url, e
                    ),
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::crawl_job::{CrawlRequest, CrawlService};
    use crate::utils::retry_policy::RetryPolicy;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_notify_finished_posts_to_every_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/finished"))
            .and(body_partial_json(serde_json::json!({
                "domain": "example.com",
                "status": "finished"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let url = format!("{}/hooks/finished", server.uri());
        let notifier = WebhookNotifier::new(
            RetryingClient::new(
                reqwest::Client::new(),
                RetryPolicy::fixed(2, Duration::from_millis(10)),
            ),
            vec![url.clone(), url],
        );

        let mut job = CrawlJob::new("example.com", CrawlService::Crawler)
            .with_requests(vec![CrawlRequest::new(Some("ops@example.com".into()), 0)]);
        job.start().unwrap();
        job.finish(Utc::now()).unwrap();

        notifier.notify_finished(&job);

        // delivery happens in the background
        for _ in 0..50 {
            if server.received_requests().await.map_or(0, |r| r.len()) >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        server.verify().await;
    }

    #[test]
    fn test_payload_lists_linked_requests() {
        let job = CrawlJob::new("example.com", CrawlService::Search)
            .with_requests(vec![CrawlRequest::new(Some("a@example.com".into()), 1)]);
        let payload = FinishedPayload::from(&job);

        assert_eq!(payload.requests.len(), 1);
        assert_eq!(payload.requests[0].email_address.as_deref(), Some("a@example.com"));
        assert_eq!(payload.status, "new");
    }
}
