// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::TransportSettings;
use crate::utils::retry_policy::RetryPolicy;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// 传输错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    /// 所有尝试均因传输层错误失败
    #[error("Request failed after {attempts} attempts: {last_error}")]
    Exhausted {
        attempts: u32,
        last_error: reqwest::Error,
    },
}

/// 带固定间隔重试的HTTP客户端
///
/// 只有传输层错误（连接失败、超时等）会触发重试；
/// 服务端返回的任何状态码都原样交给调用方。
#[derive(Clone)]
pub struct RetryingClient {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    /// 创建新的重试客户端
    ///
    /// # 参数
    ///
    /// * `client` - 底层HTTP客户端
    /// * `policy` - 重试策略
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// 根据传输配置创建客户端
    pub fn from_settings(settings: &TransportSettings) -> Self {
        Self::new(
            Client::new(),
            RetryPolicy::fixed(settings.max_retries, settings.retry_interval()),
        )
    }

    /// 重试策略
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 发送请求，传输失败时按策略重试
    ///
    /// 每次尝试都会调用 `build` 重新构造请求，因此请求体可以安全重放。
    ///
    /// # 参数
    ///
    /// * `build` - 基于底层客户端构造请求
    ///
    /// # 返回值
    ///
    /// * `Ok(Response)` - 服务端的响应（可能是非2xx）
    /// * `Err(TransportError)` - 重试次数耗尽
    pub async fn send<F>(&self, build: F) -> Result<Response, TransportError>
    where
        F: Fn(&Client) -> RequestBuilder + Sync,
    {
        let result = self
            .policy
            .execute(|attempt| {
                let request = build(&self.client);
                async move {
                    debug!(attempt, "Sending request");
                    request.send().await
                }
            })
            .await;

        result.map_err(|exhausted| {
            error!(
                "Giving up after {} attempts: {}",
                exhausted.attempts, exhausted.last_error
            );
            TransportError::Exhausted {
                attempts: exhausted.attempts,
                last_error: exhausted.last_error,
            }
        })
    }

    /// 以JSON请求体POST到指定地址
    pub async fn post_json<T>(&self, url: &str, body: &T) -> Result<Response, TransportError>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.send(|client| client.post(url).json(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(max_retries: u32) -> RetryingClient {
        RetryingClient::new(
            Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap(),
            RetryPolicy::fixed(max_retries, Duration::from_millis(20)),
        )
    }

    #[tokio::test]
    async fn test_successful_request_is_sent_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/documents"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(3)
            .post_json(
                &format!("{}/api/documents", server.uri()),
                &serde_json::json!({"url": "https://example.com/a.pdf"}),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_error_status_is_returned_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let url = server.uri();
        let response = client(3).send(|c| c.get(&url)).await.unwrap();

        assert_eq!(response.status(), 503);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_exhausts_attempts() {
        // bind and release a port so nothing is listening on it
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let started = std::time::Instant::now();
        let err = client(3).send(|c| c.get(&url)).await.unwrap_err();

        let TransportError::Exhausted { attempts, last_error } = err;
        assert_eq!(attempts, 3);
        assert!(last_error.is_connect() || last_error.is_request());
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
