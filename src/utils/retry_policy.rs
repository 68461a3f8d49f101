// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// 重试策略配置
///
/// 固定间隔重试：`max_retries` 为总尝试次数，每两次尝试之间等待 `retry_interval`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大尝试次数
    pub max_retries: u32,
    /// 两次尝试之间的等待时间
    pub retry_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 120,
            retry_interval: Duration::from_secs(30),
        }
    }
}

/// 重试耗尽
#[derive(Debug)]
pub struct RetryExhausted<E> {
    /// 实际尝试次数
    pub attempts: u32,
    /// 最后一次失败的错误
    pub last_error: E,
}

impl RetryPolicy {
    /// 创建固定间隔重试策略，至少尝试一次
    pub fn fixed(max_retries: u32, retry_interval: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            retry_interval,
        }
    }

    /// 计算下次重试前的等待时间
    pub fn calculate_backoff(&self, _attempt: u32) -> Duration {
        self.retry_interval
    }

    /// 已尝试 `attempt` 次后是否还应继续
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// 按策略执行操作直到成功或尝试次数耗尽
    ///
    /// # 参数
    ///
    /// * `operation` - 接收当前尝试序号（从 1 开始）的异步操作
    ///
    /// # 返回值
    ///
    /// * `Ok(T)` - 某次尝试成功
    /// * `Err(RetryExhausted)` - 所有尝试均失败
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !self.should_retry(attempt) {
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: error,
                        });
                    }

                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        "Attempt failed: {}. Retrying in {:?}",
                        error,
                        backoff
                    );
                    metrics::counter!("transport_retries_total").increment(1);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
