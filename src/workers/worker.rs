// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::WorkerError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Worker trait定义
///
/// 所有周期性后台工作器都必须实现此trait
#[async_trait]
pub trait Worker: Send + Sync {
    /// 执行一轮工作
    async fn run_once(&self) -> Result<(), WorkerError>;

    /// 获取工作器名称
    fn name(&self) -> &str;

    /// 两轮工作之间的间隔
    fn interval(&self) -> Duration;
}

/// 在后台按固定间隔运行工作器
///
/// 单轮失败只记录日志，不会终止循环。
///
/// # 参数
///
/// * `worker` - 要运行的工作器
///
/// # 返回值
///
/// 后台任务句柄
pub fn spawn_periodic<W>(worker: Arc<W>) -> JoinHandle<()>
where
    W: Worker + ?Sized + 'static,
{
    tokio::spawn(async move {
        info!("{} started", worker.name());

        let mut interval = tokio::time::interval(worker.interval());
        loop {
            interval.tick().await;

            if let Err(e) = worker.run_once().await {
                error!("{} failed: {}", worker.name(), e);
            }
        }
    })
}
