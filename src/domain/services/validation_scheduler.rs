// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use uuid::Uuid;

/// 校验调度器对外暴露的控制接口
#[async_trait]
pub trait ValidationScheduler: Send + Sync {
    /// 中止属于某个爬取任务的所有运行中校验，返回被中止的任务数
    async fn abort_crawl_job(&self, crawl_job_id: Uuid) -> usize;

    /// 有新任务可调度时唤醒调度器
    fn wake(&self);
}
