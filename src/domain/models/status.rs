// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::crawl_job::CrawlJob;
use super::validation_job::ValidationJob;
use serde::{Deserialize, Serialize};

/// 状态查询返回的最多校验任务数
pub const STATUS_TOP_N: u64 = 10;

/// 发现后端状态
///
/// 查询失败时不报错，而是记录为 "Unavailable: <message>"。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    pub description: String,
    pub finished: Option<bool>,
}

impl BackendStatus {
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self {
            description: format!("Unavailable: {}", message),
            finished: None,
        }
    }
}

/// 校验队列快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationQueueStatus {
    /// 尚未完成的校验任务数（未开始、进行中或暂停）
    pub pending_count: u64,
    /// 按状态再按 ID 排序的前若干个任务
    pub top_jobs: Vec<ValidationJob>,
}

/// 爬取任务完整状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJobStatusReport {
    pub crawl_job: CrawlJob,
    /// 搜索后端没有可查询的状态
    pub backend_status: Option<BackendStatus>,
    pub validation_queue: ValidationQueueStatus,
}
