// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 校验任务
///
/// 针对单个已发现文档的合规性校验。任务 ID 与文档 ID 相同，
/// 因此每个文档最多只有一个校验任务。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationJob {
    /// 任务 ID（即文档 ID）
    pub id: Uuid,
    /// 所属爬取任务
    pub crawl_job_id: Uuid,
    /// 文档所在域名
    pub domain: String,
    /// 文档 URL
    pub document_url: String,
    /// 本地文件路径，校验器读取该文件
    pub file_path: Option<String>,
    /// 任务状态
    pub status: ValidationJobStatus,
    /// 请求方优先级，数值越小越先处理
    pub priority: i32,
    /// 所属爬取任务的开始时间，作为第二排序键
    pub crawl_started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 校验任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationJobStatus {
    /// 等待调度
    #[default]
    NotStarted,
    /// 正在由某个校验任务处理
    InProgress,
    /// 所属爬取任务已暂停
    Paused,
    /// 所属爬取任务在校验过程中被销毁
    Aborted,
    /// 结果已保存
    Done,
}

impl fmt::Display for ValidationJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationJobStatus::NotStarted => write!(f, "not_started"),
            ValidationJobStatus::InProgress => write!(f, "in_progress"),
            ValidationJobStatus::Paused => write!(f, "paused"),
            ValidationJobStatus::Aborted => write!(f, "aborted"),
            ValidationJobStatus::Done => write!(f, "done"),
        }
    }
}

impl FromStr for ValidationJobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(ValidationJobStatus::NotStarted),
            "in_progress" => Ok(ValidationJobStatus::InProgress),
            "paused" => Ok(ValidationJobStatus::Paused),
            "aborted" => Ok(ValidationJobStatus::Aborted),
            "done" => Ok(ValidationJobStatus::Done),
            _ => Err(()),
        }
    }
}

impl ValidationJob {
    /// 为已下载到本地的文档创建校验任务
    ///
    /// # 参数
    ///
    /// * `document_id` - 文档 ID
    /// * `crawl_job_id` - 所属爬取任务 ID
    /// * `domain` - 域名
    /// * `document_url` - 文档 URL
    /// * `file_path` - 本地文件路径
    pub fn new(
        document_id: Uuid,
        crawl_job_id: Uuid,
        domain: impl Into<String>,
        document_url: impl Into<String>,
        file_path: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: document_id,
            crawl_job_id,
            domain: domain.into(),
            document_url: document_url.into(),
            file_path,
            status: ValidationJobStatus::NotStarted,
            priority: 0,
            crawl_started_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// 设置调度优先级键
    pub fn with_priority(mut self, priority: i32, crawl_started_at: DateTime<Utc>) -> Self {
        self.priority = priority;
        self.crawl_started_at = crawl_started_at;
        self
    }

    /// 比较两个任务的调度顺序，`Less` 表示 `self` 先被调度
    pub fn dispatch_order(&self, other: &Self) -> Ordering {
        (self.priority, self.crawl_started_at, self.created_at).cmp(&(
            other.priority,
            other.crawl_started_at,
            other.created_at,
        ))
    }
}
