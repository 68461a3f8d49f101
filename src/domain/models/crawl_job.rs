// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 爬取任务实体
///
/// 每个域名同一时间最多只有一个活动的爬取任务。任务绑定一个发现后端，
/// 切换后端时需要销毁旧任务并创建新任务，同时迁移关联的请求。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJob {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 规范化后的域名（不含协议和路径）
    pub domain: String,
    /// 发现后端
    pub crawl_service: CrawlService,
    /// 发现后端内部使用的任务句柄
    pub backend_job_id: String,
    /// 任务状态
    pub status: CrawlJobStatus,
    /// 开始时间
    pub start_time: DateTime<Utc>,
    /// 结束时间，仅在 FINISHED/FAILED 时存在
    pub finish_time: Option<DateTime<Utc>>,
    /// 发现后端是否已经完成文档发现（搜索后端使用）
    pub discovery_finished: bool,
    /// 关联的外部请求
    pub requests: Vec<CrawlRequest>,
}

/// 发现后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrawlService {
    /// 主爬虫
    #[default]
    Crawler,
    /// 基于搜索引擎查询的后端
    Search,
}

impl fmt::Display for CrawlService {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CrawlService::Crawler => write!(f, "crawler"),
            CrawlService::Search => write!(f, "search"),
        }
    }
}

impl FromStr for CrawlService {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crawler" => Ok(CrawlService::Crawler),
            "search" => Ok(CrawlService::Search),
            _ => Err(()),
        }
    }
}

/// 爬取任务状态
///
/// 状态转换：New → Running → {Paused ⇄ Running} → Finished/Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrawlJobStatus {
    #[default]
    New,
    Running,
    Paused,
    Finished,
    Failed,
}

impl CrawlJobStatus {
    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(self, CrawlJobStatus::Finished | CrawlJobStatus::Failed)
    }
}

impl fmt::Display for CrawlJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CrawlJobStatus::New => write!(f, "new"),
            CrawlJobStatus::Running => write!(f, "running"),
            CrawlJobStatus::Paused => write!(f, "paused"),
            CrawlJobStatus::Finished => write!(f, "finished"),
            CrawlJobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for CrawlJobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(CrawlJobStatus::New),
            "running" => Ok(CrawlJobStatus::Running),
            "paused" => Ok(CrawlJobStatus::Paused),
            "finished" => Ok(CrawlJobStatus::Finished),
            "failed" => Ok(CrawlJobStatus::Failed),
            _ => Err(()),
        }
    }
}

/// 爬取请求
///
/// 外部调用方提交的请求，一个请求可以覆盖多个域名，一个任务也可以服务多个请求。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub id: Uuid,
    /// 完成后接收通知的邮箱
    pub email_address: Option<String>,
    /// 请求方指定的优先级，数值越小越先处理
    pub priority: i32,
    /// 只关注该日期之后修改的文档
    pub crawl_since: Option<NaiveDate>,
    /// 该请求涉及的所有任务是否都已完成
    pub finished: bool,
}

impl CrawlRequest {
    pub fn new(email_address: Option<String>, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            email_address,
            priority,
            crawl_since: None,
            finished: false,
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    /// 当前状态不允许该转换
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: CrawlJobStatus,
        to: CrawlJobStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl CrawlJob {
    /// 为域名创建一个 NEW 状态的爬取任务
    ///
    /// # 参数
    ///
    /// * `domain` - 已规范化的域名
    /// * `crawl_service` - 发现后端
    ///
    /// # 返回值
    ///
    /// 返回新创建的任务实例
    pub fn new(domain: impl Into<String>, crawl_service: CrawlService) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            domain: domain.into(),
            crawl_service,
            backend_job_id: id.to_string(),
            status: CrawlJobStatus::New,
            start_time: Utc::now(),
            finish_time: None,
            discovery_finished: false,
            requests: Vec::new(),
        }
    }

    /// 附带一组请求
    pub fn with_requests(mut self, requests: Vec<CrawlRequest>) -> Self {
        for request in requests {
            self.link_request(request);
        }
        self
    }

    /// 关联一个请求，已关联的请求会被忽略
    pub fn link_request(&mut self, request: CrawlRequest) {
        if !self.requests.iter().any(|r| r.id == request.id) {
            self.requests.push(request);
        }
    }

    /// 校验任务的调度优先级：取关联请求中的最小值，没有请求时为 0
    pub fn priority(&self) -> i32 {
        self.requests.iter().map(|r| r.priority).min().unwrap_or(0)
    }

    /// NEW → RUNNING
    pub fn start(&mut self) -> Result<(), DomainError> {
        self.transition(CrawlJobStatus::New, CrawlJobStatus::Running)
    }

    /// RUNNING → PAUSED
    pub fn pause(&mut self) -> Result<(), DomainError> {
        self.transition(CrawlJobStatus::Running, CrawlJobStatus::Paused)
    }

    /// PAUSED → RUNNING
    pub fn resume(&mut self) -> Result<(), DomainError> {
        self.transition(CrawlJobStatus::Paused, CrawlJobStatus::Running)
    }

    /// 标记任务完成并记录结束时间
    ///
    /// 只有 RUNNING 的任务可以完成。
    pub fn finish(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(CrawlJobStatus::Running, CrawlJobStatus::Finished)?;
        self.finish_time = Some(at);
        Ok(())
    }

    /// 标记任务失败并记录结束时间
    ///
    /// 任何非终止状态都可以失败。
    pub fn fail(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: CrawlJobStatus::Failed,
            });
        }
        self.status = CrawlJobStatus::Failed;
        self.finish_time = Some(at);
        Ok(())
    }

    fn transition(
        &mut self,
        from: CrawlJobStatus,
        to: CrawlJobStatus,
    ) -> Result<(), DomainError> {
        if self.status != from {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
