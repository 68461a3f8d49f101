// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_job::{CrawlJob, CrawlJobStatus, CrawlRequest};
use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// 爬取任务仓库特质
///
/// 爬取任务与其关联请求一起读写，`save` 会同步请求关联关系。
#[async_trait]
pub trait CrawlJobRepository: Send + Sync {
    /// 保存任务（不存在则插入，存在则更新）
    async fn save(&self, job: &CrawlJob) -> Result<CrawlJob, RepositoryError>;
    /// 根据ID查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CrawlJob>, RepositoryError>;
    /// 根据域名查找任务
    async fn find_by_domain(&self, domain: &str) -> Result<Option<CrawlJob>, RepositoryError>;
    /// 查找处于指定状态的任务，按开始时间升序
    async fn find_by_status(
        &self,
        status: CrawlJobStatus,
    ) -> Result<Vec<CrawlJob>, RepositoryError>;
    /// 删除任务及其请求关联和未完成的校验任务
    async fn delete(&self, job: &CrawlJob) -> Result<(), RepositoryError>;
    /// 保存请求
    async fn save_request(&self, request: &CrawlRequest) -> Result<(), RepositoryError>;
    /// 查找请求关联的所有任务
    async fn find_jobs_for_request(
        &self,
        request_id: Uuid,
    ) -> Result<Vec<CrawlJob>, RepositoryError>;
}
