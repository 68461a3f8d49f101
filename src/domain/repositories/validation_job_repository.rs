// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::crawl_job_repository::RepositoryError;
use crate::domain::models::validation_job::{ValidationJob, ValidationJobStatus};
use crate::domain::models::validation_result::ValidationResult;
use async_trait::async_trait;
use uuid::Uuid;

/// 校验任务仓库特质
///
/// 调度顺序：优先级升序，其次爬取任务开始时间升序。
#[async_trait]
pub trait ValidationJobRepository: Send + Sync {
    /// 入队校验任务
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 新建成功
    /// * `Ok(false)` - 文档已有校验任务
    async fn enqueue(&self, job: &ValidationJob) -> Result<bool, RepositoryError>;

    /// 认领优先级最高的 NOT_STARTED 任务并标记为 IN_PROGRESS
    async fn acquire_next(&self) -> Result<Option<ValidationJob>, RepositoryError>;

    /// 根据ID查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ValidationJob>, RepositoryError>;

    /// 查找指定状态的任务，按调度顺序排列
    async fn find_by_status(
        &self,
        status: ValidationJobStatus,
    ) -> Result<Vec<ValidationJob>, RepositoryError>;

    /// 将某个爬取任务下处于 `from` 状态的任务批量改为 `to`
    ///
    /// # 返回值
    ///
    /// 受影响的行数
    async fn bulk_set_status(
        &self,
        crawl_job_id: Uuid,
        from: ValidationJobStatus,
        to: ValidationJobStatus,
    ) -> Result<u64, RepositoryError>;

    /// 将某个爬取任务下尚未开始或已暂停的任务改为新的优先级
    ///
    /// # 返回值
    ///
    /// 受影响的行数
    async fn update_priority(
        &self,
        crawl_job_id: Uuid,
        priority: i32,
    ) -> Result<u64, RepositoryError>;

    /// 将上次运行遗留的 IN_PROGRESS 任务重置为 NOT_STARTED
    async fn reset_in_progress(&self) -> Result<u64, RepositoryError>;

    /// 更新单个任务状态
    async fn set_status(
        &self,
        id: Uuid,
        status: ValidationJobStatus,
    ) -> Result<(), RepositoryError>;

    /// 保存校验结果并将任务从 IN_PROGRESS 改为 DONE
    ///
    /// 状态更新与结果写入在同一事务内完成；任务不再处于 IN_PROGRESS 时不写入任何内容。
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 结果已保存
    /// * `Ok(false)` - 任务状态已变化，结果被丢弃
    async fn save_result(
        &self,
        job: &ValidationJob,
        result: &ValidationResult,
    ) -> Result<bool, RepositoryError>;

    /// 统计尚未完成的任务数，`crawl_job_id` 为空时统计全部
    async fn count_pending(&self, crawl_job_id: Option<Uuid>) -> Result<u64, RepositoryError>;

    /// 按状态再按ID排序返回某个爬取任务的前 `limit` 个任务
    async fn top_for_crawl_job(
        &self,
        crawl_job_id: Uuid,
        limit: u64,
    ) -> Result<Vec<ValidationJob>, RepositoryError>;
}
