// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::validation_job::{ValidationJob, ValidationJobStatus};
use crate::domain::models::validation_result::{truncate_value, ValidationError, ValidationResult};
use crate::domain::repositories::crawl_job_repository::RepositoryError;
use crate::domain::repositories::validation_job_repository::ValidationJobRepository;
use crate::infrastructure::database::entities::{
    document as document_entity, document_property as property_entity,
    validation_error as error_entity, validation_job as job_entity,
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::{Expr, LockBehavior, LockType, OnConflict},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

/// 校验任务仓库实现
///
/// 基于SeaORM实现的校验任务数据访问层
#[derive(Clone)]
pub struct ValidationJobRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ValidationJobRepositoryImpl {
    /// 创建新的校验任务仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn write_result(
        txn: &DatabaseTransaction,
        job: &ValidationJob,
        result: &ValidationResult,
        now: DateTime<FixedOffset>,
    ) -> Result<(), RepositoryError> {
        document_entity::Entity::update_many()
            .col_expr(
                document_entity::Column::TestResult,
                Expr::value(Some(result.test_result.to_string())),
            )
            .col_expr(document_entity::Column::ValidatedAt, Expr::value(Some(now)))
            .filter(document_entity::Column::Id.eq(job.id))
            .exec(txn)
            .await?;

        error_entity::Entity::delete_many()
            .filter(error_entity::Column::DocumentId.eq(job.id))
            .exec(txn)
            .await?;
        property_entity::Entity::delete_many()
            .filter(property_entity::Column::DocumentId.eq(job.id))
            .exec(txn)
            .await?;

        let errors: Vec<error_entity::ActiveModel> = result
            .errors
            .iter()
            .enumerate()
            .map(|(position, error)| error_model(job.id, position as i32, error))
            .collect();
        if !errors.is_empty() {
            error_entity::Entity::insert_many(errors)
                .exec_without_returning(txn)
                .await?;
        }

        let properties: Vec<property_entity::ActiveModel> = result
            .properties
            .iter()
            .map(|(name, value)| property_entity::ActiveModel {
                document_id: Set(job.id),
                name: Set(name.clone()),
                value: Set(truncate_value(value)),
            })
            .collect();
        if !properties.is_empty() {
            property_entity::Entity::insert_many(properties)
                .exec_without_returning(txn)
                .await?;
        }

        Ok(())
    }
}

fn error_model(document_id: Uuid, position: i32, error: &ValidationError) -> error_entity::ActiveModel {
    let (specification, clause, test_number) = match error {
        ValidationError::Generic { .. } => (None, None, None),
        ValidationError::RuleViolation {
            specification,
            clause,
            test_number,
            ..
        } => (
            Some(specification.clone()),
            Some(clause.clone()),
            Some(test_number.clone()),
        ),
    };

    error_entity::ActiveModel {
        document_id: Set(document_id),
        position: Set(position),
        kind: Set(error.kind().to_string()),
        description: Set(truncate_value(error.description())),
        specification: Set(specification),
        clause: Set(clause),
        test_number: Set(test_number),
        ..Default::default()
    }
}

impl From<job_entity::Model> for ValidationJob {
    fn from(model: job_entity::Model) -> Self {
        Self {
            id: model.id,
            crawl_job_id: model.crawl_job_id,
            domain: model.domain,
            document_url: model.document_url,
            file_path: model.file_path,
            status: model.status.parse().unwrap_or_default(),
            priority: model.priority,
            crawl_started_at: model.crawl_started_at.with_timezone(&Utc),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<ValidationJob> for job_entity::ActiveModel {
    fn from(job: ValidationJob) -> Self {
        Self {
            id: Set(job.id),
            crawl_job_id: Set(job.crawl_job_id),
            domain: Set(job.domain),
            document_url: Set(job.document_url),
            file_path: Set(job.file_path),
            status: Set(job.status.to_string()),
            priority: Set(job.priority),
            crawl_started_at: Set(job.crawl_started_at.into()),
            created_at: Set(job.created_at.into()),
            updated_at: Set(job.updated_at.into()),
        }
    }
}

#[async_trait]
impl ValidationJobRepository for ValidationJobRepositoryImpl {
    async fn enqueue(&self, job: &ValidationJob) -> Result<bool, RepositoryError> {
        let model: job_entity::ActiveModel = job.clone().into();

        let inserted = job_entity::Entity::insert(model)
            .on_conflict(
                OnConflict::column(job_entity::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        Ok(inserted > 0)
    }

    async fn acquire_next(&self) -> Result<Option<ValidationJob>, RepositoryError> {
        let txn = self.db.begin().await?;

        let next = job_entity::Entity::find()
            .filter(job_entity::Column::Status.eq(ValidationJobStatus::NotStarted.to_string()))
            .filter(job_entity::Column::FilePath.is_not_null())
            .order_by_asc(job_entity::Column::Priority)
            .order_by_asc(job_entity::Column::CrawlStartedAt)
            .order_by_asc(job_entity::Column::CreatedAt)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .one(&txn)
            .await?;

        if let Some(model) = next {
            let mut active: job_entity::ActiveModel = model.into();
            active.status = Set(ValidationJobStatus::InProgress.to_string());
            active.updated_at = Set(Utc::now().into());

            let updated = active.update(&txn).await?;
            txn.commit().await?;

            return Ok(Some(updated.into()));
        }

        txn.commit().await?;
        Ok(None)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ValidationJob>, RepositoryError> {
        let model = job_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn find_by_status(
        &self,
        status: ValidationJobStatus,
    ) -> Result<Vec<ValidationJob>, RepositoryError> {
        let models = job_entity::Entity::find()
            .filter(job_entity::Column::Status.eq(status.to_string()))
            .order_by_asc(job_entity::Column::Priority)
            .order_by_asc(job_entity::Column::CrawlStartedAt)
            .order_by_asc(job_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn bulk_set_status(
        &self,
        crawl_job_id: Uuid,
        from: ValidationJobStatus,
        to: ValidationJobStatus,
    ) -> Result<u64, RepositoryError> {
        let result = job_entity::Entity::update_many()
            .col_expr(job_entity::Column::Status, Expr::value(to.to_string()))
            .col_expr(
                job_entity::Column::UpdatedAt,
                Expr::value(DateTime::<FixedOffset>::from(Utc::now())),
            )
            .filter(job_entity::Column::CrawlJobId.eq(crawl_job_id))
            .filter(job_entity::Column::Status.eq(from.to_string()))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }

    async fn update_priority(
        &self,
        crawl_job_id: Uuid,
        priority: i32,
    ) -> Result<u64, RepositoryError> {
        let result = job_entity::Entity::update_many()
            .col_expr(job_entity::Column::Priority, Expr::value(priority))
            .col_expr(
                job_entity::Column::UpdatedAt,
                Expr::value(DateTime::<FixedOffset>::from(Utc::now())),
            )
            .filter(job_entity::Column::CrawlJobId.eq(crawl_job_id))
            .filter(job_entity::Column::Status.is_in([
                ValidationJobStatus::NotStarted.to_string(),
                ValidationJobStatus::Paused.to_string(),
            ]))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }

    async fn reset_in_progress(&self) -> Result<u64, RepositoryError> {
        let result = job_entity::Entity::update_many()
            .col_expr(
                job_entity::Column::Status,
                Expr::value(ValidationJobStatus::NotStarted.to_string()),
            )
            .col_expr(
                job_entity::Column::UpdatedAt,
                Expr::value(DateTime::<FixedOffset>::from(Utc::now())),
            )
            .filter(job_entity::Column::Status.eq(ValidationJobStatus::InProgress.to_string()))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ValidationJobStatus,
    ) -> Result<(), RepositoryError> {
        job_entity::Entity::update_many()
            .col_expr(job_entity::Column::Status, Expr::value(status.to_string()))
            .col_expr(
                job_entity::Column::UpdatedAt,
                Expr::value(DateTime::<FixedOffset>::from(Utc::now())),
            )
            .filter(job_entity::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        Ok(())
    }

    async fn save_result(
        &self,
        job: &ValidationJob,
        result: &ValidationResult,
    ) -> Result<bool, RepositoryError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let txn = self.db.begin().await?;

        let claimed = job_entity::Entity::update_many()
            .col_expr(
                job_entity::Column::Status,
                Expr::value(ValidationJobStatus::Done.to_string()),
            )
            .col_expr(job_entity::Column::UpdatedAt, Expr::value(now))
            .filter(job_entity::Column::Id.eq(job.id))
            .filter(job_entity::Column::Status.eq(ValidationJobStatus::InProgress.to_string()))
            .exec(&txn)
            .await?
            .rows_affected;

        if claimed == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        Self::write_result(&txn, job, result, now).await?;
        txn.commit().await?;

        Ok(true)
    }

    async fn count_pending(&self, crawl_job_id: Option<Uuid>) -> Result<u64, RepositoryError> {
        let mut query = job_entity::Entity::find().filter(job_entity::Column::Status.is_in([
            ValidationJobStatus::NotStarted.to_string(),
            ValidationJobStatus::InProgress.to_string(),
            ValidationJobStatus::Paused.to_string(),
        ]));

        if let Some(id) = crawl_job_id {
            query = query.filter(job_entity::Column::CrawlJobId.eq(id));
        }

        Ok(query.count(self.db.as_ref()).await?)
    }

    async fn top_for_crawl_job(
        &self,
        crawl_job_id: Uuid,
        limit: u64,
    ) -> Result<Vec<ValidationJob>, RepositoryError> {
        let models = job_entity::Entity::find()
            .filter(job_entity::Column::CrawlJobId.eq(crawl_job_id))
            .order_by_asc(job_entity::Column::Status)
            .order_by_asc(job_entity::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
#[path = "validation_job_repo_impl_test.rs"]
mod tests;
