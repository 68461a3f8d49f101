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

use crate::domain::models::crawl_job::{CrawlJob, CrawlJobStatus, CrawlRequest};
use crate::domain::repositories::crawl_job_repository::{CrawlJobRepository, RepositoryError};
use crate::infrastructure::database::entities::{
    crawl_job as crawl_job_entity, crawl_job_request as link_entity,
    crawl_request as request_entity, document as document_entity,
    document_property as property_entity, validation_error as error_entity,
    validation_job as validation_job_entity,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

/// 爬取任务仓库实现
///
/// 基于SeaORM实现的爬取任务数据访问层，任务的请求关联随任务一起读写
#[derive(Clone)]
pub struct CrawlJobRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl CrawlJobRepositoryImpl {
    /// 创建新的爬取任务仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    ///
    /// # 返回值
    ///
    /// 返回新的仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn load_requests(&self, crawl_job_id: Uuid) -> Result<Vec<CrawlRequest>, RepositoryError> {
        let request_ids: Vec<Uuid> = link_entity::Entity::find()
            .select_only()
            .column(link_entity::Column::CrawlRequestId)
            .filter(link_entity::Column::CrawlJobId.eq(crawl_job_id))
            .into_tuple()
            .all(self.db.as_ref())
            .await?;

        if request_ids.is_empty() {
            return Ok(Vec::new());
        }

        let requests = request_entity::Entity::find()
            .filter(request_entity::Column::Id.is_in(request_ids))
            .order_by_asc(request_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        Ok(requests.into_iter().map(Into::into).collect())
    }

    async fn with_requests(&self, model: crawl_job_entity::Model) -> Result<CrawlJob, RepositoryError> {
        let requests = self.load_requests(model.id).await?;
        let mut job: CrawlJob = model.into();
        job.requests = requests;
        Ok(job)
    }
}

impl From<crawl_job_entity::Model> for CrawlJob {
    fn from(model: crawl_job_entity::Model) -> Self {
        Self {
            id: model.id,
            domain: model.domain,
            crawl_service: model.crawl_service.parse().unwrap_or_default(),
            backend_job_id: model.backend_job_id,
            status: model.status.parse().unwrap_or_default(),
            start_time: model.start_time.with_timezone(&Utc),
            finish_time: model.finish_time.map(|t| t.with_timezone(&Utc)),
            discovery_finished: model.discovery_finished,
            requests: Vec::new(),
        }
    }
}

impl From<CrawlJob> for crawl_job_entity::ActiveModel {
    fn from(job: CrawlJob) -> Self {
        Self {
            id: Set(job.id),
            domain: Set(job.domain),
            crawl_service: Set(job.crawl_service.to_string()),
            backend_job_id: Set(job.backend_job_id),
            status: Set(job.status.to_string()),
            start_time: Set(job.start_time.into()),
            finish_time: Set(job.finish_time.map(Into::into)),
            discovery_finished: Set(job.discovery_finished),
        }
    }
}

impl From<request_entity::Model> for CrawlRequest {
    fn from(model: request_entity::Model) -> Self {
        Self {
            id: model.id,
            email_address: model.email_address,
            priority: model.priority,
            crawl_since: model.crawl_since,
            finished: model.finished,
        }
    }
}

impl From<CrawlRequest> for request_entity::ActiveModel {
    fn from(request: CrawlRequest) -> Self {
        Self {
            id: Set(request.id),
            email_address: Set(request.email_address),
            priority: Set(request.priority),
            crawl_since: Set(request.crawl_since),
            finished: Set(request.finished),
            created_at: Set(Utc::now().into()),
        }
    }
}

#[async_trait]
impl CrawlJobRepository for CrawlJobRepositoryImpl {
    async fn save(&self, job: &CrawlJob) -> Result<CrawlJob, RepositoryError> {
        let txn = self.db.begin().await?;
        let model: crawl_job_entity::ActiveModel = job.clone().into();

        crawl_job_entity::Entity::insert(model)
            .on_conflict(
                OnConflict::column(crawl_job_entity::Column::Id)
                    .update_columns([
                        crawl_job_entity::Column::Domain,
                        crawl_job_entity::Column::CrawlService,
                        crawl_job_entity::Column::BackendJobId,
                        crawl_job_entity::Column::Status,
                        crawl_job_entity::Column::StartTime,
                        crawl_job_entity::Column::FinishTime,
                        crawl_job_entity::Column::DiscoveryFinished,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        // request rows are only updated through save_request
        let requests: Vec<request_entity::ActiveModel> =
            job.requests.iter().cloned().map(Into::into).collect();
        if !requests.is_empty() {
            request_entity::Entity::insert_many(requests)
                .on_conflict(
                    OnConflict::column(request_entity::Column::Id)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        link_entity::Entity::delete_many()
            .filter(link_entity::Column::CrawlJobId.eq(job.id))
            .exec(&txn)
            .await?;

        let links: Vec<link_entity::ActiveModel> = job
            .requests
            .iter()
            .map(|request| link_entity::ActiveModel {
                crawl_job_id: Set(job.id),
                crawl_request_id: Set(request.id),
            })
            .collect();
        if !links.is_empty() {
            link_entity::Entity::insert_many(links)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(job.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CrawlJob>, RepositoryError> {
        let model = crawl_job_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        match model {
            Some(model) => Ok(Some(self.with_requests(model).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<CrawlJob>, RepositoryError> {
        let model = crawl_job_entity::Entity::find()
            .filter(crawl_job_entity::Column::Domain.eq(domain))
            .one(self.db.as_ref())
            .await?;

        match model {
            Some(model) => Ok(Some(self.with_requests(model).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_status(
        &self,
        status: CrawlJobStatus,
    ) -> Result<Vec<CrawlJob>, RepositoryError> {
        let models = crawl_job_entity::Entity::find()
            .filter(crawl_job_entity::Column::Status.eq(status.to_string()))
            .order_by_asc(crawl_job_entity::Column::StartTime)
            .all(self.db.as_ref())
            .await?;

        let mut jobs = Vec::with_capacity(models.len());
        for model in models {
            jobs.push(self.with_requests(model).await?);
        }
        Ok(jobs)
    }

    async fn delete(&self, job: &CrawlJob) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;

        let document_ids: Vec<Uuid> = document_entity::Entity::find()
            .select_only()
            .column(document_entity::Column::Id)
            .filter(document_entity::Column::CrawlJobId.eq(job.id))
            .into_tuple()
            .all(&txn)
            .await?;

        if !document_ids.is_empty() {
            error_entity::Entity::delete_many()
                .filter(error_entity::Column::DocumentId.is_in(document_ids.clone()))
                .exec(&txn)
                .await?;
            property_entity::Entity::delete_many()
                .filter(property_entity::Column::DocumentId.is_in(document_ids))
                .exec(&txn)
                .await?;
        }

        document_entity::Entity::delete_many()
            .filter(document_entity::Column::CrawlJobId.eq(job.id))
            .exec(&txn)
            .await?;
        validation_job_entity::Entity::delete_many()
            .filter(validation_job_entity::Column::CrawlJobId.eq(job.id))
            .exec(&txn)
            .await?;
        link_entity::Entity::delete_many()
            .filter(link_entity::Column::CrawlJobId.eq(job.id))
            .exec(&txn)
            .await?;
        crawl_job_entity::Entity::delete_by_id(job.id)
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    async fn save_request(&self, request: &CrawlRequest) -> Result<(), RepositoryError> {
        let model: request_entity::ActiveModel = request.clone().into();

        request_entity::Entity::insert(model)
            .on_conflict(
                OnConflict::column(request_entity::Column::Id)
                    .update_columns([
                        request_entity::Column::EmailAddress,
                        request_entity::Column::Priority,
                        request_entity::Column::CrawlSince,
                        request_entity::Column::Finished,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        Ok(())
    }

    async fn find_jobs_for_request(
        &self,
        request_id: Uuid,
    ) -> Result<Vec<CrawlJob>, RepositoryError> {
        let job_ids: Vec<Uuid> = link_entity::Entity::find()
            .select_only()
            .column(link_entity::Column::CrawlJobId)
            .filter(link_entity::Column::CrawlRequestId.eq(request_id))
            .into_tuple()
            .all(self.db.as_ref())
            .await?;

        if job_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = crawl_job_entity::Entity::find()
            .filter(crawl_job_entity::Column::Id.is_in(job_ids))
            .order_by_asc(crawl_job_entity::Column::StartTime)
            .all(self.db.as_ref())
            .await?;

        let mut jobs = Vec::with_capacity(models.len());
        for model in models {
            jobs.push(self.with_requests(model).await?);
        }
        Ok(jobs)
    }
}

#[cfg(test)]
#[path = "crawl_job_repo_impl_test.rs"]
mod tests;
