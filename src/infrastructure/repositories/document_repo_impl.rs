// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::document::Document;
use crate::domain::models::validation_result::{ValidationError, ValidationResult};
use crate::domain::repositories::crawl_job_repository::RepositoryError;
use crate::domain::repositories::document_repository::DocumentRepository;
use crate::infrastructure::database::entities::{
    document as document_entity, document_property as property_entity,
    validation_error as error_entity,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 文档仓库实现
#[derive(Clone)]
pub struct DocumentRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl DocumentRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<document_entity::Model> for Document {
    fn from(model: document_entity::Model) -> Self {
        Self {
            id: model.id,
            crawl_job_id: model.crawl_job_id,
            domain: model.domain,
            url: model.url,
            content_type: model.content_type,
            last_modified: model.last_modified.map(|t| t.with_timezone(&Utc)),
            file_path: model.file_path,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<Document> for document_entity::ActiveModel {
    fn from(document: Document) -> Self {
        Self {
            id: Set(document.id),
            crawl_job_id: Set(document.crawl_job_id),
            domain: Set(document.domain),
            url: Set(document.url),
            content_type: Set(document.content_type),
            last_modified: Set(document.last_modified.map(Into::into)),
            file_path: Set(document.file_path),
            test_result: Set(None),
            validated_at: Set(None),
            created_at: Set(document.created_at.into()),
        }
    }
}

impl From<error_entity::Model> for ValidationError {
    fn from(model: error_entity::Model) -> Self {
        match (model.specification, model.clause, model.test_number) {
            (Some(specification), Some(clause), Some(test_number)) => {
                ValidationError::RuleViolation {
                    description: model.description,
                    specification,
                    clause,
                    test_number,
                }
            }
            _ => ValidationError::Generic {
                description: model.description,
            },
        }
    }
}

#[async_trait]
impl DocumentRepository for DocumentRepositoryImpl {
    async fn insert_if_absent(&self, document: &Document) -> Result<bool, RepositoryError> {
        let model: document_entity::ActiveModel = document.clone().into();

        let inserted = document_entity::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    document_entity::Column::Domain,
                    document_entity::Column::Url,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        Ok(inserted > 0)
    }

    async fn find_by_url(
        &self,
        domain: &str,
        url: &str,
    ) -> Result<Option<Document>, RepositoryError> {
        let model = document_entity::Entity::find()
            .filter(document_entity::Column::Domain.eq(domain))
            .filter(document_entity::Column::Url.eq(url))
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn find_result(
        &self,
        document_id: Uuid,
    ) -> Result<Option<ValidationResult>, RepositoryError> {
        let Some(document) = document_entity::Entity::find_by_id(document_id)
            .one(self.db.as_ref())
            .await?
        else {
            return Ok(None);
        };
        let Some(test_result) = document.test_result else {
            return Ok(None);
        };

        let mut result = ValidationResult::new(test_result.parse().unwrap_or_default());

        let errors = error_entity::Entity::find()
            .filter(error_entity::Column::DocumentId.eq(document_id))
            .order_by_asc(error_entity::Column::Position)
            .all(self.db.as_ref())
            .await?;
        for error in errors {
            result.add_error(error.into());
        }

        let properties = property_entity::Entity::find()
            .filter(property_entity::Column::DocumentId.eq(document_id))
            .all(self.db.as_ref())
            .await?;
        for property in properties {
            result.add_property(property.name, property.value);
        }

        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::document::DiscoveredDocument;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ConnectOptions, Database};

    async fn setup_db() -> Arc<DatabaseConnection> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1);
        let db = Database::connect(opt).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        Arc::new(db)
    }

    fn discovered(url: &str) -> DiscoveredDocument {
        DiscoveredDocument {
            url: url.to_string(),
            content_type: Some("application/pdf".to_string()),
            last_modified: None,
            file_path: Some("/tmp/report.pdf".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_if_absent_deduplicates_by_domain_and_url() {
        let repo = DocumentRepositoryImpl::new(setup_db().await);
        let crawl_job_id = Uuid::new_v4();
        let first = Document::from_discovered(
            crawl_job_id,
            "example.com",
            discovered("https://example.com/report.pdf"),
        );
        let again = Document::from_discovered(
            crawl_job_id,
            "example.com",
            discovered("https://example.com/report.pdf"),
        );

        assert!(repo.insert_if_absent(&first).await.unwrap());
        assert!(!repo.insert_if_absent(&again).await.unwrap());

        let found = repo
            .find_by_url("example.com", "https://example.com/report.pdf")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn test_find_result_is_none_before_validation() {
        let repo = DocumentRepositoryImpl::new(setup_db().await);
        let document = Document::from_discovered(
            Uuid::new_v4(),
            "example.com",
            discovered("https://example.com/a.pdf"),
        );
        repo.insert_if_absent(&document).await.unwrap();

        assert!(repo.find_result(document.id).await.unwrap().is_none());
        assert!(repo.find_result(Uuid::new_v4()).await.unwrap().is_none());
    }
}
