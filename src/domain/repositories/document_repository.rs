// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::crawl_job_repository::RepositoryError;
use crate::domain::models::document::Document;
use crate::domain::models::validation_result::ValidationResult;
use async_trait::async_trait;

/// 文档仓库特质
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// 登记文档，同一域名下相同 URL 的文档已存在时返回 `Ok(false)`
    async fn insert_if_absent(&self, document: &Document) -> Result<bool, RepositoryError>;

    /// 根据域名和 URL 查找文档
    async fn find_by_url(
        &self,
        domain: &str,
        url: &str,
    ) -> Result<Option<Document>, RepositoryError>;

    /// 读取已保存的校验结果
    async fn find_result(
        &self,
        document_id: uuid::Uuid,
    ) -> Result<Option<ValidationResult>, RepositoryError>;
}
