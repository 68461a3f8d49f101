// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Repository error: {0}")]
    RepositoryError(String),

    #[error("Discovery error: {0}")]
    DiscoveryError(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Service error: {0}")]
    ServiceError(String),
}

impl From<crate::domain::repositories::crawl_job_repository::RepositoryError> for WorkerError {
    fn from(err: crate::domain::repositories::crawl_job_repository::RepositoryError) -> Self {
        WorkerError::RepositoryError(err.to_string())
    }
}

impl From<crate::engines::traits::DiscoveryError> for WorkerError {
    fn from(err: crate::engines::traits::DiscoveryError) -> Self {
        WorkerError::DiscoveryError(err.to_string())
    }
}

impl From<crate::domain::services::crawl_job_service::CrawlJobError> for WorkerError {
    fn from(err: crate::domain::services::crawl_job_service::CrawlJobError) -> Self {
        WorkerError::ServiceError(err.to_string())
    }
}
