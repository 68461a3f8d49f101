// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 发现后端上报的候选文档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDocument {
    pub url: String,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    /// 下载到本地后的路径，没有本地文件的文档不会进入校验队列
    pub file_path: Option<String>,
}

/// 已登记的文档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub crawl_job_id: Uuid,
    pub domain: String,
    pub url: String,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn from_discovered(
        crawl_job_id: Uuid,
        domain: impl Into<String>,
        discovered: DiscoveredDocument,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            crawl_job_id,
            domain: domain.into(),
            url: discovered.url,
            content_type: discovered.content_type,
            last_modified: discovered.last_modified,
            file_path: discovered.file_path,
            created_at: Utc::now(),
        }
    }
}
