// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "validation_jobs")]
pub struct Model {
    /// 与文档 ID 相同
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub crawl_job_id: Uuid,
    pub domain: String,
    #[sea_orm(column_type = "Text")]
    pub document_url: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub file_path: Option<String>,
    pub status: String,
    pub priority: i32,
    pub crawl_started_at: ChronoDateTimeWithTimeZone,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
