// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

/// 爬取任务与请求的多对多关联
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "crawl_job_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub crawl_job_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub crawl_request_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
