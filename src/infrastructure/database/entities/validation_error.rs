// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "validation_errors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub document_id: Uuid,
    /// 错误在结果中的顺序
    pub position: i32,
    pub kind: String,
    pub description: String,
    pub specification: Option<String>,
    pub clause: Option<String>,
    pub test_number: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
