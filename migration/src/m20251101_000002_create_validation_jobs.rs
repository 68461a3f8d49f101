// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 文档与校验任务相关表迁移
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Documents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Documents::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Documents::CrawlJobId).uuid().not_null())
                    .col(ColumnDef::new(Documents::Domain).string().not_null())
                    .col(ColumnDef::new(Documents::Url).text().not_null())
                    .col(ColumnDef::new(Documents::ContentType).string())
                    .col(ColumnDef::new(Documents::LastModified).timestamp_with_time_zone())
                    .col(ColumnDef::new(Documents::FilePath).text())
                    .col(ColumnDef::new(Documents::TestResult).string())
                    .col(ColumnDef::new(Documents::ValidatedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Documents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_documents_domain_url")
                    .table(Documents::Table)
                    .col(Documents::Domain)
                    .col(Documents::Url)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ValidationJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ValidationJobs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ValidationJobs::CrawlJobId).uuid().not_null())
                    .col(ColumnDef::new(ValidationJobs::Domain).string().not_null())
                    .col(ColumnDef::new(ValidationJobs::DocumentUrl).text().not_null())
                    .col(ColumnDef::new(ValidationJobs::FilePath).text())
                    .col(ColumnDef::new(ValidationJobs::Status).string().not_null())
                    .col(
                        ColumnDef::new(ValidationJobs::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ValidationJobs::CrawlStartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ValidationJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ValidationJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_validation_jobs_dispatch")
                    .table(ValidationJobs::Table)
                    .col(ValidationJobs::Status)
                    .col(ValidationJobs::Priority)
                    .col(ValidationJobs::CrawlStartedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_validation_jobs_crawl_job")
                    .table(ValidationJobs::Table)
                    .col(ValidationJobs::CrawlJobId)
                    .col(ValidationJobs::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ValidationErrors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ValidationErrors::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ValidationErrors::DocumentId).uuid().not_null())
                    .col(ColumnDef::new(ValidationErrors::Position).integer().not_null())
                    .col(ColumnDef::new(ValidationErrors::Kind).string().not_null())
                    .col(ColumnDef::new(ValidationErrors::Description).string().not_null())
                    .col(ColumnDef::new(ValidationErrors::Specification).string())
                    .col(ColumnDef::new(ValidationErrors::Clause).string())
                    .col(ColumnDef::new(ValidationErrors::TestNumber).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DocumentProperties::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DocumentProperties::DocumentId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DocumentProperties::Name).string().not_null())
                    .col(ColumnDef::new(DocumentProperties::Value).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(DocumentProperties::DocumentId)
                            .col(DocumentProperties::Name),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DocumentProperties::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ValidationErrors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ValidationJobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Documents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Documents {
    Table,
    Id,
    CrawlJobId,
    Domain,
    Url,
    ContentType,
    LastModified,
    FilePath,
    TestResult,
    ValidatedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ValidationJobs {
    Table,
    Id,
    CrawlJobId,
    Domain,
    DocumentUrl,
    FilePath,
    Status,
    Priority,
    CrawlStartedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ValidationErrors {
    Table,
    Id,
    DocumentId,
    Position,
    Kind,
    Description,
    Specification,
    Clause,
    TestNumber,
}

#[derive(DeriveIden)]
enum DocumentProperties {
    Table,
    DocumentId,
    Name,
    Value,
}
