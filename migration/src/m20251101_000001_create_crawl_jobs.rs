// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 爬取任务相关表迁移
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrawlJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CrawlJobs::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(CrawlJobs::Domain)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(CrawlJobs::CrawlService).string().not_null())
                    .col(ColumnDef::new(CrawlJobs::BackendJobId).string().not_null())
                    .col(ColumnDef::new(CrawlJobs::Status).string().not_null())
                    .col(
                        ColumnDef::new(CrawlJobs::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CrawlJobs::FinishTime).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(CrawlJobs::DiscoveryFinished)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_crawl_jobs_status")
                    .table(CrawlJobs::Table)
                    .col(CrawlJobs::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CrawlRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CrawlRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CrawlRequests::EmailAddress).string())
                    .col(
                        ColumnDef::new(CrawlRequests::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CrawlRequests::CrawlSince).date())
                    .col(
                        ColumnDef::new(CrawlRequests::Finished)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CrawlRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Link rows are removed explicitly by the repository before a job is deleted.
        manager
            .create_table(
                Table::create()
                    .table(CrawlJobRequests::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CrawlJobRequests::CrawlJobId).uuid().not_null())
                    .col(
                        ColumnDef::new(CrawlJobRequests::CrawlRequestId)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(CrawlJobRequests::CrawlJobId)
                            .col(CrawlJobRequests::CrawlRequestId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crawl_job_requests_job")
                            .from(CrawlJobRequests::Table, CrawlJobRequests::CrawlJobId)
                            .to(CrawlJobs::Table, CrawlJobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_crawl_job_requests_request")
                            .from(CrawlJobRequests::Table, CrawlJobRequests::CrawlRequestId)
                            .to(CrawlRequests::Table, CrawlRequests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrawlJobRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CrawlRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CrawlJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CrawlJobs {
    Table,
    Id,
    Domain,
    CrawlService,
    BackendJobId,
    Status,
    StartTime,
    FinishTime,
    DiscoveryFinished,
}

#[derive(DeriveIden)]
enum CrawlRequests {
    Table,
    Id,
    EmailAddress,
    Priority,
    CrawlSince,
    Finished,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CrawlJobRequests {
    Table,
    CrawlJobId,
    CrawlRequestId,
}
