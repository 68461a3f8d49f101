// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 领域层只依赖这些抽象接口，具体实现位于基础设施层。
/// - 爬取任务仓库（crawl_job_repository）
/// - 校验任务仓库（validation_job_repository）
/// - 文档仓库（document_repository）
pub mod crawl_job_repository;
pub mod document_repository;
pub mod validation_job_repository;
