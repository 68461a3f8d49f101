// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 提供领域仓库接口的SeaORM实现
pub mod crawl_job_repo_impl;
pub mod document_repo_impl;
pub mod validation_job_repo_impl;
