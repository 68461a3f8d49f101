// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：爬取任务、校验任务、文档和校验结果
/// - 仓库接口（repositories）：数据持久化抽象接口
/// - 服务（services）：爬取任务状态机和文档登记
///
/// 领域层不依赖于任何外部实现。
pub mod models;
pub mod repositories;
pub mod services;
