// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含爬取任务、文档和校验任务的实体、服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// 主爬虫和搜索引擎两种发现后端的客户端
pub mod engines;

/// 基础设施模块
///
/// 提供数据库、指标导出和出站 HTTP 等外部服务集成
pub mod infrastructure;

/// 队列模块
///
/// 校验任务的调度与并发控制
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 校验器模块
///
/// 外部校验工具的调用与报告解析
pub mod validator;

/// 工作器模块
///
/// 实现后台任务处理和工作器管理
pub mod workers;
