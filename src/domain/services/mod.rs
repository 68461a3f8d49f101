// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 爬取任务服务（crawl_job_service）：爬取任务的状态机以及暂停、恢复、重启的传播
/// - 文档服务（document_service）：登记发现的文档并入队校验
/// - 通知服务（notification_service）：任务完成通知接口
/// - 校验调度（validation_scheduler）：校验队列对领域层暴露的控制接口
pub mod crawl_job_service;
pub mod document_service;
pub mod notification_service;
pub mod validation_scheduler;
