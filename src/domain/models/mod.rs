// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// - 爬取任务（crawl_job）：域名级别的发现任务及其请求
/// - 校验任务（validation_job）：针对单个文档的排队校验
/// - 校验结果（validation_result）：结论、错误与文档属性
/// - 文档（document）：发现后端上报的文档
/// - 状态（status）：提供给 API 层的只读快照
pub mod crawl_job;
pub mod document;
pub mod status;
pub mod validation_job;
pub mod validation_result;
