// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_job::CrawlJob;

/// 爬取任务完成通知
///
/// 实现必须立即返回，投递在后台完成。
pub trait NotificationService: Send + Sync {
    /// 通知任务已完成
    fn notify_finished(&self, job: &CrawlJob);
}
