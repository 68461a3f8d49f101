// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::crawl_job::CrawlJob;
use crate::domain::models::status::BackendStatus;
use async_trait::async_trait;
use thiserror::Error;

/// 发现后端错误类型
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 后端返回了非成功状态码
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

/// 主爬虫控制接口
///
/// 所有操作都以后端任务句柄（`CrawlJob::backend_job_id`）为参数。
#[async_trait]
pub trait CrawlerEngine: Send + Sync {
    /// 创建爬虫任务
    async fn create_job(&self, job_id: &str, domain: &str) -> Result<(), DiscoveryError>;
    /// 构建任务配置
    async fn build_job(&self, job_id: &str) -> Result<(), DiscoveryError>;
    /// 启动任务
    async fn launch_job(&self, job_id: &str) -> Result<(), DiscoveryError>;
    /// 暂停任务
    async fn pause_job(&self, job_id: &str) -> Result<(), DiscoveryError>;
    /// 恢复任务
    async fn unpause_job(&self, job_id: &str) -> Result<(), DiscoveryError>;
    /// 任务是否已完成发现
    async fn is_finished(&self, job_id: &str) -> Result<bool, DiscoveryError>;
    /// 查询任务状态
    async fn status(&self, job_id: &str) -> Result<BackendStatus, DiscoveryError>;
    /// 终止并清理任务
    async fn teardown(&self, job_id: &str) -> Result<(), DiscoveryError>;
}

/// 搜索引擎查询接口
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// 查询域名下指定类型文件的候选 URL
    async fn obtain_candidate_urls(
        &self,
        domain: &str,
        file_type: &str,
    ) -> Result<Vec<String>, DiscoveryError>;
}

/// 搜索后端的任务释放接口
#[async_trait]
pub trait JobDiscarder: Send + Sync {
    /// 放弃任务并释放其临时资源
    async fn discard_job(&self, job: &CrawlJob);
}
