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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// 应用程序配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 校验队列配置
    pub validation_queue: ValidationQueueSettings,
    /// 外部校验器配置
    pub validator: ValidatorSettings,
    /// 主爬虫配置
    pub crawler: CrawlerSettings,
    /// 搜索后端配置
    pub search: SearchSettings,
    /// 出站请求重试配置
    pub transport: TransportSettings,
    /// 完成通知配置
    pub notification: NotificationSettings,
    /// 爬取任务监控配置
    pub monitor: MonitorSettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 校验队列配置
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationQueueSettings {
    /// 同时运行的校验任务上限
    pub thread_count: usize,
    /// 定时补位间隔（秒）
    pub tick_interval_secs: u64,
}

impl ValidationQueueSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

/// 外部校验器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorSettings {
    /// 校验工具可执行文件路径
    pub tool_path: PathBuf,
    /// 临时报告文件目录
    pub report_dir: PathBuf,
    /// 校验工具诊断输出文件
    pub error_log: PathBuf,
    /// 单次校验超时（秒）
    pub timeout_secs: u64,
    /// 校验工具要求的文件扩展名
    pub required_extension: String,
    /// 报告查询使用的命名空间（前缀 → URI）
    #[serde(default)]
    pub namespaces: BTreeMap<String, String>,
    /// 属性名 → 按顺序尝试的路径查询列表
    #[serde(default)]
    pub properties: BTreeMap<String, Vec<String>>,
}

impl ValidatorSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 主爬虫配置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// 爬虫控制接口地址
    pub base_url: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
}

/// 搜索后端配置
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    /// 是否启用搜索后端
    pub enabled: bool,
    /// 搜索接口地址
    pub endpoint: String,
    /// 订阅密钥
    pub api_key: Option<String>,
    /// 下载文件的临时目录
    pub temp_folder: PathBuf,
    /// 轮询新任务的间隔（秒）
    pub poll_interval_secs: u64,
    /// 每页结果数
    pub page_size: u32,
    /// 需要查询的文件类型
    pub file_types: Vec<String>,
    /// 需要下载到本地并校验的文件类型
    pub download_types: Vec<String>,
}

/// 出站请求重试配置
#[derive(Debug, Clone, Deserialize)]
pub struct TransportSettings {
    /// 最大尝试次数
    pub max_retries: u32,
    /// 重试间隔（秒）
    pub retry_interval_secs: u64,
}

impl TransportSettings {
    /// 重试间隔
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

/// 完成通知配置
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    /// 接收完成通知的 Webhook 地址
    #[serde(default)]
    pub webhook_urls: Vec<String>,
}

/// 爬取任务监控配置
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSettings {
    /// 检查间隔（秒）
    pub interval_secs: u64,
}

/// 指标导出配置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    /// Prometheus 监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载默认值、`config/default`、`config/{APP_ENVIRONMENT}` 和
    /// `CRAWLCHECK__` 前缀的环境变量。
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Self::defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("CRAWLCHECK")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("notification.webhook_urls")
                    .with_list_parse_key("search.file_types")
                    .with_list_parse_key("search.download_types")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    fn defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            // Default DB pool settings
            .set_default("database.url", "sqlite://crawlcheck.db?mode=rwc")?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Validation queue
            .set_default("validation_queue.thread_count", 4)?
            .set_default("validation_queue.tick_interval_secs", 5)?
            // Validator
            .set_default("validator.tool_path", "verapdf")?
            .set_default("validator.report_dir", "./work/reports")?
            .set_default("validator.error_log", "./work/logs/validator-errors.log")?
            .set_default("validator.timeout_secs", 1800)?
            .set_default("validator.required_extension", "pdf")?
            // Primary crawler
            .set_default("crawler.base_url", "http://localhost:8443/engine")?
            .set_default("crawler.request_timeout_secs", 30)?
            // Search backend
            .set_default("search.enabled", false)?
            .set_default("search.endpoint", "https://api.bing.microsoft.com/v7.0/search")?
            .set_default("search.temp_folder", "./work/search")?
            .set_default("search.poll_interval_secs", 60)?
            .set_default("search.page_size", 50)?
            .set_default(
                "search.file_types",
                vec!["pdf", "odt", "ods", "odp", "doc", "xls", "ppt"],
            )?
            .set_default("search.download_types", vec!["pdf"])?
            // Transport
            .set_default("transport.max_retries", 120)?
            .set_default("transport.retry_interval_secs", 30)?
            // Notification and monitoring
            .set_default("notification.webhook_urls", Vec::<String>::new())?
            .set_default("monitor.interval_secs", 30)?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
