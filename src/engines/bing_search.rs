// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SearchSettings;
use crate::engines::traits::{DiscoveryError, SearchEngine};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Bing Web Search 查询客户端
///
/// 使用 `site:` 和 `filetype:` 运算符分页查询，直到达到估计的结果总数。
pub struct BingSearchEngine {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    page_size: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(rename = "webPages")]
    web_pages: Option<WebPages>,
}

#[derive(Deserialize)]
struct WebPages {
    #[serde(rename = "totalEstimatedMatches", default)]
    total_estimated_matches: u64,
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Deserialize)]
struct WebPage {
    url: String,
}

impl BingSearchEngine {
    pub fn new(settings: &SearchSettings) -> Result<Self, DiscoveryError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            page_size: settings.page_size.max(1),
        })
    }

    async fn fetch_page(
        &self,
        domain: &str,
        file_type: &str,
        offset: u64,
    ) -> Result<Option<WebPages>, DiscoveryError> {
        let mut request = self.client.get(&self.endpoint).query(&[
            ("q", format!("site:{} filetype:{}", domain, file_type)),
            ("count", self.page_size.to_string()),
            ("offset", offset.to_string()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header(SUBSCRIPTION_KEY_HEADER, key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(DiscoveryError::UnexpectedStatus {
                status: response.status().as_u16(),
                url: self.endpoint.clone(),
            });
        }
        let body: SearchResponse = response.json().await?;
        Ok(body.web_pages)
    }
}

#[async_trait]
impl SearchEngine for BingSearchEngine {
    async fn obtain_candidate_urls(
        &self,
        domain: &str,
        file_type: &str,
    ) -> Result<Vec<String>, DiscoveryError> {
        let mut urls: Vec<String> = Vec::new();
        let mut offset = 0u64;

        loop {
            let page = match self.fetch_page(domain, file_type, offset).await {
                Ok(page) => page,
                Err(e) if urls.is_empty() => return Err(e),
                Err(e) => {
                    warn!(
                        "Search for {} files on {} stopped at offset {}: {}",
                        file_type, domain, offset, e
                    );
                    break;
                }
            };

            let Some(page) = page else { break };
            if page.value.is_empty() {
                break;
            }
            for item in page.value {
                if !urls.contains(&item.url) {
                    urls.push(item.url);
                }
            }

            offset += u64::from(self.page_size);
            if offset >= page.total_estimated_matches {
                break;
            }
        }

        debug!("Found {} {} candidates on {}", urls.len(), file_type, domain);
        Ok(urls)
    }
}
