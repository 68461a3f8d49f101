// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::Url;

/// 将用户输入规范化为域名
///
/// 去除协议、用户信息、端口、路径、查询和片段，转为小写并去掉末尾的点。
///
/// # 返回值
///
/// * `Some(String)` - 规范化后的域名
/// * `None` - 输入中无法解析出主机名
pub fn normalize_domain(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let url = Url::parse(&candidate).ok()?;
    let host = url.host_str()?.trim_end_matches('.').to_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scheme_and_path() {
        assert_eq!(
            normalize_domain("https://Example.COM/some/path?q=1#top"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_bare_domain_with_port_and_trailing_dot() {
        assert_eq!(
            normalize_domain(" www.example.org.:8080 "),
            Some("www.example.org".to_string())
        );
        assert_eq!(
            normalize_domain("user:pw@example.net/docs"),
            Some("example.net".to_string())
        );
    }

    #[test]
    fn test_rejects_empty_input() {
        assert_eq!(normalize_domain("   "), None);
        assert_eq!(normalize_domain("http://"), None);
    }
}
