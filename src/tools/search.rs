//! web_search 工具：搜索并摘要前几条结果
//!
//! 抓取 DuckDuckGo 的 HTML 结果页，取前 N 条结果链接，逐条抓取标题与首段；
//! 单条失败降级为 {url, error} 条目，整批永不中断。

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use crate::tools::scrape::{strip_html_tags, USER_AGENT};
use crate::tools::Tool;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
/// 摘要最大字符数
const SUMMARY_CHARS: usize = 300;

/// 百分号解码（结果页的跳转链接里嵌着编码后的目标 URL）
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}

/// 还原结果链接：跳转链接取 uddg 参数并解码，其余原样返回
fn resolve_result_url(href: &str) -> String {
    let href = href.replace("&amp;", "&");
    if let Some(idx) = href.find("uddg=") {
        let rest = &href[idx + 5..];
        let encoded = rest.split('&').next().unwrap_or(rest);
        return percent_decode(encoded);
    }
    href
}

/// 搜索工具：query → 前 N 条结果的 {title, url, summary}
pub struct WebSearchTool {
    client: Client,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(timeout_secs: u64, max_results: usize) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            max_results,
        }
    }

    /// 从结果页 HTML 提取结果链接（已还原跳转）
    fn extract_result_urls(&self, html: &str) -> Vec<String> {
        let re = Regex::new(r#"result__a[^>]*?href="([^"]+)""#).expect("valid regex");
        re.captures_iter(html)
            .map(|c| resolve_result_url(&c[1]))
            .filter(|u| u.starts_with("http"))
            .take(self.max_results)
            .collect()
    }

    /// 抓取单条结果页，提取标题与首段
    async fn summarize(&self, url: &str) -> Result<Value, String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        resp.error_for_status_ref().map_err(|e| e.to_string())?;
        let body = resp.text().await.map_err(|e| e.to_string())?;

        let title_re = Regex::new(r"(?s)<title[^>]*>(.*?)</title>").expect("valid regex");
        let title = title_re
            .captures(&body)
            .map(|c| strip_html_tags(&c[1]))
            .unwrap_or_else(|| "No title found".to_string());

        let p_re = Regex::new(r"(?s)<p[^>]*>(.*?)</p>").expect("valid regex");
        let summary = p_re
            .captures(&body)
            .map(|c| strip_html_tags(&c[1]))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "No summary found".to_string());
        let summary: String = summary.chars().take(SUMMARY_CHARS).collect();

        Ok(serde_json::json!({
            "title": title,
            "url": url,
            "summary": summary,
        }))
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Perform a web search and return title, url and a short summary for the top results."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        if query.is_empty() {
            return Err("Missing query".to_string());
        }
        tracing::info!(query = %query, "web_search");

        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| format!("Search request failed: {}", e))?;
        let body = resp
            .text()
            .await
            .map_err(|e| format!("Search response: {}", e))?;

        let mut results = Vec::new();
        for url in self.extract_result_urls(&body) {
            match self.summarize(&url).await {
                Ok(entry) => results.push(entry),
                // 单条失败只记录错误条目，继续下一条
                Err(e) => results.push(serde_json::json!({"url": url, "error": e})),
            }
        }

        serde_json::to_string_pretty(&results).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_decode() {
        assert_eq!(
            percent_decode("https%3A%2F%2Fexample.com%2Fa%20b"),
            "https://example.com/a b"
        );
    }

    #[test]
    fn test_resolve_redirect_url() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc";
        assert_eq!(resolve_result_url(href), "https://www.rust-lang.org/");
    }

    #[test]
    fn test_extract_result_urls() {
        let tool = WebSearchTool::new(5, 3);
        let html = r#"
            <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fone.example%2F&amp;rut=x">One</a>
            <a rel="nofollow" class="result__a" href="https://two.example/">Two</a>
            <a class="other" href="https://ignored.example/">Ignored</a>
        "#;
        let urls = tool.extract_result_urls(html);
        assert_eq!(urls, vec!["https://one.example/", "https://two.example/"]);
    }
}
