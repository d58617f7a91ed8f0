// SPDX-License-Identifier: MIT

//! Web search via the DuckDuckGo lite endpoint
//!
//! Keyless search used by the agent to ground its research-context section.
//! Results come back as parsed organic hits; the model decides the queries.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::SearchConfig;
use crate::{MedscanError, Result};

const DUCKDUCKGO_LITE_URL: &str = "https://lite.duckduckgo.com/lite/";

/// One organic search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// DuckDuckGo lite search client
pub struct WebSearch {
    client: reqwest::Client,
    base_url: String,
    max_results: usize,
}

impl WebSearch {
    pub fn new(config: &SearchConfig) -> Self {
        Self::with_base_url(config, DUCKDUCKGO_LITE_URL)
    }

    /// Point the client at a different endpoint (tests use a local mock)
    pub fn with_base_url(config: &SearchConfig, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.to_string(),
            max_results: config.max_results,
        }
    }

    /// Run a query and return up to `max_results` organic hits
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(MedscanError::InvalidArgument(
                "search query cannot be empty".to_string(),
            ));
        }

        let url = format!("{}?q={}", self.base_url, urlencoding::encode(query));
        debug!("Searching: {}", query);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(MedscanError::Search(format!(
                "search endpoint returned status {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        self.parse_results(&html)
    }

    /// Extract results from the lite endpoint's HTML table layout
    fn parse_results(&self, html: &str) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(html);

        let link_selector = Selector::parse("a.result-link")
            .map_err(|e| MedscanError::Search(format!("invalid selector: {:?}", e)))?;
        let snippet_selector = Selector::parse("td.result-snippet")
            .map_err(|e| MedscanError::Search(format!("invalid selector: {:?}", e)))?;

        let snippets: Vec<String> = document
            .select(&snippet_selector)
            .map(|s| tidy(&s.text().collect::<Vec<_>>().join(" ")))
            .collect();

        let mut results = Vec::new();
        for (i, link) in document.select(&link_selector).take(self.max_results).enumerate() {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            results.push(SearchResult {
                title: tidy(&link.text().collect::<Vec<_>>().join(" ")),
                url: resolve_redirect(href),
                snippet: snippets.get(i).cloned().unwrap_or_default(),
            });
        }

        Ok(results)
    }
}

/// Unwrap DuckDuckGo redirect URLs of the form `.../l/?uddg=<encoded>`
fn resolve_redirect(href: &str) -> String {
    let Some(encoded) = href.split("uddg=").nth(1) else {
        return href.to_string();
    };
    let encoded = encoded.split('&').next().unwrap_or(encoded);
    urlencoding::decode(encoded)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| href.to_string())
}

/// Collapse whitespace and decode the entities the lite endpoint emits
fn tidy(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn sample_html() -> String {
        r#"
        <html><body><table>
            <tr><td>
                <a class="result-link" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fpubmed.ncbi.nlm.nih.gov%2F123%2F">Community-acquired pneumonia: diagnosis</a>
            </td></tr>
            <tr><td class="result-snippet">Review of radiographic findings &amp; treatment options.</td></tr>
            <tr><td>
                <a class="result-link" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.who.int%2Fguidelines">WHO imaging guidelines</a>
            </td></tr>
            <tr><td class="result-snippet">Standard protocols for chest imaging.</td></tr>
        </table></body></html>
        "#
        .to_string()
    }

    fn test_search(base_url: &str) -> WebSearch {
        WebSearch::with_base_url(&SearchConfig::default(), base_url)
    }

    #[test]
    fn test_parse_results() {
        let search = test_search("http://unused");
        let results = search.parse_results(&sample_html()).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Community-acquired pneumonia: diagnosis");
        assert_eq!(results[0].url, "https://pubmed.ncbi.nlm.nih.gov/123/");
        assert_eq!(
            results[0].snippet,
            "Review of radiographic findings & treatment options."
        );
        assert_eq!(results[1].url, "https://www.who.int/guidelines");
    }

    #[test]
    fn test_parse_empty_document() {
        let search = test_search("http://unused");
        let results = search.parse_results("<html><body></body></html>").unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_link_without_href_skipped() {
        let search = test_search("http://unused");
        let html = r#"<html><body><a class="result-link">no href</a></body></html>"#;
        assert!(search.parse_results(html).unwrap().is_empty());
    }

    #[test]
    fn test_result_cap() {
        let mut html = String::from("<html><body><table>");
        for i in 0..15 {
            html.push_str(&format!(
                r#"<tr><td><a class="result-link" href="https://example.com/{i}">Result {i}</a></td></tr>
                   <tr><td class="result-snippet">Snippet {i}</td></tr>"#
            ));
        }
        html.push_str("</table></body></html>");

        let search = test_search("http://unused");
        let results = search.parse_results(&html).unwrap();
        assert_eq!(results.len(), SearchConfig::default().max_results);
    }

    #[test]
    fn test_resolve_redirect() {
        assert_eq!(
            resolve_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpath"),
            "https://example.com/path"
        );
        assert_eq!(
            resolve_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&rut=abc"),
            "https://example.com"
        );
        assert_eq!(resolve_redirect("https://example.com/direct"), "https://example.com/direct");
    }

    #[test]
    fn test_tidy() {
        assert_eq!(tidy("  too   many\n spaces "), "too many spaces");
        assert_eq!(tidy("a &amp; b"), "a & b");
        assert_eq!(tidy("&lt;b&gt;&quot;x&quot;&#39;"), "<b>\"x\"'");
    }

    #[tokio::test]
    async fn test_search_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(mockito::Matcher::UrlEncoded(
                "q".into(),
                "pneumonia treatment".into(),
            ))
            .with_status(200)
            .with_body(sample_html())
            .create_async()
            .await;

        let search = test_search(&server.url());
        let results = search.search("pneumonia treatment").await.unwrap();

        assert_eq!(results.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_http_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let search = test_search(&server.url());
        let err = search.search("anything").await.unwrap_err();
        match err {
            MedscanError::Search(msg) => assert!(msg.contains("503")),
            other => panic!("Expected Search error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_rejects_empty_query() {
        let search = test_search("http://unused");
        let err = search.search("   ").await.unwrap_err();
        match err {
            MedscanError::InvalidArgument(_) => {}
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
    }
}
