use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::services::ai::quota::QuotaTracker;
use crate::services::ai::{self, LlmProvider};

const SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const PAGE_TEXT_LIMIT: usize = 15_000;
const SUMMARY_CONTEXT_LIMIT: usize = 30_000;

static NOISE_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["script", "style", "noscript", "svg", "header", "footer", "nav", "aside"]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b.*?</{tag}\s*>")).unwrap())
        .collect()
});

static CONTENT_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["article", "main", "body"]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>(.*?)</{tag}\s*>")).unwrap())
        .collect()
});

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static ODD_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[^\w\s.,;:!?\-()\[\]{}"'/]"#).unwrap());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Google Custom Search plus page scraping, summarized by the model.
pub struct WebSearcher {
    api_key: String,
    cse_id: String,
    search_url: String,
    client: reqwest::Client,
    llm: Arc<dyn LlmProvider>,
    quota: Arc<QuotaTracker>,
    fetch_delay: Duration,
}

impl WebSearcher {
    pub fn new(
        api_key: String,
        cse_id: String,
        llm: Arc<dyn LlmProvider>,
        quota: Arc<QuotaTracker>,
    ) -> Self {
        Self {
            api_key,
            cse_id,
            search_url: SEARCH_URL.to_string(),
            client: reqwest::Client::new(),
            llm,
            quota,
            fetch_delay: Duration::from_secs(1),
        }
    }

    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    /// Pause between page fetches.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Search hits for a query. Failures are logged and yield no hits.
    pub async fn search(&self, query: &str, num_results: u32) -> Vec<SearchHit> {
        match self.try_search(query, num_results).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::error!(error = %e, query, "web search failed");
                Vec::new()
            }
        }
    }

    async fn try_search(&self, query: &str, num_results: u32) -> anyhow::Result<Vec<SearchHit>> {
        let num = num_results.to_string();
        let resp: SearchResponse = self
            .client
            .get(&self.search_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("failed to call search API")?
            .error_for_status()
            .map_err(|e| AppError::Search(e.to_string()))?
            .json()
            .await
            .context("failed to parse search response")?;

        Ok(resp
            .items
            .into_iter()
            .map(|item| SearchHit {
                title: item.title,
                url: item.link,
                snippet: item.snippet,
            })
            .collect())
    }

    /// Main text of a web page, or `None` when it cannot be fetched.
    pub async fn scrape(&self, url: &str) -> Option<String> {
        let result = async {
            self.client
                .get(url)
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .header(
                    reqwest::header::ACCEPT,
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
                .timeout(Duration::from_secs(15))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        }
        .await;

        match result {
            Ok(html) => {
                let text = html_to_text(&html);
                (!text.is_empty()).then_some(text)
            }
            Err(e) => {
                tracing::warn!(error = %e, url, "failed to scrape page");
                None
            }
        }
    }

    /// Search, scrape each hit and ask the model for a cited digest.
    ///
    /// One unit of the web quota is spent only when the search found hits.
    pub async fn search_and_summarize(
        &self,
        query: &str,
        num_results: u32,
    ) -> anyhow::Result<String> {
        self.quota.ensure_available()?;

        tracing::info!(query, "searching the web");
        let hits = self.search(query, num_results).await;
        if hits.is_empty() {
            return Ok("No search results found. Try a different query.".to_string());
        }
        self.quota.try_acquire()?;

        let mut sources = Vec::with_capacity(hits.len());
        for (i, hit) in hits.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.fetch_delay).await;
            }
            tracing::debug!(url = %hit.url, "scraping search hit");

            let content = match self.scrape(&hit.url).await {
                Some(text) => text,
                None => format!("{} [Source: {}]", hit.snippet, hit.url),
            };
            sources.push(format!("# Source: {} ({})\n{}\n", hit.title, hit.url, content));
        }

        let context = truncate_chars(&sources.join("\n\n"), SUMMARY_CONTEXT_LIMIT);
        tracing::debug!(chars = context.len(), "summarizing web context");

        let prompt = format!(
            "You are a research assistant. Summarize the key information from these sources \
             about '{query}'. Provide a comprehensive digest with key points, important dates, \
             and notable opinions. Cite your sources using the provided URLs.\n\n{context}"
        );
        ai::ask(self.llm.as_ref(), &prompt).await
    }
}

/// Readable text from an HTML page: boilerplate blocks removed, the most
/// specific content container kept, tags stripped.
pub fn html_to_text(html: &str) -> String {
    let mut page = COMMENT.replace_all(html, " ").into_owned();
    for block in NOISE_BLOCKS.iter() {
        page = block.replace_all(&page, " ").into_owned();
    }

    let content = CONTENT_BLOCKS
        .iter()
        .find_map(|block| block.captures(&page).map(|c| c[1].to_string()))
        .unwrap_or(page);

    let text = TAG.replace_all(&content, " ");
    let text = decode_entities(&text);
    let text = ODD_CHARS.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, " ");
    truncate_chars(text.trim(), PAGE_TEXT_LIMIT)
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_prefers_article() {
        let html = r#"
            <html><head><style>body { color: red; }</style></head>
            <body>
              <nav>Home | About</nav>
              <article><h1>Title</h1><p>The real &amp; useful content.</p></article>
              <footer>Copyright</footer>
            </body></html>"#;
        assert_eq!(html_to_text(html), "Title The real useful content.");
    }

    #[test]
    fn test_html_falls_back_to_body() {
        let html = "<html><body><script>var x = 1;</script><p>Hello   world</p></body></html>";
        assert_eq!(html_to_text(html), "Hello world");
    }

    #[test]
    fn test_html_without_body() {
        assert_eq!(html_to_text("<p>bare <b>fragment</b></p>"), "bare fragment");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
