//! Agriculture news feed (NewsAPI `everything` endpoint).
//!
//! [`NewsFeed`] accumulates pages, keeping only articles with a description
//! and a reachable image, each URL at most once.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use krishimitra_shared::{AppConfig, Result, resolve_api_key};

use crate::http::{self, send_json};

/// Topics the feed searches for.
pub const NEWS_QUERY: &str = r#""plant disease" OR "crop disease" OR "plant health" OR "crop health" OR "agriculture technology" OR "sustainable farming" OR "pesticides" OR "soil health" OR "organic farming""#;

const PAGE_SIZE: u32 = 50;

/// An article that passed filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsArticle {
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub url: String,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<DateTime<Utc>>,
    source: Option<RawSource>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewsClient {
    client: Client,
    base: Url,
    api_key: String,
}

impl NewsClient {
    pub fn new(client: Client, base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client,
            base: http::parse_base(base_url)?,
            api_key: api_key.into(),
        })
    }

    /// Build from config; the API key comes from the env var named in `[api_keys]`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(&config.api_keys.news_api_key_env)?;
        Self::new(http::client_from_config(config)?, &config.services.news_url, api_key)
    }

    #[instrument(skip(self))]
    async fn fetch_page(&self, page: u32) -> Result<Vec<RawArticle>> {
        let mut url = http::endpoint(&self.base, "v2/everything")?;
        url.query_pairs_mut()
            .append_pair("q", NEWS_QUERY)
            .append_pair("language", "en")
            .append_pair("sortBy", "publishedAt")
            .append_pair("pageSize", &PAGE_SIZE.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("apiKey", &self.api_key);

        let response: EverythingResponse = send_json(self.client.get(url), "news").await?;
        debug!(count = response.articles.len(), "news page fetched");
        Ok(response.articles)
    }

    /// Whether an image URL answers a `HEAD` with success.
    async fn image_reachable(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(%url, error = %e, "image check failed");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// Paginated, de-duplicated article list.
#[derive(Debug, Clone)]
pub struct NewsFeed {
    next_page: u32,
    has_more: bool,
    seen: HashSet<String>,
    articles: Vec<NewsArticle>,
}

impl NewsFeed {
    pub fn new() -> Self {
        Self {
            next_page: 1,
            has_more: true,
            seen: HashSet::new(),
            articles: Vec::new(),
        }
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn articles(&self) -> &[NewsArticle] {
        &self.articles
    }

    /// Fetch the next page and append accepted articles. Returns how many were added.
    ///
    /// An empty page ends the feed. A failed fetch leaves the page counter
    /// where it was so the same page can be requested again.
    pub async fn load_more(&mut self, client: &NewsClient) -> Result<usize> {
        if !self.has_more {
            return Ok(0);
        }

        let raw = client.fetch_page(self.next_page).await?;
        self.next_page += 1;

        if raw.is_empty() {
            self.has_more = false;
            info!("news feed exhausted");
            return Ok(0);
        }

        let mut added = 0;
        for item in raw {
            let (Some(url), Some(image_url), Some(content)) = (item.url, item.url_to_image, item.description)
            else {
                continue;
            };
            if content.trim().is_empty() || self.seen.contains(&url) {
                continue;
            }
            if !client.image_reachable(&image_url).await {
                continue;
            }

            self.seen.insert(url.clone());
            self.articles.push(NewsArticle {
                title: item.title.unwrap_or_default(),
                content,
                image_url,
                url,
                source: item.source.and_then(|s| s.name),
                published_at: item.published_at,
            });
            added += 1;
        }

        debug!(added, total = self.articles.len(), "news page merged");
        Ok(added)
    }

    /// Articles whose title or content contains `term`, ignoring case.
    pub fn search(&self, term: &str) -> Vec<&NewsArticle> {
        let needle = term.trim().to_lowercase();
        self.articles
            .iter()
            .filter(|a| {
                needle.is_empty()
                    || a.title.to_lowercase().contains(&needle)
                    || a.content.to_lowercase().contains(&needle)
            })
            .collect()
    }
}

impl Default for NewsFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(server: &str, n: u32, image: &str) -> serde_json::Value {
        serde_json::json!({
            "title": format!("Soil health story {n}"),
            "description": format!("Composting lesson {n}"),
            "url": format!("https://news.example/{n}"),
            "urlToImage": format!("{server}{image}"),
            "publishedAt": "2024-05-01T10:00:00Z",
            "source": {"name": "Agri Times"}
        })
    }

    async fn mount_images(server: &wiremock::MockServer) {
        wiremock::Mock::given(wiremock::matchers::method("HEAD"))
            .and(wiremock::matchers::path("/img/ok.jpg"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .mount(server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("HEAD"))
            .and(wiremock::matchers::path("/img/gone.jpg"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn load_more_filters_and_dedupes() {
        let server = wiremock::MockServer::start().await;
        let uri = server.uri();
        mount_images(&server).await;

        let mut no_description = article(&uri, 3, "/img/ok.jpg");
        no_description["description"] = serde_json::Value::Null;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/v2/everything"))
            .and(wiremock::matchers::query_param("page", "1"))
            .and(wiremock::matchers::query_param("pageSize", "50"))
            .and(wiremock::matchers::query_param("sortBy", "publishedAt"))
            .and(wiremock::matchers::query_param("apiKey", "test-key"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "articles": [
                    article(&uri, 1, "/img/ok.jpg"),
                    article(&uri, 1, "/img/ok.jpg"),
                    article(&uri, 2, "/img/gone.jpg"),
                    no_description,
                ]
            })))
            .mount(&server)
            .await;

        let client = NewsClient::new(Client::new(), &uri, "test-key").unwrap();
        let mut feed = NewsFeed::new();
        let added = feed.load_more(&client).await.unwrap();

        assert_eq!(added, 1);
        assert_eq!(feed.articles()[0].url, "https://news.example/1");
        assert_eq!(feed.articles()[0].source.as_deref(), Some("Agri Times"));
        assert!(feed.has_more());
    }

    #[tokio::test]
    async fn empty_page_ends_feed() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/v2/everything"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "ok", "articles": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = NewsClient::new(Client::new(), &server.uri(), "k").unwrap();
        let mut feed = NewsFeed::new();
        assert_eq!(feed.load_more(&client).await.unwrap(), 0);
        assert!(!feed.has_more());
        // No further request once exhausted.
        assert_eq!(feed.load_more(&client).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_matches_title_or_content() {
        let server = wiremock::MockServer::start().await;
        let uri = server.uri();
        mount_images(&server).await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/v2/everything"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "articles": [article(&uri, 1, "/img/ok.jpg"), article(&uri, 2, "/img/ok.jpg")]
            })))
            .mount(&server)
            .await;

        let client = NewsClient::new(Client::new(), &uri, "k").unwrap();
        let mut feed = NewsFeed::new();
        feed.load_more(&client).await.unwrap();

        assert_eq!(feed.search("SOIL HEALTH").len(), 2);
        assert_eq!(feed.search("lesson 2").len(), 1);
        assert_eq!(feed.search("").len(), 2);
        assert!(feed.search("locust").is_empty());
    }
}
