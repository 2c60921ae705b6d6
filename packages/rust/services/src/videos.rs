//! Plant-care video search (YouTube Data API v3).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use krishimitra_shared::{AppConfig, KrishiMitraError, Result, resolve_api_key};

use crate::http::{self, send_json};

const BASE_SEARCH_QUERY: &str = "plant care, organic farming";
const MAX_RESULTS: u32 = 10;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Fixed video categories offered for filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoCategory {
    #[default]
    All,
    SoilHealth,
    CropRotation,
    PestManagement,
    Irrigation,
    HarvestTechniques,
}

impl VideoCategory {
    pub const ALL: [VideoCategory; 6] = [
        Self::All,
        Self::SoilHealth,
        Self::CropRotation,
        Self::PestManagement,
        Self::Irrigation,
        Self::HarvestTechniques,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::SoilHealth => "soil-health",
            Self::CropRotation => "crop-rotation",
            Self::PestManagement => "pest-management",
            Self::Irrigation => "irrigation",
            Self::HarvestTechniques => "harvest-techniques",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All Videos",
            Self::SoilHealth => "Soil Health",
            Self::CropRotation => "Crop Rotation",
            Self::PestManagement => "Pest Management",
            Self::Irrigation => "Irrigation",
            Self::HarvestTechniques => "Harvest Techniques",
        }
    }

    /// Search text: the base query, plus the category with its first `-` as a space.
    pub fn query(self) -> String {
        match self {
            Self::All => BASE_SEARCH_QUERY.to_string(),
            other => format!("{BASE_SEARCH_QUERY}, {}", other.id().replacen('-', " ", 1)),
        }
    }
}

impl fmt::Display for VideoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for VideoCategory {
    type Err = KrishiMitraError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.id() == s)
            .ok_or_else(|| KrishiMitraError::validation(format!("unknown video category: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
}

impl Video {
    pub fn embed_url(&self) -> String {
        format!("https://www.youtube.com/embed/{}", self.id)
    }
}

/// One page of results with the cursor for the next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoPage {
    pub videos: Vec<Video>,
    pub next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    channel_title: Option<String>,
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Default, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct VideoClient {
    client: Client,
    base: Url,
    api_key: String,
}

impl VideoClient {
    pub fn new(client: Client, base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client,
            base: http::parse_base(base_url)?,
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(&config.api_keys.video_api_key_env)?;
        Self::new(http::client_from_config(config)?, &config.services.video_url, api_key)
    }

    /// Search one page of videos for a category.
    #[instrument(skip(self))]
    pub async fn search(&self, category: VideoCategory, page_token: Option<&str>) -> Result<VideoPage> {
        let mut url = http::endpoint(&self.base, "search")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("part", "snippet")
                .append_pair("maxResults", &MAX_RESULTS.to_string())
                .append_pair("q", &category.query())
                .append_pair("key", &self.api_key)
                .append_pair("type", "video");
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }

        let response: SearchResponse = send_json(self.client.get(url), "video search").await?;

        let videos: Vec<Video> = response
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.video_id?;
                let thumbs = item.snippet.thumbnails;
                Some(Video {
                    id,
                    title: item.snippet.title,
                    description: item.snippet.description,
                    channel: item.snippet.channel_title,
                    published_at: item.snippet.published_at,
                    thumbnail_url: thumbs.high.or(thumbs.medium).or(thumbs.default).map(|t| t.url),
                })
            })
            .collect();

        debug!(count = videos.len(), has_next = response.next_page_token.is_some(), "videos fetched");
        Ok(VideoPage {
            videos,
            next_page_token: response.next_page_token,
        })
    }
}
