//! Plant-disease blog listing scraper and article renderer.

use std::sync::LazyLock;

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use krishimitra_markdown::{Block, html_to_blocks};
use krishimitra_shared::{AppConfig, Result};

use crate::http::{self, send_text};

/// Image shown when a listing entry carries none.
pub const DEFAULT_IMAGE: &str = "/static/images/default.jpg";

const NOT_EXTRACTED: &str = "Content could not be extracted.";

static ITEM_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.listing__item").expect("valid selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.listing__link").expect("valid selector"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2.listing__title").expect("valid selector"));
static IMAGE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.listing__image-wrapper img").expect("valid selector"));
static STRAPLINE_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("p.listing__text.listing__text--strapline").expect("valid selector")
});
static CONTENT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.widget-contentparsed").expect("valid selector"));

/// One entry of the blog listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogPost {
    pub title: String,
    /// Absolute article URL, when the entry links anywhere.
    pub url: Option<String>,
    pub description: String,
    pub image_url: String,
}

/// A fetched article, rendered to blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogArticle {
    pub url: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone)]
pub struct BlogClient {
    client: Client,
    listing_url: Url,
}

impl BlogClient {
    pub fn new(client: Client, listing_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            listing_url: http::parse_base(listing_url)?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(http::client_from_config(config)?, &config.services.blog_url)
    }

    /// Fetch and parse the listing page.
    #[instrument(skip(self), fields(url = %self.listing_url))]
    pub async fn list(&self) -> Result<Vec<BlogPost>> {
        let html = send_text(self.client.get(self.listing_url.clone()), "blog listing").await?;
        let posts = parse_listing(&html, &self.listing_url);
        if posts.is_empty() {
            warn!("no listing items found; the page structure may have changed");
        } else {
            info!(count = posts.len(), "blog listing scraped");
        }
        Ok(posts)
    }

    /// Fetch an article and render its body.
    ///
    /// A page without the expected content container yields a single
    /// explanatory paragraph rather than an error.
    #[instrument(skip(self))]
    pub async fn article(&self, url: &str) -> Result<BlogArticle> {
        let target = http::parse_base(url)?;
        let html = send_text(self.client.get(target), "blog article").await?;

        let blocks = match extract_content(&html) {
            Some(content) => html_to_blocks(&content)?,
            None => {
                debug!("article content container missing");
                vec![Block::Paragraph(NOT_EXTRACTED.to_string())]
            }
        };

        Ok(BlogArticle {
            url: url.to_string(),
            blocks,
        })
    }
}

/// Parse listing entries, skipping sponsored posts.
pub fn parse_listing(html: &str, base: &Url) -> Vec<BlogPost> {
    let doc = Html::parse_document(html);

    doc.select(&ITEM_SEL)
        .filter(|item| !item.value().classes().any(|c| c == "sponsored-post"))
        .map(|item| BlogPost {
            title: first_text(&item, &TITLE_SEL).unwrap_or_else(|| "No Title".to_string()),
            url: item
                .select(&LINK_SEL)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| base.join(href).ok())
                .map(String::from),
            description: first_text(&item, &STRAPLINE_SEL)
                .unwrap_or_else(|| "No Description".to_string()),
            image_url: image_url(&item),
        })
        .collect()
}

/// Posts whose title or description contains `term`, ignoring case.
pub fn search<'a>(posts: &'a [BlogPost], term: &str) -> Vec<&'a BlogPost> {
    let needle = term.trim().to_lowercase();
    posts
        .iter()
        .filter(|p| {
            p.title.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
        })
        .collect()
}

fn first_text(item: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    item.select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

/// `src`, then the lazy-load `data-original-mos`, then [`DEFAULT_IMAGE`].
fn image_url(item: &ElementRef<'_>) -> String {
    item.select(&IMAGE_SEL)
        .next()
        .and_then(|img| {
            img.value()
                .attr("src")
                .or_else(|| img.value().attr("data-original-mos"))
        })
        .unwrap_or(DEFAULT_IMAGE)
        .to_string()
}

fn extract_content(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.select(&CONTENT_SEL).next().map(|el| el.html())
}
