//! Article HTML to renderable blocks.

use tracing::{debug, instrument};

use krishimitra_shared::{KrishiMitraError, Result};

use crate::blocks::{Block, parse_blocks};
use crate::normalize::html_pipeline;

/// Convert article HTML to Markdown the block parser understands.
#[instrument(skip(html), fields(html_len = html.len()))]
pub fn html_to_markdown(html: &str) -> Result<String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg", "form"])
        .build();

    let raw_markdown = converter
        .convert(html)
        .map_err(|e| KrishiMitraError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw_markdown.len(), "htmd conversion complete");

    Ok(html_pipeline(&raw_markdown))
}

/// Convert article HTML straight to [`Block`]s.
pub fn html_to_blocks(html: &str) -> Result<Vec<Block>> {
    Ok(parse_blocks(&html_to_markdown(html)?))
}
