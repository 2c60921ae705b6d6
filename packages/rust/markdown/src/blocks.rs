//! Line-oriented structural parser for Markdown-like model output.
//!
//! Recognizes exactly four line shapes: `## ` headings, `### ` subheadings,
//! `- ` list items and everything else as paragraphs. Consecutive list items
//! are grouped into one [`Block::List`]; blank lines only close lists.

use serde::Serialize;

/// A classified, renderable unit of parsed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Block {
    Heading(String),
    Subheading(String),
    List(Vec<ListItem>),
    Paragraph(String),
}

/// One entry in a list block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ListItem {
    /// Item text without emphasis.
    Plain(String),
    /// The first `**bold**` span, with the text around it. `lead` is empty
    /// when the item opens with the span.
    Emphasized {
        #[serde(skip_serializing_if = "String::is_empty")]
        lead: String,
        bold: String,
        rest: String,
    },
}

impl ListItem {
    /// Classify the text of a list item (prefix already stripped).
    fn from_text(text: &str) -> Self {
        if let Some(open) = text.find("**") {
            let after_open = &text[open + 2..];
            if let Some(close) = after_open.find("**").filter(|&close| close > 0) {
                return Self::Emphasized {
                    lead: text[..open].to_string(),
                    bold: after_open[..close].to_string(),
                    rest: after_open[close + 2..].to_string(),
                };
            }
        }
        Self::Plain(text.to_string())
    }

    /// The item's text with emphasis markers removed.
    pub fn text(&self) -> String {
        match self {
            Self::Plain(t) => t.clone(),
            Self::Emphasized { lead, bold, rest } => format!("{lead}{bold}{rest}"),
        }
    }
}

impl Block {
    /// Number of source lines this block was built from.
    pub fn line_count(&self) -> usize {
        match self {
            Self::List(items) => items.len(),
            Self::Heading(_) | Self::Subheading(_) | Self::Paragraph(_) => 1,
        }
    }
}

/// Parse text into blocks, preserving input order.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut open_list: Vec<ListItem> = Vec::new();

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("## ") {
            flush(&mut open_list, &mut blocks);
            blocks.push(Block::Heading(rest.trim().to_string()));
        } else if let Some(rest) = line.strip_prefix("### ") {
            flush(&mut open_list, &mut blocks);
            blocks.push(Block::Subheading(rest.trim().to_string()));
        } else if let Some(rest) = line.strip_prefix("- ") {
            open_list.push(ListItem::from_text(rest));
        } else if line.trim().is_empty() {
            flush(&mut open_list, &mut blocks);
        } else {
            flush(&mut open_list, &mut blocks);
            blocks.push(Block::Paragraph(line.to_string()));
        }
    }

    flush(&mut open_list, &mut blocks);
    blocks
}

fn flush(open_list: &mut Vec<ListItem>, blocks: &mut Vec<Block>) {
    if !open_list.is_empty() {
        blocks.push(Block::List(std::mem::take(open_list)));
    }
}
