//! Normalization passes applied before sniffing and block parsing.
//!
//! Each pass is a function `&str -> String` applied in sequence. Two pipelines
//! exist: one for model payloads, one for Markdown produced from scraped HTML.

use std::sync::LazyLock;

use regex::Regex;

/// Normalize a model payload before it is sniffed.
pub(crate) fn payload_pipeline(text: &str) -> String {
    let mut result = normalize_line_endings(text);

    result = unwrap_code_fence(&result);
    result = strip_trailing_whitespace(&result);

    result
}

/// Normalize `htmd` output so the block parser recognizes its structure.
pub(crate) fn html_pipeline(md: &str) -> String {
    let mut result = normalize_line_endings(md);

    result = remap_heading_levels(&result);
    result = normalize_bullets(&result);
    result = strip_leftover_html(&result);
    result = strip_trailing_whitespace(&result);
    result = clean_blank_lines(&result);

    result
}

// ---------------------------------------------------------------------------
// Line endings
// ---------------------------------------------------------------------------

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

// ---------------------------------------------------------------------------
// Code fences
// ---------------------------------------------------------------------------

/// Remove a single fence wrapping the whole payload (```` ```json ... ``` ````).
///
/// Fences in the middle of the text are left alone.
fn unwrap_code_fence(text: &str) -> String {
    static FENCED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\A\s*```[A-Za-z0-9_-]*[ \t]*\n(.*?)\n?```\s*\z").expect("valid regex")
    });

    match FENCED_RE.captures(text) {
        Some(caps) if !caps[1].contains("```") => caps[1].to_string(),
        _ => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// Map ATX headings onto the two levels the block parser knows.
///
/// `#` becomes `##`; `####` and deeper become `###`.
fn remap_heading_levels(md: &str) -> String {
    static H_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid regex"));

    md.lines()
        .map(|line| match H_RE.captures(line) {
            Some(caps) => {
                let level = caps[1].len();
                let text = caps[2].trim_end_matches('#').trim();
                if level <= 2 {
                    format!("## {text}")
                } else {
                    format!("### {text}")
                }
            }
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Bullets
// ---------------------------------------------------------------------------

/// Rewrite `*`, `+` and indented bullets to a flush `- ` marker.
fn normalize_bullets(md: &str) -> String {
    static BULLET_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\s*[*+-]\s+(\S.*)$").expect("valid regex"));

    md.lines()
        .map(|line| match BULLET_RE.captures(line) {
            // A line of only `* * *` is a thematic break, not a bullet.
            Some(caps) if !is_thematic_break(line) => format!("- {}", &caps[1]),
            _ => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_thematic_break(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && (compact.chars().all(|c| c == '*')
            || compact.chars().all(|c| c == '-')
            || compact.chars().all(|c| c == '_'))
}

// ---------------------------------------------------------------------------
// Leftover HTML
// ---------------------------------------------------------------------------

/// Remove stray container tags that survived conversion, keeping their text.
fn strip_leftover_html(md: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|picture|source)(?:\s[^>]*)?/?>",
        )
        .expect("valid regex")
    });

    HTML_TAG_RE.replace_all(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

fn strip_trailing_whitespace(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse runs of blank lines into one.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").trim().to_string()
}
