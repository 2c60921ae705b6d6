//! Recommendation-text rendering pipeline.
//!
//! Text from the disease model, the weather advisor and scraped articles goes
//! through the same single pass: normalize, sniff the format, then parse it
//! into [`Block`]s or extract structured records. Nothing here does I/O and
//! nothing fails on malformed input; unrecognized text degrades to plain
//! paragraphs.

pub mod advisory;
mod blocks;
mod extract;
mod html;
mod normalize;
mod sniff;
mod treatment;

use serde::Serialize;
use tracing::debug;

pub use advisory::{
    Advisory, AdvisoryExtractor, AdvisoryKind, AdvisoryView, ExtractorRegistry,
    JsonContractExtractor, PlantLabelExtractor, PlantRecommendation, SeasonLabelExtractor,
    SeasonPlan, SoilLabelExtractor, render_advisory,
};
pub use blocks::{Block, ListItem, parse_blocks};
pub use extract::{ExtractedSection, FieldSpec, Record, RecordSpec, extract_fields, extract_records};
pub use html::{html_to_blocks, html_to_markdown};
pub use sniff::{Payload, sniff};
pub use treatment::{Treatment, TreatmentPlan, TreatmentStep};

// ---------------------------------------------------------------------------
// Treatment recommendations
// ---------------------------------------------------------------------------

/// What to display for a treatment recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "content", rename_all = "snake_case")]
pub enum RecommendationView {
    Structured(TreatmentPlan),
    Blocks(Vec<Block>),
    Text(String),
}

/// Normalize, sniff and render a recommendation payload.
///
/// JSON with no recognized section degrades to the raw text rather than an
/// empty structured view.
pub fn render_recommendation(raw: &str) -> RecommendationView {
    let normalized = normalize::payload_pipeline(raw);

    match sniff(&normalized) {
        Payload::Json(value) => {
            let plan = TreatmentPlan::from_value(&value);
            if plan.is_empty() {
                debug!("json recommendation has no recognized sections");
                RecommendationView::Text(raw.to_string())
            } else {
                RecommendationView::Structured(plan)
            }
        }
        Payload::Markdown(text) => RecommendationView::Blocks(parse_blocks(&text)),
        Payload::PlainText(text) => RecommendationView::Text(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_becomes_structured() {
        let raw = "```json\n{\"description\": \"Leaf blight\", \"prevention\": [\"Rotate crops\"]}\n```";
        match render_recommendation(raw) {
            RecommendationView::Structured(plan) => {
                assert_eq!(plan.description.as_deref(), Some("Leaf blight"));
                assert_eq!(plan.prevention, vec!["Rotate crops"]);
            }
            other => panic!("expected structured, got {other:?}"),
        }
    }

    #[test]
    fn markdown_becomes_blocks() {
        let view = render_recommendation("## Tips\r\n- water daily\r\n");
        assert_eq!(
            view,
            RecommendationView::Blocks(vec![
                Block::Heading("Tips".into()),
                Block::List(vec![ListItem::Plain("water daily".into())]),
            ])
        );
    }

    #[test]
    fn plain_text_stays_text() {
        let view = render_recommendation("Plant looks fine.");
        assert_eq!(view, RecommendationView::Text("Plant looks fine.".into()));
    }

    #[test]
    fn malformed_json_is_text() {
        let raw = "{treatment: spray}";
        assert_eq!(render_recommendation(raw), RecommendationView::Text(raw.into()));
    }

    #[test]
    fn unrecognized_json_degrades_to_raw_text() {
        let raw = r#"{"foo": "bar"}"#;
        assert_eq!(render_recommendation(raw), RecommendationView::Text(raw.into()));
    }

    #[test]
    fn view_serializes_tagged() {
        let json = serde_json::to_value(render_recommendation("Plant looks fine.")).unwrap();
        assert_eq!(json["view"], "text");
        assert_eq!(json["content"], "Plant looks fine.");
    }
}
