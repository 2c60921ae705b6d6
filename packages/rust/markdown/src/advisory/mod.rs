//! Advisory extraction: soil management, seasonal planning and plant suitability.
//!
//! Each domain can be extracted by more than one strategy. Strategies implement
//! [`AdvisoryExtractor`] and are tried in priority order by the
//! [`ExtractorRegistry`]; when none produces anything the text is shown as
//! parsed blocks instead.

mod json;
mod label;

use serde::Serialize;
use tracing::debug;

use crate::blocks::{Block, parse_blocks};
use crate::extract::ExtractedSection;
use crate::normalize::payload_pipeline;

pub use json::JsonContractExtractor;
pub use label::{PlantLabelExtractor, SeasonLabelExtractor, SoilLabelExtractor};

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// Which advisory section a text describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    Soil,
    Seasonal,
    Plants,
}

/// One growing season's plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeasonPlan {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crops: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preparations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenges: Option<String>,
}

/// A plant suited to the current conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlantRecommendation {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suitability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub care_tip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_prep: Option<String>,
}

/// Structured result of an extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Advisory {
    Soil(ExtractedSection),
    Seasonal(Vec<SeasonPlan>),
    Plants(Vec<PlantRecommendation>),
}

impl Advisory {
    pub fn kind(&self) -> AdvisoryKind {
        match self {
            Self::Soil(_) => AdvisoryKind::Soil,
            Self::Seasonal(_) => AdvisoryKind::Seasonal,
            Self::Plants(_) => AdvisoryKind::Plants,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Soil(section) => section.is_empty(),
            Self::Seasonal(seasons) => seasons.is_empty(),
            Self::Plants(plants) => plants.is_empty(),
        }
    }
}

/// What to display for an advisory text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "content", rename_all = "snake_case")]
pub enum AdvisoryView {
    Structured(Advisory),
    Fallback(Vec<Block>),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A strategy that turns advisory text into structured records.
///
/// Returning `None` (or an empty advisory) means "not recognized"; callers
/// fall back to block rendering.
pub trait AdvisoryExtractor: Send + Sync {
    /// Human-readable strategy name for tracing.
    fn name(&self) -> &str;

    /// The section this extractor understands.
    fn kind(&self) -> AdvisoryKind;

    fn extract(&self, text: &str) -> Option<Advisory>;
}

/// Render advisory text with a single extractor. Never fails.
pub fn render_advisory(extractor: &dyn AdvisoryExtractor, text: &str) -> AdvisoryView {
    let normalized = payload_pipeline(text);
    match extractor.extract(&normalized) {
        Some(advisory) if !advisory.is_empty() => {
            debug!(extractor = extractor.name(), "advisory extracted");
            AdvisoryView::Structured(advisory)
        }
        _ => {
            debug!(extractor = extractor.name(), "advisory not recognized, falling back to blocks");
            AdvisoryView::Fallback(parse_blocks(&normalized))
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds extractors in priority order.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn AdvisoryExtractor>>,
}

impl ExtractorRegistry {
    /// All built-in extractors: the JSON contract first, label matching second.
    pub fn new() -> Self {
        Self {
            extractors: vec![
                Box::new(JsonContractExtractor::new(AdvisoryKind::Soil)),
                Box::new(JsonContractExtractor::new(AdvisoryKind::Seasonal)),
                Box::new(JsonContractExtractor::new(AdvisoryKind::Plants)),
                Box::new(SoilLabelExtractor),
                Box::new(SeasonLabelExtractor),
                Box::new(PlantLabelExtractor),
            ],
        }
    }

    /// Add an extractor ahead of the built-ins.
    pub fn register(&mut self, extractor: Box<dyn AdvisoryExtractor>) {
        self.extractors.insert(0, extractor);
    }

    /// First non-empty extraction for `kind`, if any extractor recognizes the text.
    pub fn extract(&self, kind: AdvisoryKind, text: &str) -> Option<Advisory> {
        let normalized = payload_pipeline(text);
        self.extractors
            .iter()
            .filter(|e| e.kind() == kind)
            .find_map(|e| {
                let advisory = e.extract(&normalized).filter(|a| !a.is_empty())?;
                debug!(extractor = e.name(), ?kind, "advisory extracted");
                Some(advisory)
            })
    }

    /// Structured view from the first extractor that recognizes the text,
    /// otherwise the parsed blocks.
    pub fn render(&self, kind: AdvisoryKind, text: &str) -> AdvisoryView {
        match self.extract(kind, text) {
            Some(advisory) => AdvisoryView::Structured(advisory),
            None => AdvisoryView::Fallback(parse_blocks(&payload_pipeline(text))),
        }
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_advisory_structured_when_labels_match() {
        let text = "Soil improvement suggestions: add compost\npH adjustment: apply lime";
        match render_advisory(&SoilLabelExtractor, text) {
            AdvisoryView::Structured(Advisory::Soil(section)) => {
                assert_eq!(section.get("improvements"), Some("add compost"));
                assert_eq!(section.get("ph_adjustment"), Some("apply lime"));
            }
            other => panic!("expected structured soil advisory, got {other:?}"),
        }
    }

    #[test]
    fn render_advisory_falls_back_to_blocks() {
        let text = "## Soil\n- keep it moist";
        let view = render_advisory(&SoilLabelExtractor, text);
        assert_eq!(view, AdvisoryView::Fallback(parse_blocks(text)));
    }

    #[test]
    fn render_advisory_falls_back_on_empty_input() {
        assert_eq!(
            render_advisory(&PlantLabelExtractor, ""),
            AdvisoryView::Fallback(Vec::new())
        );
    }

    #[test]
    fn registry_prefers_json_contract() {
        let registry = ExtractorRegistry::new();
        let text = r#"{"improvements": "add compost", "organicMatter": "mulch"}"#;
        let advisory = registry.extract(AdvisoryKind::Soil, text).expect("soil advisory");
        let Advisory::Soil(section) = advisory else {
            panic!("expected soil");
        };
        assert_eq!(section.get("organic_matter"), Some("mulch"));
    }

    #[test]
    fn registry_falls_through_to_labels() {
        let registry = ExtractorRegistry::new();
        let text = "1. **Tomato**\n- Suitability: warm days\n- Care tip: stake early";
        let advisory = registry.extract(AdvisoryKind::Plants, text).expect("plants");
        assert_eq!(advisory.kind(), AdvisoryKind::Plants);
    }

    #[test]
    fn registry_render_fallback() {
        let registry = ExtractorRegistry::new();
        let view = registry.render(AdvisoryKind::Seasonal, "No seasonal data available.");
        assert_eq!(
            view,
            AdvisoryView::Fallback(vec![Block::Paragraph("No seasonal data available.".into())])
        );
    }

    #[test]
    fn registered_extractor_runs_first() {
        struct Fixed;
        impl AdvisoryExtractor for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }
            fn kind(&self) -> AdvisoryKind {
                AdvisoryKind::Plants
            }
            fn extract(&self, _text: &str) -> Option<Advisory> {
                Some(Advisory::Plants(vec![PlantRecommendation {
                    name: "Millet".into(),
                    ..Default::default()
                }]))
            }
        }

        let mut registry = ExtractorRegistry::new();
        registry.register(Box::new(Fixed));
        let Some(Advisory::Plants(plants)) = registry.extract(AdvisoryKind::Plants, "anything")
        else {
            panic!("expected plants");
        };
        assert_eq!(plants[0].name, "Millet");
    }
}
