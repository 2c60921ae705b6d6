//! Structured-output extraction: the advisory text is a JSON object.
//!
//! Expected shapes (key spelling is folded, so `organicMatter` and
//! `organic_matter` both work):
//!
//! - soil: `{"improvements", "amendments", "phAdjustment", "organicMatter"}`
//! - seasonal: `{"seasons": [{"name", "period", "crops", "preparations", "challenges"}]}`
//! - plants: `{"plants": [{"name", "suitability", "careTip", "soilRequirements", "soilPrep"}]}`

use serde_json::{Map, Value};

use super::{Advisory, AdvisoryExtractor, AdvisoryKind, PlantRecommendation, SeasonPlan};
use crate::extract::{ExtractedSection, json_text, lookup};
use crate::sniff::{Payload, sniff};

/// Reads an advisory from a JSON object instead of matching labels.
pub struct JsonContractExtractor {
    kind: AdvisoryKind,
}

impl JsonContractExtractor {
    pub fn new(kind: AdvisoryKind) -> Self {
        Self { kind }
    }
}

impl AdvisoryExtractor for JsonContractExtractor {
    fn name(&self) -> &str {
        match self.kind {
            AdvisoryKind::Soil => "soil-json",
            AdvisoryKind::Seasonal => "season-json",
            AdvisoryKind::Plants => "plant-json",
        }
    }

    fn kind(&self) -> AdvisoryKind {
        self.kind
    }

    fn extract(&self, text: &str) -> Option<Advisory> {
        let Payload::Json(Value::Object(root)) = sniff(text) else {
            return None;
        };

        let advisory = match self.kind {
            AdvisoryKind::Soil => Advisory::Soil(soil_section(&root)),
            AdvisoryKind::Seasonal => Advisory::Seasonal(
                records(&root, &["seasons", "seasonalplanning"])
                    .filter_map(season_plan)
                    .collect(),
            ),
            AdvisoryKind::Plants => Advisory::Plants(
                records(&root, &["plants", "plantrecommendations"])
                    .filter_map(plant_recommendation)
                    .collect(),
            ),
        };
        (!advisory.is_empty()).then_some(advisory)
    }
}

fn soil_section(root: &Map<String, Value>) -> ExtractedSection {
    const KEYS: [(&str, &[&str]); 4] = [
        ("improvements", &["improvements", "soilimprovements", "soilimprovementsuggestions"]),
        ("amendments", &["amendments", "recommendedamendments", "soilamendments"]),
        ("ph_adjustment", &["phadjustment", "ph"]),
        ("organic_matter", &["organicmatter"]),
    ];

    let mut section = ExtractedSection::default();
    for (key, aliases) in KEYS {
        if let Some(text) = lookup(root, aliases).and_then(json_text) {
            section.insert(key, text);
        }
    }
    section
}

/// Objects inside the first array found under `aliases`.
fn records<'a>(
    root: &'a Map<String, Value>,
    aliases: &[&str],
) -> impl Iterator<Item = &'a Map<String, Value>> {
    lookup(root, aliases)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn text_of(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    lookup(obj, aliases).and_then(json_text)
}

fn season_plan(obj: &Map<String, Value>) -> Option<SeasonPlan> {
    Some(SeasonPlan {
        name: text_of(obj, &["name", "season"])?,
        period: text_of(obj, &["period", "timing", "months"]),
        crops: text_of(obj, &["crops", "recommendedcrops"]),
        preparations: text_of(obj, &["preparations", "preparation"]),
        challenges: text_of(obj, &["challenges", "risks"]),
    })
}

fn plant_recommendation(obj: &Map<String, Value>) -> Option<PlantRecommendation> {
    Some(PlantRecommendation {
        name: text_of(obj, &["name", "plant"])?,
        suitability: text_of(obj, &["suitability"]),
        care_tip: text_of(obj, &["caretip", "caretips", "care"]),
        soil_requirements: text_of(obj, &["soilrequirements", "soilrequirement"]),
        soil_prep: text_of(obj, &["soilprep", "soilpreparation"]),
    })
}
