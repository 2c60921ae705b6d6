//! Label-based extractors for free-text advisories.

use std::sync::LazyLock;

use regex::Regex;

use super::{Advisory, AdvisoryExtractor, AdvisoryKind, PlantRecommendation, SeasonPlan};
use crate::extract::{FieldSpec, RecordSpec, extract_fields, extract_records};

/// A record starts on a numbered item, a `##`-`####` heading or a line that
/// is entirely bold. An optional `(…)` after the name is captured as `detail`.
const RECORD_START: &str = r"(?m)^[ \t]*(?:(?:\d+[.)]|#{2,4})[ \t]*\*{0,2}|\*\*)(?P<name>[^*:()\n]+?)[ \t]*(?:\((?P<detail>[^)\n]*)\))?[ \t]*\*{0,2}[ \t]*:?[ \t]*$";

// ---------------------------------------------------------------------------
// Soil management
// ---------------------------------------------------------------------------

static SOIL_FIELDS: LazyLock<Vec<FieldSpec>> = LazyLock::new(|| {
    vec![
        FieldSpec::labeled(
            "improvements",
            "soil improvement suggestions?|soil improvements?|improvements?",
        ),
        FieldSpec::labeled(
            "amendments",
            "recommended (?:soil )?amendments?|soil amendments?|amendments?",
        ),
        FieldSpec::labeled("ph_adjustment", "ph adjustments?|ph management|ph"),
        FieldSpec::labeled(
            "organic_matter",
            "organic matter(?: recommendations?| suggestions?)?",
        ),
    ]
});

/// Soil management fields: improvements, amendments, pH and organic matter.
pub struct SoilLabelExtractor;

impl AdvisoryExtractor for SoilLabelExtractor {
    fn name(&self) -> &str {
        "soil-labels"
    }

    fn kind(&self) -> AdvisoryKind {
        AdvisoryKind::Soil
    }

    fn extract(&self, text: &str) -> Option<Advisory> {
        let section = extract_fields(text, &SOIL_FIELDS);
        (!section.is_empty()).then_some(Advisory::Soil(section))
    }
}

// ---------------------------------------------------------------------------
// Seasonal planning
// ---------------------------------------------------------------------------

static SEASON_RECORDS: LazyLock<RecordSpec> = LazyLock::new(|| RecordSpec {
    start: Regex::new(RECORD_START).expect("valid regex"),
    fields: vec![
        FieldSpec::labeled("period", "period|timing|months|duration"),
        FieldSpec::labeled(
            "crops",
            "recommended crops|suitable crops|crops to plant|crops",
        ),
        FieldSpec::labeled(
            "preparations",
            "land preparations?|preparation steps|preparations?",
        ),
        FieldSpec::labeled(
            "challenges",
            "potential challenges|key challenges|challenges|risks",
        ),
    ],
});

/// One [`SeasonPlan`] per season heading. A `(June-October)` suffix on the
/// heading stands in for a missing period field.
pub struct SeasonLabelExtractor;

impl AdvisoryExtractor for SeasonLabelExtractor {
    fn name(&self) -> &str {
        "season-labels"
    }

    fn kind(&self) -> AdvisoryKind {
        AdvisoryKind::Seasonal
    }

    fn extract(&self, text: &str) -> Option<Advisory> {
        let seasons: Vec<SeasonPlan> = extract_records(text, &SEASON_RECORDS)
            .into_iter()
            .map(|record| {
                let field = |key: &str| record.fields.get(key).map(str::to_string);
                SeasonPlan {
                    period: field("period").or_else(|| record.detail.clone()),
                    crops: field("crops"),
                    preparations: field("preparations"),
                    challenges: field("challenges"),
                    name: record.name,
                }
            })
            .collect();
        (!seasons.is_empty()).then_some(Advisory::Seasonal(seasons))
    }
}

// ---------------------------------------------------------------------------
// Plant suitability
// ---------------------------------------------------------------------------

static PLANT_RECORDS: LazyLock<RecordSpec> = LazyLock::new(|| RecordSpec {
    start: Regex::new(RECORD_START).expect("valid regex"),
    fields: vec![
        FieldSpec::labeled(
            "suitability",
            "suitability|why it suits|why suitable|suitable because",
        ),
        FieldSpec::labeled("care_tip", "care tips?|care"),
        FieldSpec::labeled("soil_requirements", "soil requirements?|soil needs|soil type"),
        FieldSpec::labeled("soil_prep", "soil prep(?:aration)?"),
    ],
});

/// One [`PlantRecommendation`] per plant heading.
pub struct PlantLabelExtractor;

impl AdvisoryExtractor for PlantLabelExtractor {
    fn name(&self) -> &str {
        "plant-labels"
    }

    fn kind(&self) -> AdvisoryKind {
        AdvisoryKind::Plants
    }

    fn extract(&self, text: &str) -> Option<Advisory> {
        let plants: Vec<PlantRecommendation> = extract_records(text, &PLANT_RECORDS)
            .into_iter()
            .map(|record| {
                let field = |key: &str| record.fields.get(key).map(str::to_string);
                PlantRecommendation {
                    suitability: field("suitability"),
                    care_tip: field("care_tip"),
                    soil_requirements: field("soil_requirements"),
                    soil_prep: field("soil_prep"),
                    name: record.name,
                }
            })
            .collect();
        (!plants.is_empty()).then_some(Advisory::Plants(plants))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soil_fields_all_four() {
        let text = "\
**Soil improvement suggestions:** Add well-rotted manure before sowing.
**Recommended amendments:** Gypsum at 250 kg/acre.
**pH adjustment:** Apply agricultural lime to raise pH toward 6.5.
**Organic matter:** Incorporate crop residue after harvest.";
        let Some(Advisory::Soil(section)) = SoilLabelExtractor.extract(text) else {
            panic!("expected soil section");
        };
        assert_eq!(section.len(), 4);
        assert_eq!(section.get("amendments"), Some("Gypsum at 250 kg/acre."));
        assert_eq!(
            section.get("ph_adjustment"),
            Some("Apply agricultural lime to raise pH toward 6.5.")
        );
    }

    #[test]
    fn soil_partial_labels() {
        let text = "pH: slightly acidic, add lime.";
        let Some(Advisory::Soil(section)) = SoilLabelExtractor.extract(text) else {
            panic!("expected soil section");
        };
        assert_eq!(section.get("ph_adjustment"), Some("slightly acidic, add lime."));
        assert_eq!(section.get("improvements"), None);
    }

    #[test]
    fn soil_unlabeled_text_is_none() {
        assert_eq!(SoilLabelExtractor.extract("Keep the soil loose and moist."), None);
    }

    #[test]
    fn seasons_with_period_in_heading() {
        let text = "\
## Seasonal Planning
1. **Kharif (June-October)**
- Crops: rice, maize
- Preparations: puddle the fields
- Challenges: waterlogging
2. **Rabi**
- Period: November-March
- Crops: wheat, mustard";
        let Some(Advisory::Seasonal(seasons)) = SeasonLabelExtractor.extract(text) else {
            panic!("expected seasons");
        };
        assert_eq!(seasons.len(), 2);
        assert_eq!(seasons[0].name, "Kharif");
        assert_eq!(seasons[0].period.as_deref(), Some("June-October"));
        assert_eq!(seasons[0].crops.as_deref(), Some("rice, maize"));
        assert_eq!(seasons[0].challenges.as_deref(), Some("waterlogging"));
        assert_eq!(seasons[1].name, "Rabi");
        assert_eq!(seasons[1].period.as_deref(), Some("November-March"));
        assert_eq!(seasons[1].preparations, None);
    }

    #[test]
    fn plants_in_order_of_appearance() {
        let text = "\
### Tomato
**Suitability:** Thrives in the current warm spell.
**Care tip:** Stake plants early.
**Soil requirements:** Well-drained loam.
**Soil preparation:** Mix in compost.

### Okra
**Suitability:** Heat tolerant.";
        let Some(Advisory::Plants(plants)) = PlantLabelExtractor.extract(text) else {
            panic!("expected plants");
        };
        let names: Vec<&str> = plants.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Tomato", "Okra"]);
        assert_eq!(plants[0].care_tip.as_deref(), Some("Stake plants early."));
        assert_eq!(plants[0].soil_requirements.as_deref(), Some("Well-drained loam."));
        assert_eq!(plants[0].soil_prep.as_deref(), Some("Mix in compost."));
        assert_eq!(plants[1].suitability.as_deref(), Some("Heat tolerant."));
        assert_eq!(plants[1].care_tip, None);
    }

    #[test]
    fn plants_without_record_starts_is_none() {
        assert_eq!(PlantLabelExtractor.extract("Suitability: good"), None);
    }
}
