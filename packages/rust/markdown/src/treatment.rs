//! Structured form of a JSON treatment recommendation.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::extract::{json_text, lookup};

/// How to treat the disease: free text, or ordered named steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Treatment {
    Text(String),
    Steps(Vec<TreatmentStep>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreatmentStep {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
}

/// A disease treatment recommendation with every section optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreatmentPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment: Option<Treatment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prevention: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_care: Vec<String>,
}

impl TreatmentPlan {
    /// Build a plan from a JSON object. Unknown keys are ignored; a non-object
    /// yields an empty plan.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            description: lookup(obj, &["description", "briefdescription", "diseasedescription"])
                .and_then(json_text),
            symptoms: items(lookup(obj, &["symptoms", "symptom"])),
            treatment: lookup(obj, &["treatment", "treatments", "treatmentmethods"])
                .and_then(treatment),
            prevention: items(lookup(
                obj,
                &["prevention", "preventivemeasures", "preventionmeasures"],
            )),
            additional_care: items(lookup(
                obj,
                &["additionalcare", "additionalcareinstructions", "care"],
            )),
        }
    }

    /// No recognized section was present.
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.symptoms.is_empty()
            && self.treatment.is_none()
            && self.prevention.is_empty()
            && self.additional_care.is_empty()
    }
}

/// String -> one item, array -> its items, anything else -> its JSON text.
fn items(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(values)) => values.iter().filter_map(json_text).collect(),
        Some(other) => json_text(other).into_iter().collect(),
    }
}

fn treatment(value: &Value) -> Option<Treatment> {
    match value {
        Value::Object(steps) => non_empty(titled_steps(steps)),
        Value::Array(values) => non_empty(
            values
                .iter()
                .filter_map(|v| match v.as_object() {
                    Some(obj) => step_from_object(obj),
                    None => json_text(v).map(|description| TreatmentStep {
                        title: None,
                        description,
                    }),
                })
                .collect(),
        ),
        other => json_text(other).map(Treatment::Text),
    }
}

/// `{"Organic": "...", "Chemical": [...]}`: one step per key, in document order.
fn titled_steps(steps: &Map<String, Value>) -> Vec<TreatmentStep> {
    steps
        .iter()
        .filter_map(|(title, value)| {
            json_text(value).map(|description| TreatmentStep {
                title: Some(title.clone()),
                description,
            })
        })
        .collect()
}

/// `{"title": "...", "description": "..."}` inside a step array.
fn step_from_object(obj: &Map<String, Value>) -> Option<TreatmentStep> {
    let description = lookup(obj, &["description", "details", "steps"]).and_then(json_text)?;
    Some(TreatmentStep {
        title: lookup(obj, &["title", "name", "method"]).and_then(json_text),
        description,
    })
}

fn non_empty(steps: Vec<TreatmentStep>) -> Option<Treatment> {
    (!steps.is_empty()).then_some(Treatment::Steps(steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_plan() {
        let plan = TreatmentPlan::from_value(&json!({
            "description": "Fungal disease of tomato leaves.",
            "symptoms": ["Dark spots", "Yellowing"],
            "treatment": {"Organic": "Neem oil weekly", "Chemical": ["Mancozeb", "Chlorothalonil"]},
            "prevention": "Rotate crops"
        }));
        assert_eq!(plan.description.as_deref(), Some("Fungal disease of tomato leaves."));
        assert_eq!(plan.symptoms, vec!["Dark spots", "Yellowing"]);
        assert_eq!(plan.prevention, vec!["Rotate crops"]);
        assert_eq!(
            plan.treatment,
            Some(Treatment::Steps(vec![
                TreatmentStep {
                    title: Some("Organic".into()),
                    description: "Neem oil weekly".into(),
                },
                TreatmentStep {
                    title: Some("Chemical".into()),
                    description: "Mancozeb, Chlorothalonil".into(),
                },
            ]))
        );
    }

    #[test]
    fn string_treatment_is_text() {
        let plan = TreatmentPlan::from_value(&json!({"treatment": "Remove infected leaves"}));
        assert_eq!(plan.treatment, Some(Treatment::Text("Remove infected leaves".into())));
    }

    #[test]
    fn array_treatment_is_untitled_steps() {
        let plan = TreatmentPlan::from_value(&json!({
            "treatment_methods": ["Prune", {"method": "Spray", "details": "Copper fungicide"}]
        }));
        let Some(Treatment::Steps(steps)) = plan.treatment else {
            panic!("expected steps");
        };
        assert_eq!(steps[0].title, None);
        assert_eq!(steps[1].title.as_deref(), Some("Spray"));
        assert_eq!(steps[1].description, "Copper fungicide");
    }

    #[test]
    fn non_list_symptoms_become_json_text() {
        let plan = TreatmentPlan::from_value(&json!({"symptoms": {"leaf": "spots"}}));
        assert_eq!(plan.symptoms, vec![r#"{"leaf":"spots"}"#]);
    }

    #[test]
    fn unrecognized_object_is_empty() {
        assert!(TreatmentPlan::from_value(&json!({"foo": "bar"})).is_empty());
        assert!(TreatmentPlan::from_value(&json!("text")).is_empty());
    }
}
