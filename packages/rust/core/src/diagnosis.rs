//! Plant disease diagnosis: upload an image, classify, render the treatment.

use serde::Serialize;
use tracing::{info, instrument};

use krishimitra_markdown::{RecommendationView, render_recommendation};
use krishimitra_services::{DiseaseClient, Prediction, Upload};
use krishimitra_shared::{KrishiMitraError, Result};

const NO_IMAGE: &str = "Please select an image first.";

/// What the user sees below the label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "treatment", rename_all = "snake_case")]
pub enum DiagnosisOutcome {
    /// The plant was classified healthy; no treatment is shown.
    Healthy,
    Treatment(RecommendationView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    /// Class label exactly as returned by the classifier.
    pub label: String,
    pub display_label: String,
    /// Percentage, 0-100.
    pub confidence: f64,
    pub outcome: DiagnosisOutcome,
}

impl Diagnosis {
    pub fn is_healthy(&self) -> bool {
        matches!(self.outcome, DiagnosisOutcome::Healthy)
    }
}

/// Classify an image. Fails with `InputMissing` before any request when no
/// image was chosen.
#[instrument(skip_all, fields(file = image.as_ref().map(|i| i.file_name.as_str())))]
pub async fn diagnose(client: &DiseaseClient, image: Option<Upload>) -> Result<Diagnosis> {
    let image = image.ok_or_else(|| KrishiMitraError::input_missing(NO_IMAGE))?;

    let prediction = client.predict(image).await?;
    let diagnosis = interpret(prediction);

    info!(
        label = %diagnosis.label,
        confidence = diagnosis.confidence,
        healthy = diagnosis.is_healthy(),
        "diagnosis complete"
    );
    Ok(diagnosis)
}

/// Turn a raw prediction into a displayable diagnosis.
pub fn interpret(prediction: Prediction) -> Diagnosis {
    let outcome = if is_healthy_label(&prediction.disease) {
        DiagnosisOutcome::Healthy
    } else {
        DiagnosisOutcome::Treatment(render_recommendation(
            prediction.recommendations.as_deref().unwrap_or_default(),
        ))
    };

    Diagnosis {
        display_label: display_label(&prediction.disease),
        label: prediction.disease,
        confidence: prediction.confidence,
        outcome,
    }
}

pub fn is_healthy_label(label: &str) -> bool {
    label.to_lowercase().contains("healthy")
}

/// `Tomato___Late_blight` becomes `Tomato   Late blight`.
pub fn display_label(label: &str) -> String {
    label.replace('_', " ")
}
