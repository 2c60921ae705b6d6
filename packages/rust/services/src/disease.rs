//! Plant disease classifier client.

use reqwest::Client;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use krishimitra_shared::{AppConfig, Result};

use crate::http::{self, Upload, send_json};

/// A classification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Class label, e.g. `Tomato___Late_blight`.
    pub disease: String,
    /// Confidence as a percentage (0-100).
    #[serde(default, deserialize_with = "http::null_as_default")]
    pub confidence: f64,
    /// Treatment recommendation text. Structured values arrive re-serialized as JSON.
    #[serde(default, deserialize_with = "http::text_or_json")]
    pub recommendations: Option<String>,
}

/// Client for `POST /predict`.
#[derive(Debug, Clone)]
pub struct DiseaseClient {
    client: Client,
    base: Url,
}

impl DiseaseClient {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base: http::parse_base(base_url)?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(http::client_from_config(config)?, &config.services.disease_url)
    }

    /// Upload a leaf image and classify it.
    #[instrument(skip_all, fields(file = %image.file_name, bytes = image.bytes.len()))]
    pub async fn predict(&self, image: Upload) -> Result<Prediction> {
        let url = http::endpoint(&self.base, "predict")?;
        let form = Form::new().part("file", image.into_part()?);

        let prediction: Prediction =
            send_json(self.client.post(url).multipart(form), "disease prediction").await?;

        debug!(disease = %prediction.disease, confidence = prediction.confidence, "prediction received");
        Ok(prediction)
    }
}
