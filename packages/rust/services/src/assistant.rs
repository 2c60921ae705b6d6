//! Conversational assistant client (text and voice).

use reqwest::Client;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use krishimitra_shared::{AppConfig, KrishiMitraError, Result};

use crate::http::{self, Upload, send_json};

/// Reply from `/chat` or `/voice-input`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    #[serde(default, deserialize_with = "http::null_as_default")]
    pub text_response: String,
    /// File name under `/audio/`; see [`AssistantClient::audio_url`].
    #[serde(default)]
    pub audio_file_path: Option<String>,
    #[serde(default)]
    pub detected_language: Option<String>,
    /// What the server heard, for voice input.
    #[serde(default)]
    pub transcribed_text: Option<String>,
    /// Set when the server failed but still produced a spoken apology.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Client for the assistant service.
#[derive(Debug, Clone)]
pub struct AssistantClient {
    client: Client,
    base: Url,
}

impl AssistantClient {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base: http::parse_base(base_url)?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(http::client_from_config(config)?, &config.services.assistant_url)
    }

    /// Send a text message.
    #[instrument(skip_all, fields(len = message.len()))]
    pub async fn chat(&self, message: &str) -> Result<AssistantReply> {
        let url = http::endpoint(&self.base, "chat")?;
        let reply: AssistantReply = send_json(
            self.client.post(url).json(&ChatRequest { message }),
            "assistant chat",
        )
        .await?;
        log_server_error(&reply);
        Ok(reply)
    }

    /// Send recorded audio for transcription and answer.
    #[instrument(skip_all, fields(file = %audio.file_name))]
    pub async fn voice_input(&self, audio: Upload) -> Result<AssistantReply> {
        let url = http::endpoint(&self.base, "voice-input")?;
        let form = Form::new().part("file", audio.into_part()?);
        let reply: AssistantReply =
            send_json(self.client.post(url).multipart(form), "assistant voice input").await?;
        debug!(transcribed = ?reply.transcribed_text, "voice input answered");
        log_server_error(&reply);
        Ok(reply)
    }

    /// Clear server-side conversation state. Failures are logged, never returned.
    #[instrument(skip_all)]
    pub async fn reset(&self) {
        let url = match http::endpoint(&self.base, "reset") {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "assistant reset skipped");
                return;
            }
        };
        match self.client.post(url).send().await {
            Ok(response) if response.status().is_success() => debug!("assistant state reset"),
            Ok(response) => warn!(status = %response.status(), "assistant reset rejected"),
            Err(e) => warn!(error = %e, "assistant reset failed"),
        }
    }

    /// URL of a synthesized audio reply.
    pub fn audio_url(&self, audio_file_path: &str) -> Result<Url> {
        if audio_file_path.trim().is_empty() {
            return Err(KrishiMitraError::validation("empty audio file path"));
        }
        http::endpoint(&self.base, &format!("audio/{audio_file_path}"))
    }
}

fn log_server_error(reply: &AssistantReply) {
    if let Some(error) = &reply.error {
        warn!(%error, "assistant reported an internal error");
    }
}
