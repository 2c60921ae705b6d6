//! Assistant conversation state.

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use krishimitra_services::{AssistantClient, AssistantReply, Upload};
use krishimitra_shared::Result;

pub const WELCOME_MESSAGE: &str =
    "Hello! I'm KrishiMitra+ AI assistant. How can I help you today with your crops?";
pub const ERROR_MESSAGE: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";

/// Starter prompts offered before the first question.
pub const SUGGESTIONS: [&str; 3] = [
    "How to identify tomato leaf disease?",
    "Best practices for rice cultivation",
    "How to protect crops from pests?",
];

const VOICE_PLACEHOLDER: &str = "Voice message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Local>,
    /// Synthesized speech for a bot reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl ChatMessage {
    fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            timestamp: Local::now(),
            audio_url: None,
        }
    }

    fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            timestamp: Local::now(),
            audio_url: None,
        }
    }

    /// `HH:MM`, as shown next to each message.
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

/// A conversation with the assistant. Errors never escape: a failed call
/// becomes an inline bot message.
pub struct Conversation {
    client: AssistantClient,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(client: AssistantClient) -> Self {
        Self {
            client,
            messages: vec![ChatMessage::bot(WELCOME_MESSAGE)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Suggestions are only offered until the user has said something.
    pub fn suggestions(&self) -> &'static [&'static str] {
        if self.messages.iter().any(|m| m.sender == Sender::User) {
            &[]
        } else {
            &SUGGESTIONS
        }
    }

    /// Send a text message and append the reply. Blank input is ignored and
    /// returns `None`.
    #[instrument(skip_all)]
    pub async fn send(&mut self, text: &str) -> Option<&ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            debug!("blank message ignored");
            return None;
        }

        self.messages.push(ChatMessage::user(text));
        let outcome = self.client.chat(text).await;
        Some(self.push_reply(outcome))
    }

    /// Send recorded audio. The transcription, when the server returns one,
    /// stands in for the user's message.
    #[instrument(skip_all, fields(file = %audio.file_name))]
    pub async fn send_voice(&mut self, audio: Upload) -> &ChatMessage {
        let outcome = self.client.voice_input(audio).await;

        let said = outcome
            .as_ref()
            .ok()
            .and_then(|r| r.transcribed_text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(VOICE_PLACEHOLDER)
            .to_string();
        self.messages.push(ChatMessage::user(said));

        self.push_reply(outcome)
    }

    /// Drop local history back to the welcome message and clear server state.
    pub async fn reset(&mut self) {
        self.messages = vec![ChatMessage::bot(WELCOME_MESSAGE)];
        self.client.reset().await;
    }

    fn push_reply(&mut self, outcome: Result<AssistantReply>) -> &ChatMessage {
        let message = match outcome {
            Ok(reply) => {
                let audio_url = reply
                    .audio_file_path
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .and_then(|p| match self.client.audio_url(p) {
                        Ok(url) => Some(url.to_string()),
                        Err(e) => {
                            warn!(error = %e, "audio url unusable");
                            None
                        }
                    });
                ChatMessage {
                    audio_url,
                    ..ChatMessage::bot(reply.text_response)
                }
            }
            Err(e) => {
                warn!(error = %e, "assistant call failed");
                ChatMessage::bot(ERROR_MESSAGE)
            }
        };

        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(server: &wiremock::MockServer) -> Conversation {
        Conversation::new(AssistantClient::new(reqwest::Client::new(), &server.uri()).unwrap())
    }

    #[tokio::test]
    async fn starts_with_welcome_and_suggestions() {
        let server = wiremock::MockServer::start().await;
        let chat = conversation(&server);
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].text, WELCOME_MESSAGE);
        assert_eq!(chat.messages()[0].sender, Sender::Bot);
        assert_eq!(chat.suggestions().len(), 3);
    }

    #[tokio::test]
    async fn blank_message_is_ignored() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut chat = conversation(&server);
        assert!(chat.send("   \n").await.is_none());
        assert_eq!(chat.messages().len(), 1);
    }

    #[tokio::test]
    async fn reply_carries_audio_url() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text_response": "Use neem oil spray.",
                "audio_file_path": "reply_7.mp3"
            })))
            .mount(&server)
            .await;

        let mut chat = conversation(&server);
        let reply = chat.send("aphids on chilli").await.unwrap().clone();

        assert_eq!(reply.text, "Use neem oil spray.");
        assert_eq!(
            reply.audio_url,
            Some(format!("{}/audio/reply_7.mp3", server.uri()))
        );
        assert_eq!(chat.messages().len(), 3);
        assert_eq!(chat.messages()[1].sender, Sender::User);
        assert!(chat.suggestions().is_empty());
    }

    #[tokio::test]
    async fn failure_appends_inline_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut chat = conversation(&server);
        let reply = chat.send("hello").await.unwrap();
        assert_eq!(reply.text, ERROR_MESSAGE);
        assert_eq!(reply.audio_url, None);
    }

    #[tokio::test]
    async fn voice_uses_transcription() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/voice-input"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text_response": "Sow after the first rains.",
                "transcribed_text": "when to sow millet",
                "audio_file_path": null
            })))
            .mount(&server)
            .await;

        let mut chat = conversation(&server);
        let audio = Upload {
            file_name: "question.webm".into(),
            bytes: vec![1, 2, 3],
            mime: "audio/webm".into(),
        };
        chat.send_voice(audio).await;

        assert_eq!(chat.messages()[1].text, "when to sow millet");
        assert_eq!(chat.messages()[2].text, "Sow after the first rains.");
        assert_eq!(chat.messages()[2].audio_url, None);
    }

    #[tokio::test]
    async fn reset_restores_welcome_and_calls_server() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text_response": "ok"})),
            )
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/reset"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut chat = conversation(&server);
        chat.send("hi").await;
        chat.reset().await;

        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].text, WELCOME_MESSAGE);
    }
}
