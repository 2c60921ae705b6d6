//! Shared HTTP plumbing for the service clients.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::Part;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

use krishimitra_shared::{AppConfig, KrishiMitraError, Result};

/// User-Agent string for all outgoing requests.
pub const USER_AGENT: &str = concat!("KrishiMitra/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client with the configured timeout.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| KrishiMitraError::Network(format!("failed to build HTTP client: {e}")))
}

/// Client built from the `[http]` config section.
pub fn client_from_config(config: &AppConfig) -> Result<Client> {
    build_client(config.http.timeout_secs)
}

pub(crate) fn parse_base(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| KrishiMitraError::config(format!("invalid service URL {raw:?}: {e}")))
}

/// Append `path` segments to `base`, keeping any path the base already has.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let mut url = base.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|()| {
            KrishiMitraError::config(format!("service URL cannot be a base: {base}"))
        })?;
        segments
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url)
}

/// Send a request and decode a JSON body, mapping failures to crate errors.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder, what: &str) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| KrishiMitraError::Network(format!("{what}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(KrishiMitraError::Network(format!("{what}: HTTP {status}")));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| KrishiMitraError::parse(format!("{what}: invalid response body: {e}")))
}

/// Send a request and return the body as text.
pub(crate) async fn send_text(request: RequestBuilder, what: &str) -> Result<String> {
    let response = request
        .send()
        .await
        .map_err(|e| KrishiMitraError::Network(format!("{what}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(KrishiMitraError::Network(format!("{what}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| KrishiMitraError::Network(format!("{what}: failed to read body: {e}")))
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

/// Treat an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Accept a string or any JSON value; non-strings are re-serialized so the
/// renderer can sniff them.
pub(crate) fn text_or_json<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

/// A file to send as the multipart `file` field.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Upload {
    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| KrishiMitraError::io(path, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime = mime_for(path).to_string();
        Ok(Self {
            file_name,
            bytes,
            mime,
        })
    }

    pub(crate) fn into_part(self) -> Result<Part> {
        Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime)
            .map_err(|e| KrishiMitraError::validation(format!("invalid upload MIME type: {e}")))
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "webm" => "audio/webm",
        "ogg" => "audio/ogg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path() {
        let base = Url::parse("https://www.googleapis.com/youtube/v3").unwrap();
        assert_eq!(
            endpoint(&base, "search").unwrap().as_str(),
            "https://www.googleapis.com/youtube/v3/search"
        );

        let base = Url::parse("http://localhost:8000/").unwrap();
        assert_eq!(
            endpoint(&base, "/api/weather-alerts").unwrap().as_str(),
            "http://localhost:8000/api/weather-alerts"
        );
    }

    #[test]
    fn parse_base_rejects_garbage() {
        assert!(matches!(
            parse_base("not a url"),
            Err(KrishiMitraError::Config { .. })
        ));
    }

    #[test]
    fn mime_guess() {
        assert_eq!(mime_for(Path::new("leaf.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("voice.wav")), "audio/wav");
        assert_eq!(mime_for(Path::new("blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn upload_from_missing_file_is_io_error() {
        let err = Upload::from_path(Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, KrishiMitraError::Io { .. }));
    }
}
