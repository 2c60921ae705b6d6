//! Application configuration for KrishiMitra+.
//!
//! User config lives at `~/.krishimitra/krishimitra.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file; only the names of the env vars
//! that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{KrishiMitraError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "krishimitra.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".krishimitra";

// ---------------------------------------------------------------------------
// Config structs (matching krishimitra.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Base URLs of external collaborators.
    #[serde(default)]
    pub services: ServicesConfig,

    /// Env var names holding third-party API keys.
    #[serde(default)]
    pub api_keys: ApiKeysConfig,

    /// Weather dashboard settings.
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Market analytics settings.
    #[serde(default)]
    pub market: MarketConfig,

    /// Outbound HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port the backend listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Frontend origin allowed by CORS.
    #[serde(default = "default_client_url")]
    pub client_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            client_url: default_client_url(),
        }
    }
}

impl ServerConfig {
    /// Apply `PORT` and `CLIENT_URL` overrides from the environment.
    ///
    /// An unparsable `PORT` is ignored and the configured value kept.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Ok(url) = std::env::var("CLIENT_URL") {
            if !url.trim().is_empty() {
                self.client_url = url;
            }
        }
        self
    }

    /// The CORS origin as browsers send it (no trailing slash).
    pub fn cors_origin(&self) -> &str {
        self.client_url.trim_end_matches('/')
    }
}

fn default_port() -> u16 {
    5001
}
fn default_client_url() -> String {
    "http://localhost:5173/".into()
}

/// `[services]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Plant disease model server.
    #[serde(default = "default_disease_url")]
    pub disease_url: String,

    /// Chat/voice assistant backend.
    #[serde(default = "default_assistant_url")]
    pub assistant_url: String,

    /// Weather alerts / agronomy advisor.
    #[serde(default = "default_weather_url")]
    pub weather_url: String,

    /// Market analytics backend.
    #[serde(default = "default_market_url")]
    pub market_url: String,

    /// Nominatim-compatible geocoder.
    #[serde(default = "default_geocode_url")]
    pub geocode_url: String,

    /// News search API.
    #[serde(default = "default_news_url")]
    pub news_url: String,

    /// Video search API.
    #[serde(default = "default_video_url")]
    pub video_url: String,

    /// Plant disease blog listing page.
    #[serde(default = "default_blog_url")]
    pub blog_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            disease_url: default_disease_url(),
            assistant_url: default_assistant_url(),
            weather_url: default_weather_url(),
            market_url: default_market_url(),
            geocode_url: default_geocode_url(),
            news_url: default_news_url(),
            video_url: default_video_url(),
            blog_url: default_blog_url(),
        }
    }
}

fn default_disease_url() -> String {
    "http://localhost:8000".into()
}
fn default_assistant_url() -> String {
    "http://localhost:8001".into()
}
fn default_weather_url() -> String {
    "http://127.0.0.1:8002".into()
}
fn default_market_url() -> String {
    "http://localhost:5000".into()
}
fn default_geocode_url() -> String {
    "https://nominatim.openstreetmap.org".into()
}
fn default_news_url() -> String {
    "https://newsapi.org".into()
}
fn default_video_url() -> String {
    "https://www.googleapis.com/youtube/v3".into()
}
fn default_blog_url() -> String {
    "https://www.gardeningknowhow.com/plant-problems/disease".into()
}

/// `[api_keys]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    /// Name of the env var holding the news API key.
    #[serde(default = "default_news_key_env")]
    pub news_api_key_env: String,

    /// Name of the env var holding the video search API key.
    #[serde(default = "default_video_key_env")]
    pub video_api_key_env: String,
}

impl Default for ApiKeysConfig {
    fn default() -> Self {
        Self {
            news_api_key_env: default_news_key_env(),
            video_api_key_env: default_video_key_env(),
        }
    }
}

fn default_news_key_env() -> String {
    "NEWS_API_KEY".into()
}
fn default_video_key_env() -> String {
    "YOUTUBE_API_KEY".into()
}

/// `[weather]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Seconds between dashboard refreshes.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
        }
    }
}

fn default_poll_interval() -> u64 {
    300
}

/// What to do when a market panel fetch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Report the failure to the user.
    #[default]
    Surface,
    /// Replace the failed panel with flagged synthetic data.
    Synthesize,
}

/// `[market]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Behaviour on fetch failure.
    #[serde(default)]
    pub fallback: FallbackPolicy,

    /// Crops offered in the dashboard.
    #[serde(default = "default_crops")]
    pub crops: Vec<String>,

    /// Markets offered in the dashboard.
    #[serde(default = "default_markets")]
    pub markets: Vec<String>,

    /// Forecast horizon in days.
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackPolicy::default(),
            crops: default_crops(),
            markets: default_markets(),
            forecast_days: default_forecast_days(),
        }
    }
}

fn default_crops() -> Vec<String> {
    ["Wheat", "Rice", "Corn", "Soybeans", "Potatoes"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_markets() -> Vec<String> {
    [
        "Local Market",
        "Wholesale Hub",
        "Export Terminal",
        "Processing Plant",
        "Farmers Market",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_forecast_days() -> u32 {
    14
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.krishimitra/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| KrishiMitraError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.krishimitra/krishimitra.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| KrishiMitraError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        KrishiMitraError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| KrishiMitraError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| KrishiMitraError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| KrishiMitraError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the named env var, failing if it is unset or empty.
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(KrishiMitraError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}
