//! Weather and agronomy advisor client.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use krishimitra_shared::{Alert, AppConfig, Coordinates, KrishiMitraError, Result};

use crate::http::{self, send_json};

/// Body of `POST /api/weather-alerts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherRequest {
    pub lat: f64,
    pub lon: f64,
    pub email: Option<String>,
    pub plant_name: Option<String>,
}

impl WeatherRequest {
    pub fn new(location: Coordinates) -> Self {
        Self {
            lat: location.lat,
            lon: location.lon,
            email: None,
            plant_name: None,
        }
    }
}

/// Current conditions, alerts and free-text advisories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    #[serde(default, deserialize_with = "http::null_as_default")]
    pub temperature: f64,
    #[serde(default, deserialize_with = "http::null_as_default")]
    pub humidity: f64,
    #[serde(default, deserialize_with = "http::null_as_default")]
    pub wind_speed: f64,
    #[serde(default, deserialize_with = "http::null_as_default")]
    pub conditions: String,
    #[serde(default, deserialize_with = "http::null_as_default")]
    pub alerts: Vec<Alert>,
    #[serde(default, deserialize_with = "http::text_or_json")]
    pub soil_management: Option<String>,
    #[serde(default, deserialize_with = "http::text_or_json")]
    pub seasonal_planning: Option<String>,
    #[serde(default, deserialize_with = "http::text_or_json")]
    pub plant_recommendations: Option<String>,
}

/// Client for the weather advisor.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base: Url,
}

impl WeatherClient {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base: http::parse_base(base_url)?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(http::client_from_config(config)?, &config.services.weather_url)
    }

    /// Fetch conditions and advisories for a location.
    ///
    /// The advisor reports its own failures as `{"error", "details"}` with a
    /// 200 status; those become [`KrishiMitraError::Network`].
    #[instrument(skip_all, fields(lat = request.lat, lon = request.lon))]
    pub async fn weather_alerts(&self, request: &WeatherRequest) -> Result<WeatherReport> {
        let url = http::endpoint(&self.base, "api/weather-alerts")?;
        let body: Value =
            send_json(self.client.post(url).json(request), "weather alerts").await?;

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            let details = body.get("details").and_then(Value::as_str).unwrap_or_default();
            return Err(KrishiMitraError::Network(format!(
                "weather alerts: {error} {details}"
            )));
        }

        let report: WeatherReport = serde_json::from_value(body)
            .map_err(|e| KrishiMitraError::parse(format!("weather alerts: {e}")))?;

        debug!(
            temperature = report.temperature,
            alerts = report.alerts.len(),
            "weather report received"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krishimitra_shared::AlertSeverity;

    #[tokio::test]
    async fn weather_alerts_sends_camel_case_body() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/weather-alerts"))
            .and(wiremock::matchers::body_json(serde_json::json!({
                "lat": 28.6139, "lon": 77.209, "email": "asha@example.com", "plantName": "Wheat"
            })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "temperature": 36.5,
                "humidity": null,
                "windSpeed": 4.1,
                "conditions": "clear sky",
                "alerts": [{"type": "warning", "message": "High temperature alert: 36.5°C."}],
                "soilManagement": "pH adjustment: add lime"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = WeatherClient::new(Client::new(), &server.uri()).unwrap();
        let request = WeatherRequest {
            email: Some("asha@example.com".into()),
            plant_name: Some("Wheat".into()),
            ..WeatherRequest::new(Coordinates::new(28.6139, 77.209))
        };
        let report = client.weather_alerts(&request).await.unwrap();

        assert_eq!(report.temperature, 36.5);
        assert_eq!(report.humidity, 0.0);
        assert_eq!(report.alerts[0].severity, AlertSeverity::Warning);
        assert_eq!(report.soil_management.as_deref(), Some("pH adjustment: add lime"));
        assert_eq!(report.seasonal_planning, None);
    }

    #[tokio::test]
    async fn error_body_is_network_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/weather-alerts"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "Failed to process weather alert",
                "details": "upstream timeout"
            })))
            .mount(&server)
            .await;

        let client = WeatherClient::new(Client::new(), &server.uri()).unwrap();
        let err = client
            .weather_alerts(&WeatherRequest::new(Coordinates::new(0.0, 0.0)))
            .await
            .unwrap_err();
        match err {
            KrishiMitraError::Network(msg) => assert!(msg.contains("upstream timeout")),
            other => panic!("expected network error, got {other:?}"),
        }
    }
}
