//! Crop market data client.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;
use url::Url;

use krishimitra_shared::{AppConfig, KrishiMitraError, Result};

use crate::http::{self, send_json};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: String,
    #[serde(default)]
    pub market: String,
    pub price: f64,
    #[serde(default)]
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub market: String,
    pub price: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub demand: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: String,
    pub predicted_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rising => "Rising",
            Self::Falling => "Falling",
            Self::Stable => "Stable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestMarket {
    pub market: String,
    pub price: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingMarket {
    pub market: String,
    pub price: f64,
    pub price_change: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInsight {
    pub market: String,
    pub current_price: f64,
    pub trend: Trend,
    pub change: f64,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRecommendations {
    pub best_price_market: BestMarket,
    pub trending_market: TrendingMarket,
    pub market_insights: Vec<MarketInsight>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MarketClient {
    client: Client,
    base: Url,
}

impl MarketClient {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base: http::parse_base(base_url)?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(http::client_from_config(config)?, &config.services.market_url)
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = http::endpoint(&self.base, path)?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    #[instrument(skip(self))]
    pub async fn prices(&self, crop: &str, market: &str) -> Result<Vec<PricePoint>> {
        let url = self.url("api/prices", &[("crop", crop), ("market", market)])?;
        send_json(self.client.get(url), "market prices").await
    }

    #[instrument(skip(self))]
    pub async fn comparison(&self, crop: &str) -> Result<Vec<MarketQuote>> {
        let url = self.url("api/market_comparison", &[("crop", crop)])?;
        send_json(self.client.get(url), "market comparison").await
    }

    #[instrument(skip(self))]
    pub async fn forecast(&self, crop: &str, market: &str, days: u32) -> Result<Vec<ForecastPoint>> {
        let days = days.to_string();
        let url = self.url(
            "api/forecast",
            &[("crop", crop), ("market", market), ("days", &days)],
        )?;
        send_json(self.client.get(url), "market forecast").await
    }

    /// Per-market recommendations. The service answers `{"error": ...}` when it
    /// has too little data; that is reported as a failure.
    #[instrument(skip(self))]
    pub async fn recommendations(&self, crop: &str) -> Result<MarketRecommendations> {
        let url = self.url("api/recommendations", &[("crop", crop)])?;
        let body: Value = send_json(self.client.get(url), "market recommendations").await?;

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            return Err(KrishiMitraError::Network(format!(
                "market recommendations: {error}"
            )));
        }

        serde_json::from_value(body)
            .map_err(|e| KrishiMitraError::parse(format!("market recommendations: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prices_and_forecast_query_params() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/prices"))
            .and(wiremock::matchers::query_param("crop", "Wheat"))
            .and(wiremock::matchers::query_param("market", "Wholesale Hub"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"date": "2024-03-01", "market": "Wholesale Hub", "price": 1810.0, "volume": 100},
                {"date": "2024-03-02", "market": "Wholesale Hub", "price": 1825.5, "volume": 100}
            ])))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/forecast"))
            .and(wiremock::matchers::query_param("days", "14"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"date": "2024-03-03", "predicted_price": 1830.25}
            ])))
            .mount(&server)
            .await;

        let client = MarketClient::new(Client::new(), &server.uri()).unwrap();
        let prices = client.prices("Wheat", "Wholesale Hub").await.unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[1].price, 1825.5);

        let forecast = client.forecast("Wheat", "Wholesale Hub", 14).await.unwrap();
        assert_eq!(forecast[0].predicted_price, 1830.25);
    }

    #[tokio::test]
    async fn recommendations_error_body_is_failure() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/recommendations"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"error": "No data available for this crop"})),
            )
            .mount(&server)
            .await;

        let client = MarketClient::new(Client::new(), &server.uri()).unwrap();
        let err = client.recommendations("Quinoa").await.unwrap_err();
        assert!(matches!(err, KrishiMitraError::Network(_)));
    }

    #[tokio::test]
    async fn recommendations_parse() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/recommendations"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "best_price_market": {"market": "Iowa", "price": 4.8, "reason": "Currently offers the highest price for Corn"},
                "trending_market": {"market": "Iowa", "price": 4.8, "price_change": 6.1, "reason": "Prices trending rising over the last 6 months"},
                "market_insights": [{
                    "market": "Iowa", "current_price": 4.8, "trend": "Rising", "change": 6.1,
                    "last_updated": "2024-02-01", "recommendation": "Consider selling now"
                }]
            })))
            .mount(&server)
            .await;

        let client = MarketClient::new(Client::new(), &server.uri()).unwrap();
        let recs = client.recommendations("Corn").await.unwrap();
        assert_eq!(recs.market_insights[0].trend, Trend::Rising);
        assert_eq!(recs.trending_market.price_change, 6.1);
    }
}
