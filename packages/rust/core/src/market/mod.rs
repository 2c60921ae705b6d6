//! Market dashboard: price history, comparison, forecast and recommendations.
//!
//! Each panel is fetched on its own. What happens to a panel whose fetch
//! fails depends on [`FallbackPolicy`]: the failure is shown, or replaced
//! with deterministic synthetic data flagged as such.

pub mod insight;
pub mod synthetic;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, instrument, warn};

use krishimitra_services::{ForecastPoint, MarketClient, MarketQuote, MarketRecommendations, PricePoint};
use krishimitra_shared::{AppConfig, FallbackPolicy, KrishiMitraError, MarketConfig, Result};

use crate::progress::ProgressReporter;

/// Number of price history points shown.
pub const HISTORY_POINTS: usize = 30;

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

/// One dashboard panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    /// Data from the market service.
    Live(T),
    /// Generated locally after the service failed.
    Synthetic(T),
    /// The service failed and no stand-in was generated.
    Failed(String),
}

impl<T> Panel<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Live(data) | Self::Synthetic(data) => Some(data),
            Self::Failed(_) => None,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketDashboard {
    pub crop: String,
    pub market: String,
    pub prices: Panel<Vec<PricePoint>>,
    pub comparison: Panel<Vec<MarketQuote>>,
    pub forecast: Panel<Vec<ForecastPoint>>,
    pub recommendations: Panel<MarketRecommendations>,
}

impl MarketDashboard {
    /// Whether any panel shows generated data.
    pub fn has_synthetic(&self) -> bool {
        self.prices.is_synthetic()
            || self.comparison.is_synthetic()
            || self.forecast.is_synthetic()
            || self.recommendations.is_synthetic()
    }
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

pub struct MarketFlow {
    client: MarketClient,
    config: MarketConfig,
}

impl MarketFlow {
    pub fn new(client: MarketClient, config: MarketConfig) -> Self {
        Self { client, config }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            MarketClient::from_config(config)?,
            config.market.clone(),
        ))
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Load all four panels, one request at a time.
    #[instrument(skip(self, progress))]
    pub async fn dashboard(
        &self,
        crop: &str,
        market: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<MarketDashboard> {
        let crop = crop.trim();
        let market = market.trim();
        if crop.is_empty() || market.is_empty() {
            return Err(KrishiMitraError::validation("crop and market are required"));
        }
        let today = Local::now().date_naive();

        // --- Price history ---
        progress.phase("Loading price history");
        let prices = self.panel(
            "price history",
            self.client.prices(crop, market).await.map(latest),
            || synthetic::price_history(crop, market, today),
            progress,
        );

        // --- Comparison ---
        progress.phase("Comparing markets");
        let comparison = self.panel(
            "market comparison",
            self.client.comparison(crop).await,
            || synthetic::comparison(crop, &self.config.markets),
            progress,
        );

        // --- Forecast ---
        progress.phase("Loading forecast");
        let forecast = self.panel(
            "forecast",
            self.client
                .forecast(crop, market, self.config.forecast_days)
                .await,
            || synthetic::forecast(crop, market, self.config.forecast_days, today),
            progress,
        );

        // --- Recommendations ---
        progress.phase("Loading recommendations");
        let recommendations = self.recommendations_panel(crop, today, progress).await;

        let dashboard = MarketDashboard {
            crop: crop.to_string(),
            market: market.to_string(),
            prices,
            comparison,
            forecast,
            recommendations,
        };

        info!(synthetic = dashboard.has_synthetic(), "market dashboard loaded");
        progress.done(&format!("{crop} at {market}"));
        Ok(dashboard)
    }

    async fn recommendations_panel(
        &self,
        crop: &str,
        today: NaiveDate,
        progress: &dyn ProgressReporter,
    ) -> Panel<MarketRecommendations> {
        let result = self.client.recommendations(crop).await;
        match (result, self.config.fallback) {
            (Ok(recs), _) => Panel::Live(recs),
            (Err(e), FallbackPolicy::Synthesize) => {
                report_failure("recommendations", &e, progress);
                match synthetic::recommendations(crop, &self.config.markets, today) {
                    Some(recs) => Panel::Synthetic(recs),
                    None => Panel::Failed(e.user_message()),
                }
            }
            (Err(e), FallbackPolicy::Surface) => {
                report_failure("recommendations", &e, progress);
                Panel::Failed(e.user_message())
            }
        }
    }

    fn panel<T>(
        &self,
        name: &str,
        result: Result<T>,
        synthesize: impl FnOnce() -> T,
        progress: &dyn ProgressReporter,
    ) -> Panel<T> {
        match result {
            Ok(data) => Panel::Live(data),
            Err(e) => {
                report_failure(name, &e, progress);
                match self.config.fallback {
                    FallbackPolicy::Surface => Panel::Failed(e.user_message()),
                    FallbackPolicy::Synthesize => Panel::Synthetic(synthesize()),
                }
            }
        }
    }
}

fn report_failure(name: &str, error: &KrishiMitraError, progress: &dyn ProgressReporter) {
    warn!(panel = name, error = %error, "market panel failed");
    progress.warn(&format!("{name}: {}", error.user_message()));
}

/// Keep the most recent [`HISTORY_POINTS`] points.
fn latest(mut prices: Vec<PricePoint>) -> Vec<PricePoint> {
    if prices.len() > HISTORY_POINTS {
        prices.drain(..prices.len() - HISTORY_POINTS);
    }
    prices
}
