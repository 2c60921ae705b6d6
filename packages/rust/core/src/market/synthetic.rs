//! Deterministic stand-in market data.
//!
//! Every series is drawn from an RNG seeded with a SHA-256 of the crop, the
//! market and the panel, so the same request always yields the same numbers.

use chrono::{NaiveDate, TimeDelta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use krishimitra_services::{ForecastPoint, MarketQuote, MarketRecommendations, PricePoint};

use super::insight::{insight, round1, summarize};

const DEFAULT_BASE_PRICE: f64 = 2000.0;
const DEFAULT_MARKET_FACTOR: f64 = 1.1;
const HISTORY_DAYS: i64 = 30;
const NOISE: f64 = 50.0;

/// Reference price per crop, per quintal.
pub fn base_price(crop: &str) -> f64 {
    match crop.to_lowercase().as_str() {
        "wheat" => 1800.0,
        "rice" => 2200.0,
        "corn" => 1600.0,
        "soybeans" => 3500.0,
        "potatoes" => 1200.0,
        _ => DEFAULT_BASE_PRICE,
    }
}

/// Relative price level of a market type.
pub fn market_factor(market: &str) -> f64 {
    match market.to_lowercase().as_str() {
        "local market" => 0.9,
        "wholesale hub" => 1.0,
        "export terminal" => 1.15,
        "processing plant" => 1.05,
        _ => DEFAULT_MARKET_FACTOR,
    }
}

fn rng(parts: &[&str]) -> StdRng {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.to_lowercase().as_bytes());
        hasher.update([0]);
    }
    let digest = hasher.finalize();
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest);
    StdRng::from_seed(seed)
}

fn date(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Thirty daily points ending yesterday.
pub fn price_history(crop: &str, market: &str, today: NaiveDate) -> Vec<PricePoint> {
    let mut rng = rng(&[crop, market, "history"]);
    let base = base_price(crop) * market_factor(market);

    (1..=HISTORY_DAYS)
        .rev()
        .map(|days_ago| {
            let drift = 1.0 + days_ago as f64 / 100.0;
            PricePoint {
                date: date(today - TimeDelta::days(days_ago)),
                market: market.to_string(),
                price: round2(base * (0.9 + rng.random::<f64>() * 0.2) * drift),
                volume: (100.0 + rng.random::<f64>() * 400.0).round(),
            }
        })
        .collect()
}

/// One quote per market.
pub fn comparison(crop: &str, markets: &[String]) -> Vec<MarketQuote> {
    let base = base_price(crop);

    markets
        .iter()
        .map(|market| {
            let mut rng = rng(&[crop, market.as_str(), "comparison"]);
            let price = round2(base * market_factor(market) * (0.95 + rng.random::<f64>() * 0.1));
            let volume = (100.0 + rng.random::<f64>() * 500.0).round();
            let demand = match rng.random::<f64>() {
                r if r > 0.6 => "High",
                r if r > 0.3 => "Medium",
                _ => "Low",
            };
            MarketQuote {
                market: market.clone(),
                price,
                volume,
                demand: Some(demand.to_string()),
            }
        })
        .collect()
}

/// A bounded random walk starting tomorrow. The price is kept within
/// 70%-130% of the crop's base price and turns back at either bound.
pub fn forecast(crop: &str, market: &str, days: u32, today: NaiveDate) -> Vec<ForecastPoint> {
    let mut rng = rng(&[crop, market, "forecast"]);
    let base = base_price(crop);
    let (floor, ceiling) = (base * 0.7, base * 1.3);

    let mut price = base * market_factor(market);
    let mut direction = if rng.random_bool(0.5) { 1.0 } else { -1.0 };

    (1..=days)
        .map(|day| {
            price += direction * (day as f64 * 5.0) + rng.random_range(-NOISE..=NOISE);
            if price < floor {
                price = floor;
                direction = 1.0;
            } else if price > ceiling {
                price = ceiling;
                direction = -1.0;
            }
            ForecastPoint {
                date: date(today + TimeDelta::days(i64::from(day))),
                predicted_price: price.round(),
            }
        })
        .collect()
}

/// Per-market insights from a random monthly change of at most 10%.
pub fn recommendations(crop: &str, markets: &[String], today: NaiveDate) -> Option<MarketRecommendations> {
    let base = base_price(crop);

    let insights = markets
        .iter()
        .map(|market| {
            let mut rng = rng(&[crop, market.as_str(), "recommendations"]);
            let change = round1(rng.random_range(-10.0..=10.0));
            let current = (base * market_factor(market) * (1.0 + change / 100.0)).round();
            insight(market, current, change, Some(date(today)))
        })
        .collect();

    summarize(crop, insights)
}
