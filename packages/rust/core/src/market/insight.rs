//! Trend classification and per-market recommendations.

use krishimitra_services::{
    BestMarket, MarketInsight, MarketRecommendations, PricePoint, Trend, TrendingMarket,
};

/// Change (in percent) beyond which a price counts as moving.
const TREND_THRESHOLD: f64 = 2.0;
/// Change beyond which the advice becomes urgent.
const STRONG_THRESHOLD: f64 = 5.0;

/// Percentage change from `first` to `last`. A zero start yields zero.
pub fn change_pct(first: f64, last: f64) -> f64 {
    if first == 0.0 {
        0.0
    } else {
        (last - first) / first * 100.0
    }
}

pub fn classify_trend(change: f64) -> Trend {
    if change > TREND_THRESHOLD {
        Trend::Rising
    } else if change < -TREND_THRESHOLD {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

pub fn advice(trend: Trend, change: f64) -> &'static str {
    match trend {
        Trend::Rising if change > STRONG_THRESHOLD => "Consider selling now",
        Trend::Rising => "Hold if possible",
        Trend::Falling if change < -STRONG_THRESHOLD => "Sell quickly",
        _ => "Standard market conditions",
    }
}

pub fn insight(market: &str, current_price: f64, change: f64, last_updated: Option<String>) -> MarketInsight {
    let trend = classify_trend(change);
    MarketInsight {
        market: market.to_string(),
        current_price,
        trend,
        change,
        recommendation: advice(trend, change).to_string(),
        last_updated,
    }
}

/// Analyse a mixed price history: one insight per market, in first-seen
/// order, each measured from its earliest to its latest point.
pub fn analyze(crop: &str, history: &[PricePoint]) -> Option<MarketRecommendations> {
    let mut series: Vec<(&str, Vec<&PricePoint>)> = Vec::new();
    for point in history {
        match series.iter_mut().find(|(m, _)| *m == point.market) {
            Some((_, points)) => points.push(point),
            None => series.push((point.market.as_str(), vec![point])),
        }
    }

    let insights = series
        .into_iter()
        .filter_map(|(market, mut points)| {
            // ISO dates order lexicographically.
            points.sort_by(|a, b| a.date.cmp(&b.date));
            let first = points.first()?;
            let last = points.last()?;
            let change = round1(change_pct(first.price, last.price));
            Some(insight(market, last.price, change, Some(last.date.clone())))
        })
        .collect();

    summarize(crop, insights)
}

/// Pick the best-price and trending markets. `None` for no insights.
pub fn summarize(crop: &str, insights: Vec<MarketInsight>) -> Option<MarketRecommendations> {
    let best = insights
        .iter()
        .max_by(|a, b| a.current_price.total_cmp(&b.current_price))?;
    let trending = insights
        .iter()
        .max_by(|a, b| a.change.abs().total_cmp(&b.change.abs()))?;

    Some(MarketRecommendations {
        best_price_market: BestMarket {
            market: best.market.clone(),
            price: best.current_price,
            reason: format!("Currently offers the highest price for {crop}"),
        },
        trending_market: TrendingMarket {
            market: trending.market.clone(),
            price: trending.current_price,
            price_change: trending.change,
            reason: format!(
                "Prices trending {} over the last month",
                trending.trend.as_str().to_lowercase()
            ),
        },
        market_insights: insights,
    })
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
