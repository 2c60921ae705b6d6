//! Plain-terminal rendering of blocks, views and flow results.
//!
//! Everything renders into a `String` so the layout can be tested without a
//! terminal.

use std::fmt::Write;

use krishimitra_core::{AdvisoryReport, ChatMessage, Diagnosis, DiagnosisOutcome, MarketDashboard, Panel, Sender};
use krishimitra_markdown::{
    Advisory, AdvisoryView, Block, ListItem, RecommendationView, Treatment, TreatmentPlan,
};
use krishimitra_shared::AlertSeverity;

// ---------------------------------------------------------------------------
// Rendering pipeline output
// ---------------------------------------------------------------------------

pub(crate) fn blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Heading(text) => {
                let _ = writeln!(out, "\n{}\n{}", text.to_uppercase(), "=".repeat(text.chars().count()));
            }
            Block::Subheading(text) => {
                let _ = writeln!(out, "\n{text}\n{}", "-".repeat(text.chars().count()));
            }
            Block::List(items) => {
                for item in items {
                    match item {
                        ListItem::Plain(text) => {
                            let _ = writeln!(out, "  • {text}");
                        }
                        ListItem::Emphasized { lead, bold, rest } => {
                            let _ = writeln!(out, "  • {lead}{}{rest}", bold.to_uppercase());
                        }
                    }
                }
            }
            Block::Paragraph(text) => {
                let _ = writeln!(out, "{text}");
            }
        }
    }
    out
}

pub(crate) fn recommendation(view: &RecommendationView) -> String {
    match view {
        RecommendationView::Structured(plan) => treatment_plan(plan),
        RecommendationView::Blocks(parsed) => blocks(parsed),
        RecommendationView::Text(text) => format!("{text}\n"),
    }
}

fn treatment_plan(plan: &TreatmentPlan) -> String {
    let mut out = String::new();
    if let Some(description) = &plan.description {
        let _ = writeln!(out, "Description\n  {description}");
    }
    bullet_section(&mut out, "Symptoms", &plan.symptoms);
    match &plan.treatment {
        Some(Treatment::Text(text)) => {
            let _ = writeln!(out, "Treatment\n  {text}");
        }
        Some(Treatment::Steps(steps)) => {
            let _ = writeln!(out, "Treatment");
            for (n, step) in steps.iter().enumerate() {
                match &step.title {
                    Some(title) => {
                        let _ = writeln!(out, "  {}. {title}: {}", n + 1, step.description);
                    }
                    None => {
                        let _ = writeln!(out, "  {}. {}", n + 1, step.description);
                    }
                }
            }
        }
        None => {}
    }
    bullet_section(&mut out, "Prevention", &plan.prevention);
    bullet_section(&mut out, "Additional care", &plan.additional_care);
    out
}

fn bullet_section(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}");
    for item in items {
        let _ = writeln!(out, "  • {item}");
    }
}

pub(crate) fn advisory(view: &AdvisoryView) -> String {
    let mut out = String::new();
    match view {
        AdvisoryView::Fallback(parsed) => out.push_str(&blocks(parsed)),
        AdvisoryView::Structured(Advisory::Soil(section)) => {
            for (key, value) in section.iter() {
                let _ = writeln!(out, "  {}: {value}", humanize(key));
            }
        }
        AdvisoryView::Structured(Advisory::Seasonal(seasons)) => {
            for season in seasons {
                match &season.period {
                    Some(period) => {
                        let _ = writeln!(out, "  {} ({period})", season.name);
                    }
                    None => {
                        let _ = writeln!(out, "  {}", season.name);
                    }
                }
                optional_line(&mut out, "Crops", season.crops.as_deref());
                optional_line(&mut out, "Preparations", season.preparations.as_deref());
                optional_line(&mut out, "Challenges", season.challenges.as_deref());
            }
        }
        AdvisoryView::Structured(Advisory::Plants(plants)) => {
            for plant in plants {
                let _ = writeln!(out, "  {}", plant.name);
                optional_line(&mut out, "Suitability", plant.suitability.as_deref());
                optional_line(&mut out, "Care tip", plant.care_tip.as_deref());
                optional_line(&mut out, "Soil requirements", plant.soil_requirements.as_deref());
                optional_line(&mut out, "Soil preparation", plant.soil_prep.as_deref());
            }
        }
    }
    out
}

fn optional_line(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value {
        let _ = writeln!(out, "      {label}: {value}");
    }
}

/// `ph_adjustment` becomes `Ph adjustment`.
fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Flow results
// ---------------------------------------------------------------------------

pub(crate) fn diagnosis(result: &Diagnosis) -> String {
    let mut out = format!(
        "Disease:    {}\nConfidence: {:.2}%\n\n",
        result.display_label, result.confidence
    );
    match &result.outcome {
        DiagnosisOutcome::Healthy => out.push_str("The plant looks healthy. No treatment needed.\n"),
        DiagnosisOutcome::Treatment(view) => out.push_str(&recommendation(view)),
    }
    out
}

pub(crate) fn advisory_report(report: &AdvisoryReport) -> String {
    let mut out = String::new();
    let place = report
        .location
        .place_name
        .clone()
        .unwrap_or_else(|| report.location.coordinates.to_string());
    let _ = writeln!(out, "Location:    {place}");
    let _ = writeln!(out, "Temperature: {:.1}°C", report.temperature);
    let _ = writeln!(out, "Humidity:    {:.0}%", report.humidity);
    let _ = writeln!(out, "Wind:        {:.1} m/s", report.wind_speed);
    if !report.conditions.is_empty() {
        let _ = writeln!(out, "Conditions:  {}", report.conditions);
    }

    let _ = writeln!(out, "\nAlerts");
    for alert in &report.alerts {
        let tag = match alert.severity {
            AlertSeverity::Warning => "!",
            AlertSeverity::Info => "i",
            AlertSeverity::Default => "-",
        };
        let _ = writeln!(out, "  [{tag}] {}", alert.message);
    }

    for (title, view) in [
        ("Soil management", &report.soil),
        ("Seasonal planning", &report.seasonal),
        ("Plant recommendations", &report.plants),
    ] {
        if let Some(view) = view {
            let _ = writeln!(out, "\n{title}");
            out.push_str(&advisory(view));
        }
    }
    out
}

pub(crate) fn chat_message(message: &ChatMessage) -> String {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Bot => "krishimitra",
    };
    let mut out = format!("[{}] {who}: {}\n", message.time_label(), message.text);
    if let Some(url) = &message.audio_url {
        let _ = writeln!(out, "        audio: {url}");
    }
    out
}

pub(crate) fn dashboard(dashboard: &MarketDashboard) -> String {
    let mut out = format!("{} at {}\n", dashboard.crop, dashboard.market);

    panel(&mut out, "Price history", &dashboard.prices, |out, prices| {
        for point in prices {
            let _ = writeln!(out, "  {}  {:>10.2}  vol {:.0}", point.date, point.price, point.volume);
        }
    });
    panel(&mut out, "Market comparison", &dashboard.comparison, |out, quotes| {
        for quote in quotes {
            let _ = writeln!(
                out,
                "  {:<18} {:>10.2}  vol {:<5.0} demand {}",
                quote.market,
                quote.price,
                quote.volume,
                quote.demand.as_deref().unwrap_or("-")
            );
        }
    });
    panel(&mut out, "Forecast", &dashboard.forecast, |out, points| {
        for point in points {
            let _ = writeln!(out, "  {}  {:>10.0}", point.date, point.predicted_price);
        }
    });
    panel(&mut out, "Recommendations", &dashboard.recommendations, |out, recs| {
        let best = &recs.best_price_market;
        let trending = &recs.trending_market;
        let _ = writeln!(out, "  Best price: {} ({:.2}) {}", best.market, best.price, best.reason);
        let _ = writeln!(
            out,
            "  Trending:   {} ({:+.1}%) {}",
            trending.market, trending.price_change, trending.reason
        );
        for insight in &recs.market_insights {
            let _ = writeln!(
                out,
                "  {:<18} {:>10.2}  {:<8} {:+.1}%  {}",
                insight.market,
                insight.current_price,
                insight.trend.as_str(),
                insight.change,
                insight.recommendation
            );
        }
    });
    out
}

fn panel<T>(out: &mut String, title: &str, panel: &Panel<T>, body: impl FnOnce(&mut String, &T)) {
    match panel {
        Panel::Live(data) => {
            let _ = writeln!(out, "\n{title}");
            body(out, data);
        }
        Panel::Synthetic(data) => {
            let _ = writeln!(out, "\n{title} (synthetic data, service unavailable)");
            body(out, data);
        }
        Panel::Failed(error) => {
            let _ = writeln!(out, "\n{title}\n  unavailable: {error}");
        }
    }
}
