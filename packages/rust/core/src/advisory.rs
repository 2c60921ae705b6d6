//! Location-based weather advisory and the background poller.
//!
//! A location is resolved once per request (place name, explicit
//! coordinates, or the session), then the advisor is queried and its
//! free-text sections are rendered through the extractor registry.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use krishimitra_markdown::{AdvisoryKind, AdvisoryView, ExtractorRegistry};
use krishimitra_services::{GeocodeClient, WeatherClient, WeatherReport, WeatherRequest};
use krishimitra_shared::{
    Alert, AlertSeverity, AppConfig, Coordinates, KrishiMitraError, Result, SessionContext,
};

pub const LOCATION_UNAVAILABLE: &str =
    "Unable to get location. Please enable location services or enter location manually.";
pub const PLACE_NOT_FOUND: &str =
    "Could not find the specified location. Please try a different search term.";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Request / report
// ---------------------------------------------------------------------------

/// What the user asked for. At most one of `place` and `coordinates` is
/// normally set; `place` wins when both are.
#[derive(Debug, Clone, Default)]
pub struct AdvisoryRequest {
    pub place: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub plant_name: Option<String>,
}

/// A location the advisor can be queried for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub coordinates: Coordinates,
    /// Geocoder display name when the location came from a place search.
    pub place_name: Option<String>,
}

/// Everything needed to repeat the same advisory query.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryTarget {
    pub location: ResolvedLocation,
    pub plant_name: Option<String>,
    pub email: Option<String>,
}

impl AdvisoryTarget {
    fn weather_request(&self) -> WeatherRequest {
        WeatherRequest {
            email: self.email.clone(),
            plant_name: self.plant_name.clone(),
            ..WeatherRequest::new(self.location.coordinates)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryReport {
    pub location: ResolvedLocation,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub conditions: String,
    /// Never empty: a favorable-conditions notice stands in for no alerts.
    pub alerts: Vec<Alert>,
    pub soil: Option<AdvisoryView>,
    pub seasonal: Option<AdvisoryView>,
    pub plants: Option<AdvisoryView>,
}

/// The notice shown when the advisor reports no alerts.
pub fn favorable_alert(plant_name: Option<&str>) -> Alert {
    let subject = plant_name
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or("crops");
    Alert {
        severity: AlertSeverity::Info,
        message: format!("Weather conditions are currently favorable for your {subject}."),
    }
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

pub struct AdvisoryFlow {
    weather: WeatherClient,
    geocoder: GeocodeClient,
    extractors: ExtractorRegistry,
}

impl AdvisoryFlow {
    pub fn new(weather: WeatherClient, geocoder: GeocodeClient) -> Self {
        Self {
            weather,
            geocoder,
            extractors: ExtractorRegistry::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            WeatherClient::from_config(config)?,
            GeocodeClient::from_config(config)?,
        ))
    }

    /// Replace the extractor registry used for the free-text sections.
    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    /// Pick the location: a place name (geocoded), then explicit
    /// coordinates, then whatever the session already knows.
    ///
    /// A resolved location is written back into `session`.
    #[instrument(skip_all, fields(place = request.place.as_deref()))]
    pub async fn resolve_location(
        &self,
        request: &AdvisoryRequest,
        session: &mut SessionContext,
    ) -> Result<ResolvedLocation> {
        let place = request
            .place
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());

        let resolved = if let Some(place) = place {
            let found = self
                .geocoder
                .geocode(place)
                .await?
                .ok_or_else(|| KrishiMitraError::validation(PLACE_NOT_FOUND))?;
            ResolvedLocation {
                coordinates: found.coordinates,
                place_name: found.display_name.or_else(|| Some(place.to_string())),
            }
        } else if let Some(coordinates) = request.coordinates {
            if !coordinates.is_valid() {
                return Err(KrishiMitraError::validation(format!(
                    "coordinates out of range: {coordinates}"
                )));
            }
            ResolvedLocation {
                coordinates,
                place_name: None,
            }
        } else {
            let coordinates = session
                .location
                .ok_or_else(|| KrishiMitraError::permission_denied(LOCATION_UNAVAILABLE))?;
            ResolvedLocation {
                coordinates,
                place_name: None,
            }
        };

        session.location = Some(resolved.coordinates);
        debug!(coordinates = %resolved.coordinates, "location resolved");
        Ok(resolved)
    }

    /// Resolve the location and fetch one advisory.
    pub async fn advise(
        &self,
        request: &AdvisoryRequest,
        session: &mut SessionContext,
    ) -> Result<(AdvisoryTarget, AdvisoryReport)> {
        let location = self.resolve_location(request, session).await?;
        let target = AdvisoryTarget {
            location,
            plant_name: request.plant_name.clone(),
            email: session.alert_email().map(String::from),
        };
        let report = self.fetch(&target).await?;
        Ok((target, report))
    }

    /// Query the advisor for an already-resolved target.
    #[instrument(skip_all, fields(coordinates = %target.location.coordinates))]
    pub async fn fetch(&self, target: &AdvisoryTarget) -> Result<AdvisoryReport> {
        let report = self.weather.weather_alerts(&target.weather_request()).await?;
        info!(alerts = report.alerts.len(), "advisory fetched");
        Ok(self.assemble(target, report))
    }

    fn assemble(&self, target: &AdvisoryTarget, report: WeatherReport) -> AdvisoryReport {
        let alerts = if report.alerts.is_empty() {
            vec![favorable_alert(target.plant_name.as_deref())]
        } else {
            report.alerts
        };

        let render = |kind: AdvisoryKind, text: Option<String>| {
            text.filter(|t| !t.trim().is_empty())
                .map(|t| self.extractors.render(kind, &t))
        };

        AdvisoryReport {
            location: target.location.clone(),
            temperature: report.temperature,
            humidity: report.humidity,
            wind_speed: report.wind_speed,
            conditions: report.conditions,
            alerts,
            soil: render(AdvisoryKind::Soil, report.soil_management),
            seasonal: render(AdvisoryKind::Seasonal, report.seasonal_planning),
            plants: render(AdvisoryKind::Plants, report.plant_recommendations),
        }
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Re-issues the same advisory query on a fixed interval.
///
/// Polls run one after another inside the calling task, so a slow response
/// delays the next tick instead of overlapping it.
pub struct WeatherPoller<'a> {
    flow: &'a AdvisoryFlow,
    target: AdvisoryTarget,
    interval: Duration,
}

impl<'a> WeatherPoller<'a> {
    pub fn new(flow: &'a AdvisoryFlow, target: AdvisoryTarget, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            interval
        };
        Self {
            flow,
            target,
            interval,
        }
    }

    pub fn from_config(flow: &'a AdvisoryFlow, target: AdvisoryTarget, config: &AppConfig) -> Self {
        Self::new(
            flow,
            target,
            Duration::from_secs(config.weather.poll_interval_secs),
        )
    }

    /// Poll until `shutdown` resolves. The first poll fires one interval
    /// after the start.
    ///
    /// Every outcome, success or failure, is handed to `on_report`; a failed
    /// poll does not stop the loop. Shutdown also abandons a poll in flight.
    /// Returns the number of completed polls.
    #[instrument(skip_all, fields(interval_secs = self.interval.as_secs()))]
    pub async fn run<F, S>(self, mut on_report: F, shutdown: S) -> usize
    where
        F: FnMut(Result<AdvisoryReport>),
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut polls = 0;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    debug!("shutdown during weather poll");
                    break;
                }
                result = self.flow.fetch(&self.target) => result,
            };
            polls += 1;
            if let Err(e) = &result {
                warn!(error = %e, poll = polls, "weather poll failed");
            }
            on_report(result);
        }

        info!(polls, "weather poller stopped");
        polls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krishimitra_markdown::Advisory;
    use krishimitra_shared::UserProfile;
    use tokio::sync::Notify;

    fn flow(server: &wiremock::MockServer) -> AdvisoryFlow {
        let client = reqwest::Client::new();
        AdvisoryFlow::new(
            WeatherClient::new(client.clone(), &server.uri()).unwrap(),
            GeocodeClient::new(client, &server.uri()).unwrap(),
        )
    }

    fn weather_body() -> serde_json::Value {
        serde_json::json!({
            "temperature": 31.5,
            "humidity": 64,
            "windSpeed": 3.2,
            "conditions": "scattered clouds",
            "alerts": [],
            "soilManagement": "Soil improvement suggestions: add compost\npH adjustment: apply lime",
            "seasonalPlanning": "",
            "plantRecommendations": "Water early in the morning."
        })
    }

    #[tokio::test]
    async fn geocoded_coordinates_are_sent_verbatim() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/search"))
            .and(wiremock::matchers::query_param("q", "New Delhi"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"lat": "28.6138954", "lon": "77.2090057", "display_name": "New Delhi, Delhi, India"}
            ])))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/weather-alerts"))
            .and(wiremock::matchers::body_json(serde_json::json!({
                "lat": 28.6138954,
                "lon": 77.2090057,
                "email": "asha@example.com",
                "plantName": "Tomato"
            })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(weather_body()))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = SessionContext::default().with_user(UserProfile {
            id: "u1".into(),
            display_name: "Asha".into(),
            email: Some("asha@example.com".into()),
        });
        let request = AdvisoryRequest {
            place: Some("New Delhi".into()),
            plant_name: Some("Tomato".into()),
            ..Default::default()
        };

        let (target, report) = flow(&server).advise(&request, &mut session).await.unwrap();

        assert_eq!(session.location, Some(Coordinates::new(28.6138954, 77.2090057)));
        assert_eq!(
            target.location.place_name.as_deref(),
            Some("New Delhi, Delhi, India")
        );
        assert_eq!(report.temperature, 31.5);
        assert_eq!(
            report.alerts,
            vec![favorable_alert(Some("Tomato"))]
        );
        assert_eq!(
            report.alerts[0].message,
            "Weather conditions are currently favorable for your Tomato."
        );
        match report.soil {
            Some(AdvisoryView::Structured(Advisory::Soil(section))) => {
                assert_eq!(section.get("improvements"), Some("add compost"));
            }
            other => panic!("expected structured soil advisory, got {other:?}"),
        }
        assert_eq!(report.seasonal, None);
        assert!(matches!(report.plants, Some(AdvisoryView::Fallback(_))));
    }

    #[tokio::test]
    async fn unknown_place_is_validation_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/search"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let request = AdvisoryRequest {
            place: Some("Atlantis".into()),
            ..Default::default()
        };
        let mut session = SessionContext::default();
        let err = flow(&server)
            .resolve_location(&request, &mut session)
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), PLACE_NOT_FOUND);
        assert_eq!(session.location, None);
    }

    #[tokio::test]
    async fn no_location_is_permission_denied() {
        let server = wiremock::MockServer::start().await;
        let mut session = SessionContext::default();
        let err = flow(&server)
            .resolve_location(&AdvisoryRequest::default(), &mut session)
            .await
            .unwrap_err();
        assert!(matches!(err, KrishiMitraError::PermissionDenied { .. }));
        assert_eq!(err.user_message(), LOCATION_UNAVAILABLE);
    }

    #[tokio::test]
    async fn explicit_coordinates_beat_session() {
        let server = wiremock::MockServer::start().await;
        let mut session = SessionContext::default().with_location(Coordinates::new(1.0, 1.0));
        let request = AdvisoryRequest {
            coordinates: Some(Coordinates::new(12.97, 77.59)),
            ..Default::default()
        };

        let resolved = flow(&server)
            .resolve_location(&request, &mut session)
            .await
            .unwrap();
        assert_eq!(resolved.coordinates, Coordinates::new(12.97, 77.59));
        assert_eq!(session.location, Some(Coordinates::new(12.97, 77.59)));

        let bad = AdvisoryRequest {
            coordinates: Some(Coordinates::new(120.0, 0.0)),
            ..Default::default()
        };
        assert!(matches!(
            flow(&server).resolve_location(&bad, &mut session).await,
            Err(KrishiMitraError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn reported_alerts_are_kept() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/weather-alerts"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "temperature": 41.0,
                "alerts": [{"type": "warning", "message": "Heat wave expected"}]
            })))
            .mount(&server)
            .await;

        let mut session = SessionContext::default().with_location(Coordinates::new(26.9, 75.8));
        let (_, report) = flow(&server)
            .advise(&AdvisoryRequest::default(), &mut session)
            .await
            .unwrap();

        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].severity, AlertSeverity::Warning);
        assert_eq!(report.soil, None);
    }

    #[test]
    fn favorable_alert_defaults_to_crops() {
        assert_eq!(
            favorable_alert(None).message,
            "Weather conditions are currently favorable for your crops."
        );
        assert_eq!(favorable_alert(Some("  ")).severity, AlertSeverity::Info);
    }

    #[tokio::test]
    async fn poller_continues_after_failures_and_stops_on_shutdown() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/weather-alerts"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/weather-alerts"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(weather_body()))
            .mount(&server)
            .await;

        let flow = flow(&server);
        let target = AdvisoryTarget {
            location: ResolvedLocation {
                coordinates: Coordinates::new(19.07, 72.87),
                place_name: None,
            },
            plant_name: None,
            email: None,
        };

        let stop = Notify::new();
        let mut outcomes = Vec::new();
        let polls = WeatherPoller::new(&flow, target, Duration::from_millis(10))
            .run(
                |result| {
                    outcomes.push(result.is_ok());
                    if outcomes.len() == 3 {
                        stop.notify_one();
                    }
                },
                stop.notified(),
            )
            .await;

        assert_eq!(polls, 3);
        assert_eq!(outcomes, vec![false, false, true]);
    }

    fn mumbai() -> AdvisoryTarget {
        AdvisoryTarget {
            location: ResolvedLocation {
                coordinates: Coordinates::new(19.07, 72.87),
                place_name: None,
            },
            plant_name: None,
            email: None,
        }
    }

    #[tokio::test]
    async fn poller_waits_one_interval_before_first_poll() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/weather-alerts"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(weather_body()))
            .mount(&server)
            .await;

        let flow = flow(&server);
        let mut reports = 0;
        let polls = WeatherPoller::new(&flow, mumbai(), Duration::from_secs(3600))
            .run(
                |_| reports += 1,
                tokio::time::sleep(Duration::from_millis(100)),
            )
            .await;

        assert_eq!(polls, 0);
        assert_eq!(reports, 0);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_abandons_poll_in_flight() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/weather-alerts"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(weather_body())
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let flow = flow(&server);
        let run = WeatherPoller::new(&flow, mumbai(), Duration::from_millis(10)).run(
            |_| panic!("no poll should complete"),
            tokio::time::sleep(Duration::from_millis(300)),
        );
        let polls = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("poller should stop promptly");

        assert_eq!(polls, 0);
    }
}
