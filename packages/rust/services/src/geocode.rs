//! Place-name geocoding (Nominatim search API).

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use krishimitra_shared::{AppConfig, Coordinates, KrishiMitraError, Result};

use crate::http::{self, send_json};

/// The best match for a place name.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub coordinates: Coordinates,
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Client,
    base: Url,
}

impl GeocodeClient {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base: http::parse_base(base_url)?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(http::client_from_config(config)?, &config.services.geocode_url)
    }

    /// Resolve a free-text place. `Ok(None)` means the service found nothing.
    #[instrument(skip(self))]
    pub async fn geocode(&self, query: &str) -> Result<Option<Place>> {
        let mut url = http::endpoint(&self.base, "search")?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("q", query);

        let hits: Vec<SearchHit> = send_json(self.client.get(url), "geocode").await?;
        let Some(hit) = hits.into_iter().next() else {
            debug!("no geocode match");
            return Ok(None);
        };

        let parse = |raw: &str, axis: &str| {
            raw.trim().parse::<f64>().map_err(|e| {
                KrishiMitraError::parse(format!("geocode: invalid {axis} {raw:?}: {e}"))
            })
        };
        let coordinates = Coordinates::new(parse(&hit.lat, "lat")?, parse(&hit.lon, "lon")?);
        debug!(%coordinates, "geocoded");

        Ok(Some(Place {
            coordinates,
            display_name: hit.display_name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_hit_is_used() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/search"))
            .and(wiremock::matchers::query_param("format", "json"))
            .and(wiremock::matchers::query_param("q", "Nashik"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"lat": "19.9975", "lon": "73.7898", "display_name": "Nashik, Maharashtra, India"},
                {"lat": "20.0", "lon": "74.0"}
            ])))
            .mount(&server)
            .await;

        let client = GeocodeClient::new(Client::new(), &server.uri()).unwrap();
        let place = client.geocode("Nashik").await.unwrap().expect("a match");
        assert_eq!(place.coordinates, Coordinates::new(19.9975, 73.7898));
        assert_eq!(place.display_name.as_deref(), Some("Nashik, Maharashtra, India"));
    }

    #[tokio::test]
    async fn no_hits_is_none() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/search"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = GeocodeClient::new(Client::new(), &server.uri()).unwrap();
        assert_eq!(client.geocode("Atlantis").await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_coordinates_are_parse_errors() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/search"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"lat": "north", "lon": "1.0"}])),
            )
            .mount(&server)
            .await;

        let client = GeocodeClient::new(Client::new(), &server.uri()).unwrap();
        let err = client.geocode("x").await.unwrap_err();
        assert!(matches!(err, KrishiMitraError::Parse { .. }));
    }
}
