//! Nearby hospital discovery via the Overpass API.
//!
//! Hospitals are fetched as OpenStreetMap nodes tagged `amenity=hospital`
//! within a radius of the current position. Records store raw coordinates
//! only; distances are recomputed against the live position every time the
//! list is viewed, so an ordering is never stale.

use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::config::HospitalsConfig;
use crate::error::{MaydayError, Result};
use crate::geo::LocationPoint;

/// Display name used when a hospital node carries no name tag.
const UNNAMED_HOSPITAL: &str = "Hospital";

/// One hospital as fetched from Overpass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HospitalRecord {
    /// Stable OpenStreetMap node id.
    #[schema(example = "9842015632")]
    pub id: String,

    /// Hospital name, or a generic fallback when unnamed.
    #[schema(example = "AIIMS Trauma Centre")]
    pub name: String,

    /// Latitude in decimal degrees.
    pub lat: f64,

    /// Longitude in decimal degrees.
    pub lng: f64,
}

impl HospitalRecord {
    /// Position of this hospital.
    #[must_use]
    pub const fn location(&self) -> LocationPoint {
        LocationPoint::new(self.lat, self.lng)
    }
}

/// A hospital paired with its distance from the viewer's position.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RankedHospital {
    /// Stable OpenStreetMap node id.
    pub id: String,

    /// Hospital name.
    pub name: String,

    /// Latitude in decimal degrees.
    pub lat: f64,

    /// Longitude in decimal degrees.
    pub lng: f64,

    /// Distance from the current position in kilometers.
    #[schema(example = 2.41)]
    pub distance_km: f64,
}

/// Ranks hospitals by distance from `center`, nearest first.
///
/// A non-empty `search` keeps only hospitals whose name contains it,
/// case-insensitively. Distances are computed fresh from `center` on every
/// call.
#[must_use]
pub fn rank_hospitals(
    records: &[HospitalRecord],
    center: LocationPoint,
    search: &str,
) -> Vec<RankedHospital> {
    let needle = search.trim().to_lowercase();

    let mut ranked: Vec<RankedHospital> = records
        .iter()
        .filter(|record| needle.is_empty() || record.name.to_lowercase().contains(&needle))
        .map(|record| RankedHospital {
            id: record.id.clone(),
            name: record.name.clone(),
            lat: record.lat,
            lng: record.lng,
            distance_km: center.distance_km(record.location()),
        })
        .collect();

    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked
}

/// HTTP client for the Overpass interpreter endpoint.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl OverpassClient {
    /// Creates a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &HospitalsConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.overpass_url).map_err(|err| {
            MaydayError::ConfigValidationError(format!("hospitals.overpass_url: {err}"))
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| MaydayError::HttpClientError(err.to_string()))?;

        Ok(Self { client, endpoint })
    }

    /// Finds hospitals within `radius_m` meters of `center`.
    ///
    /// An empty area yields an empty list, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`MaydayError::HospitalSearchFailed`] on transport errors,
    /// non-success status codes, or undecodable bodies.
    pub async fn find_nearby(
        &self,
        center: LocationPoint,
        radius_m: u32,
    ) -> Result<Vec<HospitalRecord>> {
        let query = format!(
            "[out:json];(node[\"amenity\"=\"hospital\"](around:{radius_m},{lat},{lng}););out;",
            lat = center.lat,
            lng = center.lng,
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(query)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| MaydayError::HospitalSearchFailed(err.to_string()))?
            .json::<OverpassResponse>()
            .await
            .map_err(|err| {
                MaydayError::HospitalSearchFailed(format!("invalid overpass payload: {err}"))
            })?;

        Ok(response
            .elements
            .into_iter()
            .map(HospitalRecord::from)
            .collect())
    }
}

// Overpass wire format.

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    id: u64,
    lat: f64,
    lon: f64,
    #[serde(default)]
    tags: OverpassTags,
}

#[derive(Debug, Default, Deserialize)]
struct OverpassTags {
    name: Option<String>,
}

impl From<OverpassElement> for HospitalRecord {
    fn from(element: OverpassElement) -> Self {
        let name = element
            .tags
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNNAMED_HOSPITAL.to_string());

        Self {
            id: element.id.to_string(),
            name,
            lat: element.lat,
            lng: element.lon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::Router;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    const CENTER: LocationPoint = LocationPoint::new(28.6139, 77.2090);

    fn record(id: &str, name: &str, lat: f64, lng: f64) -> HospitalRecord {
        HospitalRecord {
            id: id.to_string(),
            name: name.to_string(),
            lat,
            lng,
        }
    }

    fn sample_records() -> Vec<HospitalRecord> {
        vec![
            record("1", "City Care Hospital", 28.70, 77.30),
            record("2", "AIIMS Trauma Centre", 28.62, 77.21),
            record("3", "Fortis Heart Institute", 28.50, 77.10),
        ]
    }

    async fn spawn_backend(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn config_for(addr: SocketAddr) -> HospitalsConfig {
        HospitalsConfig {
            overpass_url: format!("http://{addr}/api/interpreter"),
            search_radius_m: 8000,
            request_timeout_secs: 2,
        }
    }

    #[test]
    fn test_ranking_sorts_by_distance_ascending() {
        let ranked = rank_hospitals(&sample_records(), CENTER, "");
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].id, "2");
        assert!(ranked[0].distance_km <= ranked[1].distance_km);
        assert!(ranked[1].distance_km <= ranked[2].distance_km);
    }

    #[test]
    fn test_ranking_recomputes_from_live_center() {
        let records = sample_records();
        let near_city_care = LocationPoint::new(28.70, 77.29);

        let from_delhi = rank_hospitals(&records, CENTER, "");
        let from_north = rank_hospitals(&records, near_city_care, "");

        assert_eq!(from_delhi[0].id, "2");
        assert_eq!(from_north[0].id, "1");
    }

    #[test]
    fn test_search_filter_is_case_insensitive() {
        let ranked = rank_hospitals(&sample_records(), CENTER, "aiims");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].name, "AIIMS Trauma Centre");

        let ranked = rank_hospitals(&sample_records(), CENTER, "  HOSPITAL ");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "1");
    }

    #[test]
    fn test_search_with_no_matches_is_empty() {
        let ranked = rank_hospitals(&sample_records(), CENTER, "clinic");
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn test_find_nearby_parses_elements_and_applies_name_fallback() {
        let router = Router::new().route(
            "/api/interpreter",
            post(|| async {
                axum::Json(serde_json::json!({
                    "version": 0.6,
                    "elements": [
                        {"type": "node", "id": 101, "lat": 28.62, "lon": 77.21,
                         "tags": {"name": "AIIMS Trauma Centre", "emergency": "yes"}},
                        {"type": "node", "id": 102, "lat": 28.63, "lon": 77.22, "tags": {}},
                        {"type": "node", "id": 103, "lat": 28.64, "lon": 77.23}
                    ]
                }))
            }),
        );
        let addr = spawn_backend(router).await;
        let client = OverpassClient::new(&config_for(addr)).unwrap();

        let hospitals = client.find_nearby(CENTER, 8000).await.unwrap();
        assert_eq!(hospitals.len(), 3);
        assert_eq!(hospitals[0].id, "101");
        assert_eq!(hospitals[0].name, "AIIMS Trauma Centre");
        assert_eq!(hospitals[1].name, "Hospital");
        assert_eq!(hospitals[2].name, "Hospital");
    }

    #[tokio::test]
    async fn test_find_nearby_sends_amenity_query() {
        let seen = Arc::new(Mutex::new(String::new()));
        let capture = Arc::clone(&seen);
        let router = Router::new().route(
            "/api/interpreter",
            post(move |body: String| {
                let capture = Arc::clone(&capture);
                async move {
                    *capture.lock().unwrap() = body;
                    axum::Json(serde_json::json!({"elements": []}))
                }
            }),
        );
        let addr = spawn_backend(router).await;
        let client = OverpassClient::new(&config_for(addr)).unwrap();

        let hospitals = client.find_nearby(CENTER, 8000).await.unwrap();
        assert!(hospitals.is_empty());

        let query = seen.lock().unwrap().clone();
        assert!(query.contains("[out:json]"));
        assert!(query.contains("node[\"amenity\"=\"hospital\"]"));
        assert!(query.contains("around:8000,28.6139,77.209"));
    }

    #[tokio::test]
    async fn test_find_nearby_reports_http_errors() {
        let router = Router::new().route(
            "/api/interpreter",
            post(|| async { axum::http::StatusCode::GATEWAY_TIMEOUT }),
        );
        let addr = spawn_backend(router).await;
        let client = OverpassClient::new(&config_for(addr)).unwrap();

        let err = client.find_nearby(CENTER, 8000).await.unwrap_err();
        assert!(matches!(err, MaydayError::HospitalSearchFailed(_)));
    }
}
