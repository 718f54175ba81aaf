//! Coordinates resolution with fallback. A map view keeps rendering even
//! when the server or the network is down: first ask the server, then a
//! local cache file of previously fetched answers, and as a last resort
//! synthesize a plausible track deterministically from the route id.

use std::collections::HashMap;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::data_formats::{ApiResponse, CoordinatesResponse, Waypoint};

/// Which layer of the fallback chain produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Remote,
    LocalCache,
    Synthetic,
}

#[derive(Debug, Clone)]
pub struct ResolvedCoordinates {
    pub coordinates: CoordinatesResponse,
    pub tier: Tier,
}

pub struct CoordinatesClient {
    base_url: String,
    cache_path: PathBuf,
    http: reqwest::Client,
}

impl CoordinatesClient {
    pub fn new(base_url: impl Into<String>, cache_path: impl Into<PathBuf>) -> Self {
        CoordinatesClient {
            base_url: base_url.into(),
            cache_path: cache_path.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Resolves coordinates for a route, trying each tier in turn. Never
    /// fails: the synthetic tier always has an answer.
    pub async fn resolve(&self, route_id: i64) -> ResolvedCoordinates {
        match self.fetch_remote(route_id).await {
            Ok(coordinates) => {
                tracing::debug!(route_id, "coordinates resolved from server");
                self.store_in_cache(route_id, &coordinates).await;
                return ResolvedCoordinates {
                    coordinates,
                    tier: Tier::Remote,
                };
            }
            Err(e) => tracing::warn!(route_id, "coordinates fetch failed: {e}"),
        }

        if let Some(coordinates) = self.read_from_cache(route_id).await {
            tracing::debug!(route_id, "coordinates resolved from local cache");
            return ResolvedCoordinates {
                coordinates,
                tier: Tier::LocalCache,
            };
        }

        tracing::debug!(route_id, "coordinates synthesized");
        ResolvedCoordinates {
            coordinates: synthesize_coordinates(route_id),
            tier: Tier::Synthetic,
        }
    }

    async fn fetch_remote(&self, route_id: i64) -> anyhow::Result<CoordinatesResponse> {
        let url = format!("{}/api/hiking-routes/{route_id}/coordinates", self.base_url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("server answered {}", response.status());
        }
        let body: ApiResponse<CoordinatesResponse> = response.json().await?;
        body.data
            .ok_or_else(|| anyhow::anyhow!("response carried no coordinates"))
    }

    async fn read_from_cache(&self, route_id: i64) -> Option<CoordinatesResponse> {
        let raw = tokio::fs::read_to_string(&self.cache_path).await.ok()?;
        let cache: CacheFile = serde_json::from_str(&raw).ok()?;
        cache.entries.get(&route_id.to_string()).cloned()
    }

    async fn store_in_cache(&self, route_id: i64, coordinates: &CoordinatesResponse) {
        let mut cache = match tokio::fs::read_to_string(&self.cache_path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => CacheFile::default(),
        };
        cache
            .entries
            .insert(route_id.to_string(), coordinates.clone());
        let serialized = match serde_json::to_string_pretty(&cache.entries) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("failed to serialize coordinates cache: {e}");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&self.cache_path, serialized).await {
            tracing::warn!("failed to write coordinates cache: {e}");
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
struct CacheFile {
    entries: HashMap<String, CoordinatesResponse>,
}

/// Builds a stable fake track for a route. Seeded from the route id, so the
/// same route always draws the same line.
pub fn synthesize_coordinates(route_id: i64) -> CoordinatesResponse {
    let mut rng = StdRng::seed_from_u64(route_id as u64);

    let start_lat = rng.gen_range(35.0..48.0);
    let start_lng = rng.gen_range(-120.0..-75.0);
    // Trailhead to summit spans at most a few hundredths of a degree.
    let end_lat = start_lat + rng.gen_range(-0.05..0.05);
    let end_lng = start_lng + rng.gen_range(-0.05..0.05);

    let waypoint_count = rng.gen_range(3..8);
    let mut waypoints = Vec::with_capacity(waypoint_count);
    for i in 1..=waypoint_count {
        let t = i as f64 / (waypoint_count + 1) as f64;
        waypoints.push(Waypoint {
            lat: start_lat + (end_lat - start_lat) * t + rng.gen_range(-0.005..0.005),
            lng: start_lng + (end_lng - start_lng) * t + rng.gen_range(-0.005..0.005),
        });
    }

    CoordinatesResponse {
        route_id,
        start_name: "Trailhead".to_string(),
        start_lat,
        start_lng,
        end_name: "Summit".to_string(),
        end_lat,
        end_lng,
        waypoints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_tracks_are_deterministic_per_route() {
        let a = synthesize_coordinates(7);
        let b = synthesize_coordinates(7);
        assert_eq!(a, b);

        let other = synthesize_coordinates(8);
        assert_ne!(a, other);
    }

    #[test]
    fn synthetic_track_stays_near_its_start() {
        let track = synthesize_coordinates(42);
        assert!((track.end_lat - track.start_lat).abs() <= 0.05);
        assert!((track.end_lng - track.start_lng).abs() <= 0.05);
        assert!(!track.waypoints.is_empty());
    }

    #[tokio::test]
    async fn unreachable_server_and_empty_cache_fall_through_to_synthetic() {
        let dir = tempfile::tempdir().unwrap();
        let client = CoordinatesClient::new(
            "http://127.0.0.1:1", // nothing listens here
            dir.path().join("cache.json"),
        );
        let resolved = client.resolve(3).await;
        assert_eq!(resolved.tier, Tier::Synthetic);
        assert_eq!(resolved.coordinates.route_id, 3);
    }

    #[tokio::test]
    async fn cache_file_answers_when_the_server_is_down() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("cache.json");
        let cached = synthesize_coordinates(5);
        let mut entries = HashMap::new();
        entries.insert("5".to_string(), &cached);
        tokio::fs::write(&cache_path, serde_json::to_string(&entries).unwrap())
            .await
            .unwrap();

        let client = CoordinatesClient::new("http://127.0.0.1:1", &cache_path);
        let resolved = client.resolve(5).await;
        assert_eq!(resolved.tier, Tier::LocalCache);
        assert_eq!(resolved.coordinates, cached);
    }
}
