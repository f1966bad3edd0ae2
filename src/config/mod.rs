//! Engine configuration.
//!
//! All knobs come from environment variables with documented defaults,
//! so the engine runs out of the box against the public OSM services.
//! An unparseable value is a hard [`EngineError::Config`] failure.

use crate::{EngineError, EngineResult};
use std::time::Duration;

/// Runtime configuration for the route engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the geocoding service (Nominatim-compatible).
    pub geocoder_url: String,
    /// Base URL of the road routing service (OSRM-compatible).
    pub road_router_url: String,
    /// User-agent sent with every upstream request.
    pub user_agent: String,
    /// Minimum spacing between upstream geocoding requests.
    pub geocode_interval: Duration,
    /// Per-request timeout for geocoding calls.
    pub geocode_timeout: Duration,
    /// Per-request timeout for road routing calls.
    pub road_timeout: Duration,
    /// Width of the road fan-out worker pool.
    pub road_workers: usize,
    /// Path of the persistent geocode cache file.
    pub geocode_cache_path: String,
    /// Coordinate returned when every geocoding tier misses ("lon,lat").
    pub fallback_coords: String,
    /// Fuel price per liter.
    pub fuel_price_per_liter: f64,
    /// Vehicle mileage, km per liter.
    pub mileage_km_per_liter: f64,
    /// Driver wage per hour.
    pub driver_rate_per_hour: f64,
    /// Toll rate per km.
    pub toll_rate_per_km: f64,
    /// Cap on enumerated candidate routes per request.
    pub max_routes: usize,
}

impl Config {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            geocoder_url: env_or("GEOCODER_URL", "https://nominatim.openstreetmap.org"),
            road_router_url: env_or("ROAD_ROUTER_URL", "http://router.project-osrm.org"),
            user_agent: env_or("UPSTREAM_USER_AGENT", "freightflow/0.1 (route engine)"),
            geocode_interval: Duration::from_millis(parse_env("GEOCODE_INTERVAL_MS", "1000")?),
            geocode_timeout: Duration::from_secs(parse_env("GEOCODE_TIMEOUT_SECS", "10")?),
            road_timeout: Duration::from_secs(parse_env("ROAD_TIMEOUT_SECS", "10")?),
            road_workers: parse_env("ROAD_WORKERS", "5")?,
            geocode_cache_path: env_or("GEOCODE_CACHE_PATH", "geocode_cache.json"),
            fallback_coords: env_or("GEOCODE_FALLBACK_COORDS", "77.1025,28.7041"),
            fuel_price_per_liter: parse_env("FUEL_PRICE_PER_LITER", "100")?,
            mileage_km_per_liter: parse_env("MILEAGE_KM_PER_LITER", "12")?,
            driver_rate_per_hour: parse_env("DRIVER_RATE_PER_HOUR", "150")?,
            toll_rate_per_km: parse_env("TOLL_RATE_PER_KM", "1.5")?,
            max_routes: parse_env("MAX_CANDIDATE_ROUTES", "20")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> EngineResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env_or(key, default);
    raw.parse()
        .map_err(|e| EngineError::Config(format!("{key}={raw}: {e}")))
}

impl Default for Config {
    fn default() -> Self {
        Config {
            geocoder_url: "https://nominatim.openstreetmap.org".to_string(),
            road_router_url: "http://router.project-osrm.org".to_string(),
            user_agent: "freightflow/0.1 (route engine)".to_string(),
            geocode_interval: Duration::from_secs(1),
            geocode_timeout: Duration::from_secs(10),
            road_timeout: Duration::from_secs(10),
            road_workers: 5,
            geocode_cache_path: "geocode_cache.json".to_string(),
            fallback_coords: "77.1025,28.7041".to_string(),
            fuel_price_per_liter: 100.0,
            mileage_km_per_liter: 12.0,
            driver_rate_per_hour: 150.0,
            toll_rate_per_km: 1.5,
            max_routes: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.road_workers, 5);
        assert_eq!(config.geocode_interval, Duration::from_secs(1));
        assert_eq!(config.max_routes, 20);
        assert_eq!(config.fallback_coords, "77.1025,28.7041");
    }

    #[test]
    fn from_env_defaults_agree_with_default_impl() {
        // No freightflow vars are set in the test environment, so both
        // construction paths must agree.
        let from_env = Config::from_env().unwrap();
        let default = Config::default();
        assert_eq!(from_env.road_workers, default.road_workers);
        assert_eq!(from_env.geocode_interval, default.geocode_interval);
        assert_eq!(from_env.max_routes, default.max_routes);
    }

    #[test]
    fn malformed_env_value_is_a_config_error() {
        std::env::set_var("FREIGHTFLOW_TEST_WORKERS", "many");
        let err = parse_env::<usize>("FREIGHTFLOW_TEST_WORKERS", "5").unwrap_err();
        std::env::remove_var("FREIGHTFLOW_TEST_WORKERS");

        assert!(matches!(err, EngineError::Config(_)));
        let message = err.to_string();
        assert!(message.contains("FREIGHTFLOW_TEST_WORKERS"));
        assert!(message.contains("many"));
    }
}
