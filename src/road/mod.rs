//! Road routing client.
//!
//! Queries an OSRM-compatible service for the drivable route between
//! two coordinate pairs and derives the leg economics from configured
//! constants. "No route" is a degraded outcome (`Ok(None)`), never an
//! error: the caller simply does not get that road edge.

use crate::config::Config;
use crate::geocode::Coords;
use serde::Deserialize;
use tracing::{debug, warn};

/// A priced road leg as returned by the router.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RoadEstimate {
    pub distance_km: f64,
    pub time_hr: f64,
    pub fuel_cost: f64,
    pub toll_cost: f64,
    pub driver_wage: f64,
    pub total_cost: f64,
    /// Encoded polyline, passed through opaquely.
    pub geometry: String,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    /// Meters.
    distance: f64,
    /// Seconds.
    duration: f64,
    geometry: String,
}

/// Client for the road routing service.
#[derive(Clone)]
pub struct RoadRouter {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    fuel_price_per_liter: f64,
    mileage_km_per_liter: f64,
    driver_rate_per_hour: f64,
    toll_rate_per_km: f64,
}

impl RoadRouter {
    pub fn new(config: &Config) -> Self {
        RoadRouter {
            client: reqwest::Client::builder()
                .timeout(config.road_timeout)
                .build()
                .unwrap_or_default(),
            base_url: config.road_router_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            fuel_price_per_liter: config.fuel_price_per_liter,
            mileage_km_per_liter: config.mileage_km_per_liter,
            driver_rate_per_hour: config.driver_rate_per_hour,
            toll_rate_per_km: config.toll_rate_per_km,
        }
    }

    /// Fetch the road route between two points.
    ///
    /// Returns `None` when the service has no route or the call fails.
    pub async fn route(&self, from: Coords, to: Coords) -> Option<RoadEstimate> {
        let url = format!(
            "{}/route/v1/driving/{};{}?overview=full",
            self.base_url, from, to
        );

        let response = match self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(%from, %to, error = %e, "road routing request failed");
                return None;
            }
        };

        let body: OsrmResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(%from, %to, error = %e, "malformed road routing response");
                return None;
            }
        };

        let route = match body.routes.into_iter().next() {
            Some(r) => r,
            None => {
                debug!(%from, %to, "no road route between points");
                return None;
            }
        };

        let distance_km = route.distance / 1000.0;
        let time_hr = route.duration / 3600.0;
        Some(self.price(distance_km, time_hr, route.geometry))
    }

    /// Derive leg economics from distance and duration.
    pub fn price(&self, distance_km: f64, time_hr: f64, geometry: String) -> RoadEstimate {
        let fuel_cost = (distance_km / self.mileage_km_per_liter) * self.fuel_price_per_liter;
        let toll_cost = distance_km * self.toll_rate_per_km;
        let driver_wage = time_hr * self.driver_rate_per_hour;

        RoadEstimate {
            distance_km,
            time_hr,
            fuel_cost,
            toll_cost,
            driver_wage,
            total_cost: fuel_cost + toll_cost + driver_wage,
            geometry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_model_from_documented_constants() {
        let router = RoadRouter::new(&Config::default());
        let leg = router.price(1200.0, 18.0, String::new());

        // fuel: 1200 / 12 * 100, toll: 1200 * 1.5, wage: 18 * 150
        assert!((leg.fuel_cost - 10_000.0).abs() < 1e-9);
        assert!((leg.toll_cost - 1_800.0).abs() < 1e-9);
        assert!((leg.driver_wage - 2_700.0).abs() < 1e-9);
        assert!((leg.total_cost - 14_500.0).abs() < 1e-9);
    }

    #[test]
    fn osrm_units_convert_to_km_and_hours() {
        let body: OsrmResponse = serde_json::from_str(
            r#"{"routes":[{"distance":1408000.0,"duration":50400.0,"geometry":"abc123"}]}"#,
        )
        .unwrap();
        let route = &body.routes[0];
        assert!((route.distance / 1000.0 - 1408.0).abs() < 1e-9);
        assert!((route.duration / 3600.0 - 14.0).abs() < 1e-9);
        assert_eq!(route.geometry, "abc123");
    }

    #[test]
    fn empty_routes_deserialize() {
        let body: OsrmResponse = serde_json::from_str(r#"{"code":"NoRoute"}"#).unwrap();
        assert!(body.routes.is_empty());
    }
}
