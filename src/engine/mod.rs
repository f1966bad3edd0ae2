//! Planning engine.
//!
//! Wires the pipeline end to end: geocoding, network construction,
//! candidate enumeration, evaluation, two-stage optimization, and
//! ranking into the final recommendation set.

use crate::candidates::enumerate_routes;
use crate::config::Config;
use crate::data::{FlightTable, ShippingTable};
use crate::eval::{evaluate_route, GoodsType, RouteEval};
use crate::geocode::Geocoder;
use crate::net::NetworkBuilder;
use crate::optimizer::{Evaluated, PopulationSearch, TabuSearch};
use crate::rank::{pre_filter, rank_and_build};
use crate::road::RoadRouter;
use crate::{EngineError, EngineResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// What the caller wants minimized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Cost,
    Time,
    Eco,
    Balanced,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Cost => "cost",
            Priority::Time => "time",
            Priority::Eco => "eco",
            Priority::Balanced => "balanced",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cost" => Ok(Priority::Cost),
            "time" => Ok(Priority::Time),
            "eco" => Ok(Priority::Eco),
            "balanced" => Ok(Priority::Balanced),
            other => Err(EngineError::Request(format!(
                "unknown priority '{other}', expected cost, time, eco, or balanced"
            ))),
        }
    }
}

/// One planning request.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub source: String,
    pub destination: String,
    pub priority: Priority,
    pub goods_type: GoodsType,
    pub cargo_weight: f64,
}

impl PlanRequest {
    fn validate(&self) -> EngineResult<()> {
        if self.source.trim().is_empty() {
            return Err(EngineError::Request("source must not be empty".to_string()));
        }
        if self.destination.trim().is_empty() {
            return Err(EngineError::Request(
                "destination must not be empty".to_string(),
            ));
        }
        if !self.cargo_weight.is_finite() || self.cargo_weight < 0.0 {
            return Err(EngineError::Request(format!(
                "cargo weight must be a non-negative number, got {}",
                self.cargo_weight
            )));
        }
        Ok(())
    }
}

/// One recommended route.
#[derive(Debug, Clone, Serialize)]
pub struct RouteOption {
    pub route_id: String,
    /// Ordered node names, source first.
    pub overview: Vec<String>,
    pub data: RouteEval,
}

/// The planner. Owns the geocoder (and with it the process-wide caches
/// and rate gate) and the road router client.
pub struct RoutePlanner {
    config: Config,
    geocoder: Arc<Geocoder>,
    road_router: RoadRouter,
    search: PopulationSearch,
    tabu: TabuSearch,
}

impl RoutePlanner {
    pub fn new(config: Config) -> Self {
        let geocoder = Arc::new(Geocoder::new(&config));
        let road_router = RoadRouter::new(&config);
        RoutePlanner {
            config,
            geocoder,
            road_router,
            search: PopulationSearch::default(),
            tabu: TabuSearch::default(),
        }
    }

    /// The shared geocoder, e.g. for seeding from a locations table.
    pub fn geocoder(&self) -> &Arc<Geocoder> {
        &self.geocoder
    }

    /// Compute up to three recommended routes for a request.
    ///
    /// Infeasibility (no candidates) yields an empty list, not an
    /// error; only malformed requests fail.
    pub async fn recommend(
        &self,
        flights: &FlightTable,
        shipping: &ShippingTable,
        request: &PlanRequest,
    ) -> EngineResult<Vec<RouteOption>> {
        request.validate()?;

        info!(
            source = %request.source,
            destination = %request.destination,
            priority = %request.priority,
            goods = %request.goods_type,
            weight_kg = request.cargo_weight,
            "planning request"
        );

        let builder = NetworkBuilder::new(
            Arc::clone(&self.geocoder),
            self.road_router.clone(),
            self.config.road_workers,
        );
        let network = builder
            .build(flights, shipping, &request.source, &request.destination)
            .await;

        let routes = enumerate_routes(
            &network,
            &request.source,
            &request.destination,
            self.config.max_routes,
        );
        if routes.is_empty() {
            info!("no candidate routes between endpoints");
            return Ok(Vec::new());
        }
        info!(candidates = routes.len(), "enumerated candidate routes");

        // Evaluation is pure and CPU-bound; fan across cores.
        let all_evaluated: Vec<Evaluated> = routes
            .into_par_iter()
            .map(|route| {
                let eval =
                    evaluate_route(&network, &route, request.cargo_weight, request.goods_type);
                (route, eval)
            })
            .filter(|(_, eval)| eval.valid)
            .collect();
        if all_evaluated.is_empty() {
            info!("no valid candidate routes after evaluation");
            return Ok(Vec::new());
        }

        let filtered = pre_filter(&all_evaluated, request.priority);

        let selected = self.search.select(&filtered, request.goods_type);
        info!(selected = selected.len(), "stage-1 selection complete");

        let refined: Vec<Evaluated> = selected
            .iter()
            .map(|(route, _)| {
                self.tabu.refine(
                    &network,
                    route,
                    request.cargo_weight,
                    request.goods_type,
                    request.priority,
                )
            })
            .collect();
        info!(refined = refined.len(), "stage-2 refinement complete");

        let ranked = rank_and_build(&network, refined, &all_evaluated, request.priority);

        Ok(ranked
            .into_iter()
            .map(|(route, eval)| RouteOption {
                route_id: Uuid::new_v4().to_string(),
                overview: route,
                data: eval,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_known_values() {
        assert_eq!("cost".parse::<Priority>().unwrap(), Priority::Cost);
        assert_eq!("ECO".parse::<Priority>().unwrap(), Priority::Eco);
        assert!("fastest".parse::<Priority>().is_err());
    }

    #[test]
    fn request_validation() {
        let request = PlanRequest {
            source: "Mumbai".to_string(),
            destination: "Delhi".to_string(),
            priority: Priority::Cost,
            goods_type: GoodsType::Standard,
            cargo_weight: -1.0,
        };
        assert!(matches!(
            request.validate(),
            Err(EngineError::Request(_))
        ));

        let request = PlanRequest {
            cargo_weight: 100.0,
            ..request
        };
        assert!(request.validate().is_ok());

        let request = PlanRequest {
            source: "  ".to_string(),
            ..request.clone()
        };
        assert!(request.validate().is_err());
    }
}
