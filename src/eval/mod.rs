//! Route evaluation.
//!
//! Computes per-leg cost, time, distance, and CO₂ for a candidate node
//! sequence, then aggregates route totals with goods-type multipliers
//! and customs surcharges.

use crate::graph::{EdgeData, Network, TransportMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Estimated cruise speed used when a flight lane has no recorded
/// distance, km/h.
const AIR_FALLBACK_SPEED_KMH: f64 = 800.0;
/// Same for shipping lanes, km/h.
const SEA_FALLBACK_SPEED_KMH: f64 = 40.0;

/// Cargo classification. Unknown inputs map to `Standard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoodsType {
    Standard,
    Perishable,
    Hazardous,
    Fragile,
    Oversized,
    HighValue,
}

impl GoodsType {
    /// Menu mapping: 1 standard, 2 perishable, 3 hazardous, 4 fragile,
    /// 5 oversized, 6 high-value. Anything else is standard.
    pub fn from_index(index: u32) -> Self {
        match index {
            2 => GoodsType::Perishable,
            3 => GoodsType::Hazardous,
            4 => GoodsType::Fragile,
            5 => GoodsType::Oversized,
            6 => GoodsType::HighValue,
            _ => GoodsType::Standard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoodsType::Standard => "standard",
            GoodsType::Perishable => "perishable",
            GoodsType::Hazardous => "hazardous",
            GoodsType::Fragile => "fragile",
            GoodsType::Oversized => "oversized",
            GoodsType::HighValue => "high_value",
        }
    }

    /// Cost multiplier applied to every leg.
    pub fn multiplier(&self) -> f64 {
        match self {
            GoodsType::Standard => 1.0,
            GoodsType::Perishable => 1.30,
            GoodsType::Hazardous => 1.40,
            GoodsType::Fragile => 1.20,
            GoodsType::Oversized => 1.50,
            GoodsType::HighValue => 1.15,
        }
    }

    /// Additive handling impact as a fraction of the base cost.
    pub fn impact_rate(&self) -> f64 {
        match self {
            GoodsType::Perishable => 0.30,
            GoodsType::Hazardous => 0.20,
            GoodsType::Fragile => 0.10,
            _ => 0.0,
        }
    }

    /// Customs rate for air and sea legs.
    pub fn customs_rate(&self) -> f64 {
        match self {
            GoodsType::Hazardous | GoodsType::HighValue => 0.08,
            _ => 0.05,
        }
    }
}

impl std::fmt::Display for GoodsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CO₂ for one leg, tonnes.
pub fn co2_tonnes(mode: TransportMode, distance_km: f64, weight_kg: f64) -> f64 {
    distance_km * weight_kg * mode.co2_factor() / 1000.0
}

/// Evaluation of a single leg.
#[derive(Debug, Clone, Serialize)]
pub struct LegEval {
    pub start: String,
    pub end: String,
    pub mode: TransportMode,
    pub distance_km: f64,
    pub time_hr: f64,
    pub base_cost: f64,
    pub goods_type_multiplier: f64,
    pub adjusted_cost: f64,
    pub goods_impact: f64,
    pub customs_cost: f64,
    pub total_segment_cost: f64,
    pub co2_emissions: f64,
    /// Encoded polyline for road legs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,
    /// `[(lat, lon), (lat, lon)]` of the leg endpoints; attached by the
    /// result builder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<[(f64, f64); 2]>,
}

/// Evaluation of a whole route.
#[derive(Debug, Clone, Serialize)]
pub struct RouteEval {
    pub valid: bool,
    pub total_cost: f64,
    pub total_time: f64,
    /// Road legs only; air and sea distances feed emissions but not
    /// this total.
    pub total_distance: f64,
    pub total_emissions: f64,
    pub goods_type: GoodsType,
    pub goods_type_score: f64,
    pub modes: BTreeSet<TransportMode>,
    pub segments: Vec<LegEval>,
}

impl RouteEval {
    fn invalid(goods_type: GoodsType) -> Self {
        RouteEval {
            valid: false,
            total_cost: f64::INFINITY,
            total_time: f64::INFINITY,
            total_distance: 0.0,
            total_emissions: 0.0,
            goods_type,
            goods_type_score: 0.0,
            modes: BTreeSet::new(),
            segments: Vec::new(),
        }
    }
}

/// Evaluate a route leg by leg. A missing edge between any consecutive
/// pair yields an invalid evaluation with infinite cost and time.
pub fn evaluate_route(
    network: &Network,
    route: &[String],
    cargo_weight: f64,
    goods_type: GoodsType,
) -> RouteEval {
    let multiplier = goods_type.multiplier();

    let mut total_cost = 0.0;
    let mut total_time = 0.0;
    let mut total_distance = 0.0;
    let mut total_emissions = 0.0;
    let mut modes = BTreeSet::new();
    let mut segments = Vec::with_capacity(route.len().saturating_sub(1));

    for pair in route.windows(2) {
        let (start, end) = (&pair[0], &pair[1]);
        let Some(edge) = network.edge_between(start, end) else {
            return RouteEval::invalid(goods_type);
        };

        let mode = edge.mode();
        let (base_cost, time_hr, distance_km, geometry) = match edge {
            EdgeData::Road(leg) => (
                leg.total_cost,
                leg.time_hr,
                leg.distance_km,
                Some(leg.geometry.clone()),
            ),
            EdgeData::Air {
                cost_per_kg,
                time_hr,
                distance_km,
            } => (
                cost_per_kg * cargo_weight,
                *time_hr,
                distance_km.unwrap_or(time_hr * AIR_FALLBACK_SPEED_KMH),
                None,
            ),
            EdgeData::Sea {
                cost_per_kg,
                time_hr,
                distance_km,
            } => (
                cost_per_kg * cargo_weight,
                *time_hr,
                distance_km.unwrap_or(time_hr * SEA_FALLBACK_SPEED_KMH),
                None,
            ),
        };

        let emissions = co2_tonnes(mode, distance_km, cargo_weight);
        let adjusted_cost = base_cost * multiplier;
        let goods_impact = base_cost * goods_type.impact_rate();
        let customs_cost = match mode {
            TransportMode::Air | TransportMode::Sea => base_cost * goods_type.customs_rate(),
            TransportMode::Road => 0.0,
        };
        let total_segment_cost = adjusted_cost + goods_impact + customs_cost;

        total_cost += total_segment_cost;
        total_time += time_hr;
        if mode == TransportMode::Road {
            total_distance += distance_km;
        }
        total_emissions += emissions;
        modes.insert(mode);

        segments.push(LegEval {
            start: start.clone(),
            end: end.clone(),
            mode,
            distance_km,
            time_hr,
            base_cost,
            goods_type_multiplier: multiplier,
            adjusted_cost,
            goods_impact,
            customs_cost,
            total_segment_cost,
            co2_emissions: emissions,
            geometry,
            coordinates: None,
        });
    }

    let goods_type_score = if goods_type == GoodsType::Standard {
        0.0
    } else {
        multiplier * total_time.sqrt() * 10.0
    };

    RouteEval {
        valid: true,
        total_cost,
        total_time,
        total_distance,
        total_emissions,
        goods_type,
        goods_type_score,
        modes,
        segments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::Coords;
    use crate::graph::{NetworkNode, NodeKind};
    use crate::road::RoadEstimate;

    const TOL: f64 = 1e-6;

    fn node(name: &str, kind: NodeKind) -> NetworkNode {
        NetworkNode {
            name: name.to_string(),
            kind,
            country: "India".to_string(),
            coords: Coords::new(0.0, 0.0),
        }
    }

    fn network() -> Network {
        let mut network = Network::new();
        network.ensure_node(node("Mumbai", NodeKind::City));
        network.ensure_node(node("Delhi", NodeKind::City));
        network.ensure_node(node("Mumbai Airport", NodeKind::Airport));
        network.ensure_node(node("Delhi Airport", NodeKind::Airport));

        network.add_edge(
            "Mumbai",
            "Delhi",
            EdgeData::Road(RoadEstimate {
                distance_km: 1408.0,
                time_hr: 22.0,
                fuel_cost: 11_733.33,
                toll_cost: 2112.0,
                driver_wage: 3300.0,
                total_cost: 17_145.33,
                geometry: "encoded".to_string(),
            }),
        );
        network.add_edge(
            "Mumbai Airport",
            "Delhi Airport",
            EdgeData::Air {
                cost_per_kg: 45.0,
                time_hr: 2.0,
                distance_km: None,
            },
        );
        network
    }

    #[test]
    fn road_leg_uses_priced_totals() {
        let network = network();
        let route = vec!["Mumbai".to_string(), "Delhi".to_string()];
        let eval = evaluate_route(&network, &route, 100.0, GoodsType::Standard);

        assert!(eval.valid);
        assert!((eval.total_cost - 17_145.33).abs() < TOL);
        assert!((eval.total_time - 22.0).abs() < TOL);
        assert!((eval.total_distance - 1408.0).abs() < TOL);
        // 1408 km * 100 kg * 0.1053 / 1000
        assert!((eval.total_emissions - 14.82624).abs() < TOL);
        assert_eq!(eval.segments[0].customs_cost, 0.0);
        assert_eq!(eval.segments[0].geometry.as_deref(), Some("encoded"));
        assert_eq!(eval.goods_type_score, 0.0);
    }

    #[test]
    fn air_distance_falls_back_to_cruise_speed() {
        let network = network();
        let route = vec!["Mumbai Airport".to_string(), "Delhi Airport".to_string()];
        let eval = evaluate_route(&network, &route, 10.0, GoodsType::Standard);

        let leg = &eval.segments[0];
        assert!((leg.distance_km - 1600.0).abs() < TOL);
        // Air distance never enters the route total.
        assert!((eval.total_distance - 0.0).abs() < TOL);
        assert!((leg.co2_emissions - 1600.0 * 10.0 * 0.5015 / 1000.0).abs() < TOL);
    }

    #[test]
    fn hazardous_surcharges() {
        let network = network();
        let route = vec!["Mumbai Airport".to_string(), "Delhi Airport".to_string()];
        let standard = evaluate_route(&network, &route, 10.0, GoodsType::Standard);
        let hazardous = evaluate_route(&network, &route, 10.0, GoodsType::Hazardous);

        let leg = &hazardous.segments[0];
        assert!((leg.adjusted_cost - leg.base_cost * 1.40).abs() < TOL);
        assert!((leg.goods_impact - leg.base_cost * 0.20).abs() < TOL);
        assert!((leg.customs_cost - leg.base_cost * 0.08).abs() < TOL);
        assert!(hazardous.total_cost > standard.total_cost);
    }

    #[test]
    fn standard_air_leg_pays_base_customs() {
        let network = network();
        let route = vec!["Mumbai Airport".to_string(), "Delhi Airport".to_string()];
        let eval = evaluate_route(&network, &route, 10.0, GoodsType::Standard);
        let leg = &eval.segments[0];
        assert!((leg.customs_cost - leg.base_cost * 0.05).abs() < TOL);
    }

    #[test]
    fn missing_edge_invalidates_route() {
        let network = network();
        let route = vec!["Delhi".to_string(), "Mumbai".to_string()];
        let eval = evaluate_route(&network, &route, 100.0, GoodsType::Standard);
        assert!(!eval.valid);
        assert!(eval.total_cost.is_infinite());
        assert!(eval.total_time.is_infinite());
        assert!(eval.segments.is_empty());
    }

    #[test]
    fn goods_score_law() {
        let network = network();
        let route = vec!["Mumbai".to_string(), "Delhi".to_string()];
        let eval = evaluate_route(&network, &route, 100.0, GoodsType::Perishable);
        let expected = 1.30 * eval.total_time.sqrt() * 10.0;
        assert!((eval.goods_type_score - expected).abs() < TOL);
    }

    #[test]
    fn totals_are_leg_sums() {
        let mut network = network();
        network.add_edge(
            "Mumbai",
            "Mumbai Airport",
            EdgeData::Road(RoadEstimate {
                distance_km: 25.0,
                time_hr: 0.8,
                fuel_cost: 208.33,
                toll_cost: 37.5,
                driver_wage: 120.0,
                total_cost: 365.83,
                geometry: String::new(),
            }),
        );
        let route = vec![
            "Mumbai".to_string(),
            "Mumbai Airport".to_string(),
            "Delhi Airport".to_string(),
        ];
        let eval = evaluate_route(&network, &route, 50.0, GoodsType::Fragile);

        let cost: f64 = eval.segments.iter().map(|s| s.total_segment_cost).sum();
        let time: f64 = eval.segments.iter().map(|s| s.time_hr).sum();
        let emissions: f64 = eval.segments.iter().map(|s| s.co2_emissions).sum();
        let road_distance: f64 = eval
            .segments
            .iter()
            .filter(|s| s.mode == TransportMode::Road)
            .map(|s| s.distance_km)
            .sum();

        assert!((eval.total_cost - cost).abs() < TOL);
        assert!((eval.total_time - time).abs() < TOL);
        assert!((eval.total_emissions - emissions).abs() < TOL);
        assert!((eval.total_distance - road_distance).abs() < TOL);
        assert_eq!(eval.modes.len(), 2);
    }

    #[test]
    fn goods_index_menu() {
        assert_eq!(GoodsType::from_index(1), GoodsType::Standard);
        assert_eq!(GoodsType::from_index(3), GoodsType::Hazardous);
        assert_eq!(GoodsType::from_index(6), GoodsType::HighValue);
        assert_eq!(GoodsType::from_index(0), GoodsType::Standard);
        assert_eq!(GoodsType::from_index(99), GoodsType::Standard);
    }
}
