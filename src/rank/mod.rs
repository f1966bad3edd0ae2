//! Ranking and result assembly.
//!
//! Pre-filters outlier candidates before optimization, then ranks the
//! refined routes by the request priority, deduplicates, tops the list
//! up from the full evaluated set when the optimizer collapsed it, and
//! attaches per-leg coordinates for consumption.

use crate::engine::Priority;
use crate::eval::RouteEval;
use crate::graph::Network;
use crate::optimizer::Evaluated;
use std::collections::HashSet;
use tracing::debug;

/// How many routes a response carries.
pub const RESULT_LIMIT: usize = 3;

/// Min/max envelope of a candidate set, for normalized scoring.
#[derive(Debug, Clone, Copy)]
pub struct MetricContext {
    min_cost: f64,
    max_cost: f64,
    min_time: f64,
    max_time: f64,
    min_emissions: f64,
    max_emissions: f64,
}

impl MetricContext {
    pub fn of(candidates: &[Evaluated]) -> Self {
        let mut ctx = MetricContext {
            min_cost: f64::INFINITY,
            max_cost: f64::NEG_INFINITY,
            min_time: f64::INFINITY,
            max_time: f64::NEG_INFINITY,
            min_emissions: f64::INFINITY,
            max_emissions: f64::NEG_INFINITY,
        };
        for (_, eval) in candidates {
            ctx.min_cost = ctx.min_cost.min(eval.total_cost);
            ctx.max_cost = ctx.max_cost.max(eval.total_cost);
            ctx.min_time = ctx.min_time.min(eval.total_time);
            ctx.max_time = ctx.max_time.max(eval.total_time);
            ctx.min_emissions = ctx.min_emissions.min(eval.total_emissions);
            ctx.max_emissions = ctx.max_emissions.max(eval.total_emissions);
        }
        ctx
    }

    /// The scalar each priority sorts by, ascending. Balanced blends
    /// the normalized objectives at 0.4 cost, 0.4 time, 0.2 emissions.
    pub fn metric(&self, priority: Priority, eval: &RouteEval) -> f64 {
        match priority {
            Priority::Cost => eval.total_cost,
            Priority::Time => eval.total_time,
            Priority::Eco => eval.total_emissions,
            Priority::Balanced => {
                0.4 * normalize(eval.total_cost, self.min_cost, self.max_cost)
                    + 0.4 * normalize(eval.total_time, self.min_time, self.max_time)
                    + 0.2 * normalize(eval.total_emissions, self.min_emissions, self.max_emissions)
            }
        }
    }
}

fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        (value - min) / (max - min)
    } else {
        0.0
    }
}

/// Drop extreme outliers before the optimizer sees them, then add the
/// best of the dropped back if fewer than [`RESULT_LIMIT`] remain.
pub fn pre_filter(candidates: &[Evaluated], priority: Priority) -> Vec<Evaluated> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let ctx = MetricContext::of(candidates);
    let keep = |eval: &RouteEval| -> bool {
        match priority {
            Priority::Cost => eval.total_cost <= 3.0 * ctx.min_cost,
            Priority::Time => eval.total_time <= 2.0 * ctx.min_time,
            Priority::Eco => eval.total_emissions <= 8.0 * ctx.min_emissions,
            Priority::Balanced => {
                eval.total_cost <= 5.0 * ctx.min_cost
                    || eval.total_time <= 3.0 * ctx.min_time
                    || eval.total_emissions <= 5.0 * ctx.min_emissions
            }
        }
    };

    let mut kept: Vec<Evaluated> = Vec::new();
    let mut dropped: Vec<Evaluated> = Vec::new();
    for candidate in candidates {
        if keep(&candidate.1) {
            kept.push(candidate.clone());
        } else {
            dropped.push(candidate.clone());
        }
    }

    if kept.len() < RESULT_LIMIT && !dropped.is_empty() {
        dropped.sort_by(|a, b| {
            ctx.metric(priority, &a.1)
                .total_cmp(&ctx.metric(priority, &b.1))
        });
        for candidate in dropped {
            if kept.len() >= RESULT_LIMIT {
                break;
            }
            kept.push(candidate);
        }
    }

    debug!(
        candidates = candidates.len(),
        kept = kept.len(),
        "pre-filtered candidate routes"
    );
    kept
}

/// Rank the refined routes, deduplicate, top up, and attach leg
/// coordinates. Returns at most [`RESULT_LIMIT`] evaluations, sorted
/// ascending by the priority metric.
pub fn rank_and_build(
    network: &Network,
    refined: Vec<Evaluated>,
    all_evaluated: &[Evaluated],
    priority: Priority,
) -> Vec<Evaluated> {
    if refined.is_empty() && all_evaluated.is_empty() {
        return Vec::new();
    }

    let mut ranked = refined;
    let ctx = MetricContext::of(&ranked);
    ranked.sort_by(|a, b| {
        ctx.metric(priority, &a.1)
            .total_cmp(&ctx.metric(priority, &b.1))
    });

    // Deduplicate by the joined overview, first occurrence wins.
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique: Vec<Evaluated> = Vec::new();
    for candidate in ranked {
        if seen.insert(candidate.0.join("→")) {
            unique.push(candidate);
        }
    }
    unique.truncate(RESULT_LIMIT);

    // The optimizer may collapse everything onto one route; refill from
    // the unoptimized evaluations.
    if unique.len() < RESULT_LIMIT {
        let fill_ctx = MetricContext::of(all_evaluated);
        let mut fill: Vec<&Evaluated> = all_evaluated.iter().collect();
        fill.sort_by(|a, b| {
            fill_ctx
                .metric(priority, &a.1)
                .total_cmp(&fill_ctx.metric(priority, &b.1))
        });
        for candidate in fill {
            if unique.len() >= RESULT_LIMIT {
                break;
            }
            if seen.insert(candidate.0.join("→")) {
                unique.push(candidate.clone());
            }
        }
    }

    // Re-sort so the merged list stays monotone under the priority.
    let final_ctx = MetricContext::of(&unique);
    unique.sort_by(|a, b| {
        final_ctx
            .metric(priority, &a.1)
            .total_cmp(&final_ctx.metric(priority, &b.1))
    });
    unique.truncate(RESULT_LIMIT);

    for (_, eval) in &mut unique {
        attach_coordinates(network, eval);
    }
    unique
}

/// Attach `[(lat, lon), (lat, lon)]` endpoints to every leg. Node
/// coordinates are stored lon-first; consumers expect lat-first.
fn attach_coordinates(network: &Network, eval: &mut RouteEval) {
    for segment in &mut eval.segments {
        let start = network.get_node(&segment.start).map(|n| n.coords.lat_lon());
        let end = network.get_node(&segment.end).map(|n| n.coords.lat_lon());
        if let (Some(start), Some(end)) = (start, end) {
            segment.coordinates = Some([start, end]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::Route;
    use crate::eval::{evaluate_route, GoodsType};
    use crate::geocode::Coords;
    use crate::graph::{EdgeData, NetworkNode, NodeKind};
    use crate::road::RoadEstimate;

    fn road(cost: f64, time: f64, distance: f64) -> EdgeData {
        EdgeData::Road(RoadEstimate {
            distance_km: distance,
            time_hr: time,
            fuel_cost: 0.0,
            toll_cost: 0.0,
            driver_wage: 0.0,
            total_cost: cost,
            geometry: String::new(),
        })
    }

    /// Three disjoint two-leg road routes with spread-out totals.
    fn network_with_three_routes() -> (Network, Vec<Evaluated>) {
        let mut network = Network::new();
        for (name, kind) in [
            ("S", NodeKind::City),
            ("D", NodeKind::City),
            ("H1", NodeKind::Airport),
            ("H2", NodeKind::Airport),
            ("H3", NodeKind::Airport),
        ] {
            network.ensure_node(NetworkNode {
                name: name.to_string(),
                kind,
                country: "India".to_string(),
                coords: Coords::new(70.0, 20.0),
            });
        }
        network.add_edge("S", "H1", road(100.0, 1.0, 50.0));
        network.add_edge("H1", "D", road(100.0, 1.0, 50.0));
        network.add_edge("S", "H2", road(300.0, 3.0, 150.0));
        network.add_edge("H2", "D", road(300.0, 3.0, 150.0));
        network.add_edge("S", "H3", road(900.0, 9.0, 450.0));
        network.add_edge("H3", "D", road(900.0, 9.0, 450.0));

        let routes: Vec<Route> = vec![
            ["S", "H1", "D"].map(String::from).to_vec(),
            ["S", "H2", "D"].map(String::from).to_vec(),
            ["S", "H3", "D"].map(String::from).to_vec(),
        ];
        let candidates = routes
            .into_iter()
            .map(|route| {
                let eval = evaluate_route(&network, &route, 100.0, GoodsType::Standard);
                (route, eval)
            })
            .collect();
        (network, candidates)
    }

    #[test]
    fn cost_pre_filter_drops_expensive_outliers() {
        let (_network, candidates) = network_with_three_routes();
        let kept = pre_filter(&candidates, Priority::Cost);
        // min cost 200; the 1800 route exceeds 3x but is added back to
        // reach the result limit.
        assert_eq!(kept.len(), 3);

        let without_topup: Vec<_> = kept
            .iter()
            .filter(|(_, e)| e.total_cost <= 600.0)
            .collect();
        assert_eq!(without_topup.len(), 2);
    }

    #[test]
    fn time_pre_filter_tops_up_with_the_best_dropped_route() {
        let (_network, mut candidates) = network_with_three_routes();
        candidates.push(candidates[0].clone());
        // Times are 2h, 2h, 6h, 18h; the 2x-min threshold keeps only
        // the 2h pair, so the 6h route comes back to reach the limit.
        let kept = pre_filter(&candidates, Priority::Time);
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|(_, e)| e.total_time <= 6.0));
    }

    #[test]
    fn ranking_is_monotone_and_deduplicated() {
        let (network, candidates) = network_with_three_routes();
        let mut refined = candidates.clone();
        refined.push(candidates[0].clone()); // duplicate to collapse

        let result = rank_and_build(&network, refined, &candidates, Priority::Cost);
        assert_eq!(result.len(), 3);

        let mut seen = HashSet::new();
        for (route, _) in &result {
            assert!(seen.insert(route.join("→")));
        }
        for pair in result.windows(2) {
            assert!(pair[0].1.total_cost <= pair[1].1.total_cost);
        }
    }

    #[test]
    fn collapsed_refinement_tops_up_from_candidates() {
        let (network, candidates) = network_with_three_routes();
        // Stage 2 collapsed everything onto the single best route.
        let refined = vec![candidates[0].clone(), candidates[0].clone()];
        let result = rank_and_build(&network, refined, &candidates, Priority::Time);

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].0, candidates[0].0);
        for pair in result.windows(2) {
            assert!(pair[0].1.total_time <= pair[1].1.total_time);
        }
    }

    #[test]
    fn coordinates_are_lat_lon_flipped() {
        let (network, candidates) = network_with_three_routes();
        let result = rank_and_build(&network, candidates.clone(), &candidates, Priority::Cost);
        let segment = &result[0].1.segments[0];
        // Nodes sit at lon 70, lat 20.
        assert_eq!(segment.coordinates, Some([(20.0, 70.0), (20.0, 70.0)]));
    }

    #[test]
    fn balanced_metric_blends_normalized_objectives() {
        let (_network, candidates) = network_with_three_routes();
        let ctx = MetricContext::of(&candidates);
        // Extremes normalize to 0 and 1.
        assert!((ctx.metric(Priority::Balanced, &candidates[0].1) - 0.0).abs() < 1e-9);
        assert!((ctx.metric(Priority::Balanced, &candidates[2].1) - 1.0).abs() < 1e-9);
        let middle = ctx.metric(Priority::Balanced, &candidates[1].1);
        assert!(middle > 0.0 && middle < 1.0);
    }
}
