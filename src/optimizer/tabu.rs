//! Tabu Search refinement.
//!
//! Locally improves a route by substituting its transit hubs with other
//! hubs of the same type, steered by the request priority. A FIFO tabu
//! list prevents cycling through recently visited solutions.

use crate::candidates::Route;
use crate::engine::Priority;
use crate::eval::{evaluate_route, GoodsType, RouteEval};
use crate::graph::Network;
use std::collections::VecDeque;

pub struct TabuSearch {
    pub max_iterations: usize,
    pub tabu_size: usize,
}

impl Default for TabuSearch {
    fn default() -> Self {
        TabuSearch {
            max_iterations: 50,
            tabu_size: 7,
        }
    }
}

impl TabuSearch {
    /// Refine one route. Returns the best solution found under the
    /// priority objective, which may be the unchanged input.
    pub fn refine(
        &self,
        network: &Network,
        initial: &Route,
        cargo_weight: f64,
        goods_type: GoodsType,
        priority: Priority,
    ) -> (Route, RouteEval) {
        let mut current_route = initial.clone();
        let mut current_eval = evaluate_route(network, &current_route, cargo_weight, goods_type);

        let mut best_route = current_route.clone();
        let mut best_eval = current_eval.clone();

        let mut tabu_list: VecDeque<Route> = VecDeque::with_capacity(self.tabu_size);

        for _ in 0..self.max_iterations {
            let mut neighbors =
                self.neighbors(network, &current_route, cargo_weight, goods_type, &tabu_list);
            if neighbors.is_empty() {
                break;
            }

            neighbors.sort_by(|a, b| {
                priority_objective(priority, &a.1).total_cmp(&priority_objective(priority, &b.1))
            });
            let (best_neighbor, best_neighbor_eval) = neighbors.swap_remove(0);

            // The best neighbor is accepted unconditionally; escaping a
            // local optimum is the point.
            current_route = best_neighbor;
            current_eval = best_neighbor_eval;

            tabu_list.push_back(current_route.clone());
            if tabu_list.len() > self.tabu_size {
                tabu_list.pop_front();
            }

            if priority_objective(priority, &current_eval)
                < priority_objective(priority, &best_eval)
            {
                best_route = current_route.clone();
                best_eval = current_eval.clone();
            }
        }

        (best_route, best_eval)
    }

    /// Hub-substitution neighborhood: every intermediate airport/port
    /// swapped with every other node of the same type such that both
    /// resulting consecutive edges exist.
    fn neighbors(
        &self,
        network: &Network,
        route: &Route,
        cargo_weight: f64,
        goods_type: GoodsType,
        tabu_list: &VecDeque<Route>,
    ) -> Vec<(Route, RouteEval)> {
        let mut neighbors = Vec::new();
        if route.len() < 4 {
            return neighbors;
        }

        for position in 1..route.len() - 1 {
            let Some(node) = network.get_node(&route[position]) else {
                continue;
            };
            if !node.kind.is_hub() {
                continue;
            }

            for replacement in network.hub_names(node.kind) {
                if replacement == route[position] {
                    continue;
                }
                if !network.has_edge(&route[position - 1], &replacement)
                    || !network.has_edge(&replacement, &route[position + 1])
                {
                    continue;
                }

                let mut candidate = route.clone();
                candidate[position] = replacement;
                if tabu_list.contains(&candidate) {
                    continue;
                }

                let eval = evaluate_route(network, &candidate, cargo_weight, goods_type);
                if eval.valid {
                    neighbors.push((candidate, eval));
                }
            }
        }
        neighbors
    }
}

/// The scalar objective steering the refinement: time alone for the
/// time priority, a time-dominated weighted sum for everything else.
fn priority_objective(priority: Priority, eval: &RouteEval) -> f64 {
    match priority {
        Priority::Time => eval.total_time,
        _ => eval.total_cost + eval.total_time * 1000.0,
    }
}
