//! Route optimization.
//!
//! Two stages. Stage 1 is a reference-direction multi-objective search
//! over candidate-route indices, minimizing cost, time, and goods
//! impact simultaneously; survivors are the Pareto-favorable picks.
//! Stage 2 ([`TabuSearch`]) locally refines each pick by swapping
//! transit hubs.

mod tabu;

pub use tabu::TabuSearch;

use crate::candidates::Route;
use crate::eval::{GoodsType, RouteEval};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tracing::debug;

/// An evaluated candidate, the unit the optimizer shuffles.
pub type Evaluated = (Route, RouteEval);

/// Stage-1 population search over candidate indices.
///
/// The decision space is the index set `[0, N)`; three objectives are
/// minimized: total cost, total time, and the goods impact score (zero
/// for standard cargo). Selection uses fast non-dominated sorting with
/// Das-Dennis reference-point niching, deterministic under the fixed
/// seed.
pub struct PopulationSearch {
    pub population_size: usize,
    pub generations: usize,
    pub partitions: usize,
    pub seed: u64,
    pub mutation_rate: f64,
}

impl Default for PopulationSearch {
    fn default() -> Self {
        PopulationSearch {
            population_size: 100,
            generations: 50,
            partitions: 12,
            seed: 42,
            mutation_rate: 0.2,
        }
    }
}

impl PopulationSearch {
    /// Run the search and return the Pareto-favorable candidates first,
    /// followed by every remaining original candidate. Nothing the
    /// sampling missed is discarded.
    pub fn select(&self, candidates: &[Evaluated], goods_type: GoodsType) -> Vec<Evaluated> {
        let n = candidates.len();
        if n <= 1 {
            return candidates.to_vec();
        }

        let objectives: Vec<[f64; 3]> = candidates
            .iter()
            .map(|(_, eval)| objective_vector(eval, goods_type))
            .collect();

        let directions = reference_directions(self.partitions);
        let mut rng = SmallRng::seed_from_u64(self.seed);

        // Initial population of indices.
        let mut population: Vec<usize> = (0..self.population_size)
            .map(|_| rng.gen_range(0..n))
            .collect();

        for _ in 0..self.generations {
            let ranks = individual_ranks(&population, &objectives);

            // Binary tournament on Pareto rank, then occasional random
            // reset to keep the whole index set reachable.
            let mut offspring = Vec::with_capacity(self.population_size);
            for _ in 0..self.population_size {
                let a = rng.gen_range(0..population.len());
                let b = rng.gen_range(0..population.len());
                let parent = if ranks[a] <= ranks[b] {
                    population[a]
                } else {
                    population[b]
                };
                let child = if rng.gen_bool(self.mutation_rate) {
                    rng.gen_range(0..n)
                } else {
                    parent
                };
                offspring.push(child);
            }

            let mut combined = population;
            combined.extend(offspring);
            population = self.survive(&combined, &objectives, &directions);
        }

        // Final population: first front first, deduplicated by index.
        let fronts = non_dominated_sort(&member_objectives(&population, &objectives));
        let mut seen: HashSet<usize> = HashSet::new();
        let mut selected: Vec<Evaluated> = Vec::new();
        for front in fronts {
            for position in front {
                let index = population[position];
                if seen.insert(index) {
                    selected.push(candidates[index].clone());
                }
            }
        }

        debug!(
            candidates = n,
            survivors = seen.len(),
            "population search finished"
        );

        // Union with original candidates the sampling never visited.
        for (index, candidate) in candidates.iter().enumerate() {
            if !seen.contains(&index) {
                selected.push(candidate.clone());
            }
        }
        selected
    }

    /// Environmental selection: fill whole fronts, then niche the split
    /// front against the reference directions.
    fn survive(
        &self,
        combined: &[usize],
        objectives: &[[f64; 3]],
        directions: &[[f64; 3]],
    ) -> Vec<usize> {
        let member_objs = member_objectives(combined, objectives);
        let fronts = non_dominated_sort(&member_objs);

        let mut survivors: Vec<usize> = Vec::with_capacity(self.population_size);
        let mut niche_counts = vec![0usize; directions.len()];
        let normalized = normalize(&member_objs);

        for front in fronts {
            if survivors.len() + front.len() <= self.population_size {
                for &position in &front {
                    let (niche, _) = associate(&normalized[position], directions);
                    niche_counts[niche] += 1;
                    survivors.push(combined[position]);
                }
                if survivors.len() == self.population_size {
                    break;
                }
                continue;
            }

            // Split front: repeatedly take from the least-crowded niche
            // the member closest to its direction.
            let mut remaining: Vec<(usize, usize, f64)> = front
                .iter()
                .map(|&position| {
                    let (niche, distance) = associate(&normalized[position], directions);
                    (position, niche, distance)
                })
                .collect();

            while survivors.len() < self.population_size && !remaining.is_empty() {
                let min_count = remaining
                    .iter()
                    .map(|&(_, niche, _)| niche_counts[niche])
                    .min()
                    .expect("remaining not empty");
                let pick = remaining
                    .iter()
                    .enumerate()
                    .filter(|(_, &(_, niche, _))| niche_counts[niche] == min_count)
                    .min_by(|(_, a), (_, b)| a.2.total_cmp(&b.2))
                    .map(|(slot, _)| slot)
                    .expect("remaining not empty");
                let (position, niche, _) = remaining.swap_remove(pick);
                niche_counts[niche] += 1;
                survivors.push(combined[position]);
            }
            break;
        }

        survivors
    }
}

/// The three minimized objectives for one evaluation.
pub fn objective_vector(eval: &RouteEval, goods_type: GoodsType) -> [f64; 3] {
    let goods_impact = if goods_type == GoodsType::Standard {
        0.0
    } else {
        eval.goods_type_score
    };
    [eval.total_cost, eval.total_time, goods_impact]
}

fn member_objectives(members: &[usize], objectives: &[[f64; 3]]) -> Vec<[f64; 3]> {
    members.iter().map(|&index| objectives[index]).collect()
}

/// Pareto rank of each population slot.
fn individual_ranks(population: &[usize], objectives: &[[f64; 3]]) -> Vec<usize> {
    let member_objs = member_objectives(population, objectives);
    let fronts = non_dominated_sort(&member_objs);
    let mut ranks = vec![0usize; population.len()];
    for (rank, front) in fronts.iter().enumerate() {
        for &position in front {
            ranks[position] = rank;
        }
    }
    ranks
}

fn dominates(a: &[f64; 3], b: &[f64; 3]) -> bool {
    let no_worse = a.iter().zip(b.iter()).all(|(x, y)| x <= y);
    let strictly_better = a.iter().zip(b.iter()).any(|(x, y)| x < y);
    no_worse && strictly_better
}

/// Fast non-dominated sort; returns fronts of positions, best first.
fn non_dominated_sort(objectives: &[[f64; 3]]) -> Vec<Vec<usize>> {
    let n = objectives.len();
    let mut dominated_by: Vec<usize> = vec![0; n];
    let mut dominates_list: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in 0..n {
        for j in (i + 1)..n {
            if dominates(&objectives[i], &objectives[j]) {
                dominates_list[i].push(j);
                dominated_by[j] += 1;
            } else if dominates(&objectives[j], &objectives[i]) {
                dominates_list[j].push(i);
                dominated_by[i] += 1;
            }
        }
    }

    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| dominated_by[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            for &j in &dominates_list[i] {
                dominated_by[j] -= 1;
                if dominated_by[j] == 0 {
                    next.push(j);
                }
            }
        }
        fronts.push(std::mem::take(&mut current));
        current = next;
    }
    fronts
}

/// Min-max normalization against the ideal and nadir points.
fn normalize(objectives: &[[f64; 3]]) -> Vec<[f64; 3]> {
    let mut ideal = [f64::INFINITY; 3];
    let mut nadir = [f64::NEG_INFINITY; 3];
    for obj in objectives {
        for axis in 0..3 {
            ideal[axis] = ideal[axis].min(obj[axis]);
            nadir[axis] = nadir[axis].max(obj[axis]);
        }
    }

    objectives
        .iter()
        .map(|obj| {
            let mut normalized = [0.0; 3];
            for axis in 0..3 {
                let span = nadir[axis] - ideal[axis];
                normalized[axis] = if span > 0.0 {
                    (obj[axis] - ideal[axis]) / span
                } else {
                    0.0
                };
            }
            normalized
        })
        .collect()
}

/// Nearest reference direction by perpendicular distance.
fn associate(point: &[f64; 3], directions: &[[f64; 3]]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (index, direction) in directions.iter().enumerate() {
        let distance = perpendicular_distance(point, direction);
        if distance < best.1 {
            best = (index, distance);
        }
    }
    best
}

fn perpendicular_distance(point: &[f64; 3], direction: &[f64; 3]) -> f64 {
    let norm = direction.iter().map(|d| d * d).sum::<f64>().sqrt();
    let dot: f64 = point.iter().zip(direction.iter()).map(|(p, d)| p * d).sum();
    let projection = dot / norm;

    let mut squared = 0.0;
    for axis in 0..3 {
        let component = point[axis] - projection * direction[axis] / norm;
        squared += component * component;
    }
    squared.sqrt()
}

/// Das-Dennis uniform simplex partition for three objectives: all
/// non-negative integer triples summing to `partitions`, scaled onto
/// the unit simplex.
pub fn reference_directions(partitions: usize) -> Vec<[f64; 3]> {
    let p = partitions as f64;
    let mut directions = Vec::new();
    for i in 0..=partitions {
        for j in 0..=(partitions - i) {
            let k = partitions - i - j;
            directions.push([i as f64 / p, j as f64 / p, k as f64 / p]);
        }
    }
    directions
}
