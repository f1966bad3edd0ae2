//! Transport network graph.
//!
//! In-memory directed multigraph of cities, airports, and seaports,
//! scoped to a single planning request. Edges carry a per-mode payload;
//! nodes carry type, country, and coordinates.

use crate::geocode::Coords;
use crate::road::RoadEstimate;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Transport mode of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Road,
    Air,
    Sea,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Road => "road",
            TransportMode::Air => "air",
            TransportMode::Sea => "sea",
        }
    }

    /// Carbon emission factor, kg CO₂ per kg-km of cargo moved.
    pub fn co2_factor(&self) -> f64 {
        match self {
            TransportMode::Road => 0.1053,
            TransportMode::Air => 0.5015,
            TransportMode::Sea => 0.0251,
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a node is: an endpoint city or a transit hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    City,
    Airport,
    Port,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::City => "city",
            NodeKind::Airport => "airport",
            NodeKind::Port => "port",
        }
    }

    /// Hubs are the nodes eligible for substitution during refinement.
    pub fn is_hub(&self) -> bool {
        matches!(self, NodeKind::Airport | NodeKind::Port)
    }
}

/// A node in the transport network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkNode {
    pub name: String,
    pub kind: NodeKind,
    pub country: String,
    pub coords: Coords,
}

/// Per-mode edge payload.
#[derive(Debug, Clone, Serialize)]
pub enum EdgeData {
    /// A priced road leg from the road router.
    Road(RoadEstimate),
    /// A scheduled flight lane; cost is per kg.
    Air {
        cost_per_kg: f64,
        time_hr: f64,
        distance_km: Option<f64>,
    },
    /// A scheduled shipping lane; cost is per kg, time already in hours.
    Sea {
        cost_per_kg: f64,
        time_hr: f64,
        distance_km: Option<f64>,
    },
}

impl EdgeData {
    pub fn mode(&self) -> TransportMode {
        match self {
            EdgeData::Road(_) => TransportMode::Road,
            EdgeData::Air { .. } => TransportMode::Air,
            EdgeData::Sea { .. } => TransportMode::Sea,
        }
    }

    pub fn time_hr(&self) -> f64 {
        match self {
            EdgeData::Road(leg) => leg.time_hr,
            EdgeData::Air { time_hr, .. } | EdgeData::Sea { time_hr, .. } => *time_hr,
        }
    }
}

/// The transport network for one request.
pub struct Network {
    graph: DiGraph<NetworkNode, EdgeData>,
    /// Map from node name to graph index.
    node_index: HashMap<String, NodeIndex>,
}

impl Network {
    pub fn new() -> Self {
        Network {
            graph: DiGraph::new(),
            node_index: HashMap::new(),
        }
    }

    /// Add a node, or return the existing index for its name.
    pub fn ensure_node(&mut self, node: NetworkNode) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&node.name) {
            return idx;
        }
        let name = node.name.clone();
        let idx = self.graph.add_node(node);
        self.node_index.insert(name, idx);
        idx
    }

    /// Add a directed edge between two named nodes. Returns false when
    /// either endpoint is missing.
    pub fn add_edge(&mut self, from: &str, to: &str, edge: EdgeData) -> bool {
        match (self.node_index.get(from), self.node_index.get(to)) {
            (Some(&from_idx), Some(&to_idx)) => {
                self.graph.add_edge(from_idx, to_idx, edge);
                true
            }
            _ => false,
        }
    }

    pub fn get_node(&self, name: &str) -> Option<&NetworkNode> {
        self.node_index.get(name).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_index.contains_key(name)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edge_between(from, to).is_some()
    }

    /// The edge payload between two named nodes, if any.
    pub fn edge_between(&self, from: &str, to: &str) -> Option<&EdgeData> {
        let &from_idx = self.node_index.get(from)?;
        let &to_idx = self.node_index.get(to)?;
        let edge = self.graph.find_edge(from_idx, to_idx)?;
        self.graph.edge_weight(edge)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NetworkNode> {
        self.graph.node_weights()
    }

    /// Hub nodes of a given kind in a given country, excluding the
    /// request endpoints.
    pub fn hubs_in_country<'a>(
        &'a self,
        country: &'a str,
        kind: NodeKind,
        exclude: &'a [&'a str],
    ) -> impl Iterator<Item = &'a NetworkNode> {
        self.graph.node_weights().filter(move |n| {
            n.kind == kind && n.country == country && !exclude.contains(&n.name.as_str())
        })
    }

    /// All hub nodes of a given kind, by name.
    pub fn hub_names(&self, kind: NodeKind) -> Vec<String> {
        self.graph
            .node_weights()
            .filter(|n| n.kind == kind)
            .map(|n| n.name.clone())
            .collect()
    }

    /// Count edges by mode.
    pub fn edge_count_by_mode(&self) -> HashMap<TransportMode, usize> {
        let mut counts = HashMap::new();
        for edge in self.graph.edge_weights() {
            *counts.entry(edge.mode()).or_insert(0) += 1;
        }
        counts
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed country-to-continent table. Unknown countries map to no
/// continent and therefore never satisfy the cross-country road rule.
pub fn continent_of(country: &str) -> Option<&'static str> {
    let continent = match country {
        "India" | "China" | "Singapore" | "Hong Kong" | "Japan" | "UAE"
        | "United Arab Emirates" => "Asia",
        "USA" | "United States" | "Canada" | "Mexico" => "North America",
        "Netherlands" | "UK" | "United Kingdom" | "Germany" | "France" => "Europe",
        _ => return None,
    };
    Some(continent)
}

pub fn same_continent(country_a: &str, country_b: &str) -> bool {
    match (continent_of(country_a), continent_of(country_b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Whether a road leg between two countries at a given distance is
/// physically plausible: same country, or same continent, and never
/// beyond 5000 km.
pub fn road_feasible(source_country: &str, dest_country: &str, distance_km: f64) -> bool {
    if source_country != dest_country && !same_continent(source_country, dest_country) {
        return false;
    }
    distance_km <= 5000.0
}
