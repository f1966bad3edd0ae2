//! Candidate route enumeration.
//!
//! Produces node sequences following the realistic multi-modal
//! templates: a direct road leg, or a road-air-road / road-sea-road
//! bridge through hubs in the endpoint countries. Enumeration order is
//! deterministic for a fully built graph.

use crate::graph::{Network, NodeKind, TransportMode};

/// A candidate route: ordered node names, source first.
pub type Route = Vec<String>;

/// Enumerate candidate routes, truncated to `max_routes`.
pub fn enumerate_routes(
    network: &Network,
    source: &str,
    destination: &str,
    max_routes: usize,
) -> Vec<Route> {
    let mut routes: Vec<Route> = Vec::new();

    let source_country = network
        .get_node(source)
        .map(|n| n.country.clone())
        .unwrap_or_default();
    let dest_country = network
        .get_node(destination)
        .map(|n| n.country.clone())
        .unwrap_or_default();

    // 1. Direct road.
    if matches!(
        network.edge_between(source, destination).map(|e| e.mode()),
        Some(TransportMode::Road)
    ) {
        routes.push(vec![source.to_string(), destination.to_string()]);
    }

    // 2. Air bridge, 3. Sea bridge: hubs reachable by road on each end,
    // joined by a scheduled lane of the matching mode.
    for kind in [NodeKind::Airport, NodeKind::Port] {
        let exclude = [source, destination];
        let departure_hubs: Vec<String> = network
            .hubs_in_country(&source_country, kind, &exclude)
            .filter(|hub| network.has_edge(source, &hub.name))
            .map(|hub| hub.name.clone())
            .collect();
        let arrival_hubs: Vec<String> = network
            .hubs_in_country(&dest_country, kind, &exclude)
            .filter(|hub| network.has_edge(&hub.name, destination))
            .map(|hub| hub.name.clone())
            .collect();

        for departure in &departure_hubs {
            for arrival in &arrival_hubs {
                if network.has_edge(departure, arrival) {
                    routes.push(vec![
                        source.to_string(),
                        departure.clone(),
                        arrival.clone(),
                        destination.to_string(),
                    ]);
                }
            }
        }
    }

    routes.truncate(max_routes);
    routes
}
