//! Network construction.
//!
//! Assembles the per-request transport graph: air edges from the flight
//! table, sea edges from the shipping table, city endpoints, and road
//! edges from the endpoints to hubs in their own countries. Road
//! queries fan out across a bounded worker pool; results are applied to
//! the graph serially after the join so the build stays deterministic.

use crate::data::{FlightTable, ShippingTable};
use crate::geocode::{Coords, Geocoder};
use crate::graph::{road_feasible, EdgeData, Network, NetworkNode, NodeKind};
use crate::road::{RoadEstimate, RoadRouter};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Builds the transport network for one request.
pub struct NetworkBuilder {
    geocoder: Arc<Geocoder>,
    road_router: RoadRouter,
    workers: usize,
}

/// One road query resolved during the fan-out.
struct FanOutResult {
    order: usize,
    from: String,
    to: String,
    estimate: Option<RoadEstimate>,
}

impl NetworkBuilder {
    pub fn new(geocoder: Arc<Geocoder>, road_router: RoadRouter, workers: usize) -> Self {
        NetworkBuilder {
            geocoder,
            road_router,
            workers: workers.max(1),
        }
    }

    /// Build the graph from the scheduled lanes plus road legs around
    /// the two endpoints.
    pub async fn build(
        &self,
        flights: &FlightTable,
        shipping: &ShippingTable,
        source: &str,
        destination: &str,
    ) -> Network {
        let mut network = Network::new();

        // Air edges. Endpoint countries resolve lazily through the
        // geocoder's cache tiers.
        for row in &flights.0 {
            self.ensure_hub(&mut network, &row.departure_airport, NodeKind::Airport)
                .await;
            self.ensure_hub(&mut network, &row.arrival_airport, NodeKind::Airport)
                .await;
            network.add_edge(
                &row.departure_airport,
                &row.arrival_airport,
                EdgeData::Air {
                    cost_per_kg: row.cost,
                    time_hr: row.travel_time,
                    distance_km: row.distance_km,
                },
            );
        }

        // Sea edges; the table's travel time is in days.
        for row in &shipping.0 {
            self.ensure_hub(&mut network, &row.departure_port, NodeKind::Port)
                .await;
            self.ensure_hub(&mut network, &row.arrival_port, NodeKind::Port)
                .await;
            network.add_edge(
                &row.departure_port,
                &row.arrival_port,
                EdgeData::Sea {
                    cost_per_kg: row.cost,
                    time_hr: row.travel_time * 24.0,
                    distance_km: None,
                },
            );
        }

        // Endpoint cities.
        let source_place = self.geocoder.resolve(source).await;
        let dest_place = self.geocoder.resolve(destination).await;
        if source_place.degraded || dest_place.degraded {
            warn!(source, destination, "an endpoint resolved to fallback coordinates");
        }

        network.ensure_node(NetworkNode {
            name: source.to_string(),
            kind: NodeKind::City,
            country: source_place.country.clone(),
            coords: source_place.coords,
        });
        network.ensure_node(NetworkNode {
            name: destination.to_string(),
            kind: NodeKind::City,
            country: dest_place.country.clone(),
            coords: dest_place.coords,
        });

        info!(
            source,
            source_country = %source_place.country,
            destination,
            dest_country = %dest_place.country,
            "adding road connections"
        );

        // Direct road, when the service finds one and it is plausible.
        if let Some(estimate) = self
            .road_router
            .route(source_place.coords, dest_place.coords)
            .await
        {
            if road_feasible(&source_place.country, &dest_place.country, estimate.distance_km) {
                debug!(distance_km = estimate.distance_km, "direct road connection added");
                network.add_edge(source, destination, EdgeData::Road(estimate));
            }
        }

        // In-country fan-out: source -> hubs, hubs -> destination.
        let exclude = [source, destination];
        let mut tasks: Vec<(String, String, Coords, Coords)> = Vec::new();
        for kind in [NodeKind::Airport, NodeKind::Port] {
            for hub in network.hubs_in_country(&source_place.country, kind, &exclude) {
                tasks.push((
                    source.to_string(),
                    hub.name.clone(),
                    source_place.coords,
                    hub.coords,
                ));
            }
            for hub in network.hubs_in_country(&dest_place.country, kind, &exclude) {
                tasks.push((
                    hub.name.clone(),
                    destination.to_string(),
                    hub.coords,
                    dest_place.coords,
                ));
            }
        }

        debug!(queries = tasks.len(), workers = self.workers, "road fan-out");
        let mut results = self.fan_out(tasks).await;
        results.sort_by_key(|r| r.order);

        for result in results {
            let Some(estimate) = result.estimate else {
                continue;
            };
            let from_country = network
                .get_node(&result.from)
                .map(|n| n.country.clone())
                .unwrap_or_default();
            let to_country = network
                .get_node(&result.to)
                .map(|n| n.country.clone())
                .unwrap_or_default();
            if road_feasible(&from_country, &to_country, estimate.distance_km) {
                network.add_edge(&result.from, &result.to, EdgeData::Road(estimate));
            }
        }

        info!(
            nodes = network.node_count(),
            edges = network.edge_count(),
            "transport network built"
        );
        network
    }

    /// Dispatch road queries across the bounded pool, collecting into a
    /// local vector. Nothing touches the graph until the join.
    async fn fan_out(&self, tasks: Vec<(String, String, Coords, Coords)>) -> Vec<FanOutResult> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut join_set = JoinSet::new();

        for (order, (from, to, from_coords, to_coords)) in tasks.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let router = self.road_router.clone();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let estimate = router.route(from_coords, to_coords).await;
                FanOutResult {
                    order,
                    from,
                    to,
                    estimate,
                }
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "road fan-out worker failed"),
            }
        }
        results
    }

    async fn ensure_hub(&self, network: &mut Network, name: &str, kind: NodeKind) {
        if network.contains(name) {
            return;
        }
        let place = self.geocoder.resolve(name).await;
        network.ensure_node(NetworkNode {
            name: name.to_string(),
            kind,
            country: place.country,
            coords: place.coords,
        });
    }
}
