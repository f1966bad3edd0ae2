//! Container classification.
//!
//! Picks the smallest container class of a transport mode whose rated
//! capacity covers the cargo weight.

use crate::graph::TransportMode;
use crate::{EngineError, EngineResult};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// One row of the container specification table.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerRecord {
    #[serde(rename = "Transport Mode")]
    pub mode: String,
    #[serde(rename = "Container Type")]
    pub container_type: String,
    #[serde(rename = "Weight Capacity (kg)")]
    pub capacity_kg: f64,
}

/// The chosen class for a shipment, with a capacity-breach flag.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ContainerChoice {
    pub container_type: String,
    pub capacity_kg: f64,
    /// True when even the largest class of the mode is too small.
    pub exceeded: bool,
}

pub struct ContainerTable(pub Vec<ContainerRecord>);

impl ContainerTable {
    pub fn load(path: &Path) -> EngineResult<Self> {
        let file = std::fs::File::open(path).map_err(|source| EngineError::Table {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_reader(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Self {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut rows = Vec::new();
        for (index, result) in csv_reader.deserialize::<ContainerRecord>().enumerate() {
            match result {
                Ok(row) => rows.push(row),
                Err(e) => warn!(row = index + 2, error = %e, "skipping malformed container row"),
            }
        }
        ContainerTable(rows)
    }

    /// Smallest class of `mode` whose capacity covers `weight_kg`, or
    /// the largest class flagged `exceeded`. `None` when the table has
    /// no rows for the mode.
    pub fn classify(&self, mode: TransportMode, weight_kg: f64) -> Option<ContainerChoice> {
        let mut classes: Vec<&ContainerRecord> = self
            .0
            .iter()
            .filter(|r| r.mode.eq_ignore_ascii_case(mode.as_str()))
            .collect();
        if classes.is_empty() {
            return None;
        }

        classes.sort_by(|a, b| a.capacity_kg.total_cmp(&b.capacity_kg));

        if let Some(fit) = classes.iter().find(|r| r.capacity_kg >= weight_kg) {
            return Some(ContainerChoice {
                container_type: fit.container_type.clone(),
                capacity_kg: fit.capacity_kg,
                exceeded: false,
            });
        }

        let largest = classes[classes.len() - 1];
        Some(ContainerChoice {
            container_type: largest.container_type.clone(),
            capacity_kg: largest.capacity_kg,
            exceeded: true,
        })
    }
}
