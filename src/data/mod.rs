//! Tabular inputs.
//!
//! The engine consumes three CSV tables (UTF-8, header row): scheduled
//! flight lanes, scheduled shipping lanes, and a location database of
//! known cities, airports, and ports. Malformed rows are skipped with a
//! warning; a missing file is a hard configuration error.

use crate::geocode::{Coords, Geocoder};
use crate::{EngineError, EngineResult};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// One scheduled flight lane.
///
/// `cost` is per kg, `travel_time` in hours. `distance_km` is optional;
/// absent values are estimated from flight time at evaluation.
#[derive(Debug, Clone, Deserialize)]
pub struct FlightRecord {
    pub departure_airport: String,
    pub arrival_airport: String,
    pub cost: f64,
    pub travel_time: f64,
    #[serde(default)]
    pub distance_km: Option<f64>,
}

/// One scheduled shipping lane. `cost` per kg, `travel_time` in days.
#[derive(Debug, Clone, Deserialize)]
pub struct ShippingRecord {
    pub departure_port: String,
    pub arrival_port: String,
    pub cost: f64,
    pub travel_time: f64,
}

/// One known location from the location database.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationRecord {
    pub city: String,
    pub country: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub code: Option<String>,
}

impl LocationRecord {
    /// Lookup key: the code when present, the city name otherwise.
    pub fn key(&self) -> &str {
        match self.code.as_deref() {
            Some(code) if !code.is_empty() => code,
            _ => &self.city,
        }
    }
}

#[derive(Debug)]
pub struct FlightTable(pub Vec<FlightRecord>);
pub struct ShippingTable(pub Vec<ShippingRecord>);
pub struct LocationTable(pub Vec<LocationRecord>);

impl FlightTable {
    pub fn load(path: &Path) -> EngineResult<Self> {
        read_table(path).map(FlightTable)
    }

    pub fn from_reader<R: Read>(reader: R) -> Self {
        FlightTable(read_rows(reader, "<reader>"))
    }
}

impl ShippingTable {
    pub fn load(path: &Path) -> EngineResult<Self> {
        read_table(path).map(ShippingTable)
    }

    pub fn from_reader<R: Read>(reader: R) -> Self {
        ShippingTable(read_rows(reader, "<reader>"))
    }
}

impl LocationTable {
    pub fn load(path: &Path) -> EngineResult<Self> {
        read_table(path).map(LocationTable)
    }

    pub fn from_reader<R: Read>(reader: R) -> Self {
        LocationTable(read_rows(reader, "<reader>"))
    }

    /// Seed the geocoder's in-process tier so known hubs resolve
    /// without touching the upstream service.
    pub fn seed_geocoder(&self, geocoder: &Geocoder) {
        for record in &self.0 {
            let coords = Coords::new(record.lon, record.lat);
            geocoder.seed(record.key(), coords, &record.country);
            if record.key() != record.city {
                geocoder.seed(&record.city, coords, &record.country);
            }
        }
    }
}

fn read_table<T: for<'de> Deserialize<'de>>(path: &Path) -> EngineResult<Vec<T>> {
    let file = std::fs::File::open(path).map_err(|source| EngineError::Table {
        path: path.display().to_string(),
        source,
    })?;
    Ok(read_rows(file, &path.display().to_string()))
}

fn read_rows<T: for<'de> Deserialize<'de>, R: Read>(reader: R, origin: &str) -> Vec<T> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for (index, result) in csv_reader.deserialize().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => warn!(origin, row = index + 2, error = %e, "skipping malformed row"),
        }
    }
    rows
}
