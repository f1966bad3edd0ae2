//! Geocoding with tiered caching.
//!
//! Resolves free-form place names to coordinates and a country via four
//! tiers, stopping on the first hit: the in-process cache, a persistent
//! cache file, a built-in table of known port coordinates, and finally
//! an upstream Nominatim-compatible service. Upstream hits update the
//! first two tiers; upstream failures degrade to a configurable
//! fallback coordinate instead of erroring.
//!
//! The upstream service is rate limited to one request per interval
//! (default 1 s) across the whole process, independent of caller
//! concurrency.

use crate::config::Config;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// A longitude/latitude pair.
///
/// Stored and rendered in `lon,lat` order, the wire order of both
/// upstream services. Result builders flip to `(lat, lon)`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coords {
    pub lon: f64,
    pub lat: f64,
}

impl Coords {
    pub fn new(lon: f64, lat: f64) -> Self {
        Coords { lon, lat }
    }

    /// `(lat, lon)` ordering for map-facing consumers.
    pub fn lat_lon(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lon, self.lat)
    }
}

impl FromStr for Coords {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lon, lat) = s.split_once(',').unwrap_or((s, ""));
        Ok(Coords {
            lon: lon.trim().parse()?,
            lat: lat.trim().parse()?,
        })
    }
}

/// Outcome of a resolution: coordinates plus country, with a flag for
/// the degraded fallback path.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub coords: Coords,
    pub country: String,
    /// True when every tier missed and `coords` is the configured
    /// fallback. Callers treat this as degraded, not as an error.
    pub degraded: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
struct CacheEntry {
    coords: String,
    country: String,
}

/// In-process cache slot. Misses are remembered too, so a failing name
/// costs at most one upstream round-trip per process.
#[derive(Debug, Clone)]
enum MemoryEntry {
    Hit(CacheEntry),
    Miss,
}

/// Raw hit from the Nominatim-compatible search endpoint. `lon`/`lat`
/// arrive as strings.
#[derive(Debug, Deserialize)]
struct GeocodeHit {
    lon: String,
    lat: String,
    #[serde(default)]
    address: GeocodeAddress,
}

#[derive(Debug, Default, Deserialize)]
struct GeocodeAddress {
    country: Option<String>,
}

/// The geocoder. One value per process; clones of an `Arc<Geocoder>`
/// share the caches and the rate-limit gate.
pub struct Geocoder {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    interval: Duration,
    fallback: Coords,
    cache_path: PathBuf,
    /// Tier 1: process-lifetime cache, append-only.
    memory: Mutex<HashMap<String, MemoryEntry>>,
    /// Tier 2: snapshot of the persistent cache file, rewritten on update.
    persistent: Mutex<HashMap<String, CacheEntry>>,
    /// Serializes upstream request initiation.
    gate: tokio::sync::Mutex<()>,
}

impl Geocoder {
    pub fn new(config: &Config) -> Self {
        let cache_path = PathBuf::from(&config.geocode_cache_path);
        let persistent = load_cache_file(&cache_path);
        let fallback = config
            .fallback_coords
            .parse()
            .unwrap_or(Coords::new(77.1025, 28.7041));

        Geocoder {
            client: reqwest::Client::builder()
                .timeout(config.geocode_timeout)
                .build()
                .unwrap_or_default(),
            base_url: config.geocoder_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            interval: config.geocode_interval,
            fallback,
            cache_path,
            memory: Mutex::new(HashMap::new()),
            persistent: Mutex::new(persistent),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Pre-load the in-process tier, e.g. from the locations table.
    /// Known hubs never reach the upstream service.
    pub fn seed(&self, name: &str, coords: Coords, country: &str) {
        let entry = CacheEntry {
            coords: coords.to_string(),
            country: country.to_string(),
        };
        self.memory
            .lock()
            .expect("geocoder cache poisoned")
            .insert(name.to_string(), MemoryEntry::Hit(entry));
    }

    /// Resolve a place name to coordinates and country.
    ///
    /// Inputs that already look like `"<number>,<number>"` are returned
    /// verbatim without any lookup. A full miss returns the fallback
    /// coordinate with `degraded = true` and country `"Unknown"`.
    pub async fn resolve(&self, location: &str) -> Place {
        // Short-circuit literal coordinates.
        if let Ok(coords) = location.parse::<Coords>() {
            return Place {
                coords,
                country: "Unknown".to_string(),
                degraded: false,
            };
        }

        // Tier 1: in-process cache, remembered misses included.
        if let Some(entry) = self
            .memory
            .lock()
            .expect("geocoder cache poisoned")
            .get(location)
            .cloned()
        {
            return match entry {
                MemoryEntry::Hit(entry) => place_from_entry(&entry, self.fallback),
                MemoryEntry::Miss => self.fallback_place(),
            };
        }

        // Tier 2: persistent cache snapshot.
        if let Some(entry) = self
            .persistent
            .lock()
            .expect("geocoder cache poisoned")
            .get(location)
            .cloned()
        {
            self.memory
                .lock()
                .expect("geocoder cache poisoned")
                .insert(location.to_string(), MemoryEntry::Hit(entry.clone()));
            return place_from_entry(&entry, self.fallback);
        }

        // Tier 3: built-in port coordinates. Not cached: a seeded or
        // upstream entry with a real country should still win later.
        if let Some(coords) = builtin_port_coords(location) {
            return Place {
                coords,
                country: "Unknown".to_string(),
                degraded: false,
            };
        }

        // Tier 4: upstream service.
        match self.query_upstream(location).await {
            Some((coords, country)) => {
                let entry = CacheEntry {
                    coords: coords.to_string(),
                    country: country.clone(),
                };
                self.memory
                    .lock()
                    .expect("geocoder cache poisoned")
                    .insert(location.to_string(), MemoryEntry::Hit(entry.clone()));
                self.persist(location, entry).await;
                Place {
                    coords,
                    country,
                    degraded: false,
                }
            }
            None => {
                warn!(location, "geocoding failed, using fallback coordinates");
                self.memory
                    .lock()
                    .expect("geocoder cache poisoned")
                    .insert(location.to_string(), MemoryEntry::Miss);
                self.fallback_place()
            }
        }
    }

    fn fallback_place(&self) -> Place {
        Place {
            coords: self.fallback,
            country: "Unknown".to_string(),
            degraded: true,
        }
    }

    /// Country for a node name; `"Unknown"` when unresolvable.
    pub async fn country_of(&self, location: &str) -> String {
        self.resolve(location).await.country
    }

    async fn query_upstream(&self, location: &str) -> Option<(Coords, String)> {
        // Gate initiation: the upstream terms require one request per
        // interval process-wide. Concurrent callers queue here; each
        // waits the full interval before its request goes out.
        {
            let _gate = self.gate.lock().await;
            tokio::time::sleep(self.interval).await;
        }

        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("q", location),
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "1"),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(location, error = %e, "geocoding request failed");
                return None;
            }
        };

        let hits: Vec<GeocodeHit> = match response.json().await {
            Ok(h) => h,
            Err(e) => {
                warn!(location, error = %e, "malformed geocoding response");
                return None;
            }
        };

        let hit = hits.into_iter().next()?;
        let lon: f64 = hit.lon.parse().ok()?;
        let lat: f64 = hit.lat.parse().ok()?;
        let country = hit.address.country.unwrap_or_else(|| "Unknown".to_string());
        debug!(location, lon, lat, country, "geocoded upstream");
        Some((Coords::new(lon, lat), country))
    }

    /// Read-modify-write of the cache file, atomically rewritten via a
    /// temp file. Write failures log and continue.
    async fn persist(&self, location: &str, entry: CacheEntry) {
        let snapshot = {
            let mut persistent = self.persistent.lock().expect("geocoder cache poisoned");
            persistent.insert(location.to_string(), entry);
            persistent.clone()
        };

        let payload = match serde_json::to_vec_pretty(&snapshot) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "could not serialize geocode cache");
                return;
            }
        };

        let tmp = self.cache_path.with_extension("json.tmp");
        if let Err(e) = tokio::fs::write(&tmp, payload).await {
            warn!(path = %tmp.display(), error = %e, "could not write geocode cache");
            return;
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.cache_path).await {
            warn!(path = %self.cache_path.display(), error = %e, "could not replace geocode cache");
        }
    }
}

fn place_from_entry(entry: &CacheEntry, fallback: Coords) -> Place {
    let coords = entry.coords.parse().unwrap_or(fallback);
    Place {
        coords,
        country: entry.country.clone(),
        degraded: false,
    }
}

fn load_cache_file(path: &PathBuf) -> HashMap<String, CacheEntry> {
    match std::fs::read(path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable geocode cache");
                HashMap::new()
            }
        },
        // Missing file is the normal first run; other read errors are
        // equally non-fatal.
        Err(_) => HashMap::new(),
    }
}

/// Known seaport coordinates that public geocoders resolve poorly.
fn builtin_port_coords(name: &str) -> Option<Coords> {
    let coords = match name {
        "Port of Houston" => Coords::new(-95.297241, 29.614658),
        "Port of Seattle-Tacoma" => Coords::new(-122.3375, 47.5703),
        "Port of Jebel Ali" => Coords::new(55.0272904, 25.0013084),
        "Mumbai Port" => Coords::new(72.8321, 18.9517),
        "Port of Shanghai" => Coords::new(121.677966, 31.230416),
        _ => return None,
    };
    Some(coords)
}
