//! Location resolution: device position, reverse geocoding and debounced
//! place search, folded into one canonical result.
//!
//! Detection never fails. Any problem along the way (permission denied,
//! no fix within the timeout, geocoder down) yields [`LocationRecord::fallback`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Config, Platform};
use crate::utils::latest::{LatestRequest, Ticket};
use crate::utils::validation::normalize_label;

/// A position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A reverse geocoded place.
///
/// `address`, `city` and `state` are always filled; the finer parts are
/// only present when the geocoder returned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub address: String,
    pub city: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
}

impl LocationRecord {
    /// Used whenever detection fails.
    pub fn fallback() -> Self {
        Self {
            address: "Lagos, Nigeria".to_string(),
            city: "Lagos".to_string(),
            state: "Lagos".to_string(),
            latitude: 6.5244,
            longitude: 3.3792,
            street_number: None,
            street_name: None,
            postal_code: None,
            country: Some("Nigeria".to_string()),
            district: None,
            locality: None,
        }
    }

    /// The position this record was resolved from.
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Device position provider.
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Whether permission must be asked for explicitly before reading a fix.
    fn requires_runtime_permission(&self) -> bool;
    async fn request_permission(&self) -> bool;
    /// Read a single position fix.
    async fn current_position(&self) -> Result<Coordinates>;
}

/// Forward and reverse geocoding.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Describe the place at `coords`.
    async fn reverse(&self, coords: Coordinates) -> Result<LocationRecord>;
    /// Place labels matching `query`, best first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>>;
}

/// Reports the position set in the config file. Terminals have no GPS.
#[derive(Debug, Clone)]
pub struct ConfiguredGeolocator {
    platform: Platform,
    position: Option<Coordinates>,
}

impl ConfiguredGeolocator {
    /// Read the coordinates from `config`. Without them every fix fails
    /// and detection falls back.
    pub fn from_config(config: &Config) -> Self {
        let position = match (config.location.device_latitude, config.location.device_longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Self {
            platform: config.platform,
            position,
        }
    }
}

#[async_trait]
impl Geolocator for ConfiguredGeolocator {
    fn requires_runtime_permission(&self) -> bool {
        self.platform.requires_runtime_permission()
    }

    async fn request_permission(&self) -> bool {
        self.position.is_some()
    }

    async fn current_position(&self) -> Result<Coordinates> {
        match self.position {
            Some(position) => Ok(position),
            None => bail!("No device position configured"),
        }
    }
}

/// Areas offered as suggestions even when the search service has nothing.
pub const KNOWN_AREAS: &[(&str, &str)] = &[
    ("Ikeja", "Lagos"),
    ("Lekki", "Lagos"),
    ("Victoria Island", "Lagos"),
    ("Ikoyi", "Lagos"),
    ("Surulere", "Lagos"),
    ("Yaba", "Lagos"),
    ("Ajah", "Lagos"),
    ("Gbagada", "Lagos"),
    ("Maryland", "Lagos"),
    ("Festac", "Lagos"),
    ("Wuse", "Abuja"),
    ("Garki", "Abuja"),
    ("Maitama", "Abuja"),
    ("Asokoro", "Abuja"),
    ("Gwarinpa", "Abuja"),
    ("Port Harcourt", "Rivers"),
    ("Ibadan", "Oyo"),
    ("Benin City", "Edo"),
    ("Enugu", "Enugu"),
    ("Kano", "Kano"),
];

fn known_area_matches(query: &str) -> Vec<String> {
    let needle = normalize_label(query);
    KNOWN_AREAS
        .iter()
        .map(|(area, state)| format!("{area}, {state}"))
        .filter(|label| normalize_label(label).contains(&needle))
        .collect()
}

/// Remote results first, then known areas, without case-insensitive repeats.
pub fn merge_suggestions(remote: Vec<String>, local: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    remote
        .into_iter()
        .chain(local)
        .filter(|label| !label.trim().is_empty())
        .filter(|label| seen.insert(normalize_label(label)))
        .collect()
}

/// Split an "Area, State" label into (city, state). A label without a
/// comma is looked up among the known areas, else used for both.
pub fn infer_city_state(label: &str) -> (String, String) {
    let parts: Vec<&str> = label
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    match parts.as_slice() {
        [] => (String::new(), String::new()),
        [only] => {
            let state = KNOWN_AREAS
                .iter()
                .find(|(area, _)| area.eq_ignore_ascii_case(only))
                .map_or(*only, |(_, state)| *state);
            ((*only).to_string(), state.to_string())
        }
        [city, .., state] => ((*city).to_string(), (*state).to_string()),
    }
}

/// What the user picked on the location screen.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationChoice {
    CurrentLocation,
    Suggestion(String),
}

/// Result handed back to the screen that asked for a location.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedLocation {
    /// The device position, reverse geocoded.
    Detected(LocationRecord),
    /// A suggestion label; city and state are left to the caller.
    Area(String),
}

impl ResolvedLocation {
    /// Text shown in a form field for this location.
    pub fn label(&self) -> String {
        match self {
            ResolvedLocation::Detected(record) => format!("{}, {}", record.city, record.state),
            ResolvedLocation::Area(label) => label.clone(),
        }
    }
}

/// Current-location detection and debounced area search.
///
/// Cloning shares the latest-search counter, so a clone handed to a
/// spawned task still has its results superseded by newer searches.
#[derive(Clone)]
pub struct LocationResolver {
    geolocator: Arc<dyn Geolocator>,
    geocoder: Arc<dyn Geocoder>,
    latest: LatestRequest,
    debounce: Duration,
    geolocation_timeout: Duration,
    search_limit: usize,
}

impl LocationResolver {
    /// Create a resolver.
    ///
    /// # Arguments
    ///
    /// * `geolocator` - Source of the device position.
    /// * `geocoder` - Reverse geocoding and place search.
    /// * `config` - Debounce, timeout and result limit.
    pub fn new(
        geolocator: Arc<dyn Geolocator>,
        geocoder: Arc<dyn Geocoder>,
        config: &Config,
    ) -> Self {
        Self {
            geolocator,
            geocoder,
            latest: LatestRequest::new(),
            debounce: config.search_debounce(),
            geolocation_timeout: config.geolocation_timeout(),
            search_limit: config.geocoding.search_limit,
        }
    }

    /// Device position, reverse geocoded. Falls back instead of failing.
    pub async fn detect_current(&self) -> LocationRecord {
        if self.geolocator.requires_runtime_permission()
            && !self.geolocator.request_permission().await
        {
            warn!("Location permission denied, using fallback location");
            return LocationRecord::fallback();
        }

        let coords = match tokio::time::timeout(
            self.geolocation_timeout,
            self.geolocator.current_position(),
        )
        .await
        {
            Ok(Ok(coords)) => coords,
            Ok(Err(e)) => {
                warn!("Could not read device position: {}", e);
                return LocationRecord::fallback();
            }
            Err(_) => {
                warn!(
                    "No position fix within {:?}, using fallback location",
                    self.geolocation_timeout
                );
                return LocationRecord::fallback();
            }
        };

        match self.geocoder.reverse(coords).await {
            Ok(record) => {
                info!("Detected location: {}, {}", record.city, record.state);
                record
            }
            Err(e) => {
                warn!("Reverse geocoding failed: {:#}", e);
                LocationRecord::fallback()
            }
        }
    }

    /// Start a new search, superseding any in flight.
    pub fn begin_search(&self) -> Ticket {
        self.latest.issue()
    }

    /// Whether no search started after `ticket`.
    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.latest.is_current(ticket)
    }

    /// Debounced suggestions for `query`. `None` when a newer search
    /// started before this one finished; the result must then be dropped.
    pub async fn suggestions(&self, ticket: Ticket, query: &str) -> Option<Vec<String>> {
        tokio::time::sleep(self.debounce).await;
        if !self.is_latest(ticket) {
            return None;
        }

        let query = query.trim();
        if query.is_empty() {
            return Some(Vec::new());
        }

        let remote = match self.geocoder.search(query, self.search_limit).await {
            Ok(labels) => labels,
            Err(e) => {
                warn!("Place search failed: {:#}", e);
                Vec::new()
            }
        };

        if !self.is_latest(ticket) {
            debug!("Dropping results of superseded search {}", ticket.number());
            return None;
        }
        Some(merge_suggestions(remote, known_area_matches(query)))
    }

    /// Turn a picked row into a location. Picking the current location runs
    /// detection, which never fails.
    pub async fn resolve_location(&self, choice: LocationChoice) -> ResolvedLocation {
        match choice {
            LocationChoice::CurrentLocation => ResolvedLocation::Detected(self.detect_current().await),
            LocationChoice::Suggestion(label) => ResolvedLocation::Area(label),
        }
    }
}
