#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Static neighborhood coordinate tables for map rendering.
//!
//! A [`GeocodingTable`] maps normalized neighborhood names to a fixed
//! centroid. Tables are immutable once built and are handed to the map
//! layer explicitly, so tests can substitute a smaller table. City tables
//! are defined as TOML files in `cities/` and embedded at compile time
//! by the [`registry`].
//!
//! Lookups normalize through [`crime_risk_models::normalize_name`], the
//! same function that builds the reconciler's join keys.

pub mod registry;

use std::collections::BTreeMap;

use crime_risk_models::{GeoCoordinate, NeighborhoodKey};
use serde::Deserialize;
use thiserror::Error;

/// Errors from building a geocoding table.
#[derive(Debug, Error)]
pub enum GeocoderError {
    /// TOML parsing failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Two entries normalize to the same key.
    #[error("Neighborhood '{name}' is listed more than once")]
    DuplicateNeighborhood {
        /// The normalized name.
        name: String,
    },

    /// A coordinate is outside the WGS84 range.
    #[error("Invalid coordinate for '{name}': ({latitude}, {longitude})")]
    InvalidCoordinate {
        /// The neighborhood name.
        name: String,
        /// Latitude as given.
        latitude: f64,
        /// Longitude as given.
        longitude: f64,
    },
}

/// TOML schema for a city coordinate file.
#[derive(Debug, Clone, Deserialize)]
struct CityFile {
    id: String,
    city: String,
    center: GeoCoordinate,
    zoom: u8,
    #[serde(default)]
    neighborhood: Vec<NeighborhoodEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct NeighborhoodEntry {
    name: String,
    latitude: f64,
    longitude: f64,
}

/// Immutable name → coordinate table for one city.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodingTable {
    id: String,
    city: String,
    center: GeoCoordinate,
    zoom: u8,
    entries: BTreeMap<NeighborhoodKey, GeoCoordinate>,
}

impl GeocodingTable {
    /// Parses a city table from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`GeocoderError`] if the TOML is malformed, a coordinate
    /// is out of range, or two names normalize to the same key.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, GeocoderError> {
        let file: CityFile = toml::de::from_str(toml_str)?;

        let mut table = Self {
            id: file.id,
            city: file.city,
            center: file.center,
            zoom: file.zoom,
            entries: BTreeMap::new(),
        };

        for entry in file.neighborhood {
            let coordinate = GeoCoordinate {
                latitude: entry.latitude,
                longitude: entry.longitude,
            };
            if !is_valid(coordinate) {
                return Err(GeocoderError::InvalidCoordinate {
                    name: entry.name,
                    latitude: entry.latitude,
                    longitude: entry.longitude,
                });
            }
            let key = NeighborhoodKey::new(&entry.name);
            if table.entries.insert(key.clone(), coordinate).is_some() {
                return Err(GeocoderError::DuplicateNeighborhood {
                    name: key.to_string(),
                });
            }
        }

        Ok(table)
    }

    /// Builds a table from explicit `(name, coordinate)` pairs.
    ///
    /// Later duplicates replace earlier ones.
    #[must_use]
    pub fn from_entries<'a>(
        city: &str,
        center: GeoCoordinate,
        entries: impl IntoIterator<Item = (&'a str, GeoCoordinate)>,
    ) -> Self {
        Self {
            id: crime_risk_models::normalize_name(city).to_lowercase(),
            city: city.to_string(),
            center,
            zoom: 12,
            entries: entries
                .into_iter()
                .map(|(name, coordinate)| (NeighborhoodKey::new(name), coordinate))
                .collect(),
        }
    }

    /// Returns the embedded Recife table.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed.
    #[must_use]
    pub fn recife() -> Self {
        registry::city("recife").unwrap_or_else(|| panic!("Recife table is not registered"))
    }

    /// Looks up a neighborhood by name, ignoring case, accents, and
    /// extra whitespace. Unknown names yield `None`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<GeoCoordinate> {
        self.lookup_key(&NeighborhoodKey::new(name))
    }

    /// Looks up an already-normalized key.
    #[must_use]
    pub fn lookup_key(&self, key: &NeighborhoodKey) -> Option<GeoCoordinate> {
        self.entries.get(key).copied()
    }

    /// Registry identifier (e.g., `"recife"`).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable city name.
    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Initial map center.
    #[must_use]
    pub const fn center(&self) -> GeoCoordinate {
        self.center
    }

    /// Initial map zoom level.
    #[must_use]
    pub const fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Number of known neighborhoods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no neighborhoods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_valid(c: GeoCoordinate) -> bool {
    (-90.0..=90.0).contains(&c.latitude) && (-180.0..=180.0).contains(&c.longitude)
}
