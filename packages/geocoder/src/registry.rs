//! Compile-time registry of city coordinate tables.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a city requires creating a TOML file in `cities/` and adding a
//! corresponding entry here.

use crate::GeocodingTable;

/// Number of registered cities. Enforced by a test.
#[cfg(test)]
const EXPECTED_CITY_COUNT: usize = 1;

/// Embedded TOML city tables.
const CITY_TOMLS: &[(&str, &str)] = &[("recife", include_str!("../cities/recife.toml"))];

/// Returns all registered city tables.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests.
#[must_use]
pub fn all_cities() -> Vec<GeocodingTable> {
    CITY_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            GeocodingTable::from_toml_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse city table '{name}': {e}"))
        })
        .collect()
}

/// Returns the registered table with the given id.
#[must_use]
pub fn city(id: &str) -> Option<GeocodingTable> {
    all_cities().into_iter().find(|table| table.id() == id)
}
