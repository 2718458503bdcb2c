#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Neighborhood, cluster, and risk tier types for the crime risk views.
//!
//! Everything downstream of the backend boundary speaks in these types.
//! Neighborhood names are joined through [`NeighborhoodKey`], which is
//! always built with [`normalize_name`] so that the catalog, ranking,
//! cluster membership lists, and the geocoding table agree on identity.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Display value for a statistic the backend did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// Normalizes a neighborhood name into its canonical join form.
///
/// The pipeline:
/// 1. Split on any whitespace (trims and collapses runs)
/// 2. Uppercase
/// 3. Fold Portuguese diacritics (`Á`→`A`, `Ç`→`C`, ...)
/// 4. Join with single spaces
#[must_use]
pub fn normalize_name(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            word.chars()
                .flat_map(char::to_uppercase)
                .map(fold_diacritic)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const fn fold_diacritic(c: char) -> char {
    match c {
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'Ç' => 'C',
        'Ñ' => 'N',
        _ => c,
    }
}

/// Normalized neighborhood identifier used as the join key across the
/// catalog, ranking, and cluster sources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NeighborhoodKey(String);

impl NeighborhoodKey {
    /// Builds a key from a raw neighborhood name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(normalize_name(name))
    }

    /// Returns the normalized key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the source name normalized to nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for NeighborhoodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NeighborhoodKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Qualitative risk level shown to users.
///
/// `VeryHigh` is only produced by the crime-count prediction; cluster
/// analysis uses the lower three tiers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    /// Regular patrol profile.
    Low,
    /// Monitoring profile.
    Medium,
    /// High attention profile.
    High,
    /// Prediction-only escalation above `High`.
    VeryHigh,
}

impl RiskTier {
    /// Human-readable tier name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        }
    }

    /// All tiers, lowest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High, Self::VeryHigh]
    }
}

/// Formats an optional statistic with fixed precision, or [`NOT_AVAILABLE`].
#[must_use]
pub fn format_metric(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.decimals$}"))
}

/// Formats an optional count, or [`NOT_AVAILABLE`].
#[must_use]
pub fn format_count(value: Option<u64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
}

/// One neighborhood from the catalog source, in canonical form regardless
/// of whether the backend sent a bare name or a structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Join key.
    pub key: NeighborhoodKey,
    /// Name as the backend spelled it.
    pub display_name: String,
    /// Cluster assignment, when the catalog carries it.
    pub cluster_id: Option<u32>,
    /// Explicit risk label, when the catalog carries it.
    pub risk_label: Option<String>,
}

/// One neighborhood from the ranking source.
///
/// Missing counts and percentages default to zero; missing averages stay
/// `None` so they render as [`NOT_AVAILABLE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodRecord {
    /// Join key.
    pub key: NeighborhoodKey,
    /// Name as the backend spelled it.
    pub display_name: String,
    /// Drug trafficking occurrences recorded for the neighborhood.
    pub occurrence_count: u64,
    /// Average suspects per occurrence.
    pub average_suspects: Option<f64>,
    /// Share of occurrences involving a weapon, 0-100.
    pub percent_armed: f64,
    /// 1-based position in the ranking.
    pub rank_position: Option<u32>,
    /// Cluster assignment.
    pub cluster_id: Option<u32>,
    /// Explicit risk label (`"Alto"`, `"Médio"`, `"Baixo"`).
    pub risk_label: Option<String>,
    /// Average hour of day of the occurrences.
    pub average_hour: Option<f64>,
}

/// Pre-aggregated statistics for one cluster, passed through as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatistics {
    /// Average suspects per occurrence.
    pub average_suspects: Option<f64>,
    /// Average victims per occurrence.
    pub average_victims: Option<f64>,
    /// Share of occurrences involving a weapon, 0-100.
    pub percent_armed: Option<f64>,
    /// Average suspect age.
    pub average_suspect_age: Option<f64>,
    /// Average hour of day.
    pub average_hour: Option<f64>,
    /// Total occurrences across the cluster.
    pub total_occurrences: Option<u64>,
    /// Neighborhood with the most occurrences in the cluster.
    pub most_critical: Option<String>,
}

/// One cluster of neighborhoods sharing a crime-pattern profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    /// Small non-negative cluster identifier.
    pub cluster_id: u32,
    /// Neighborhood count reported by the source.
    pub total_neighborhoods: u64,
    /// Free-text profile description.
    pub description: String,
    /// Explicit risk label, when the source provided one.
    pub risk_label: Option<String>,
    /// Member neighborhoods, when the source listed them.
    pub members: Vec<NeighborhoodKey>,
    /// Source-side aggregates.
    pub statistics: ClusterStatistics,
}

/// Per-neighborhood statistics returned by the cluster membership query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodStatistics {
    /// Average suspects per occurrence.
    pub average_suspects: Option<f64>,
    /// Average victims per occurrence.
    pub average_victims: Option<f64>,
    /// Share of occurrences involving a weapon, 0-100.
    pub percent_armed: Option<f64>,
    /// Average suspect age.
    pub average_suspect_age: Option<f64>,
    /// Average hour of day.
    pub average_hour: Option<f64>,
    /// Total occurrences.
    pub total_occurrences: Option<u64>,
    /// 1-based position in the occurrence ranking.
    pub rank_position: Option<u32>,
}

/// Result of asking which cluster a neighborhood belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMembership {
    /// Neighborhood as echoed by the backend.
    pub neighborhood: String,
    /// Assigned cluster.
    pub cluster_id: Option<u32>,
    /// Explicit risk label.
    pub risk_label: Option<String>,
    /// Cluster profile description.
    pub description: String,
    /// Statistics for the queried neighborhood.
    pub neighborhood_stats: NeighborhoodStatistics,
    /// Aggregates over the whole cluster.
    pub cluster_stats: ClusterStatistics,
    /// Other neighborhoods in the same cluster.
    pub cluster_members: Vec<String>,
    /// Operational recommendation text.
    pub recommendation: String,
}

/// Transient result of a crime-count prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    /// Neighborhood as echoed by the backend.
    pub neighborhood: String,
    /// Predicted number of crimes in the period.
    pub predicted_count: Option<f64>,
    /// Explicit risk label (`"Muito Alto"`, `"Alto"`, ...).
    pub risk_label: Option<String>,
    /// Period label, `MM/YYYY`.
    pub period: String,
    /// Operational recommendation text.
    pub recommendation: String,
}

/// Direction of a historical series.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    /// Last period above the first.
    Rising,
    /// Not rising.
    Falling,
    /// Not enough data.
    Unknown,
}

impl Trend {
    /// Parses the backend's Portuguese trend label.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match normalize_name(label).as_str() {
            "CRESCENTE" | "RISING" => Self::Rising,
            "DECRESCENTE" | "FALLING" => Self::Falling,
            _ => Self::Unknown,
        }
    }
}

/// One period of a neighborhood's crime history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    /// Period label, `MM/YYYY`.
    pub period: String,
    /// Crimes recorded in the period.
    pub crime_count: u64,
}

/// Summary statistics over a [`HistoricalSeries`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStatistics {
    /// Mean crimes per period.
    pub mean: Option<f64>,
    /// Highest period count.
    pub max: Option<u64>,
    /// Lowest period count.
    pub min: Option<u64>,
    /// Series direction.
    pub trend: Trend,
}

impl HistoryStatistics {
    /// Derives statistics from the points themselves.
    ///
    /// The trend is `Rising` only with at least three points and a last
    /// count above the first.
    #[must_use]
    pub fn derive(points: &[HistoryPoint]) -> Self {
        let counts: Vec<u64> = points.iter().map(|p| p.crime_count).collect();

        let (Some(first), Some(last)) = (counts.first(), counts.last()) else {
            return Self {
                mean: None,
                max: None,
                min: None,
                trend: Trend::Unknown,
            };
        };

        #[allow(clippy::cast_precision_loss)]
        let mean = counts.iter().map(|&c| c as f64).sum::<f64>() / counts.len() as f64;

        let trend = if counts.len() >= 3 && last > first {
            Trend::Rising
        } else {
            Trend::Falling
        };

        Self {
            mean: Some((mean * 100.0).round() / 100.0),
            max: counts.iter().max().copied(),
            min: counts.iter().min().copied(),
            trend,
        }
    }
}

/// Chronological crime counts for one neighborhood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSeries {
    /// Neighborhood as echoed by the backend.
    pub neighborhood: String,
    /// Points in chronological order.
    pub points: Vec<HistoryPoint>,
    /// Series statistics.
    pub statistics: HistoryStatistics,
}
