#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Risk tier classification and visual encoding.
//!
//! Every surface that shows a neighborhood, cluster, or prediction (tables,
//! charts, map markers, badges) asks [`RiskClassifier::classify`] for the
//! tier and styling so the same record renders identically everywhere.
//!
//! Tier resolution order:
//! 1. An explicit textual label (`"Alto"`, `"Médio"`, `"Baixo"`,
//!    `"Muito Alto"`), normalized case- and accent-insensitively.
//!    Unrecognized text is treated as `Medium`.
//! 2. The record's cluster id, through the configurable [`TierTable`].
//! 3. The table's `unlisted` tier, flagged as [`TierSource::Unresolved`]
//!    and drawn with the neutral [`TierStyle::UNKNOWN`] style.

pub mod style;
pub mod table;

use crime_risk_models::{
    CatalogEntry, ClusterMembership, ClusterSummary, NeighborhoodRecord, PredictionResult,
    RiskTier, normalize_name,
};
use serde::Serialize;
use thiserror::Error;

pub use style::TierStyle;
pub use table::TierTable;

/// Errors from loading a tier table.
#[derive(Debug, Error)]
pub enum TierTableError {
    /// TOML parsing failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The same cluster id appears twice.
    #[error("Cluster {id} is listed more than once")]
    DuplicateCluster {
        /// The repeated cluster id.
        id: u32,
    },
}

/// Anything that carries the signals a tier can be derived from.
pub trait RiskSignal {
    /// Explicit risk label, if the source provided one.
    fn risk_label(&self) -> Option<&str>;

    /// Numeric cluster id, if known.
    fn cluster_id(&self) -> Option<u32>;
}

/// Ad-hoc signal assembled from several sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signal<'a> {
    /// Explicit label.
    pub label: Option<&'a str>,
    /// Cluster id.
    pub cluster_id: Option<u32>,
}

impl RiskSignal for Signal<'_> {
    fn risk_label(&self) -> Option<&str> {
        self.label
    }

    fn cluster_id(&self) -> Option<u32> {
        self.cluster_id
    }
}

impl RiskSignal for NeighborhoodRecord {
    fn risk_label(&self) -> Option<&str> {
        self.risk_label.as_deref()
    }

    fn cluster_id(&self) -> Option<u32> {
        self.cluster_id
    }
}

impl RiskSignal for CatalogEntry {
    fn risk_label(&self) -> Option<&str> {
        self.risk_label.as_deref()
    }

    fn cluster_id(&self) -> Option<u32> {
        self.cluster_id
    }
}

impl RiskSignal for ClusterSummary {
    fn risk_label(&self) -> Option<&str> {
        self.risk_label.as_deref()
    }

    fn cluster_id(&self) -> Option<u32> {
        Some(self.cluster_id)
    }
}

impl RiskSignal for ClusterMembership {
    fn risk_label(&self) -> Option<&str> {
        self.risk_label.as_deref()
    }

    fn cluster_id(&self) -> Option<u32> {
        self.cluster_id
    }
}

impl RiskSignal for PredictionResult {
    fn risk_label(&self) -> Option<&str> {
        self.risk_label.as_deref()
    }

    fn cluster_id(&self) -> Option<u32> {
        None
    }
}

/// Where a classification's tier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierSource {
    /// Explicit risk label.
    Label,
    /// Cluster id listed in the tier table.
    ClusterTable,
    /// No usable signal; the table's `unlisted` tier was assumed.
    Unresolved,
}

/// A derived tier plus its rendering attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Risk tier.
    pub tier: RiskTier,
    /// How the tier was resolved.
    pub source: TierSource,
    /// Color, marker radius, and badge classes.
    pub style: TierStyle,
}

impl Classification {
    fn new(tier: RiskTier, source: TierSource) -> Self {
        let style = match source {
            TierSource::Unresolved => TierStyle::UNKNOWN,
            TierSource::Label | TierSource::ClusterTable => TierStyle::for_tier(tier),
        };
        Self {
            tier,
            source,
            style,
        }
    }
}

/// Parses a textual risk label.
///
/// Returns `None` only for blank labels, which count as absent.
/// Unrecognized text maps to `Medium`.
#[must_use]
pub fn tier_from_label(label: &str) -> Option<RiskTier> {
    let normalized = normalize_name(label);
    let tier = match normalized.as_str() {
        "" => return None,
        "ALTO" | "HIGH" => RiskTier::High,
        "MEDIO" | "MEDIUM" => RiskTier::Medium,
        "BAIXO" | "LOW" => RiskTier::Low,
        "MUITO ALTO" | "VERY HIGH" | "VERY_HIGH" => RiskTier::VeryHigh,
        other => {
            log::debug!("Unrecognized risk label '{other}', assuming MEDIUM");
            RiskTier::Medium
        }
    };
    Some(tier)
}

/// Derives tiers and styles from record signals.
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    table: TierTable,
}

impl RiskClassifier {
    /// Creates a classifier over the given fallback table.
    #[must_use]
    pub const fn new(table: TierTable) -> Self {
        Self { table }
    }

    /// Returns the fallback table.
    #[must_use]
    pub const fn table(&self) -> &TierTable {
        &self.table
    }

    /// Classifies a record. Total and deterministic.
    #[must_use]
    pub fn classify(&self, record: &impl RiskSignal) -> Classification {
        if let Some(tier) = record.risk_label().and_then(tier_from_label) {
            return Classification::new(tier, TierSource::Label);
        }

        match record.cluster_id().and_then(|id| self.table.lookup(id)) {
            Some(tier) => Classification::new(tier, TierSource::ClusterTable),
            None => Classification::new(self.table.unlisted(), TierSource::Unresolved),
        }
    }
}
