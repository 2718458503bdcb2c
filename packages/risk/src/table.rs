//! Configurable cluster id → risk tier fallback table.
//!
//! Some backend responses carry only a numeric cluster id and omit the
//! human risk label. The table maps those ids to a tier. It is loaded from
//! TOML: the default table is embedded at compile time, and callers can
//! supply their own via [`TierTable::from_toml_str`].

use std::collections::BTreeMap;

use crime_risk_models::RiskTier;
use serde::Deserialize;

use crate::TierTableError;

/// Embedded default table.
const DEFAULT_TIERS_TOML: &str = include_str!("../tiers/default.toml");

/// Cluster id → tier mapping with a tier for unlisted ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    clusters: BTreeMap<u32, RiskTier>,
    unlisted: RiskTier,
}

#[derive(Deserialize)]
struct TierTableFile {
    #[serde(default = "default_unlisted")]
    unlisted: RiskTier,
    #[serde(default)]
    cluster: Vec<ClusterTierEntry>,
}

#[derive(Deserialize)]
struct ClusterTierEntry {
    id: u32,
    tier: RiskTier,
}

const fn default_unlisted() -> RiskTier {
    RiskTier::Low
}

impl TierTable {
    /// Returns the embedded default table.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. It is a compile-time
    /// constant, so a failure here is a development error caught by the
    /// tests below.
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml_str(DEFAULT_TIERS_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded tier table: {e}"))
    }

    /// Parses a tier table from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`TierTableError`] if the TOML is malformed or lists the
    /// same cluster id twice.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, TierTableError> {
        let file: TierTableFile = toml::de::from_str(toml_str)?;

        let mut clusters = BTreeMap::new();
        for entry in file.cluster {
            if clusters.insert(entry.id, entry.tier).is_some() {
                return Err(TierTableError::DuplicateCluster { id: entry.id });
            }
        }

        Ok(Self {
            clusters,
            unlisted: file.unlisted,
        })
    }

    /// Builds a table from explicit entries.
    #[must_use]
    pub fn from_entries(
        entries: impl IntoIterator<Item = (u32, RiskTier)>,
        unlisted: RiskTier,
    ) -> Self {
        Self {
            clusters: entries.into_iter().collect(),
            unlisted,
        }
    }

    /// Tier configured for `cluster_id`, if listed.
    #[must_use]
    pub fn lookup(&self, cluster_id: u32) -> Option<RiskTier> {
        self.clusters.get(&cluster_id).copied()
    }

    /// Tier assumed for ids the table does not list.
    #[must_use]
    pub const fn unlisted(&self) -> RiskTier {
        self.unlisted
    }

    /// Number of listed clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether no cluster is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self::embedded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_parses() {
        let table = TierTable::embedded();
        assert_eq!(table.len(), 4);
        assert_eq!(table.lookup(0), Some(RiskTier::Medium));
        assert_eq!(table.lookup(1), Some(RiskTier::Low));
        assert_eq!(table.lookup(2), Some(RiskTier::Low));
        assert_eq!(table.lookup(3), Some(RiskTier::Medium));
        assert_eq!(table.lookup(4), None);
        assert_eq!(table.unlisted(), RiskTier::Low);
    }

    #[test]
    fn custom_table_overrides_defaults() {
        let table = TierTable::from_toml_str(
            r#"
            unlisted = "MEDIUM"

            [[cluster]]
            id = 7
            tier = "HIGH"
            "#,
        )
        .unwrap();
        assert_eq!(table.lookup(7), Some(RiskTier::High));
        assert_eq!(table.lookup(0), None);
        assert_eq!(table.unlisted(), RiskTier::Medium);
    }

    #[test]
    fn rejects_duplicate_cluster_ids() {
        let err = TierTable::from_toml_str(
            r#"
            [[cluster]]
            id = 1
            tier = "LOW"

            [[cluster]]
            id = 1
            tier = "HIGH"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, TierTableError::DuplicateCluster { id: 1 }));
    }

    #[test]
    fn rejects_unknown_tier_names() {
        assert!(TierTable::from_toml_str("unlisted = \"SEVERE\"").is_err());
    }
}
