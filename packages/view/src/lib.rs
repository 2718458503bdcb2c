#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! View models built from a loaded [`Snapshot`].
//!
//! [`reconcile`] left-joins the ranking onto the catalog by
//! [`NeighborhoodKey`], attaches cluster membership, and classifies every
//! record once so that tables, charts, and map markers agree on tiers.
//! Inconsistencies between the sources are reported as
//! [`DataQualityWarning`]s and never cause a record to be dropped.

pub mod dashboard;
pub mod map;
pub mod store;

use std::collections::{BTreeMap, btree_map::Entry};
use std::fmt;

use crime_risk::{Classification, RiskClassifier, Signal};
use crime_risk_backend::{Snapshot, SourceKind};
use crime_risk_models::{CatalogEntry, ClusterStatistics, NeighborhoodKey, NeighborhoodRecord};
use serde::Serialize;

pub use dashboard::ChartRow;
pub use map::{MapMarker, MarkerLayer, map_markers};
pub use store::SnapshotStore;

/// One neighborhood after joining the catalog, ranking, and cluster
/// sources.
///
/// Statistics are `None` when the ranking had no entry for the
/// neighborhood, so they render as `N/A` rather than a measured zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRecord {
    /// Join key.
    pub key: NeighborhoodKey,
    /// Name as first spelled by the catalog (or the ranking).
    pub display_name: String,
    /// Occurrences from the ranking.
    pub occurrence_count: Option<u64>,
    /// Average suspects per occurrence.
    pub average_suspects: Option<f64>,
    /// Share of occurrences involving a weapon, 0-100.
    pub percent_armed: Option<f64>,
    /// Average hour of day.
    pub average_hour: Option<f64>,
    /// 1-based ranking position.
    pub rank_position: Option<u32>,
    /// Resolved cluster id.
    pub cluster_id: Option<u32>,
    /// Resolved explicit label, if any source had one.
    pub risk_label: Option<String>,
    /// Whether the catalog listed this neighborhood.
    pub in_catalog: bool,
    /// Tier and styling.
    pub classification: Classification,
}

impl MergedRecord {
    /// `Group {id}` label of the record's cluster.
    #[must_use]
    pub fn cluster_label(&self) -> Option<String> {
        self.cluster_id.map(group_label)
    }
}

/// One cluster shaped for presentation. Statistics are passed through
/// from the source unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterViewModel {
    /// Cluster id.
    pub cluster_id: u32,
    /// `Group {id}`.
    pub label: String,
    /// Profile description.
    pub description: String,
    /// Neighborhood count reported by the source.
    pub total_neighborhoods: u64,
    /// Member neighborhoods, from the source's list or else from the
    /// merged records assigned to the cluster.
    pub members: Vec<NeighborhoodKey>,
    /// Source-side aggregates.
    pub statistics: ClusterStatistics,
    /// Tier and styling.
    pub classification: Classification,
}

/// Problems found while reconciling. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DataQualityWarning {
    /// Cluster sizes do not add up to the catalog size.
    #[serde(rename_all = "camelCase")]
    NeighborhoodCountMismatch {
        /// Sum of `total_neighborhoods` over all clusters.
        cluster_total: u64,
        /// Distinct neighborhoods in the catalog.
        catalog_count: u64,
    },
    /// The ranking names a neighborhood the catalog does not list.
    RankingEntryNotInCatalog {
        /// The unknown neighborhood.
        key: NeighborhoodKey,
    },
    /// A neighborhood is listed as a member of two clusters.
    #[serde(rename_all = "camelCase")]
    DuplicateClusterMembership {
        /// The neighborhood.
        key: NeighborhoodKey,
        /// Cluster that listed it first (and keeps it).
        first_cluster: u32,
        /// Cluster that listed it again.
        second_cluster: u32,
    },
    /// A source could not be fetched.
    SourceUnavailable {
        /// Which source.
        source: SourceKind,
        /// Error text.
        message: String,
    },
    /// A source answered with an unexpected shape.
    MalformedSource {
        /// Which source.
        source: SourceKind,
        /// What was wrong.
        message: String,
    },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeighborhoodCountMismatch {
                cluster_total,
                catalog_count,
            } => write!(
                f,
                "Clusters account for {cluster_total} neighborhoods but the catalog lists {catalog_count}"
            ),
            Self::RankingEntryNotInCatalog { key } => {
                write!(f, "Ranked neighborhood '{key}' is not in the catalog")
            }
            Self::DuplicateClusterMembership {
                key,
                first_cluster,
                second_cluster,
            } => write!(
                f,
                "'{key}' is listed in both {} and {}",
                group_label(*first_cluster),
                group_label(*second_cluster)
            ),
            Self::SourceUnavailable { source, message } => {
                write!(f, "Source '{source}' is unavailable: {message}")
            }
            Self::MalformedSource { source, message } => {
                write!(f, "Source '{source}' was malformed: {message}")
            }
        }
    }
}

/// Everything the presentation surfaces read for one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    /// Every known neighborhood, keyed for lookup.
    pub per_neighborhood: BTreeMap<NeighborhoodKey, MergedRecord>,
    /// Clusters sorted by id.
    pub per_cluster: Vec<ClusterViewModel>,
    /// Ranked neighborhoods in ranking order.
    pub ranking: Vec<MergedRecord>,
    /// Data-quality findings.
    pub warnings: Vec<DataQualityWarning>,
}

impl ViewModel {
    /// Looks up a neighborhood by any spelling of its name.
    #[must_use]
    pub fn neighborhood(&self, name: &str) -> Option<&MergedRecord> {
        self.per_neighborhood.get(&NeighborhoodKey::new(name))
    }

    /// Looks up a cluster by id.
    #[must_use]
    pub fn cluster(&self, cluster_id: u32) -> Option<&ClusterViewModel> {
        self.per_cluster.iter().find(|c| c.cluster_id == cluster_id)
    }
}

/// Presentation label for a cluster id.
#[must_use]
pub fn group_label(cluster_id: u32) -> String {
    format!("Group {cluster_id}")
}

struct Draft {
    display_name: String,
    in_catalog: bool,
    catalog_cluster: Option<u32>,
    catalog_label: Option<String>,
    ranked: Option<NeighborhoodRecord>,
}

impl Draft {
    fn from_catalog(entry: &CatalogEntry) -> Self {
        Self {
            display_name: entry.display_name.clone(),
            in_catalog: true,
            catalog_cluster: entry.cluster_id,
            catalog_label: entry.risk_label.clone(),
            ranked: None,
        }
    }
}

fn non_blank(label: Option<&str>) -> Option<&str> {
    label.filter(|l| !l.trim().is_empty())
}

/// Joins the snapshot's sources into a [`ViewModel`].
///
/// Pure and idempotent: the same snapshot and classifier always produce
/// the same view model.
///
/// Cluster ids resolve from the ranking, then the catalog, then the
/// cluster membership lists. Labels resolve from the ranking, then the
/// catalog, then the cluster summary; without any label the classifier
/// falls back to the cluster id.
#[must_use]
pub fn reconcile(snapshot: &Snapshot, classifier: &RiskClassifier) -> ViewModel {
    let mut warnings = Vec::new();

    for failure in &snapshot.failures {
        warnings.push(DataQualityWarning::SourceUnavailable {
            source: failure.source,
            message: failure.message.clone(),
        });
    }
    for warning in &snapshot.shape_warnings {
        warnings.push(DataQualityWarning::MalformedSource {
            source: warning.source,
            message: warning.message.clone(),
        });
    }

    let mut membership: BTreeMap<NeighborhoodKey, u32> = BTreeMap::new();
    let mut cluster_labels: BTreeMap<u32, &str> = BTreeMap::new();
    for cluster in &snapshot.clusters {
        if let Some(label) = non_blank(cluster.risk_label.as_deref()) {
            cluster_labels.entry(cluster.cluster_id).or_insert(label);
        }
        for key in &cluster.members {
            match membership.entry(key.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(cluster.cluster_id);
                }
                Entry::Occupied(slot) if *slot.get() != cluster.cluster_id => {
                    warnings.push(DataQualityWarning::DuplicateClusterMembership {
                        key: key.clone(),
                        first_cluster: *slot.get(),
                        second_cluster: cluster.cluster_id,
                    });
                }
                Entry::Occupied(_) => {}
            }
        }
    }

    let mut drafts: BTreeMap<NeighborhoodKey, Draft> = BTreeMap::new();
    for entry in &snapshot.catalog {
        match drafts.entry(entry.key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(Draft::from_catalog(entry));
            }
            Entry::Occupied(mut slot) => {
                log::debug!("Collapsing duplicate catalog entry '{}'", entry.key);
                let draft = slot.get_mut();
                draft.catalog_cluster = draft.catalog_cluster.or(entry.cluster_id);
                if draft.catalog_label.is_none() {
                    draft.catalog_label.clone_from(&entry.risk_label);
                }
            }
        }
    }
    let catalog_count = drafts.len() as u64;

    let mut ranked_keys = Vec::new();
    for record in &snapshot.ranking {
        let draft = drafts.entry(record.key.clone()).or_insert_with(|| {
            warnings.push(DataQualityWarning::RankingEntryNotInCatalog {
                key: record.key.clone(),
            });
            Draft {
                display_name: record.display_name.clone(),
                in_catalog: false,
                catalog_cluster: None,
                catalog_label: None,
                ranked: None,
            }
        });
        if draft.ranked.is_some() {
            log::debug!("Ignoring repeated ranking entry for '{}'", record.key);
            continue;
        }
        draft.ranked = Some(record.clone());
        ranked_keys.push(record.key.clone());
    }

    let per_neighborhood: BTreeMap<NeighborhoodKey, MergedRecord> = drafts
        .into_iter()
        .map(|(key, draft)| {
            let merged = merge(&key, draft, &membership, &cluster_labels, classifier);
            (key, merged)
        })
        .collect();

    let ranking = ranked_keys
        .iter()
        .filter_map(|key| per_neighborhood.get(key).cloned())
        .collect();

    let per_cluster = cluster_views(snapshot, &per_neighborhood, classifier);

    let cluster_total: u64 = snapshot
        .clusters
        .iter()
        .map(|c| c.total_neighborhoods)
        .fold(0, u64::saturating_add);
    if !snapshot.clusters.is_empty() && catalog_count > 0 && cluster_total != catalog_count {
        log::warn!(
            "Cluster sizes sum to {cluster_total} but the catalog lists {catalog_count} neighborhoods"
        );
        warnings.push(DataQualityWarning::NeighborhoodCountMismatch {
            cluster_total,
            catalog_count,
        });
    }

    ViewModel {
        per_neighborhood,
        per_cluster,
        ranking,
        warnings,
    }
}

fn merge(
    key: &NeighborhoodKey,
    draft: Draft,
    membership: &BTreeMap<NeighborhoodKey, u32>,
    cluster_labels: &BTreeMap<u32, &str>,
    classifier: &RiskClassifier,
) -> MergedRecord {
    let ranked = draft.ranked.as_ref();

    let cluster_id = ranked
        .and_then(|r| r.cluster_id)
        .or(draft.catalog_cluster)
        .or_else(|| membership.get(key).copied());

    let risk_label = non_blank(ranked.and_then(|r| r.risk_label.as_deref()))
        .or_else(|| non_blank(draft.catalog_label.as_deref()))
        .or_else(|| cluster_id.and_then(|id| cluster_labels.get(&id).copied()))
        .map(str::to_string);

    let classification = classifier.classify(&Signal {
        label: risk_label.as_deref(),
        cluster_id,
    });

    MergedRecord {
        key: key.clone(),
        display_name: draft.display_name,
        occurrence_count: ranked.map(|r| r.occurrence_count),
        average_suspects: ranked.and_then(|r| r.average_suspects),
        percent_armed: ranked.map(|r| r.percent_armed),
        average_hour: ranked.and_then(|r| r.average_hour),
        rank_position: ranked.and_then(|r| r.rank_position),
        cluster_id,
        risk_label,
        in_catalog: draft.in_catalog,
        classification,
    }
}

fn cluster_views(
    snapshot: &Snapshot,
    per_neighborhood: &BTreeMap<NeighborhoodKey, MergedRecord>,
    classifier: &RiskClassifier,
) -> Vec<ClusterViewModel> {
    let mut views: BTreeMap<u32, ClusterViewModel> = BTreeMap::new();

    for cluster in &snapshot.clusters {
        if views.contains_key(&cluster.cluster_id) {
            log::debug!("Ignoring repeated summary for cluster {}", cluster.cluster_id);
            continue;
        }

        let members = if cluster.members.is_empty() {
            per_neighborhood
                .values()
                .filter(|r| r.cluster_id == Some(cluster.cluster_id))
                .map(|r| r.key.clone())
                .collect()
        } else {
            cluster.members.clone()
        };

        views.insert(
            cluster.cluster_id,
            ClusterViewModel {
                cluster_id: cluster.cluster_id,
                label: group_label(cluster.cluster_id),
                description: cluster.description.clone(),
                total_neighborhoods: cluster.total_neighborhoods,
                members,
                statistics: cluster.statistics.clone(),
                classification: classifier.classify(cluster),
            },
        );
    }

    views.into_values().collect()
}

#[cfg(test)]
mod tests {
    use crime_risk::TierSource;
    use crime_risk_backend::loader::{ShapeWarning, SourceFailure};
    use crime_risk_models::{ClusterSummary, RiskTier};

    use super::*;

    pub fn catalog(names: &[&str]) -> Vec<CatalogEntry> {
        names
            .iter()
            .map(|name| CatalogEntry {
                key: NeighborhoodKey::new(name),
                display_name: (*name).to_string(),
                cluster_id: None,
                risk_label: None,
            })
            .collect()
    }

    pub fn ranked(name: &str, count: u64, label: Option<&str>) -> NeighborhoodRecord {
        NeighborhoodRecord {
            key: NeighborhoodKey::new(name),
            display_name: name.to_string(),
            occurrence_count: count,
            average_suspects: Some(1.5),
            percent_armed: 10.0,
            rank_position: None,
            cluster_id: None,
            risk_label: label.map(str::to_string),
            average_hour: None,
        }
    }

    pub fn cluster(id: u32, members: &[&str], label: Option<&str>) -> ClusterSummary {
        ClusterSummary {
            cluster_id: id,
            total_neighborhoods: members.len() as u64,
            description: format!("profile {id}"),
            risk_label: label.map(str::to_string),
            members: members.iter().map(|m| NeighborhoodKey::new(m)).collect(),
            statistics: ClusterStatistics::default(),
        }
    }

    fn scenario() -> Snapshot {
        Snapshot {
            catalog: catalog(&["BOA VIAGEM", "PINA"]),
            clusters: vec![cluster(0, &["BOA VIAGEM", "PINA"], None)],
            ranking: vec![ranked("Boa Viagem", 42, Some("Alto"))],
            ..Snapshot::default()
        }
    }

    #[test]
    fn left_join_keeps_unranked_neighborhoods() {
        let view = reconcile(&scenario(), &RiskClassifier::default());

        let boa_viagem = view.neighborhood("boa viagem").unwrap();
        assert_eq!(boa_viagem.occurrence_count, Some(42));
        assert_eq!(boa_viagem.classification.tier, RiskTier::High);
        assert_eq!(boa_viagem.classification.source, TierSource::Label);

        let pina = view.neighborhood("PINA").unwrap();
        assert_eq!(pina.occurrence_count, None);
        assert_eq!(pina.percent_armed, None);
        assert_eq!(pina.cluster_id, Some(0));
        assert_eq!(pina.classification.tier, RiskTier::Medium);
        assert_eq!(pina.classification.source, TierSource::ClusterTable);

        assert_eq!(view.per_neighborhood.len(), 2);
        assert!(view.warnings.is_empty());
    }

    #[test]
    fn reconcile_is_idempotent() {
        let snapshot = scenario();
        let classifier = RiskClassifier::default();
        assert_eq!(reconcile(&snapshot, &classifier), reconcile(&snapshot, &classifier));
    }

    #[test]
    fn case_variants_do_not_duplicate() {
        let snapshot = Snapshot {
            catalog: catalog(&["Boa Viagem", "BOA  VIAGEM", "boa viagem"]),
            ranking: vec![ranked("BOA VIAGEM", 3, None), ranked("Boa viagem", 9, None)],
            ..Snapshot::default()
        };
        let view = reconcile(&snapshot, &RiskClassifier::default());

        assert_eq!(view.per_neighborhood.len(), 1);
        assert_eq!(view.ranking.len(), 1);
        assert_eq!(view.ranking[0].occurrence_count, Some(3));
        assert_eq!(view.ranking[0].display_name, "Boa Viagem");
    }

    #[test]
    fn count_mismatch_is_flagged_without_dropping() {
        let snapshot = Snapshot {
            catalog: catalog(&["BOA VIAGEM", "PINA", "TORRE"]),
            clusters: vec![cluster(0, &["BOA VIAGEM"], None), cluster(1, &["PINA"], None)],
            ..Snapshot::default()
        };
        let view = reconcile(&snapshot, &RiskClassifier::default());

        assert_eq!(view.per_neighborhood.len(), 3);
        assert!(view.warnings.contains(&DataQualityWarning::NeighborhoodCountMismatch {
            cluster_total: 2,
            catalog_count: 3,
        }));
        let torre = view.neighborhood("Torre").unwrap();
        assert_eq!(torre.cluster_id, None);
        assert_eq!(torre.classification.source, TierSource::Unresolved);
    }

    #[test]
    fn huge_cluster_sizes_saturate_instead_of_overflowing() {
        let resp: crime_risk_backend_models::ClustersResponse =
            serde_json::from_value(serde_json::json!({
                "clusters": [
                    { "cluster_id": 0, "total_bairros": 1e20, "bairros": ["BOA VIAGEM"] },
                    { "cluster_id": 1, "total_bairros": 1e20, "bairros": ["PINA"] }
                ]
            }))
            .unwrap();
        let snapshot = Snapshot {
            catalog: catalog(&["BOA VIAGEM", "PINA"]),
            clusters: crime_risk_backend::normalize::cluster_summaries(resp.clusters.unwrap()),
            ..Snapshot::default()
        };
        let view = reconcile(&snapshot, &RiskClassifier::default());

        assert_eq!(view.per_neighborhood.len(), 2);
        assert!(view.warnings.contains(&DataQualityWarning::NeighborhoodCountMismatch {
            cluster_total: u64::MAX,
            catalog_count: 2,
        }));
    }

    #[test]
    fn ranking_outside_catalog_is_kept_and_flagged() {
        let snapshot = Snapshot {
            catalog: catalog(&["PINA"]),
            ranking: vec![ranked("Ibura", 7, Some("Baixo"))],
            ..Snapshot::default()
        };
        let view = reconcile(&snapshot, &RiskClassifier::default());

        let ibura = view.neighborhood("IBURA").unwrap();
        assert!(!ibura.in_catalog);
        assert_eq!(ibura.classification.tier, RiskTier::Low);
        assert!(matches!(
            &view.warnings[0],
            DataQualityWarning::RankingEntryNotInCatalog { key } if key.as_str() == "IBURA"
        ));
    }

    #[test]
    fn duplicate_membership_keeps_first_cluster() {
        let snapshot = Snapshot {
            catalog: catalog(&["PINA"]),
            clusters: vec![cluster(1, &["PINA"], None), cluster(3, &["Pina"], None)],
            ..Snapshot::default()
        };
        let view = reconcile(&snapshot, &RiskClassifier::default());

        assert_eq!(view.neighborhood("PINA").unwrap().cluster_id, Some(1));
        assert!(view.warnings.iter().any(|w| matches!(
            w,
            DataQualityWarning::DuplicateClusterMembership { first_cluster: 1, second_cluster: 3, .. }
        )));
    }

    #[test]
    fn cluster_label_reaches_members_without_their_own() {
        let snapshot = Snapshot {
            catalog: catalog(&["PINA", "TORRE"]),
            clusters: vec![cluster(2, &["PINA", "TORRE"], Some("Alto"))],
            ranking: vec![ranked("Torre", 5, Some("Baixo"))],
            ..Snapshot::default()
        };
        let view = reconcile(&snapshot, &RiskClassifier::default());

        assert_eq!(view.neighborhood("PINA").unwrap().classification.tier, RiskTier::High);
        assert_eq!(view.neighborhood("TORRE").unwrap().classification.tier, RiskTier::Low);
        assert_eq!(view.per_cluster[0].classification.tier, RiskTier::High);
    }

    #[test]
    fn clusters_are_labeled_and_sorted() {
        let snapshot = Snapshot {
            catalog: catalog(&["PINA", "TORRE"]),
            clusters: vec![cluster(3, &["TORRE"], None), cluster(1, &["PINA"], None)],
            ..Snapshot::default()
        };
        let view = reconcile(&snapshot, &RiskClassifier::default());

        let labels: Vec<&str> = view.per_cluster.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Group 1", "Group 3"]);
        assert_eq!(view.cluster(1).unwrap().classification.tier, RiskTier::Low);
        assert_eq!(view.cluster(3).unwrap().classification.tier, RiskTier::Medium);
    }

    #[test]
    fn partial_failure_still_reconciles() {
        let snapshot = Snapshot {
            catalog: catalog(&["BOA VIAGEM", "PINA"]),
            clusters: vec![cluster(0, &["BOA VIAGEM", "PINA"], None)],
            failures: vec![SourceFailure {
                source: SourceKind::Ranking,
                message: "Backend returned status 503".to_string(),
                retryable: true,
            }],
            ..Snapshot::default()
        };
        let view = reconcile(&snapshot, &RiskClassifier::default());

        assert!(view.ranking.is_empty());
        assert_eq!(view.per_neighborhood.len(), 2);
        assert!(matches!(
            view.warnings[0],
            DataQualityWarning::SourceUnavailable { source: SourceKind::Ranking, .. }
        ));
    }

    #[test]
    fn shape_warnings_are_carried_over() {
        let snapshot = Snapshot {
            catalog: catalog(&["PINA"]),
            shape_warnings: vec![ShapeWarning {
                source: SourceKind::Clusters,
                message: "response has no 'clusters' field".to_string(),
            }],
            ..Snapshot::default()
        };
        let view = reconcile(&snapshot, &RiskClassifier::default());
        assert_eq!(
            view.warnings[0].to_string(),
            "Source 'clusters' was malformed: response has no 'clusters' field"
        );
    }
}
