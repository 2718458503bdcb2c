//! Concurrent load of the three read sources into a [`Snapshot`].

use crime_risk_models::{CatalogEntry, ClusterSummary, NeighborhoodRecord};
use futures::future::join3;
use serde::Serialize;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

use crate::{AnalyticsBackend, BackendError, normalize};

/// One of the three sources a snapshot is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// Neighborhood catalog.
    Catalog,
    /// Per-cluster statistics.
    Clusters,
    /// Occurrence ranking.
    Ranking,
}

/// A source that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    /// Which source failed.
    pub source: SourceKind,
    /// Error text, including the backend's detail message when present.
    pub message: String,
    /// Whether retrying could help.
    pub retryable: bool,
}

/// A source that answered with an unexpected shape and was replaced by an
/// empty collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeWarning {
    /// Which source was malformed.
    pub source: SourceKind,
    /// What was wrong.
    pub message: String,
}

/// The three read sources after boundary normalization.
///
/// A source that failed or was malformed contributes an empty collection
/// and an entry in [`Self::failures`] or [`Self::shape_warnings`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Catalog entries in backend order.
    pub catalog: Vec<CatalogEntry>,
    /// Cluster summaries in backend order.
    pub clusters: Vec<ClusterSummary>,
    /// Ranked records, most occurrences first.
    pub ranking: Vec<NeighborhoodRecord>,
    /// Sources that failed.
    pub failures: Vec<SourceFailure>,
    /// Sources that were malformed.
    pub shape_warnings: Vec<ShapeWarning>,
}

impl Snapshot {
    /// Whether every source loaded cleanly.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.shape_warnings.is_empty()
    }
}

/// Errors from [`load_snapshot`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// No source could be fetched.
    #[error("All sources failed: {}", summarize(.failures))]
    AllSourcesFailed {
        /// One failure per source.
        failures: Vec<SourceFailure>,
    },
}

impl LoadError {
    /// Whether retrying the load could help.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AllSourcesFailed { failures } => failures.iter().any(|f| f.retryable),
        }
    }
}

fn summarize(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.source, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

enum Outcome<T> {
    Loaded(Vec<T>),
    Malformed(ShapeWarning),
    Failed(SourceFailure),
}

fn classify<T>(
    source: SourceKind,
    field: &str,
    result: Result<Option<Vec<T>>, BackendError>,
) -> Outcome<T> {
    match result {
        Ok(Some(items)) => Outcome::Loaded(items),
        Ok(None) => {
            let message = format!("response has no '{field}' field");
            log::warn!("{source}: {message}, substituting an empty collection");
            Outcome::Malformed(ShapeWarning { source, message })
        }
        Err(e) if e.is_shape() => {
            let message = e.to_string();
            log::warn!("{source}: {message}, substituting an empty collection");
            Outcome::Malformed(ShapeWarning { source, message })
        }
        Err(e) => {
            log::warn!("{source}: fetch failed: {e}");
            Outcome::Failed(SourceFailure {
                source,
                message: e.to_string(),
                retryable: e.is_transport(),
            })
        }
    }
}

impl<T> Outcome<T> {
    fn apply(self, snapshot: &mut Snapshot) -> Vec<T> {
        match self {
            Self::Loaded(items) => items,
            Self::Malformed(warning) => {
                snapshot.shape_warnings.push(warning);
                Vec::new()
            }
            Self::Failed(failure) => {
                snapshot.failures.push(failure);
                Vec::new()
            }
        }
    }
}

/// Fetches the catalog, cluster statistics, and ranking concurrently and
/// waits for all three.
///
/// # Errors
///
/// Returns [`LoadError::AllSourcesFailed`] if none of the three sources
/// could be fetched. A malformed source is not a failure.
pub async fn load_snapshot(backend: &dyn AnalyticsBackend) -> Result<Snapshot, LoadError> {
    log::info!("Loading catalog, clusters, and ranking");

    let (catalog, clusters, ranking) = join3(
        backend.fetch_catalog(),
        backend.fetch_clusters(),
        backend.fetch_ranking(),
    )
    .await;

    let catalog = classify(SourceKind::Catalog, "bairros", catalog.map(|r| r.bairros));
    let clusters = classify(SourceKind::Clusters, "clusters", clusters.map(|r| r.clusters));
    let ranking = classify(SourceKind::Ranking, "top_bairros", ranking.map(|r| r.top_bairros));

    let mut snapshot = Snapshot::default();
    let catalog = catalog.apply(&mut snapshot);
    let clusters = clusters.apply(&mut snapshot);
    let ranking = ranking.apply(&mut snapshot);

    if snapshot.failures.len() == 3 {
        return Err(LoadError::AllSourcesFailed {
            failures: snapshot.failures,
        });
    }

    snapshot.catalog = normalize::catalog_entries(catalog);
    snapshot.clusters = normalize::cluster_summaries(clusters);
    snapshot.ranking = normalize::ranking_records(ranking);

    log::info!(
        "Loaded {} catalog entries, {} clusters, {} ranked neighborhoods ({} failures, {} shape warnings)",
        snapshot.catalog.len(),
        snapshot.clusters.len(),
        snapshot.ranking.len(),
        snapshot.failures.len(),
        snapshot.shape_warnings.len(),
    );

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crime_risk_backend_models::{
        CatalogResponse, ClusterPredictRequest, ClusterPredictResponse, ClustersResponse,
        CrimePredictRequest, CrimePredictResponse, HealthResponse, HistoryResponse,
        ModelInfoResponse, RankingResponse,
    };
    use serde_json::{Value, json};
    use tokio::sync::Barrier;

    use super::*;

    /// In-memory backend answering the three read endpoints from JSON
    /// values. `None` means the call fails with a 503. With a `rendezvous`
    /// barrier, no fetch answers until all three are in flight.
    #[derive(Default)]
    struct FixedBackend {
        catalog: Option<Value>,
        clusters: Option<Value>,
        ranking: Option<Value>,
        rendezvous: Option<Arc<Barrier>>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FixedBackend {
        async fn enter(&self, name: &'static str) {
            self.calls.lock().unwrap().push(name);
            if let Some(barrier) = &self.rendezvous {
                barrier.wait().await;
            }
        }
    }

    fn answer<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Result<T, BackendError> {
        match value {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Err(BackendError::Status {
                status: 503,
                detail: Some("Service Unavailable".to_string()),
            }),
        }
    }

    #[async_trait::async_trait]
    impl AnalyticsBackend for FixedBackend {
        async fn fetch_catalog(&self) -> Result<CatalogResponse, BackendError> {
            self.enter("catalog").await;
            answer(self.catalog.as_ref())
        }

        async fn fetch_clusters(&self) -> Result<ClustersResponse, BackendError> {
            self.enter("clusters").await;
            answer(self.clusters.as_ref())
        }

        async fn fetch_ranking(&self) -> Result<RankingResponse, BackendError> {
            self.enter("ranking").await;
            answer(self.ranking.as_ref())
        }

        async fn predict_cluster(
            &self,
            _request: &ClusterPredictRequest,
        ) -> Result<ClusterPredictResponse, BackendError> {
            unimplemented!()
        }

        async fn predict_crimes(
            &self,
            _request: &CrimePredictRequest,
        ) -> Result<CrimePredictResponse, BackendError> {
            unimplemented!()
        }

        async fn fetch_history(&self, _neighborhood: &str) -> Result<HistoryResponse, BackendError> {
            unimplemented!()
        }

        async fn fetch_model_info(&self) -> Result<ModelInfoResponse, BackendError> {
            unimplemented!()
        }

        async fn health(&self) -> Result<HealthResponse, BackendError> {
            unimplemented!()
        }
    }

    fn full_backend() -> FixedBackend {
        FixedBackend {
            catalog: Some(json!({ "bairros": ["BOA VIAGEM", "PINA"] })),
            clusters: Some(json!({
                "clusters": [{ "cluster_id": 0, "total_bairros": 2, "bairros": ["BOA VIAGEM", "PINA"] }]
            })),
            ranking: Some(json!({
                "top_bairros": [{ "bairro": "Boa Viagem", "total_ocorrencias": 42, "nivel_risco": "Alto" }]
            })),
            ..FixedBackend::default()
        }
    }

    #[tokio::test]
    async fn loads_all_three_sources() {
        let backend = full_backend();
        let snapshot = load_snapshot(&backend).await.unwrap();

        assert!(snapshot.is_complete());
        assert_eq!(snapshot.catalog.len(), 2);
        assert_eq!(snapshot.clusters.len(), 1);
        assert_eq!(snapshot.ranking[0].occurrence_count, 42);
        assert_eq!(backend.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn sources_are_fetched_concurrently() {
        let backend = FixedBackend {
            rendezvous: Some(Arc::new(Barrier::new(3))),
            ..full_backend()
        };
        let snapshot = tokio::time::timeout(Duration::from_secs(5), load_snapshot(&backend))
            .await
            .expect("fetches ran one after another")
            .unwrap();

        assert!(snapshot.is_complete());
        assert_eq!(backend.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn one_failed_source_keeps_the_others() {
        let backend = FixedBackend {
            ranking: None,
            ..full_backend()
        };
        let snapshot = load_snapshot(&backend).await.unwrap();

        assert!(snapshot.ranking.is_empty());
        assert_eq!(snapshot.catalog.len(), 2);
        assert_eq!(snapshot.failures.len(), 1);
        assert_eq!(snapshot.failures[0].source, SourceKind::Ranking);
        assert!(snapshot.failures[0].retryable);
        assert!(snapshot.failures[0].message.contains("Service Unavailable"));
    }

    #[tokio::test]
    async fn all_sources_failing_is_an_error() {
        let backend = FixedBackend::default();
        let err = load_snapshot(&backend).await.unwrap_err();

        let LoadError::AllSourcesFailed { failures } = &err;
        assert_eq!(failures.len(), 3);
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("All sources failed: catalog:"));
    }

    #[tokio::test]
    async fn missing_collection_field_becomes_empty_with_warning() {
        let backend = FixedBackend {
            clusters: Some(json!({ "erro": "modelo não treinado" })),
            ..full_backend()
        };
        let snapshot = load_snapshot(&backend).await.unwrap();

        assert!(snapshot.clusters.is_empty());
        assert!(snapshot.failures.is_empty());
        assert_eq!(snapshot.shape_warnings.len(), 1);
        assert_eq!(snapshot.shape_warnings[0].source, SourceKind::Clusters);
    }

    #[tokio::test]
    async fn undecodable_body_is_a_shape_warning() {
        let backend = FixedBackend {
            ranking: Some(json!({ "top_bairros": "not a list" })),
            ..full_backend()
        };
        let snapshot = load_snapshot(&backend).await.unwrap();

        assert!(snapshot.ranking.is_empty());
        assert_eq!(snapshot.shape_warnings[0].source, SourceKind::Ranking);
        assert!(snapshot.failures.is_empty());
    }
}
