//! Shared, swappable view model.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crime_risk::RiskClassifier;
use crime_risk_backend::{AnalyticsBackend, LoadError, load_snapshot};

use crate::{ViewModel, reconcile};

/// Holds the latest reconciled [`ViewModel`].
///
/// Readers get an `Arc` to a whole snapshot. A refresh builds the next
/// view model completely before swapping it in, so a reader never sees a
/// half-updated state, and a failed refresh leaves the previous one in
/// place. Overlapping refreshes are ordered by when they started: a
/// refresh that finishes after a newer one has been installed is dropped.
pub struct SnapshotStore {
    backend: Arc<dyn AnalyticsBackend>,
    classifier: RiskClassifier,
    seq: AtomicU64,
    current: RwLock<Installed>,
}

#[derive(Default)]
struct Installed {
    seq: u64,
    view: Option<Arc<ViewModel>>,
}

impl SnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(backend: Arc<dyn AnalyticsBackend>, classifier: RiskClassifier) -> Self {
        Self {
            backend,
            classifier,
            seq: AtomicU64::new(0),
            current: RwLock::new(Installed::default()),
        }
    }

    /// The current view model, if a load has succeeded.
    #[must_use]
    pub fn current(&self) -> Option<Arc<ViewModel>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .view
            .clone()
    }

    /// Loads and reconciles a fresh snapshot, then swaps it in.
    ///
    /// If a refresh started later has already been installed, that newer
    /// view is kept and returned instead.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if every source failed. The previous view
    /// model is kept.
    pub async fn refresh(&self) -> Result<Arc<ViewModel>, LoadError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = match load_snapshot(self.backend.as_ref()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Refresh failed, keeping the previous snapshot: {e}");
                return Err(e);
            }
        };

        let view = Arc::new(reconcile(&snapshot, &self.classifier));
        for warning in &view.warnings {
            log::warn!("Data quality: {warning}");
        }

        let mut installed = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if installed.seq > seq
            && let Some(newer) = &installed.view
        {
            log::debug!(
                "Discarding refresh #{seq}, refresh #{} is newer",
                installed.seq
            );
            return Ok(Arc::clone(newer));
        }
        installed.seq = seq;
        installed.view = Some(Arc::clone(&view));
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    use crime_risk_backend::BackendError;
    use crime_risk_backend_models::{
        CatalogResponse, ClusterPredictRequest, ClusterPredictResponse, ClustersResponse,
        CrimePredictRequest, CrimePredictResponse, HealthResponse, HistoryResponse,
        ModelInfoResponse, RankingResponse,
    };
    use serde_json::json;
    use tokio::sync::Notify;

    use super::*;

    /// Serves a fixed catalog until `offline` is set, then fails every
    /// call.
    #[derive(Default)]
    struct FlakyBackend {
        offline: AtomicBool,
    }

    impl FlakyBackend {
        fn check(&self) -> Result<(), BackendError> {
            if self.offline.load(Ordering::SeqCst) {
                Err(BackendError::Status {
                    status: 502,
                    detail: None,
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait::async_trait]
    impl AnalyticsBackend for FlakyBackend {
        async fn fetch_catalog(&self) -> Result<CatalogResponse, BackendError> {
            self.check()?;
            Ok(serde_json::from_value(json!({ "bairros": ["PINA", "TORRE"] }))?)
        }

        async fn fetch_clusters(&self) -> Result<ClustersResponse, BackendError> {
            self.check()?;
            Ok(serde_json::from_value(json!({ "clusters": [] }))?)
        }

        async fn fetch_ranking(&self) -> Result<RankingResponse, BackendError> {
            self.check()?;
            Ok(serde_json::from_value(
                json!({ "top_bairros": [{ "bairro": "Pina", "total_ocorrencias": 4 }] }),
            )?)
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

    /// The first catalog fetch waits for `release` and answers with one
    /// neighborhood; later fetches answer at once with two.
    #[derive(Default)]
    struct GatedBackend {
        catalog_calls: AtomicUsize,
        release: Notify,
    }

    #[async_trait::async_trait]
    impl AnalyticsBackend for GatedBackend {
        async fn fetch_catalog(&self) -> Result<CatalogResponse, BackendError> {
            if self.catalog_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.release.notified().await;
                return Ok(serde_json::from_value(json!({ "bairros": ["PINA"] }))?);
            }
            Ok(serde_json::from_value(json!({ "bairros": ["PINA", "TORRE"] }))?)
        }

        async fn fetch_clusters(&self) -> Result<ClustersResponse, BackendError> {
            Ok(serde_json::from_value(json!({ "clusters": [] }))?)
        }

        async fn fetch_ranking(&self) -> Result<RankingResponse, BackendError> {
            Ok(serde_json::from_value(json!({ "top_bairros": [] }))?)
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

    #[tokio::test]
    async fn late_finishing_older_refresh_does_not_overwrite_newer() {
        let backend = Arc::new(GatedBackend::default());
        let store = SnapshotStore::new(backend.clone(), RiskClassifier::default());

        let (older, newer) = tokio::join!(store.refresh(), async {
            let view = store.refresh().await;
            backend.release.notify_one();
            view
        });
        let (older, newer) = (older.unwrap(), newer.unwrap());

        assert_eq!(newer.per_neighborhood.len(), 2);
        assert!(Arc::ptr_eq(&older, &newer));
        assert!(Arc::ptr_eq(&store.current().unwrap(), &newer));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let backend = Arc::new(FlakyBackend::default());
        let store = SnapshotStore::new(backend.clone(), RiskClassifier::default());
        assert!(store.current().is_none());

        let first = store.refresh().await.unwrap();
        assert_eq!(first.per_neighborhood.len(), 2);

        backend.offline.store(true, Ordering::SeqCst);
        let err = store.refresh().await.unwrap_err();
        assert!(err.is_retryable());

        let current = store.current().unwrap();
        assert!(Arc::ptr_eq(&current, &first));
    }

    #[tokio::test]
    async fn refresh_replaces_the_whole_view() {
        let store = SnapshotStore::new(Arc::new(FlakyBackend::default()), RiskClassifier::default());
        let first = store.refresh().await.unwrap();
        let second = store.refresh().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert!(Arc::ptr_eq(&store.current().unwrap(), &second));
    }
}
