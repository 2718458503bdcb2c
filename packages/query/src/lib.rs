#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! On-demand cluster membership and crime-count prediction queries.
//!
//! [`QueryOrchestrator`] runs one query at a time from the caller's point
//! of view: every submission takes a new sequence number, and a response
//! that arrives after a newer submission is discarded instead of
//! overwriting the newer state. A successful prediction also fetches the
//! neighborhood's history in a background task; that result only updates
//! the auxiliary [`HistoryStatus`] and never turns a success into a
//! failure.

pub mod input;
pub mod limits;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crime_risk::{Classification, RiskClassifier};
use crime_risk_backend::{AnalyticsBackend, BackendError, normalize};
use crime_risk_models::{ClusterMembership, HistoricalSeries, PredictionResult};
use serde::Serialize;
use tokio::task::JoinHandle;

pub use input::{ClusterQuery, PredictionQuery, ValidationError, Weapon};
pub use limits::{LimitsError, QueryConfig, QueryLimits};

/// Message shown when the backend gave no detail of its own.
pub const GENERIC_FAILURE: &str =
    "Could not complete the query. Check that the analytics service is running and try again.";

/// State of the history fetch that follows a successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryStatus {
    /// Still fetching.
    Pending,
    /// The series arrived.
    Available(HistoricalSeries),
    /// The fetch failed; the prediction itself is unaffected.
    Unavailable {
        /// Why.
        message: String,
    },
}

/// Result of a cluster membership query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOutcome {
    /// Normalized backend answer.
    pub membership: ClusterMembership,
    /// Tier and styling.
    pub classification: Classification,
}

/// Result of a crime-count prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionOutcome {
    /// Normalized backend answer.
    pub result: PredictionResult,
    /// Tier and styling.
    pub classification: Classification,
    /// History of the same neighborhood.
    pub history: HistoryStatus,
}

/// A successful query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryOutcome {
    /// From [`QueryOrchestrator::submit_cluster`].
    Cluster(ClusterOutcome),
    /// From [`QueryOrchestrator::submit_prediction`].
    Prediction(PredictionOutcome),
}

/// A failed query, ready to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryFailure {
    /// The backend's detail message, or [`GENERIC_FAILURE`].
    pub message: String,
    /// Whether offering a retry makes sense.
    pub retryable: bool,
}

impl QueryFailure {
    fn from_backend(error: &BackendError) -> Self {
        log::warn!("Query failed: {error}");
        Self {
            message: error
                .detail()
                .map_or_else(|| GENERIC_FAILURE.to_string(), str::to_string),
            retryable: error.is_transport(),
        }
    }

    fn timed_out(timeout: Duration) -> Self {
        log::warn!("Query timed out after {timeout:?}");
        Self {
            message: format!("The analytics service did not answer within {timeout:?}."),
            retryable: true,
        }
    }
}

/// Orchestrator state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum QueryState {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// Waiting for the response to submission `seq`.
    Loading {
        /// Sequence number of the in-flight submission.
        seq: u64,
    },
    /// The latest submission succeeded.
    Success(QueryOutcome),
    /// The latest submission failed.
    Failed(QueryFailure),
}

/// What happened to one submission's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The response became the current state.
    Settled,
    /// A newer submission was made first; the response was dropped.
    Superseded,
}

#[derive(Default)]
struct Inner {
    seq: u64,
    state: QueryState,
    history_task: Option<JoinHandle<()>>,
}

type Shared = Arc<Mutex<Inner>>;

fn lock(shared: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs cluster and prediction queries against the backend.
pub struct QueryOrchestrator {
    backend: Arc<dyn AnalyticsBackend>,
    classifier: RiskClassifier,
    config: QueryConfig,
    shared: Shared,
}

impl QueryOrchestrator {
    /// Creates an idle orchestrator with the default classifier.
    #[must_use]
    pub fn new(backend: Arc<dyn AnalyticsBackend>, config: QueryConfig) -> Self {
        Self {
            backend,
            classifier: RiskClassifier::default(),
            config,
            shared: Arc::default(),
        }
    }

    /// Replaces the classifier used to style results.
    #[must_use]
    pub fn with_classifier(mut self, classifier: RiskClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> QueryState {
        lock(&self.shared).state.clone()
    }

    /// Sequence number of the latest submission, zero before any.
    #[must_use]
    pub fn current_seq(&self) -> u64 {
        lock(&self.shared).seq
    }

    /// Asks which cluster a neighborhood belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] without contacting the backend, and
    /// without changing the state, if the input is invalid.
    pub async fn submit_cluster(&self, query: ClusterQuery) -> Result<Settlement, ValidationError> {
        let request = query.to_request()?;
        let seq = self.begin();
        log::debug!("Cluster query #{seq} for '{}'", request.bairro);

        let state = match self.bounded(self.backend.predict_cluster(&request)).await {
            Ok(resp) => {
                let membership = normalize::cluster_membership(resp, &request.bairro);
                let classification = self.classifier.classify(&membership);
                QueryState::Success(QueryOutcome::Cluster(ClusterOutcome {
                    membership,
                    classification,
                }))
            }
            Err(failure) => QueryState::Failed(failure),
        };

        Ok(self.settle(seq, state, None))
    }

    /// Predicts the crime count for a neighborhood and period, then
    /// fetches the neighborhood's history in the background.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] without contacting the backend, and
    /// without changing the state, if the input is invalid.
    pub async fn submit_prediction(
        &self,
        query: PredictionQuery,
    ) -> Result<Settlement, ValidationError> {
        let request = query.to_request(&self.config.limits)?;
        let seq = self.begin();
        log::debug!(
            "Prediction query #{seq} for '{}' {:02}/{}",
            request.bairro,
            request.mes,
            request.ano
        );

        match self.bounded(self.backend.predict_crimes(&request)).await {
            Ok(resp) => {
                let result = normalize::prediction_result(resp, &request);
                let classification = self.classifier.classify(&result);
                let state = QueryState::Success(QueryOutcome::Prediction(PredictionOutcome {
                    result,
                    classification,
                    history: HistoryStatus::Pending,
                }));
                Ok(self.settle(seq, state, Some(request.bairro)))
            }
            Err(failure) => Ok(self.settle(seq, QueryState::Failed(failure), None)),
        }
    }

    /// Waits for the current history fetch, if any, to finish.
    pub async fn history_settled(&self) {
        let task = lock(&self.shared).history_task.take();
        if let Some(task) = task
            && let Err(e) = task.await
            && !e.is_cancelled()
        {
            log::error!("History task panicked: {e}");
        }
    }

    /// Starts a submission: bumps the sequence, enters `Loading`, and
    /// cancels the previous history fetch.
    fn begin(&self) -> u64 {
        let mut inner = lock(&self.shared);
        let seq = inner.seq + 1;
        inner.seq = seq;
        inner.state = QueryState::Loading { seq };
        if let Some(task) = inner.history_task.take() {
            task.abort();
        }
        seq
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, QueryFailure> {
        match tokio::time::timeout(self.config.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(QueryFailure::from_backend(&e)),
            Err(_) => Err(QueryFailure::timed_out(self.config.timeout)),
        }
    }

    /// Stores `state` if `seq` is still current. With `history_for`, also
    /// spawns the history fetch for that neighborhood.
    fn settle(&self, seq: u64, state: QueryState, history_for: Option<String>) -> Settlement {
        let mut inner = lock(&self.shared);
        if inner.seq != seq {
            log::warn!("Discarding response #{seq}; #{} is current", inner.seq);
            return Settlement::Superseded;
        }
        inner.state = state;
        if let Some(neighborhood) = history_for {
            inner.history_task = Some(self.spawn_history(seq, neighborhood));
        }
        Settlement::Settled
    }

    fn spawn_history(&self, seq: u64, neighborhood: String) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let shared = Arc::clone(&self.shared);
        let timeout = self.config.timeout;

        tokio::spawn(async move {
            let status =
                match tokio::time::timeout(timeout, backend.fetch_history(&neighborhood)).await {
                    Ok(Ok(resp)) => {
                        HistoryStatus::Available(normalize::historical_series(resp, &neighborhood))
                    }
                    Ok(Err(e)) => {
                        log::warn!("History for '{neighborhood}' unavailable: {e}");
                        HistoryStatus::Unavailable {
                            message: e.to_string(),
                        }
                    }
                    Err(_) => {
                        log::warn!("History for '{neighborhood}' timed out");
                        HistoryStatus::Unavailable {
                            message: format!("No answer within {timeout:?}"),
                        }
                    }
                };

            let mut inner = lock(&shared);
            if inner.seq != seq {
                log::debug!("Dropping history for superseded query #{seq}");
                return;
            }
            if let QueryState::Success(QueryOutcome::Prediction(outcome)) = &mut inner.state {
                outcome.history = status;
            }
        })
    }
}
