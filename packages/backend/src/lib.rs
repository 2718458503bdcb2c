#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytics backend client and concurrent snapshot loader.
//!
//! The backend exposes clustering and prediction results over HTTP. This
//! crate defines the [`AnalyticsBackend`] seam (implemented over `reqwest`
//! by [`http::HttpBackend`] and by in-memory doubles in tests), converts
//! wire responses into domain types in [`normalize`], and assembles the
//! three read sources into a [`loader::Snapshot`].

pub mod config;
pub mod http;
pub mod loader;
pub mod normalize;

use crime_risk_backend_models::{
    CatalogResponse, ClusterPredictRequest, ClusterPredictResponse, ClustersResponse,
    CrimePredictRequest, CrimePredictResponse, HealthResponse, HistoryResponse,
    ModelInfoResponse, RankingResponse,
};
use thiserror::Error;

pub use config::BackendConfig;
pub use http::HttpBackend;
pub use loader::{LoadError, Snapshot, SourceKind, load_snapshot};

/// Errors from a single backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request could not be sent or the connection failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned status {status}{}", detail_suffix(.detail))]
    Status {
        /// HTTP status code.
        status: u16,
        /// The backend's `detail` message, if it sent one.
        detail: Option<String>,
    },

    /// The body was not the JSON shape we expected.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A request URL could not be built.
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The URL that failed.
        url: String,
        /// Parser message.
        message: String,
    },
}

impl BackendError {
    /// Whether the failure is worth retrying (network trouble or a 5xx).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Json(_) | Self::InvalidUrl { .. } => false,
        }
    }

    /// Whether the failure is an unexpected response body.
    #[must_use]
    pub const fn is_shape(&self) -> bool {
        matches!(self, Self::Json(_))
    }

    /// The backend-provided error message, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

#[allow(clippy::ref_option)]
fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Errors from building a backend configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL does not parse.
    #[error("Invalid backend URL '{url}': {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parser message.
        message: String,
    },

    /// The timeout is not a positive whole number of seconds.
    #[error("Invalid timeout '{value}': expected a positive number of seconds")]
    InvalidTimeout {
        /// The rejected value.
        value: String,
    },
}

/// The analytics backend's read and query endpoints.
#[async_trait::async_trait]
pub trait AnalyticsBackend: Send + Sync {
    /// Fetches the neighborhood catalog.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails.
    async fn fetch_catalog(&self) -> Result<CatalogResponse, BackendError>;

    /// Fetches per-cluster statistics.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails.
    async fn fetch_clusters(&self) -> Result<ClustersResponse, BackendError>;

    /// Fetches the occurrence ranking.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails.
    async fn fetch_ranking(&self) -> Result<RankingResponse, BackendError>;

    /// Asks which cluster a neighborhood belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails.
    async fn predict_cluster(
        &self,
        request: &ClusterPredictRequest,
    ) -> Result<ClusterPredictResponse, BackendError>;

    /// Predicts the crime count for a neighborhood and period.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails.
    async fn predict_crimes(
        &self,
        request: &CrimePredictRequest,
    ) -> Result<CrimePredictResponse, BackendError>;

    /// Fetches the monthly crime history of a neighborhood.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails.
    async fn fetch_history(&self, neighborhood: &str) -> Result<HistoryResponse, BackendError>;

    /// Fetches a description of the prediction model.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails.
    async fn fetch_model_info(&self) -> Result<ModelInfoResponse, BackendError>;

    /// Checks that the backend is up.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails.
    async fn health(&self) -> Result<HealthResponse, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_classify_by_code() {
        let server = BackendError::Status {
            status: 503,
            detail: None,
        };
        let client = BackendError::Status {
            status: 404,
            detail: Some("Bairro não encontrado".to_string()),
        };
        assert!(server.is_transport());
        assert!(!client.is_transport());
        assert_eq!(client.detail(), Some("Bairro não encontrado"));
        assert_eq!(
            client.to_string(),
            "Backend returned status 404: Bairro não encontrado"
        );
        assert_eq!(server.to_string(), "Backend returned status 503");
    }

    #[test]
    fn json_errors_are_shape_errors() {
        let err: BackendError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(err.is_shape());
        assert!(!err.is_transport());
    }
}
