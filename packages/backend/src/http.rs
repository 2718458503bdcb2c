//! `reqwest` implementation of [`AnalyticsBackend`].
//!
//! Every call reads the body as text first so that a non-2xx status can
//! surface the backend's `detail` message, and so that decode failures
//! are reported as [`BackendError::Json`] rather than as transport errors.

use crime_risk_backend_models::{
    CatalogResponse, ClusterPredictRequest, ClusterPredictResponse, ClustersResponse,
    CrimePredictRequest, CrimePredictResponse, ErrorBody, HealthResponse, HistoryResponse,
    ModelInfoResponse, RankingResponse,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{AnalyticsBackend, BackendConfig, BackendError};

const CATALOG_PATH: &str = "/clustering/";
const CLUSTERS_PATH: &str = "/clustering/clusters/info";
const RANKING_PATH: &str = "/clustering/bairros/ranking";
const CLUSTER_PREDICT_PATH: &str = "/clustering/predict";
const CRIME_PREDICT_PATH: &str = "/predicao/predict";
const HISTORY_PATH: &str = "/predicao/historico";
const MODEL_INFO_PATH: &str = "/predicao/";
const HEALTH_PATH: &str = "/";

/// HTTP client for the analytics backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Creates a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Http`] if the TLS backend cannot be
    /// initialized.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Returns the base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Builds the history URL, percent-encoding the neighborhood name as a
    /// single path segment.
    fn history_url(&self, neighborhood: &str) -> Result<reqwest::Url, BackendError> {
        let raw = self.url(HISTORY_PATH);
        let invalid = |message: String| BackendError::InvalidUrl {
            url: raw.clone(),
            message,
        };

        let mut url = reqwest::Url::parse(&raw).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("URL cannot have path segments".to_string()))?
            .pop_if_empty()
            .push(neighborhood);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = self.url(path);
        log::debug!("GET {url}");
        let resp = self.client.get(&url).send().await?;
        decode(resp).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let url = self.url(path);
        log::debug!("POST {url}");
        let resp = self.client.post(&url).json(body).send().await?;
        decode(resp).await
    }
}

/// Turns a response into `T`, or into [`BackendError::Status`] carrying the
/// backend's `detail` message.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, BackendError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            detail: error_detail(&body),
        });
    }

    Ok(serde_json::from_str(&body)?)
}

fn error_detail(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message())
}

#[async_trait::async_trait]
impl AnalyticsBackend for HttpBackend {
    async fn fetch_catalog(&self) -> Result<CatalogResponse, BackendError> {
        self.get(CATALOG_PATH).await
    }

    async fn fetch_clusters(&self) -> Result<ClustersResponse, BackendError> {
        self.get(CLUSTERS_PATH).await
    }

    async fn fetch_ranking(&self) -> Result<RankingResponse, BackendError> {
        self.get(RANKING_PATH).await
    }

    async fn predict_cluster(
        &self,
        request: &ClusterPredictRequest,
    ) -> Result<ClusterPredictResponse, BackendError> {
        self.post(CLUSTER_PREDICT_PATH, request).await
    }

    async fn predict_crimes(
        &self,
        request: &CrimePredictRequest,
    ) -> Result<CrimePredictResponse, BackendError> {
        self.post(CRIME_PREDICT_PATH, request).await
    }

    async fn fetch_history(&self, neighborhood: &str) -> Result<HistoryResponse, BackendError> {
        let url = self.history_url(neighborhood)?;
        log::debug!("GET {url}");
        let resp = self.client.get(url).send().await?;
        decode(resp).await
    }

    async fn fetch_model_info(&self) -> Result<ModelInfoResponse, BackendError> {
        self.get(MODEL_INFO_PATH).await
    }

    async fn health(&self) -> Result<HealthResponse, BackendError> {
        self.get(HEALTH_PATH).await
    }
}
