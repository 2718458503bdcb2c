#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! JSON request and response types for the crime analytics backend.
//!
//! These mirror the backend's wire format field for field (Portuguese
//! names included). Every response field is optional and numeric fields
//! decode through [`lenient`], so an incomplete response still decodes.
//! Conversion into the domain types happens once, in
//! `crime_risk_backend::normalize`.

pub mod lenient;

use serde::{Deserialize, Serialize};

/// `GET /clustering/` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogResponse {
    /// Neighborhood count reported by the backend.
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub total_bairros: Option<u64>,
    /// Neighborhoods, either bare names or structured records.
    #[serde(default, deserialize_with = "lenient::opt_list")]
    pub bairros: Option<Vec<CatalogItem>>,
}

/// One catalog entry in either of the two shapes the backend has used.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CatalogItem {
    /// A bare neighborhood name.
    Name(String),
    /// A structured record with at least a `bairro` field.
    Record(CatalogRecord),
}

/// Structured catalog entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogRecord {
    /// Neighborhood name.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub bairro: Option<String>,
    /// Cluster id.
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub cluster: Option<u32>,
    /// Risk label.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub nivel_risco: Option<String>,
    /// Average suspects per occurrence.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media_suspeitos: Option<f64>,
    /// Average victims per occurrence.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media_vitimas: Option<f64>,
    /// Percent of occurrences with a weapon.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub percentual_com_arma: Option<f64>,
    /// Average hour of day.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media_hora: Option<f64>,
    /// Total occurrences.
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub total_ocorrencias: Option<u64>,
}

/// `GET /clustering/clusters/info` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClustersResponse {
    /// Cluster count reported by the backend.
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub total_clusters: Option<u64>,
    /// One entry per cluster.
    #[serde(default, deserialize_with = "lenient::opt_list")]
    pub clusters: Option<Vec<ClusterInfo>>,
}

/// One cluster from the cluster-info endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterInfo {
    /// Cluster id.
    #[serde(default, alias = "cluster", deserialize_with = "lenient::opt_u32")]
    pub cluster_id: Option<u32>,
    /// Profile description.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub descricao: Option<String>,
    /// Risk label.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub nivel_risco: Option<String>,
    /// Number of member neighborhoods.
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub total_bairros: Option<u64>,
    /// Member neighborhood names.
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub bairros: Vec<String>,
    /// Aggregates.
    #[serde(default)]
    pub estatisticas: Option<ClusterStatsWire>,
}

/// Cluster aggregates, shared by the cluster-info and cluster-predict
/// endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterStatsWire {
    /// Number of member neighborhoods (cluster-predict only).
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub total_bairros_cluster: Option<u64>,
    /// Member neighborhood names (cluster-predict only).
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub bairros: Vec<String>,
    /// Average suspects per occurrence.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media_suspeitos: Option<f64>,
    /// Average victims per occurrence.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media_vitimas: Option<f64>,
    /// Percent of occurrences with a weapon.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub percentual_com_arma: Option<f64>,
    /// Average suspect age.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media_idade_suspeitos: Option<f64>,
    /// Average hour of day.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media_hora: Option<f64>,
    /// Total occurrences.
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub total_ocorrencias: Option<u64>,
    /// Neighborhood with the most occurrences.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub bairro_mais_critico: Option<String>,
}

/// `GET /clustering/bairros/ranking` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankingResponse {
    /// Neighborhoods considered by the ranking.
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub total_bairros_analisados: Option<u64>,
    /// Ranked neighborhoods, most occurrences first.
    #[serde(default, deserialize_with = "lenient::opt_list")]
    pub top_bairros: Option<Vec<RankingEntry>>,
}

/// One ranked neighborhood.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankingEntry {
    /// 1-based rank.
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub posicao: Option<u32>,
    /// Neighborhood name.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub bairro: Option<String>,
    /// Total occurrences.
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub total_ocorrencias: Option<u64>,
    /// Cluster id.
    #[serde(default, alias = "cluster_id", deserialize_with = "lenient::opt_u32")]
    pub cluster: Option<u32>,
    /// Risk label.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub nivel_risco: Option<String>,
    /// Average suspects per occurrence.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media_suspeitos: Option<f64>,
    /// Percent of occurrences with a weapon.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub percentual_com_arma: Option<f64>,
    /// Average hour of day.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media_hora: Option<f64>,
}

/// `POST /clustering/predict` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterPredictRequest {
    /// Neighborhood name.
    pub bairro: String,
}

/// `POST /clustering/predict` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterPredictResponse {
    /// Neighborhood name, title-cased by the backend.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub bairro: Option<String>,
    /// Assigned cluster.
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub cluster: Option<u32>,
    /// Risk label.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub nivel_risco: Option<String>,
    /// Cluster profile description.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub descricao_cluster: Option<String>,
    /// Neighborhood statistics.
    #[serde(default)]
    pub estatisticas_bairro: Option<NeighborhoodStatsWire>,
    /// Cluster aggregates.
    #[serde(default)]
    pub estatisticas_cluster: Option<ClusterStatsWire>,
    /// Recommendation text.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub recomendacao: Option<String>,
}

/// Per-neighborhood statistics from the cluster-predict endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NeighborhoodStatsWire {
    /// Average suspects per occurrence.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media_suspeitos: Option<f64>,
    /// Average victims per occurrence.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media_vitimas: Option<f64>,
    /// Percent of occurrences with a weapon.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub percentual_com_arma: Option<f64>,
    /// Average suspect age.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media_idade_suspeitos: Option<f64>,
    /// Average hour of day.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media_hora: Option<f64>,
    /// Total occurrences.
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub total_ocorrencias: Option<u64>,
    /// 1-based ranking position.
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub posicao_no_ranking: Option<u32>,
}

/// `POST /predicao/predict` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrimePredictRequest {
    /// Neighborhood name.
    pub bairro: String,
    /// Month, 1-12.
    pub mes: u32,
    /// Year.
    pub ano: i32,
    /// Expected victims.
    pub quantidade_vitimas: u32,
    /// Expected suspects.
    pub quantidade_suspeitos: u32,
    /// Expected weapon category.
    pub arma_utilizada: String,
}

/// `POST /predicao/predict` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrimePredictResponse {
    /// Neighborhood name.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub bairro: Option<String>,
    /// Period label, `MM/YYYY`.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub periodo: Option<String>,
    /// Predicted crime count.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub previsao_crimes: Option<f64>,
    /// Risk label, including `"Muito Alto"`.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub nivel_risco: Option<String>,
    /// Backend's own color hint (`"vermelho"`, `"laranja"`, ...).
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub cor_alerta: Option<String>,
    /// Recommendation text.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub recomendacao: Option<String>,
}

/// `GET /predicao/historico/{bairro}` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryResponse {
    /// Neighborhood name.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub bairro: Option<String>,
    /// Number of records returned.
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub total_registros: Option<u64>,
    /// Chronological records.
    #[serde(default, deserialize_with = "lenient::opt_list")]
    pub historico: Option<Vec<HistoryEntry>>,
    /// Series statistics.
    #[serde(default)]
    pub estatisticas: Option<HistoryStatsWire>,
}

/// One month of history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryEntry {
    /// Year.
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub ano: Option<u32>,
    /// Month.
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub mes: Option<u32>,
    /// Period label, `MM/YYYY`.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub periodo: Option<String>,
    /// Crimes in the period.
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub quantidade_crimes: Option<u64>,
}

/// History statistics as computed by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryStatsWire {
    /// Mean crimes per period.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub media: Option<f64>,
    /// Highest period count.
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub max: Option<u64>,
    /// Lowest period count.
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub min: Option<u64>,
    /// `"crescente"` or `"decrescente"`.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub tendencia: Option<String>,
}

/// `GET /predicao/` response describing the prediction model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    /// Model family.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub modelo: Option<String>,
    /// Model kind.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub tipo: Option<String>,
    /// What the model predicts.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub objetivo: Option<String>,
    /// Input features.
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub features: Vec<String>,
    /// Target variable.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub target: Option<String>,
    /// Neighborhoods the model accepts.
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub bairros_disponiveis: Vec<String>,
}

/// `GET /` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Greeting message.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub mensagem: Option<String>,
    /// API version.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub versao: Option<String>,
    /// `"online"` when healthy.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub status: Option<String>,
}

/// Error body returned by the backend on non-2xx responses.
///
/// `detail` is a string for application errors and a list of objects
/// for request validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    /// Error detail.
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Extracts a human-readable message, if any.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                    .collect();
                (!messages.is_empty()).then(|| messages.join("; "))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn catalog_accepts_bare_names() {
        let resp: CatalogResponse =
            serde_json::from_value(json!({ "bairros": ["BOA VIAGEM", "PINA"] })).unwrap();
        let items = resp.bairros.unwrap();
        assert!(matches!(&items[0], CatalogItem::Name(n) if n == "BOA VIAGEM"));
    }

    #[test]
    fn catalog_accepts_records() {
        let resp: CatalogResponse = serde_json::from_value(json!({
            "total_bairros": 1,
            "bairros": [{ "bairro": "Pina", "cluster": 2, "nivel_risco": "Baixo", "media_suspeitos": "1.5" }]
        }))
        .unwrap();
        let items = resp.bairros.unwrap();
        let CatalogItem::Record(record) = &items[0] else {
            panic!("expected a record");
        };
        assert_eq!(record.bairro.as_deref(), Some("Pina"));
        assert_eq!(record.cluster, Some(2));
        assert_eq!(record.media_suspeitos, Some(1.5));
        assert_eq!(record.total_ocorrencias, None);
    }

    #[test]
    fn one_bad_ranking_entry_keeps_the_rest() {
        let resp: RankingResponse = serde_json::from_value(json!({
            "top_bairros": [{ "bairro": "Pina", "total_ocorrencias": 4 }, "Torre", 7]
        }))
        .unwrap();
        let entries = resp.top_bairros.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].bairro.as_deref(), Some("Pina"));

        let clusters: ClustersResponse = serde_json::from_value(json!({
            "clusters": ["broken", { "cluster_id": 2, "bairros": ["Pina"] }]
        }))
        .unwrap();
        assert_eq!(clusters.clusters.unwrap()[0].cluster_id, Some(2));
    }

    #[test]
    fn missing_collection_field_decodes_as_none() {
        let resp: RankingResponse = serde_json::from_value(json!({ "unexpected": true })).unwrap();
        assert!(resp.top_bairros.is_none());
    }

    #[test]
    fn odd_numeric_fields_degrade_to_none() {
        let entry: RankingEntry = serde_json::from_value(json!({
            "bairro": "Torre",
            "total_ocorrencias": "many",
            "percentual_com_arma": null,
            "cluster": 1.0
        }))
        .unwrap();
        assert_eq!(entry.total_ocorrencias, None);
        assert_eq!(entry.percentual_com_arma, None);
        assert_eq!(entry.cluster, Some(1));
    }

    #[test]
    fn error_body_messages() {
        let plain: ErrorBody =
            serde_json::from_value(json!({ "detail": "Modelo não carregado" })).unwrap();
        assert_eq!(plain.message().as_deref(), Some("Modelo não carregado"));

        let validation: ErrorBody = serde_json::from_value(json!({
            "detail": [{ "loc": ["body", "mes"], "msg": "field required" }]
        }))
        .unwrap();
        assert_eq!(validation.message().as_deref(), Some("field required"));

        assert_eq!(ErrorBody::default().message(), None);
    }
}
