//! Converts wire responses into domain types.
//!
//! This is the only place that knows about the backend's field names and
//! alternative shapes. Entries without a usable neighborhood name are
//! skipped; every other missing field gets its documented default.

use crime_risk_backend_models::{
    CatalogItem, ClusterInfo, ClusterPredictResponse, ClusterStatsWire, CrimePredictRequest,
    CrimePredictResponse, HistoryEntry, HistoryResponse, RankingEntry,
};
use crime_risk_models::{
    CatalogEntry, ClusterMembership, ClusterStatistics, ClusterSummary, HistoricalSeries,
    HistoryPoint, HistoryStatistics, NeighborhoodKey, NeighborhoodRecord, NeighborhoodStatistics,
    PredictionResult, Trend,
};

/// Description used when the backend sends none.
pub const NO_DESCRIPTION: &str = "No description available";

/// Resolves each catalog item, bare name or record, into a [`CatalogEntry`].
#[must_use]
pub fn catalog_entries(items: Vec<CatalogItem>) -> Vec<CatalogEntry> {
    items
        .into_iter()
        .filter_map(|item| match item {
            CatalogItem::Name(name) => catalog_entry(name, None, None),
            CatalogItem::Record(record) => catalog_entry(
                record.bairro.unwrap_or_default(),
                record.cluster,
                record.nivel_risco,
            ),
        })
        .collect()
}

fn catalog_entry(
    name: String,
    cluster_id: Option<u32>,
    risk_label: Option<String>,
) -> Option<CatalogEntry> {
    let key = NeighborhoodKey::new(&name);
    if key.is_empty() {
        log::debug!("Skipping catalog entry without a neighborhood name");
        return None;
    }
    Some(CatalogEntry {
        key,
        display_name: name.trim().to_string(),
        cluster_id,
        risk_label,
    })
}

/// Converts ranking entries, defaulting missing counts and percentages to
/// zero. Entries without a position take their list position.
#[must_use]
pub fn ranking_records(entries: Vec<RankingEntry>) -> Vec<NeighborhoodRecord> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let name = entry.bairro?;
            let key = NeighborhoodKey::new(&name);
            if key.is_empty() {
                return None;
            }
            let list_position = u32::try_from(index + 1).ok();
            Some(NeighborhoodRecord {
                key,
                display_name: name.trim().to_string(),
                occurrence_count: entry.total_ocorrencias.unwrap_or(0),
                average_suspects: entry.media_suspeitos,
                percent_armed: entry.percentual_com_arma.unwrap_or(0.0),
                rank_position: entry.posicao.or(list_position),
                cluster_id: entry.cluster,
                risk_label: entry.nivel_risco,
                average_hour: entry.media_hora,
            })
        })
        .collect()
}

/// Converts cluster-info entries. Entries without a cluster id are dropped.
#[must_use]
pub fn cluster_summaries(clusters: Vec<ClusterInfo>) -> Vec<ClusterSummary> {
    clusters
        .into_iter()
        .filter_map(|info| {
            let Some(cluster_id) = info.cluster_id else {
                log::warn!("Skipping cluster entry without a cluster_id");
                return None;
            };
            let members: Vec<NeighborhoodKey> = info
                .bairros
                .iter()
                .map(|name| NeighborhoodKey::new(name))
                .filter(|key| !key.is_empty())
                .collect();
            Some(ClusterSummary {
                cluster_id,
                total_neighborhoods: info
                    .total_bairros
                    .unwrap_or(members.len() as u64),
                description: info
                    .descricao
                    .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                risk_label: info.nivel_risco,
                members,
                statistics: cluster_statistics(info.estatisticas.unwrap_or_default()),
            })
        })
        .collect()
}

fn cluster_statistics(stats: ClusterStatsWire) -> ClusterStatistics {
    ClusterStatistics {
        average_suspects: stats.media_suspeitos,
        average_victims: stats.media_vitimas,
        percent_armed: stats.percentual_com_arma,
        average_suspect_age: stats.media_idade_suspeitos,
        average_hour: stats.media_hora,
        total_occurrences: stats.total_ocorrencias,
        most_critical: stats.bairro_mais_critico,
    }
}

/// Converts a cluster-membership answer. `requested` names the
/// neighborhood if the backend does not echo it.
#[must_use]
pub fn cluster_membership(resp: ClusterPredictResponse, requested: &str) -> ClusterMembership {
    let stats = resp.estatisticas_bairro.unwrap_or_default();
    let cluster = resp.estatisticas_cluster.unwrap_or_default();
    let cluster_members = cluster.bairros.clone();

    ClusterMembership {
        neighborhood: resp.bairro.unwrap_or_else(|| requested.to_string()),
        cluster_id: resp.cluster,
        risk_label: resp.nivel_risco,
        description: resp
            .descricao_cluster
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        neighborhood_stats: NeighborhoodStatistics {
            average_suspects: stats.media_suspeitos,
            average_victims: stats.media_vitimas,
            percent_armed: stats.percentual_com_arma,
            average_suspect_age: stats.media_idade_suspeitos,
            average_hour: stats.media_hora,
            total_occurrences: stats.total_ocorrencias,
            rank_position: stats.posicao_no_ranking,
        },
        cluster_stats: cluster_statistics(cluster),
        cluster_members,
        recommendation: resp.recomendacao.unwrap_or_default(),
    }
}

/// Converts a crime-count prediction, falling back to the request for the
/// neighborhood and period.
#[must_use]
pub fn prediction_result(
    resp: CrimePredictResponse,
    request: &CrimePredictRequest,
) -> PredictionResult {
    PredictionResult {
        neighborhood: resp.bairro.unwrap_or_else(|| request.bairro.clone()),
        predicted_count: resp.previsao_crimes,
        risk_label: resp.nivel_risco,
        period: resp
            .periodo
            .unwrap_or_else(|| period_label(request.mes, request.ano)),
        recommendation: resp.recomendacao.unwrap_or_default(),
    }
}

/// Formats a period as `MM/YYYY`.
#[must_use]
pub fn period_label(month: u32, year: impl std::fmt::Display) -> String {
    format!("{month:02}/{year}")
}

/// Converts a history response.
///
/// Entries without a crime count are skipped. Backend statistics are kept
/// where present and derived from the points where missing.
#[must_use]
pub fn historical_series(resp: HistoryResponse, requested: &str) -> HistoricalSeries {
    let points: Vec<HistoryPoint> = resp
        .historico
        .unwrap_or_default()
        .into_iter()
        .filter_map(history_point)
        .collect();

    let derived = HistoryStatistics::derive(&points);
    let statistics = match resp.estatisticas {
        Some(stats) => HistoryStatistics {
            mean: stats.media.or(derived.mean),
            max: stats.max.or(derived.max),
            min: stats.min.or(derived.min),
            trend: stats
                .tendencia
                .as_deref()
                .map(Trend::from_label)
                .filter(|t| *t != Trend::Unknown)
                .unwrap_or(derived.trend),
        },
        None => derived,
    };

    HistoricalSeries {
        neighborhood: resp.bairro.unwrap_or_else(|| requested.to_string()),
        points,
        statistics,
    }
}

fn history_point(entry: HistoryEntry) -> Option<HistoryPoint> {
    let crime_count = entry.quantidade_crimes?;
    let period = match (entry.periodo, entry.mes, entry.ano) {
        (Some(period), _, _) => period,
        (None, Some(month), Some(year)) => period_label(month, year),
        _ => return None,
    };
    Some(HistoryPoint {
        period,
        crime_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crime_risk_backend_models::{CatalogResponse, ClustersResponse, RankingResponse};
    use serde_json::json;

    #[test]
    fn both_catalog_shapes_normalize_identically() {
        let names: CatalogResponse =
            serde_json::from_value(json!({ "bairros": ["Boa Viagem", " pina "] })).unwrap();
        let records: CatalogResponse = serde_json::from_value(json!({
            "bairros": [{ "bairro": "Boa Viagem" }, { "bairro": " pina " }]
        }))
        .unwrap();

        let from_names = catalog_entries(names.bairros.unwrap());
        let from_records = catalog_entries(records.bairros.unwrap());

        assert_eq!(from_names, from_records);
        assert_eq!(from_names[1].key.as_str(), "PINA");
        assert_eq!(from_names[1].display_name, "pina");
    }

    #[test]
    fn catalog_records_keep_cluster_and_label() {
        let resp: CatalogResponse = serde_json::from_value(json!({
            "bairros": [{ "bairro": "Torre", "cluster": 3, "nivel_risco": "Médio" }, { "cluster": 1 }]
        }))
        .unwrap();
        let entries = catalog_entries(resp.bairros.unwrap());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].cluster_id, Some(3));
        assert_eq!(entries[0].risk_label.as_deref(), Some("Médio"));
    }

    #[test]
    fn ranking_defaults_are_deterministic() {
        let resp: RankingResponse = serde_json::from_value(json!({
            "top_bairros": [
                { "bairro": "Boa Viagem", "total_ocorrencias": 42, "nivel_risco": "Alto", "posicao": 1 },
                { "bairro": "Pina" },
                { "total_ocorrencias": 3 }
            ]
        }))
        .unwrap();
        let records = ranking_records(resp.top_bairros.unwrap());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].occurrence_count, 42);
        assert_eq!(records[0].rank_position, Some(1));
        assert_eq!(records[1].occurrence_count, 0);
        assert!(records[1].percent_armed.abs() < f64::EPSILON);
        assert_eq!(records[1].average_suspects, None);
        assert_eq!(records[1].rank_position, Some(2));
    }

    #[test]
    fn clusters_pass_statistics_through() {
        let resp: ClustersResponse = serde_json::from_value(json!({
            "clusters": [
                {
                    "cluster_id": 0,
                    "descricao": "Perfil de risco médio",
                    "nivel_risco": "Médio",
                    "total_bairros": 2,
                    "bairros": ["BOA VIAGEM", "Pina"],
                    "estatisticas": { "media_suspeitos": 2.1, "total_ocorrencias": 50, "bairro_mais_critico": "BOA VIAGEM" }
                },
                { "descricao": "no id" }
            ]
        }))
        .unwrap();
        let clusters = cluster_summaries(resp.clusters.unwrap());

        assert_eq!(clusters.len(), 1);
        let cluster = &clusters[0];
        assert_eq!(cluster.total_neighborhoods, 2);
        assert_eq!(cluster.members, vec![NeighborhoodKey::new("boa viagem"), NeighborhoodKey::new("PINA")]);
        assert_eq!(cluster.statistics.average_suspects, Some(2.1));
        assert_eq!(cluster.statistics.total_occurrences, Some(50));
        assert_eq!(cluster.statistics.percent_armed, None);
    }

    #[test]
    fn cluster_count_falls_back_to_member_list() {
        let resp: ClustersResponse = serde_json::from_value(json!({
            "clusters": [{ "cluster": 1, "bairros": ["Torre", "Zumbi", "Prado"] }]
        }))
        .unwrap();
        let clusters = cluster_summaries(resp.clusters.unwrap());
        assert_eq!(clusters[0].cluster_id, 1);
        assert_eq!(clusters[0].total_neighborhoods, 3);
        assert_eq!(clusters[0].description, NO_DESCRIPTION);
    }

    #[test]
    fn prediction_falls_back_to_request() {
        let request = CrimePredictRequest {
            bairro: "Pina".to_string(),
            mes: 3,
            ano: 2025,
            quantidade_vitimas: 1,
            quantidade_suspeitos: 1,
            arma_utilizada: "Nenhum".to_string(),
        };
        let result = prediction_result(CrimePredictResponse::default(), &request);
        assert_eq!(result.neighborhood, "Pina");
        assert_eq!(result.period, "03/2025");
        assert_eq!(result.predicted_count, None);
    }

    #[test]
    fn history_derives_missing_statistics() {
        let resp: HistoryResponse = serde_json::from_value(json!({
            "bairro": "Pina",
            "historico": [
                { "ano": 2024, "mes": 1, "quantidade_crimes": 2 },
                { "periodo": "02/2024", "quantidade_crimes": 3 },
                { "periodo": "03/2024" },
                { "periodo": "04/2024", "quantidade_crimes": 6 }
            ],
            "estatisticas": { "media": 3.5, "tendencia": "" }
        }))
        .unwrap();
        let series = historical_series(resp, "PINA");

        let periods: Vec<&str> = series.points.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["01/2024", "02/2024", "04/2024"]);
        assert_eq!(series.statistics.mean, Some(3.5));
        assert_eq!(series.statistics.max, Some(6));
        assert_eq!(series.statistics.trend, Trend::Rising);
    }
}
