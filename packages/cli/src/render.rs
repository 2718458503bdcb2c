//! Plain-text rendering of views and query outcomes.

use crime_risk::{Classification, TierSource};
use crime_risk_backend_models::ModelInfoResponse;
use crime_risk_geocoder::GeocodingTable;
use crime_risk_models::{NOT_AVAILABLE, RiskTier, format_count, format_metric};
use crime_risk_query::{HistoryStatus, QueryOutcome};
use crime_risk_view::{MarkerLayer, MergedRecord, ViewModel};

fn tier(classification: &Classification) -> String {
    let name = classification.tier.display_name();
    match classification.source {
        TierSource::Unresolved => format!("{name} (assumed)"),
        TierSource::Label | TierSource::ClusterTable => name.to_string(),
    }
}

fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}

pub fn overview(view: &ViewModel, top: usize) {
    println!("Neighborhoods: {}", view.per_neighborhood.len());
    println!("Clusters:      {}", view.per_cluster.len());
    println!("Occurrences:   {}", view.total_occurrences());
    println!();

    println!("Risk distribution");
    let distribution = view.tier_distribution();
    for tier in RiskTier::all() {
        let count = distribution.get(tier).copied().unwrap_or(0);
        if *tier == RiskTier::VeryHigh && count == 0 {
            continue;
        }
        println!("  {:<10} {count}", tier.display_name());
    }
    println!();

    println!("Top {top} by occurrences");
    for row in view.top_ranked(top) {
        println!("  {:<28} {:>6}  {}", row.label, row.count, row.color);
    }

    if !view.warnings.is_empty() {
        println!();
        println!("Data warnings");
        for warning in &view.warnings {
            println!("  - {warning}");
        }
    }
}

pub fn clusters(view: &ViewModel) {
    for cluster in &view.per_cluster {
        let stats = &cluster.statistics;
        println!(
            "{} [{}] - {} neighborhoods",
            cluster.label,
            tier(&cluster.classification),
            cluster.total_neighborhoods
        );
        println!("  {}", cluster.description);
        println!(
            "  avg suspects {}  avg victims {}  armed {}%  occurrences {}",
            format_metric(stats.average_suspects, 2),
            format_metric(stats.average_victims, 2),
            format_metric(stats.percent_armed, 1),
            format_count(stats.total_occurrences),
        );
        if let Some(critical) = &stats.most_critical {
            println!("  most critical: {critical}");
        }
        println!();
    }
}

pub fn ranking(rows: &[MergedRecord]) {
    println!(
        "{:>4}  {:<28} {:>11} {:>12} {:>7}  {:<10} CLUSTER",
        "#", "NEIGHBORHOOD", "OCCURRENCES", "AVG SUSPECTS", "ARMED%", "RISK"
    );
    println!("{}", "-".repeat(90));
    for record in rows {
        println!(
            "{:>4}  {:<28} {:>11} {:>12} {:>7}  {:<10} {}",
            record
                .rank_position
                .map_or_else(|| NOT_AVAILABLE.to_string(), |p| p.to_string()),
            record.display_name,
            format_count(record.occurrence_count),
            format_metric(record.average_suspects, 2),
            format_metric(record.percent_armed, 1),
            tier(&record.classification),
            or_na(record.cluster_label().as_deref()),
        );
    }
}

pub fn map(table: &GeocodingTable, layer: &MarkerLayer) {
    let center = table.center();
    println!(
        "{} (center {:.4}, {:.4}, zoom {})",
        table.city(),
        center.latitude,
        center.longitude,
        table.zoom()
    );
    for marker in &layer.markers {
        println!(
            "  {:<28} {:>9.4} {:>9.4}  {} r={}  {}",
            marker.display_name,
            marker.coordinate.latitude,
            marker.coordinate.longitude,
            marker.classification.style.color,
            marker.classification.style.radius,
            format_count(marker.occurrence_count),
        );
    }
    if !layer.unlocated.is_empty() {
        let names: Vec<&str> = layer.unlocated.iter().map(|k| k.as_str()).collect();
        println!("No coordinates for: {}", names.join(", "));
    }
}

pub fn outcome(outcome: &QueryOutcome) {
    match outcome {
        QueryOutcome::Cluster(cluster) => {
            let membership = &cluster.membership;
            let stats = &membership.neighborhood_stats;
            println!(
                "{}: {} [{}]",
                membership.neighborhood,
                or_na(membership.cluster_id.map(crime_risk_view::group_label).as_deref()),
                tier(&cluster.classification)
            );
            println!("  {}", membership.description);
            println!(
                "  occurrences {}  ranking #{}  avg suspects {}  armed {}%",
                format_count(stats.total_occurrences),
                stats
                    .rank_position
                    .map_or_else(|| NOT_AVAILABLE.to_string(), |p| p.to_string()),
                format_metric(stats.average_suspects, 2),
                format_metric(stats.percent_armed, 1),
            );
            if !membership.cluster_members.is_empty() {
                println!("  same cluster: {}", membership.cluster_members.join(", "));
            }
            if !membership.recommendation.is_empty() {
                println!("  {}", membership.recommendation);
            }
        }
        QueryOutcome::Prediction(prediction) => {
            let result = &prediction.result;
            println!(
                "{} {}: {} crimes predicted [{}]",
                result.neighborhood,
                result.period,
                format_metric(result.predicted_count, 1),
                tier(&prediction.classification)
            );
            if !result.recommendation.is_empty() {
                println!("  {}", result.recommendation);
            }
            match &prediction.history {
                HistoryStatus::Available(series) => {
                    let stats = &series.statistics;
                    println!(
                        "  history: {} periods, mean {}, max {}, min {}, trend {}",
                        series.points.len(),
                        format_metric(stats.mean, 2),
                        format_count(stats.max),
                        format_count(stats.min),
                        stats.trend
                    );
                    for point in &series.points {
                        println!("    {}  {}", point.period, point.crime_count);
                    }
                }
                HistoryStatus::Unavailable { message } => {
                    println!("  history unavailable: {message}");
                }
                HistoryStatus::Pending => println!("  history: pending"),
            }
        }
    }
}

pub fn model(info: &ModelInfoResponse) {
    println!("Model:     {}", or_na(info.modelo.as_deref()));
    println!("Kind:      {}", or_na(info.tipo.as_deref()));
    println!("Objective: {}", or_na(info.objetivo.as_deref()));
    println!("Target:    {}", or_na(info.target.as_deref()));
    println!("Features:  {}", info.features.join(", "));
    println!("Neighborhoods available: {}", info.bairros_disponiveis.len());
}
