//! Aggregates for the dashboard charts.

use std::collections::BTreeMap;

use crime_risk_models::RiskTier;
use serde::Serialize;

use crate::ViewModel;

/// One bar of the occurrences chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRow {
    /// Neighborhood display name.
    pub label: String,
    /// Occurrences, zero when unknown.
    pub count: u64,
    /// Bar color of the neighborhood's tier.
    pub color: &'static str,
}

impl ViewModel {
    /// The first `n` ranked neighborhoods as chart rows.
    ///
    /// A missing count is drawn as a zero-height bar.
    #[must_use]
    pub fn top_ranked(&self, n: usize) -> Vec<ChartRow> {
        self.ranking
            .iter()
            .take(n)
            .map(|record| ChartRow {
                label: record.display_name.clone(),
                count: record.occurrence_count.unwrap_or(0),
                color: record.classification.style.color,
            })
            .collect()
    }

    /// Number of neighborhoods per tier. Every tier is present, possibly
    /// with a zero count.
    #[must_use]
    pub fn tier_distribution(&self) -> BTreeMap<RiskTier, usize> {
        let mut counts: BTreeMap<RiskTier, usize> =
            RiskTier::all().iter().map(|tier| (*tier, 0)).collect();
        for record in self.per_neighborhood.values() {
            *counts.entry(record.classification.tier).or_default() += 1;
        }
        counts
    }

    /// Total occurrences over the ranked neighborhoods.
    #[must_use]
    pub fn total_occurrences(&self) -> u64 {
        self.ranking
            .iter()
            .filter_map(|record| record.occurrence_count)
            .fold(0, u64::saturating_add)
    }
}
