//! Map markers for the ranked neighborhoods.

use crime_risk::Classification;
use crime_risk_geocoder::GeocodingTable;
use crime_risk_models::{GeoCoordinate, NeighborhoodKey};
use serde::Serialize;

use crate::{MergedRecord, ViewModel};

/// A circle marker at a neighborhood's coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    /// Join key.
    pub key: NeighborhoodKey,
    /// Popup title.
    pub display_name: String,
    /// Marker position.
    pub coordinate: GeoCoordinate,
    /// Occurrences, for the popup.
    pub occurrence_count: Option<u64>,
    /// Tier, fill color, and radius.
    pub classification: Classification,
}

/// Markers plus the neighborhoods that could not be placed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerLayer {
    /// Placed markers in ranking order.
    pub markers: Vec<MapMarker>,
    /// Neighborhoods with no known coordinate.
    pub unlocated: Vec<NeighborhoodKey>,
}

/// Places one marker per ranked neighborhood with a known coordinate.
///
/// When the ranking is empty (for example because its source failed) the
/// catalog neighborhoods are placed instead, so the map is never blank
/// while other data is available.
#[must_use]
pub fn map_markers(view: &ViewModel, table: &GeocodingTable) -> MarkerLayer {
    let records: Vec<&MergedRecord> = if view.ranking.is_empty() {
        view.per_neighborhood.values().collect()
    } else {
        view.ranking.iter().collect()
    };

    let mut layer = MarkerLayer::default();
    for record in records {
        match table.lookup_key(&record.key) {
            Some(coordinate) => layer.markers.push(MapMarker {
                key: record.key.clone(),
                display_name: record.display_name.clone(),
                coordinate,
                occurrence_count: record.occurrence_count,
                classification: record.classification,
            }),
            None => {
                log::debug!("No coordinate for '{}', leaving it off the map", record.key);
                layer.unlocated.push(record.key.clone());
            }
        }
    }
    layer
}

#[cfg(test)]
mod tests {
    use crime_risk::{RiskClassifier, TierStyle};
    use crime_risk_backend::Snapshot;

    use crate::reconcile;
    use crate::tests::{catalog, ranked};

    use super::*;

    fn table() -> GeocodingTable {
        GeocodingTable::from_entries(
            "Recife",
            GeoCoordinate {
                latitude: -8.055,
                longitude: -34.895,
            },
            [(
                "Boa Viagem",
                GeoCoordinate {
                    latitude: -8.1267,
                    longitude: -34.9019,
                },
            )],
        )
    }

    #[test]
    fn unknown_coordinates_are_listed_not_fatal() {
        let snapshot = Snapshot {
            catalog: catalog(&["BOA VIAGEM", "Várzea"]),
            ranking: vec![ranked("boa viagem", 42, Some("Alto")), ranked("Várzea", 2, None)],
            ..Snapshot::default()
        };
        let view = reconcile(&snapshot, &RiskClassifier::default());
        let layer = map_markers(&view, &table());

        assert_eq!(layer.markers.len(), 1);
        let marker = &layer.markers[0];
        assert_eq!(marker.display_name, "BOA VIAGEM");
        assert_eq!(marker.classification.style.radius, TierStyle::HIGH.radius);
        assert!((marker.coordinate.latitude + 8.1267).abs() < 1e-9);
        assert_eq!(layer.unlocated, vec![NeighborhoodKey::new("VARZEA")]);
    }

    #[test]
    fn falls_back_to_catalog_without_ranking() {
        let snapshot = Snapshot {
            catalog: catalog(&["Boa Viagem"]),
            ..Snapshot::default()
        };
        let view = reconcile(&snapshot, &RiskClassifier::default());
        let layer = map_markers(&view, &table());

        assert_eq!(layer.markers.len(), 1);
        assert_eq!(layer.markers[0].occurrence_count, None);
        assert_eq!(layer.markers[0].classification.style, TierStyle::UNKNOWN);
    }
}
