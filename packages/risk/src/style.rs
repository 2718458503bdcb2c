//! Visual constants per risk tier.

use crime_risk_models::RiskTier;
use serde::Serialize;

/// Rendering attributes for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierStyle {
    /// Hex fill color for markers and chart series.
    pub color: &'static str,
    /// Map marker radius in pixels.
    pub radius: u8,
    /// Badge CSS classes.
    pub badge: &'static str,
}

impl TierStyle {
    /// Low risk: green.
    pub const LOW: Self = Self {
        color: "#10b981",
        radius: 9,
        badge: "bg-green-100 text-green-800",
    };

    /// Medium risk: amber.
    pub const MEDIUM: Self = Self {
        color: "#f59e0b",
        radius: 12,
        badge: "bg-yellow-100 text-yellow-800",
    };

    /// High risk: red.
    pub const HIGH: Self = Self {
        color: "#dc2626",
        radius: 15,
        badge: "bg-red-100 text-red-800",
    };

    /// Very high risk (predictions only): dark red.
    pub const VERY_HIGH: Self = Self {
        color: "#991b1b",
        radius: 18,
        badge: "bg-red-200 text-red-900",
    };

    /// Records whose tier could not be resolved from any signal.
    pub const UNKNOWN: Self = Self {
        color: "#6b7280",
        radius: 8,
        badge: "bg-gray-100 text-gray-800",
    };

    /// Style for a resolved tier.
    #[must_use]
    pub const fn for_tier(tier: RiskTier) -> Self {
        match tier {
            RiskTier::Low => Self::LOW,
            RiskTier::Medium => Self::MEDIUM,
            RiskTier::High => Self::HIGH,
            RiskTier::VeryHigh => Self::VERY_HIGH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radii_grow_with_tier() {
        let radii: Vec<u8> = RiskTier::all()
            .iter()
            .map(|t| TierStyle::for_tier(*t).radius)
            .collect();
        assert_eq!(radii, vec![9, 12, 15, 18]);
        assert!(TierStyle::UNKNOWN.radius < TierStyle::LOW.radius);
    }

    #[test]
    fn colors_are_distinct() {
        let mut colors: Vec<&str> = RiskTier::all()
            .iter()
            .map(|t| TierStyle::for_tier(*t).color)
            .collect();
        colors.push(TierStyle::UNKNOWN.color);
        let before = colors.len();
        colors.sort_unstable();
        colors.dedup();
        assert_eq!(colors.len(), before);
    }
}
