//! Query inputs and their local validation.

use chrono::Datelike;
use crime_risk_backend_models::{ClusterPredictRequest, CrimePredictRequest};
use crime_risk_models::normalize_name;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::QueryLimits;

/// Input rejected before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No neighborhood was selected.
    #[error("Select a neighborhood")]
    MissingNeighborhood,

    /// Month outside 1-12.
    #[error("Month {month} is outside 1-12")]
    MonthOutOfRange {
        /// Rejected month.
        month: u32,
    },

    /// Year outside the configured range.
    #[error("Year {year} is outside {min}-{max}")]
    YearOutOfRange {
        /// Rejected year.
        year: i32,
        /// Earliest accepted year.
        min: i32,
        /// Latest accepted year.
        max: i32,
    },

    /// Victims outside `1..=max`.
    #[error("Victims must be between 1 and {max}, got {victims}")]
    VictimsOutOfRange {
        /// Rejected count.
        victims: u32,
        /// Largest accepted count.
        max: u32,
    },

    /// Suspects outside `1..=max`.
    #[error("Suspects must be between 1 and {max}, got {suspects}")]
    SuspectsOutOfRange {
        /// Rejected count.
        suspects: u32,
        /// Largest accepted count.
        max: u32,
    },
}

/// Weapon category the prediction model was trained on.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Weapon {
    /// No weapon.
    #[default]
    #[serde(rename = "Nenhum")]
    #[strum(to_string = "Nenhum", serialize = "none")]
    Nenhum,
    /// Firearm.
    #[serde(rename = "Arma de fogo")]
    #[strum(to_string = "Arma de fogo", serialize = "arma-de-fogo", serialize = "firearm")]
    ArmaDeFogo,
    /// Bladed weapon.
    #[serde(rename = "Arma branca")]
    #[strum(to_string = "Arma branca", serialize = "arma-branca", serialize = "blade")]
    ArmaBranca,
    /// Any other weapon.
    #[serde(rename = "Outras armas")]
    #[strum(to_string = "Outras armas", serialize = "outras-armas", serialize = "other")]
    OutrasArmas,
}

impl Weapon {
    /// All categories in form order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Nenhum, Self::ArmaDeFogo, Self::ArmaBranca, Self::OutrasArmas]
    }
}

/// Which cluster does a neighborhood belong to?
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterQuery {
    /// Neighborhood name as selected by the user.
    pub neighborhood: String,
}

impl ClusterQuery {
    /// Creates a query.
    #[must_use]
    pub fn new(neighborhood: impl Into<String>) -> Self {
        Self {
            neighborhood: neighborhood.into(),
        }
    }

    /// Validates the input and builds the request body.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingNeighborhood`] for a blank name.
    pub fn to_request(&self) -> Result<ClusterPredictRequest, ValidationError> {
        Ok(ClusterPredictRequest {
            bairro: require_neighborhood(&self.neighborhood)?,
        })
    }
}

/// How many crimes are expected in a neighborhood and period?
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionQuery {
    /// Neighborhood name as selected by the user.
    pub neighborhood: String,
    /// Month, 1-12.
    pub month: u32,
    /// Year.
    pub year: i32,
    /// Expected victims.
    pub victims: u32,
    /// Expected suspects.
    pub suspects: u32,
    /// Expected weapon category.
    pub weapon: Weapon,
}

impl PredictionQuery {
    /// A query for the current month with one victim, one suspect, and no
    /// weapon.
    #[must_use]
    pub fn for_today(neighborhood: impl Into<String>) -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            neighborhood: neighborhood.into(),
            month: today.month(),
            year: today.year(),
            victims: 1,
            suspects: 1,
            weapon: Weapon::default(),
        }
    }

    /// Validates the input against `limits` and builds the request body.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, checking the
    /// neighborhood, month, year, victims, then suspects.
    pub fn to_request(&self, limits: &QueryLimits) -> Result<CrimePredictRequest, ValidationError> {
        let bairro = require_neighborhood(&self.neighborhood)?;

        if !(1..=12).contains(&self.month) {
            return Err(ValidationError::MonthOutOfRange { month: self.month });
        }
        if !(limits.year_min..=limits.year_max).contains(&self.year) {
            return Err(ValidationError::YearOutOfRange {
                year: self.year,
                min: limits.year_min,
                max: limits.year_max,
            });
        }
        if !(1..=limits.victims_max).contains(&self.victims) {
            return Err(ValidationError::VictimsOutOfRange {
                victims: self.victims,
                max: limits.victims_max,
            });
        }
        if !(1..=limits.suspects_max).contains(&self.suspects) {
            return Err(ValidationError::SuspectsOutOfRange {
                suspects: self.suspects,
                max: limits.suspects_max,
            });
        }

        Ok(CrimePredictRequest {
            bairro,
            mes: self.month,
            ano: self.year,
            quantidade_vitimas: self.victims,
            quantidade_suspeitos: self.suspects,
            arma_utilizada: self.weapon.to_string(),
        })
    }
}

/// The backend matches names case-insensitively, so only surrounding and
/// repeated whitespace is cleaned up; accents are preserved.
fn require_neighborhood(name: &str) -> Result<String, ValidationError> {
    if normalize_name(name).is_empty() {
        return Err(ValidationError::MissingNeighborhood);
    }
    Ok(name.split_whitespace().collect::<Vec<_>>().join(" "))
}
