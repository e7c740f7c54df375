//! Request and response bodies of the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{HousingRecord, OceanProximity, PredictionStatus};

/// Body of `POST /predictions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionRequest {
    pub longitude: f64,
    pub latitude: f64,
    pub housing_median_age: f64,
    pub total_rooms: f64,
    pub total_bedrooms: f64,
    pub population: f64,
    pub households: f64,
    pub median_income: f64,
    pub ocean_proximity: OceanProximity,
}

impl PredictionRequest {
    /// Converts the request into a record with a fresh id.
    pub fn to_housing_record(&self) -> HousingRecord {
        HousingRecord::new(
            self.longitude,
            self.latitude,
            self.housing_median_age,
            self.total_rooms,
            self.total_bedrooms,
            self.population,
            self.households,
            self.median_income,
            self.ocean_proximity,
        )
    }
}

/// Body of every successful prediction response.
///
/// Fields that do not apply to the current status are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub run_id: String,
    pub status: PredictionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PredictionResponse {
    pub fn submitted(run_id: impl Into<String>) -> Self {
        Self::in_progress(run_id, PredictionStatus::Pending)
    }

    pub fn in_progress(run_id: impl Into<String>, status: PredictionStatus) -> Self {
        Self {
            run_id: run_id.into(),
            status,
            prediction: None,
            completed_at: None,
        }
    }

    pub fn completed(run_id: impl Into<String>, prediction: f64, completed_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            status: PredictionStatus::Completed,
            prediction: Some(prediction),
            completed_at: Some(completed_at),
        }
    }

    pub fn failed(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            status: PredictionStatus::Failed,
            prediction: None,
            completed_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}
