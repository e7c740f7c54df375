//! Housing record entity and the ocean-proximity category.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;

/// Proximity of a housing block to the ocean.
///
/// Serialised as the exact category strings used by the training data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OceanProximity {
    #[serde(rename = "<1H OCEAN")]
    LessThanOneHour,
    #[serde(rename = "INLAND")]
    Inland,
    #[serde(rename = "ISLAND")]
    Island,
    #[serde(rename = "NEAR BAY")]
    NearBay,
    #[serde(rename = "NEAR OCEAN")]
    NearOcean,
}

impl OceanProximity {
    /// All categories, in one-hot column order.
    pub const ALL: [OceanProximity; 5] = [
        OceanProximity::LessThanOneHour,
        OceanProximity::Inland,
        OceanProximity::Island,
        OceanProximity::NearBay,
        OceanProximity::NearOcean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OceanProximity::LessThanOneHour => "<1H OCEAN",
            OceanProximity::Inland => "INLAND",
            OceanProximity::Island => "ISLAND",
            OceanProximity::NearBay => "NEAR BAY",
            OceanProximity::NearOcean => "NEAR OCEAN",
        }
    }

    /// Position of this category in [`OceanProximity::ALL`].
    pub fn index(&self) -> usize {
        match self {
            OceanProximity::LessThanOneHour => 0,
            OceanProximity::Inland => 1,
            OceanProximity::Island => 2,
            OceanProximity::NearBay => 3,
            OceanProximity::NearOcean => 4,
        }
    }

    /// One-hot encoding over [`OceanProximity::ALL`].
    pub fn one_hot(&self) -> [f64; 5] {
        let mut encoded = [0.0; 5];
        encoded[self.index()] = 1.0;
        encoded
    }
}

impl fmt::Display for OceanProximity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OceanProximity {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OceanProximity::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| PipelineError::DataValidation(format!("Invalid ocean proximity: {}", s)))
    }
}

/// A single block of housing features to price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HousingRecord {
    /// Unique identifier; generated when absent.
    #[serde(default = "new_record_id")]
    pub id: String,
    pub longitude: f64,
    pub latitude: f64,
    /// Median age of houses in the block.
    pub housing_median_age: f64,
    pub total_rooms: f64,
    pub total_bedrooms: f64,
    pub population: f64,
    pub households: f64,
    /// Median income of households in the block (tens of thousands).
    pub median_income: f64,
    pub ocean_proximity: OceanProximity,
}

fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

impl HousingRecord {
    /// Creates a record with a freshly generated id.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        longitude: f64,
        latitude: f64,
        housing_median_age: f64,
        total_rooms: f64,
        total_bedrooms: f64,
        population: f64,
        households: f64,
        median_income: f64,
        ocean_proximity: OceanProximity,
    ) -> Self {
        Self {
            id: new_record_id(),
            longitude,
            latitude,
            housing_median_age,
            total_rooms,
            total_bedrooms,
            population,
            households,
            median_income,
            ocean_proximity,
        }
    }

    /// Overrides the generated id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Numeric fields in canonical feature order.
    pub fn numeric_fields(&self) -> [(&'static str, f64); 8] {
        [
            ("longitude", self.longitude),
            ("latitude", self.latitude),
            ("housing_median_age", self.housing_median_age),
            ("total_rooms", self.total_rooms),
            ("total_bedrooms", self.total_bedrooms),
            ("population", self.population),
            ("households", self.households),
            ("median_income", self.median_income),
        ]
    }

    /// Checks that every numeric field is finite and that counts are non-negative.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (name, value) in self.numeric_fields() {
            if !value.is_finite() {
                return Err(PipelineError::DataValidation(format!(
                    "{} must be a finite number",
                    name
                )));
            }
        }

        for (name, value) in self.numeric_fields().into_iter().skip(2) {
            if value < 0.0 {
                return Err(PipelineError::DataValidation(format!(
                    "{} must be a non-negative number",
                    name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_record() -> HousingRecord {
    HousingRecord::new(
        -122.64,
        38.01,
        36.0,
        1336.0,
        258.0,
        678.0,
        249.0,
        5.5789,
        OceanProximity::NearOcean,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ocean_proximity_round_trip_strings() {
        for category in OceanProximity::ALL {
            let parsed: OceanProximity = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert!("OUT OF REACH".parse::<OceanProximity>().is_err());
    }

    #[test]
    fn test_ocean_proximity_serde_uses_category_strings() {
        let json = serde_json::to_string(&OceanProximity::LessThanOneHour).unwrap();
        assert_eq!(json, "\"<1H OCEAN\"");

        let parsed: OceanProximity = serde_json::from_str("\"NEAR BAY\"").unwrap();
        assert_eq!(parsed, OceanProximity::NearBay);
    }

    #[test]
    fn test_one_hot_encoding() {
        assert_eq!(OceanProximity::Inland.one_hot(), [0.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(
            OceanProximity::NearOcean.one_hot(),
            [0.0, 0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_record_gets_generated_id() {
        let a = sample_record();
        let b = sample_record();
        assert!(Uuid::parse_str(&a.id).is_ok());
        assert_ne!(a.id, b.id);
        assert_eq!(a.clone().with_id("fixed").id, "fixed");
    }

    #[test]
    fn test_record_deserialize_without_id() {
        let json = serde_json::json!({
            "longitude": -122.23,
            "latitude": 37.88,
            "housing_median_age": 41.0,
            "total_rooms": 880.0,
            "total_bedrooms": 129.0,
            "population": 322.0,
            "households": 126.0,
            "median_income": 8.3252,
            "ocean_proximity": "NEAR BAY"
        });
        let record: HousingRecord = serde_json::from_value(json).unwrap();
        assert!(!record.id.is_empty());
        assert_eq!(record.ocean_proximity, OceanProximity::NearBay);
    }

    #[test]
    fn test_record_rejects_unknown_fields() {
        let json = serde_json::json!({
            "longitude": -122.23,
            "latitude": 37.88,
            "housing_median_age": 41.0,
            "total_rooms": 880.0,
            "total_bedrooms": 129.0,
            "population": 322.0,
            "households": 126.0,
            "median_income": 8.3252,
            "ocean_proximity": "NEAR BAY",
            "pool": true
        });
        assert!(serde_json::from_value::<HousingRecord>(json).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(sample_record().validate().is_ok());

        let mut record = sample_record();
        record.population = -1.0;
        let err = record.validate().unwrap_err();
        assert!(err.to_string().contains("population"));

        // Coordinates may be negative.
        let mut record = sample_record();
        record.latitude = -33.9;
        assert!(record.validate().is_ok());

        let mut record = sample_record();
        record.median_income = f64::NAN;
        assert!(record.validate().is_err());
    }
}
