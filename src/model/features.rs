//! Feature layout shared by the pipeline and the model.
//!
//! The model expects 13 features: the 8 numeric housing fields followed by a
//! one-hot encoding of `ocean_proximity` over the five categories.

use std::collections::BTreeMap;

use ndarray::Array1;

use crate::domain::{HousingRecord, OceanProximity};

/// Number of model input features.
pub const NUM_FEATURES: usize = 13;

/// Canonical feature order.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "longitude",
    "latitude",
    "housing_median_age",
    "total_rooms",
    "total_bedrooms",
    "population",
    "households",
    "median_income",
    "ocean_proximity_<1H OCEAN",
    "ocean_proximity_INLAND",
    "ocean_proximity_ISLAND",
    "ocean_proximity_NEAR BAY",
    "ocean_proximity_NEAR OCEAN",
];

/// Name of the one-hot column for a category.
pub fn one_hot_column(category: OceanProximity) -> String {
    format!("ocean_proximity_{}", category.as_str())
}

/// Builds the named feature map for a record.
pub fn record_to_feature_map(record: &HousingRecord) -> BTreeMap<String, f64> {
    let mut features: BTreeMap<String, f64> = record
        .numeric_fields()
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect();

    for category in OceanProximity::ALL {
        let hot = if category == record.ocean_proximity { 1.0 } else { 0.0 };
        features.insert(one_hot_column(category), hot);
    }

    features
}

/// Orders a named feature map into the canonical vector.
///
/// Returns the name of the first missing feature on failure.
pub fn feature_map_to_array(features: &BTreeMap<String, f64>) -> Result<Array1<f64>, String> {
    let mut values = Vec::with_capacity(NUM_FEATURES);
    for name in FEATURE_NAMES {
        match features.get(name) {
            Some(value) => values.push(*value),
            None => return Err(name.to_string()),
        }
    }
    Ok(Array1::from(values))
}

/// Converts a record straight to the canonical feature vector.
pub fn record_to_features(record: &HousingRecord) -> Array1<f64> {
    let mut values = Vec::with_capacity(NUM_FEATURES);
    values.extend(record.numeric_fields().iter().map(|(_, value)| *value));
    values.extend(record.ocean_proximity.one_hot());
    Array1::from(values)
}
