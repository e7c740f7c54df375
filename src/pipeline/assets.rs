//! Stages of the housing prediction job.
//!
//! ```text
//! raw_input -> cleaned_data -> stored_cleaned_data ──────────────┐
//!                   └-> prepared_data -> prediction_result -> stored_prediction_result
//! ```
//!
//! Each stage is a plain function over the previous stage's output.
//! [`execute_job`] runs them in dependency order for one run.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::domain::{HousingRecord, OceanProximity, Prediction};
use crate::error::{PipelineError, PipelineResult};
use crate::metrics::MetricsCollector;
use crate::model::{feature_map_to_array, record_to_feature_map};
use crate::ports::{ModelPort, StoragePort};

/// Key holding the raw record inside a run config.
pub const RUN_CONFIG_DATA_KEY: &str = "data";

/// Fields that must be non-negative, with the label used in error messages.
const NON_NEGATIVE_FIELDS: [(&str, &str); 6] = [
    ("housing_median_age", "Housing median age"),
    ("total_rooms", "Total rooms"),
    ("total_bedrooms", "Total bedrooms"),
    ("population", "Population"),
    ("households", "Households"),
    ("median_income", "Median income"),
];

const NUMERIC_FIELDS: [&str; 8] = [
    "longitude",
    "latitude",
    "housing_median_age",
    "total_rooms",
    "total_bedrooms",
    "population",
    "households",
    "median_income",
];

/// Resources shared by the stages of one run.
#[derive(Clone)]
pub struct RunContext {
    pub run_id: String,
    pub storage: Arc<dyn StoragePort>,
    pub model: Arc<dyn ModelPort>,
}

impl RunContext {
    pub fn new(
        run_id: impl Into<String>,
        storage: Arc<dyn StoragePort>,
        model: Arc<dyn ModelPort>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            storage,
            model,
        }
    }
}

/// Output of the final stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredPrediction {
    pub record_id: String,
    pub prediction: f64,
    pub run_id: String,
}

/// Builds the run config for a record.
///
/// The record id travels as `record_id` so the cleaned row overwrites the
/// submitted one.
pub fn run_config_for(record: &HousingRecord) -> PipelineResult<Value> {
    let mut data = serde_json::to_value(record)
        .map_err(|e| PipelineError::Orchestrator(format!("Failed to build run config: {}", e)))?;

    if let Some(object) = data.as_object_mut() {
        if let Some(id) = object.remove("id") {
            object.insert("record_id".to_string(), id);
        }
    }

    let mut config = Map::new();
    config.insert(RUN_CONFIG_DATA_KEY.to_string(), data);
    Ok(Value::Object(config))
}

/// Loads the raw record from the run config.
pub fn raw_input(run_config: &Value) -> PipelineResult<Map<String, Value>> {
    run_config
        .get(RUN_CONFIG_DATA_KEY)
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| {
            PipelineError::DataValidation(format!(
                "Run config must contain a '{}' object",
                RUN_CONFIG_DATA_KEY
            ))
        })
}

/// Validates and normalizes the raw record.
///
/// - numeric strings are converted to numbers; arrays, booleans and objects
///   are rejected
/// - a missing or null `total_bedrooms` is deliberately filled with 0 before
///   validation, so a record without it is priced rather than rejected
/// - counts, ages and income must be non-negative
/// - `ocean_proximity` must be one of the five categories
pub fn cleaned_data(raw: &Map<String, Value>) -> PipelineResult<HousingRecord> {
    info!(
        record_id = raw.get("record_id").and_then(serde_json::Value::as_str).unwrap_or("unknown"),
        "Starting data cleaning"
    );

    let mut numbers: BTreeMap<&str, Option<f64>> = BTreeMap::new();
    for field in NUMERIC_FIELDS {
        numbers.insert(field, parse_numeric(field, raw.get(field))?);
    }

    if numbers.get("total_bedrooms").copied().flatten().is_none() {
        info!("Filling missing total_bedrooms with 0");
        numbers.insert("total_bedrooms", Some(0.0));
    }

    let value = |field: &str| numbers.get(field).copied().flatten();

    let (Some(longitude), Some(latitude)) = (value("longitude"), value("latitude")) else {
        error!("Invalid longitude or latitude");
        return Err(PipelineError::DataValidation(
            "Longitude and latitude must be numeric".to_string(),
        ));
    };

    for (field, label) in NON_NEGATIVE_FIELDS {
        match value(field) {
            Some(v) if v >= 0.0 => {}
            _ => {
                error!(field = field, "Invalid value");
                return Err(PipelineError::DataValidation(format!(
                    "{} must be a non-negative number",
                    label
                )));
            }
        }
    }

    let ocean_proximity = parse_ocean_proximity(raw.get("ocean_proximity"))?;

    let id = match raw.get("record_id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => Uuid::new_v4().to_string(),
    };

    let record = HousingRecord {
        id,
        longitude,
        latitude,
        housing_median_age: value("housing_median_age").unwrap_or_default(),
        total_rooms: value("total_rooms").unwrap_or_default(),
        total_bedrooms: value("total_bedrooms").unwrap_or_default(),
        population: value("population").unwrap_or_default(),
        households: value("households").unwrap_or_default(),
        median_income: value("median_income").unwrap_or_default(),
        ocean_proximity,
    };

    record
        .validate()
        .map_err(|e| PipelineError::DataCleaning(format!("Error cleaning data: {}", e)))?;

    info!(record_id = %record.id, "Data cleaning completed");
    Ok(record)
}

fn parse_numeric(field: &str, value: Option<&Value>) -> PipelineResult<Option<f64>> {
    let invalid = || PipelineError::DataValidation(format!("{} must be a valid number", field));

    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => Some(s.trim().parse::<f64>().map_err(|_| invalid())?),
        Some(_) => return Err(invalid()),
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(invalid()),
    }
}

fn parse_ocean_proximity(value: Option<&Value>) -> PipelineResult<OceanProximity> {
    match value {
        None | Some(Value::Null) => Err(PipelineError::DataValidation(
            "Ocean proximity is required".to_string(),
        )),
        Some(Value::String(s)) if s.is_empty() => Err(PipelineError::DataValidation(
            "Ocean proximity is required".to_string(),
        )),
        Some(Value::String(s)) => s.parse(),
        Some(other) => Err(PipelineError::DataValidation(format!(
            "Invalid ocean proximity: {}",
            other
        ))),
    }
}

/// Upserts the cleaned record and returns its id.
pub async fn stored_cleaned_data(ctx: &RunContext, record: &HousingRecord) -> PipelineResult<String> {
    info!(record_id = %record.id, "Storing cleaned data");

    let record_id = ctx
        .storage
        .save_housing_record(record)
        .await
        .map_err(|e| PipelineError::Storage(format!("Error storing cleaned data: {}", e)))?;

    info!(record_id = %record_id, "Stored cleaned data");
    Ok(record_id)
}

/// One-hot encodes the record into the named feature map.
pub fn prepared_data(record: &HousingRecord) -> BTreeMap<String, f64> {
    debug!(record_id = %record.id, "Preparing features");
    record_to_feature_map(record)
}

/// Orders the features canonically and runs the model.
pub async fn prediction_result(
    ctx: &RunContext,
    features: &BTreeMap<String, f64>,
) -> PipelineResult<f64> {
    let array = feature_map_to_array(features).map_err(|missing| {
        PipelineError::Prediction(format!(
            "Error generating prediction: missing feature {}",
            missing
        ))
    })?;

    let value = ctx
        .model
        .predict_features(&array)
        .await
        .map_err(|e| PipelineError::Prediction(format!("Error generating prediction: {}", e)))?;

    info!(prediction = value, "Prediction generated");
    Ok(value)
}

/// Persists the prediction against the stored record and this run.
pub async fn stored_prediction_result(
    ctx: &RunContext,
    prediction: f64,
    record_id: &str,
) -> PipelineResult<StoredPrediction> {
    let entity = Prediction::completed(record_id, prediction, ctx.run_id.as_str());

    ctx.storage
        .save_prediction(&entity)
        .await
        .map_err(|e| PipelineError::Prediction(format!("Error storing prediction: {}", e)))?;

    MetricsCollector::new().record_prediction(prediction);
    info!(record_id = %record_id, "Stored prediction");

    Ok(StoredPrediction {
        record_id: record_id.to_string(),
        prediction,
        run_id: ctx.run_id.clone(),
    })
}

/// Runs every stage for one run, in dependency order.
#[instrument(skip(ctx, run_config), fields(run_id = %ctx.run_id))]
pub async fn execute_job(ctx: &RunContext, run_config: &Value) -> PipelineResult<StoredPrediction> {
    let raw = raw_input(run_config)?;
    let cleaned = cleaned_data(&raw)?;
    let record_id = stored_cleaned_data(ctx, &cleaned).await?;
    let features = prepared_data(&cleaned);
    let prediction = prediction_result(ctx, &features).await?;
    stored_prediction_result(ctx, prediction, &record_id).await
}
