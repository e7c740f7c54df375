//! Database schema constants.
//!
//! Two related tables back every prediction: the cleaned housing record and
//! the prediction that references it. Each constant holds a single statement
//! so it can be executed as a prepared query.

/// SQL schema for creating the cleaned_housing_records table.
pub const CREATE_HOUSING_RECORDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cleaned_housing_records (
    id TEXT PRIMARY KEY,
    longitude DOUBLE PRECISION NOT NULL,
    latitude DOUBLE PRECISION NOT NULL,
    housing_median_age DOUBLE PRECISION NOT NULL,
    total_rooms DOUBLE PRECISION NOT NULL,
    total_bedrooms DOUBLE PRECISION NOT NULL,
    population DOUBLE PRECISION NOT NULL,
    households DOUBLE PRECISION NOT NULL,
    median_income DOUBLE PRECISION NOT NULL,
    ocean_proximity TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// SQL schema for creating the predictions table.
pub const CREATE_PREDICTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS predictions (
    id TEXT PRIMARY KEY,
    cleaned_record_id TEXT NOT NULL REFERENCES cleaned_housing_records(id) ON DELETE CASCADE,
    prediction_value DOUBLE PRECISION NOT NULL,
    run_id TEXT UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

pub const CREATE_PREDICTIONS_RECORD_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_predictions_cleaned_record_id ON predictions(cleaned_record_id)
"#;

pub const CREATE_PREDICTIONS_CREATED_AT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_predictions_created_at ON predictions(created_at)
"#;

/// Returns all schema creation statements in the correct order.
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_HOUSING_RECORDS_TABLE,
        CREATE_PREDICTIONS_TABLE,
        CREATE_PREDICTIONS_RECORD_INDEX,
        CREATE_PREDICTIONS_CREATED_AT_INDEX,
    ]
}

/// Table names in the schema.
pub mod tables {
    pub const HOUSING_RECORDS: &str = "cleaned_housing_records";
    pub const PREDICTIONS: &str = "predictions";
}
