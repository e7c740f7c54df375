//! Domain entities for housing price prediction.
//!
//! - `HousingRecord`: the nine features of a housing block plus an id
//! - `OceanProximity`: the closed set of proximity categories
//! - `Prediction`: a predicted price linked to a record and a pipeline run
//! - `PredictionStatus` / `PipelineStatus`: request and run lifecycles

pub mod housing;
pub mod prediction;

pub use housing::{HousingRecord, OceanProximity};
pub use prediction::{PipelineStatus, Prediction, PredictionStatus};
