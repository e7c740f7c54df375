//! housing-predictor: housing price prediction behind an asynchronous ETL pipeline.
//!
//! Clients submit the features of a housing block, receive a run id, and poll
//! until the pipeline has cleaned the record, priced it with a linear
//! regression model and stored the result.
//!
//! The crate follows a ports-and-adapters layout:
//! - [`domain`]: entities and statuses
//! - [`ports`]: traits between the core and its adapters
//! - [`service`]: the prediction service (core)
//! - [`pipeline`]: job graph, run registry, queue and worker pool
//! - [`storage`], [`model`]: driven adapters
//! - [`api`], [`cli`]: driving adapters

// Core modules
pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod ports;
pub mod service;
pub mod storage;

pub use config::{ConfigError, Settings};
pub use error::{PipelineError, PipelineResult};
