//! Ports between the domain core and its adapters.
//!
//! Driven ports (implemented by adapters, called by the core):
//! - [`EtlPort`]: the pipeline orchestrator
//! - [`StoragePort`]: the relational store
//! - [`ModelPort`]: the regression model
//!
//! Driving port (implemented by the core, called by HTTP/CLI):
//! - [`PredictionServicePort`]

pub mod etl;
pub mod model;
pub mod service;
pub mod storage;

pub use etl::EtlPort;
pub use model::ModelPort;
pub use service::{PredictionOutcome, PredictionServicePort};
pub use storage::StoragePort;
