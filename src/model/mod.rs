//! Pre-trained housing price model.
//!
//! The model is a linear regression over 13 features (see [`features`])
//! stored as a JSON artifact:
//!
//! ```json
//! {
//!   "model_type": "linear_regression",
//!   "feature_names": ["longitude", "latitude", "..."],
//!   "coefficients": [-4.2e4, -4.1e4, "..."],
//!   "intercept": -3.5e6,
//!   "version": "2024-01-01"
//! }
//! ```

pub mod adapter;
pub mod features;
pub mod linear;

pub use adapter::{LinearModelAdapter, ModelError};
pub use features::{
    feature_map_to_array, record_to_feature_map, record_to_features, FEATURE_NAMES, NUM_FEATURES,
};
pub use linear::{LinearRegressionModel, ModelArtifact};
