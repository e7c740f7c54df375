//! In-process orchestration of the housing prediction job.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐ enqueue ┌──────────┐ dequeue ┌────────────────┐
//! │ LocalEtlAdapter  │────────▶│ JobQueue │────────▶│   WorkerPool   │
//! │   (EtlPort)      │         └──────────┘         │ execute_job()  │
//! └────────┬─────────┘                              └───────┬────────┘
//!          │ status                                         │ transitions
//!          ▼                                                ▼
//!    ┌──────────────────────────────────────────────────────────┐
//!    │                        RunRegistry                        │
//!    └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use housing_predictor::pipeline::{local_pipeline, LocalPipelineConfig};
//!
//! let (etl, mut pool) = local_pipeline(LocalPipelineConfig::default(), storage, model);
//! pool.start()?;
//! let run_id = etl.start_prediction_pipeline(&record).await?;
//! ```

pub mod assets;
pub mod job;
pub mod orchestrator;
pub mod queue;
pub mod runs;
pub mod worker_pool;

pub use assets::{execute_job, run_config_for, RunContext, StoredPrediction};
pub use job::{PipelineJob, RunStatus, JOB_NAME};
pub use orchestrator::{local_pipeline, run_job_inline, LocalEtlAdapter, LocalPipelineConfig};
pub use queue::{JobQueue, QueueError};
pub use runs::{PipelineRun, RunRegistry};
pub use worker_pool::{PoolError, PoolStats, WorkerPool, WorkerPoolConfig};
