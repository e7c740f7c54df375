//! In-memory storage adapter.
//!
//! Mirrors the PostgreSQL adapter's semantics (upserts, the record foreign
//! key, one prediction per run) without a database. Used for local runs with
//! `DATABASE_URL=memory://` and throughout the test suite.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{HousingRecord, Prediction, PredictionStatus};
use crate::error::PipelineResult;
use crate::ports::StoragePort;

use super::database::StorageError;

#[derive(Default)]
struct Tables {
    records: HashMap<String, HousingRecord>,
    predictions: HashMap<String, Prediction>,
    /// run_id -> prediction id
    runs: HashMap<String, String>,
}

/// Thread-safe in-memory store.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_count(&self) -> usize {
        self.tables.read().await.records.len()
    }

    pub async fn prediction_count(&self) -> usize {
        self.tables.read().await.predictions.len()
    }
}

#[async_trait]
impl StoragePort for InMemoryStorage {
    async fn save_housing_record(&self, record: &HousingRecord) -> PipelineResult<String> {
        let mut tables = self.tables.write().await;
        tables.records.insert(record.id.clone(), record.clone());
        Ok(record.id.clone())
    }

    async fn get_housing_record(&self, record_id: &str) -> PipelineResult<Option<HousingRecord>> {
        Ok(self.tables.read().await.records.get(record_id).cloned())
    }

    async fn save_prediction(&self, prediction: &Prediction) -> PipelineResult<String> {
        let mut tables = self.tables.write().await;

        if !tables.records.contains_key(&prediction.record_id) {
            return Err(StorageError::NotFound(format!(
                "housing record {} referenced by prediction {}",
                prediction.record_id, prediction.id
            ))
            .into());
        }

        let mut stored = prediction.clone();
        stored.record = None;

        if let Some(run_id) = &prediction.run_id {
            if let Some(existing_id) = tables.runs.get(run_id).cloned() {
                stored.id = existing_id;
            }
            tables.runs.insert(run_id.clone(), stored.id.clone());
        }

        let id = stored.id.clone();
        tables.predictions.insert(id.clone(), stored);
        Ok(id)
    }

    async fn get_prediction(&self, run_id: &str) -> PipelineResult<Option<Prediction>> {
        let tables = self.tables.read().await;

        let Some(prediction) = tables
            .runs
            .get(run_id)
            .and_then(|id| tables.predictions.get(id))
        else {
            return Ok(None);
        };

        let mut prediction = prediction.clone();
        prediction.status = PredictionStatus::Completed;
        prediction.record = tables.records.get(&prediction.record_id).cloned();
        Ok(Some(prediction))
    }

    async fn list_predictions(&self, limit: i64) -> PipelineResult<Vec<Prediction>> {
        let tables = self.tables.read().await;

        let mut predictions: Vec<Prediction> = tables
            .predictions
            .values()
            .map(|p| {
                let mut p = p.clone();
                p.record = tables.records.get(&p.record_id).cloned();
                p
            })
            .collect();
        predictions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        predictions.truncate(limit.max(0) as usize);

        Ok(predictions)
    }

    async fn health_check(&self) -> PipelineResult<()> {
        Ok(())
    }
}
