//! Per-row risk scoring.
//!
//! Each record is scored by an independent request. A failed request drops
//! only its own record; every other result is kept.

use crate::client::PredictionClient;
use crate::error::Result;
use crate::models::{AnnotatedStation, Prediction, StationRecord};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Something that can assign a flood-risk score to a station record.
#[async_trait]
pub trait RiskScorer: Send + Sync {
    async fn score(&self, record: &StationRecord) -> Result<Prediction>;
}

#[async_trait]
impl RiskScorer for PredictionClient {
    async fn score(&self, record: &StationRecord) -> Result<Prediction> {
        self.predict(record).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationReport {
    pub requested: usize,
    pub scored: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Annotation {
    pub stations: Vec<AnnotatedStation>,
    pub report: AnnotationReport,
}

pub struct Annotator {
    scorer: Arc<dyn RiskScorer>,
    max_concurrent_requests: usize,
}

impl Annotator {
    pub fn new(scorer: Arc<dyn RiskScorer>, max_concurrent_requests: usize) -> Self {
        Self {
            scorer,
            max_concurrent_requests: max_concurrent_requests.max(1),
        }
    }

    /// Score every record and keep the ones that succeeded, in input order.
    pub async fn annotate(&self, records: Vec<StationRecord>) -> Annotation {
        let requested = records.len();
        if requested == 0 {
            return Annotation::default();
        }

        info!(
            "Scoring {} stations ({} at a time)",
            requested, self.max_concurrent_requests
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_requests));
        let mut tasks = JoinSet::new();

        for (index, record) in records.into_iter().enumerate() {
            let scorer = Arc::clone(&self.scorer);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                // Never closed
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = scorer.score(&record).await;
                (index, record, outcome)
            });
        }

        let mut slots: Vec<Option<AnnotatedStation>> = vec![None; requested];
        let mut failed = 0;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, record, Ok(prediction))) => {
                    debug!(
                        "Scored {}: {:.2}%",
                        record.name, prediction.risk_percentage
                    );
                    slots[index] = Some(AnnotatedStation::new(record, prediction));
                }
                Ok((_, record, Err(e))) => {
                    failed += 1;
                    warn!("Error predicting risk for {}: {}", record.name, e);
                }
                Err(e) => {
                    failed += 1;
                    error!("Scoring task did not complete: {}", e);
                }
            }
        }

        let stations: Vec<AnnotatedStation> = slots.into_iter().flatten().collect();
        let report = AnnotationReport {
            requested,
            scored: stations.len(),
            failed,
        };

        if failed > 0 {
            warn!(
                "Scored {}/{} stations, {} dropped after failed predictions",
                report.scored, requested, failed
            );
        } else {
            info!("Scored all {} stations", requested);
        }

        Annotation { stations, report }
    }
}
