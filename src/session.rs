use crate::annotator::{AnnotationReport, Annotator};
use crate::config::MapConfig;
use crate::error::Result;
use crate::parser::{ParseStats, Parser};
use crate::projector::{project, MapState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Idle,
    Uploading,
    Rendering,
}

/// Everything one annotation cycle produced.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub rows_read: usize,
    pub rows_rejected: usize,
    pub annotation: AnnotationReport,
    pub completed_at: DateTime<Utc>,
}

/// Holds the map for the most recent upload. Each upload replaces it entirely.
pub struct UploadSession {
    annotator: Annotator,
    map_config: MapConfig,
    status: UploadStatus,
    map: MapState,
}

impl UploadSession {
    pub fn new(annotator: Annotator, map_config: MapConfig) -> Self {
        Self {
            annotator,
            map: MapState::empty(&map_config),
            map_config,
            status: UploadStatus::Idle,
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn map(&self) -> &MapState {
        &self.map
    }

    /// Run parse, score and project for one uploaded CSV.
    ///
    /// Takes the raw upload bytes. Prior markers are dropped before parsing
    /// starts. On a CSV error the session goes back to idle with an empty map.
    pub async fn process_upload(&mut self, content: impl AsRef<[u8]>) -> Result<CycleSummary> {
        self.transition(UploadStatus::Uploading);
        self.map = MapState::empty(&self.map_config);

        let (records, stats) = match Parser::parse_csv(content) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Error processing CSV file: {}", e);
                self.transition(UploadStatus::Idle);
                return Err(e);
            }
        };
        log_parse_stats(&stats);

        let annotation = self.annotator.annotate(records).await;

        self.transition(UploadStatus::Rendering);
        self.map = project(&annotation.stations, &self.map_config);

        info!("Map updated with {} markers", self.map.markers.len());

        Ok(CycleSummary {
            rows_read: stats.total_rows - stats.empty_rows,
            rows_rejected: stats.rejected,
            annotation: annotation.report,
            completed_at: Utc::now(),
        })
    }

    fn transition(&mut self, next: UploadStatus) {
        if self.status != next {
            info!("Upload status {:?} -> {:?}", self.status, next);
            self.status = next;
        }
    }
}

fn log_parse_stats(stats: &ParseStats) {
    info!(
        "Parsed CSV: {} rows, {} accepted, {} skipped for missing name or coordinates ({:.1}%)",
        stats.total_rows - stats.empty_rows,
        stats.accepted,
        stats.rejected,
        stats.rejection_rate() * 100.0
    );
}
