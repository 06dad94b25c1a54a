//! Replays recorded frames or zone signals through a fresh session.
//!
//! Input is JSON lines. A line with a `zone_id` is a zone signal; any other
//! line is a pose frame. Both go through the detector loop in file order.

use std::io::BufRead;
use std::sync::Arc;

use tokio::sync::mpsc;

use services::{DetectorInput, TrackingService, join_detector, spawn_detector};
use sop_core::AdherenceReport;
use sop_core::model::{EnvironmentId, ProcessId};

#[derive(Debug)]
pub struct ReplayLineError {
    pub line: usize,
    pub source: serde_json::Error,
}

impl std::fmt::Display for ReplayLineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.source)
    }
}

impl std::error::Error for ReplayLineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Reads every non-blank line. Line numbers in errors are 1-based.
pub fn read_lines(reader: impl BufRead) -> Result<Vec<DetectorInput>, Box<dyn std::error::Error>> {
    let mut lines = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed = serde_json::from_str(&line).map_err(|source| ReplayLineError {
            line: idx + 1,
            source,
        })?;
        lines.push(parsed);
    }
    Ok(lines)
}

/// Opens a session, starts it at the first record, streams every record
/// through the detector loop, and stops at the latest record.
pub async fn replay(
    service: &TrackingService,
    environment_id: EnvironmentId,
    process_id: ProcessId,
    lines: Vec<DetectorInput>,
) -> Result<AdherenceReport, Box<dyn std::error::Error>> {
    let opened = service.open_session(environment_id, process_id).await?;
    let registry = service.registry();
    let id = opened.session_id;

    let start = lines
        .first()
        .map_or_else(|| registry.clock().now(), DetectorInput::timestamp);
    let end = lines.iter().map(DetectorInput::timestamp).max().unwrap_or(start);
    registry.start_at(id, start)?;

    let (tx, rx) = mpsc::channel(64);
    let detector = spawn_detector(Arc::clone(&registry), id, opened.detector, rx);

    for line in lines {
        if tx.send(line).await.is_err() {
            // The loop already ended; its error surfaces from the join below.
            break;
        }
    }
    drop(tx);

    let stats = join_detector(detector).await?;
    tracing::info!(
        frames = stats.frames,
        signals = stats.signals,
        steps_completed = stats.steps_completed,
        "replay finished"
    );

    let report = registry.stop_at(id, end)?;
    registry.remove(id);
    Ok(report)
}
