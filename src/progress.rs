//! Progress reporting hooks for pipeline runs.
//!
//! Observers replace an in-process progress bar: the pipeline emits an event per
//! chunk (plus skips and run boundaries) and implementors decide what to do with
//! them — log to stderr, update a UI, collect metrics.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::Summary;

/// Events emitted by a pipeline run.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Emitted once, after header validation, before the first chunk.
    RunStarted,
    /// Emitted after each chunk is fully processed.
    ChunkFinished {
        /// 0-based chunk sequence number.
        chunk_index: u64,
        /// Rows evaluated in this chunk.
        rows: usize,
        /// Rows matched in this chunk.
        matched: usize,
    },
    /// Emitted for each malformed record skipped under the skip policy.
    RecordSkipped {
        record_index: u64,
        expected_fields: usize,
        found_fields: usize,
    },
    /// Emitted once when the run completes or is cancelled.
    RunFinished { summary: Summary, elapsed: Duration },
}

/// Observer hook for pipeline events.
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Logs pipeline events to stderr.
#[derive(Debug, Default)]
pub struct StdErrProgress;

impl ProgressObserver for StdErrProgress {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::RunStarted => eprintln!("[filter] run started"),
            PipelineEvent::ChunkFinished {
                chunk_index,
                rows,
                matched,
            } => eprintln!("[filter] chunk {chunk_index}: {rows} rows, {matched} matched"),
            PipelineEvent::RecordSkipped {
                record_index,
                expected_fields,
                found_fields,
            } => eprintln!(
                "[filter] skipped malformed record {record_index} ({found_fields} fields, expected {expected_fields})"
            ),
            PipelineEvent::RunFinished { summary, elapsed } => {
                eprintln!("[filter] finished in {elapsed:.2?}: {summary}")
            }
        }
    }
}

/// Fans events out to a list of observers.
#[derive(Default)]
pub struct CompositeProgress {
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl CompositeProgress {
    /// Create a composite from a list of observers.
    pub fn new(observers: Vec<Arc<dyn ProgressObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeProgress")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ProgressObserver for CompositeProgress {
    fn on_event(&self, event: &PipelineEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
