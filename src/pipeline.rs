//! The streaming filter pipeline.
//!
//! [`FilterPipeline::run`] pulls one chunk at a time from a [`ChunkReader`], applies
//! one immutable [`FilterExpr`] to every row, and writes matches to a [`RowSink`] in
//! input order — strictly sequential, read-ahead depth of one chunk, so memory use is
//! independent of input size.
//!
//! [`filter_csv_path`] is the file-to-file entrypoint: it samples the input, resolves
//! the encoding (explicit override, then detection, then fallback), and runs the
//! pipeline between the two paths.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use encoding_rs::Encoding;

use crate::encoding::{
    resolve_encoding, EncodingDetector, HeuristicDetector, DEFAULT_SAMPLE_SIZE, FALLBACK_ENCODING,
};
use crate::error::{FilterError, FilterResult};
use crate::expr::FilterExpr;
use crate::progress::{PipelineEvent, ProgressObserver};
use crate::reader::{ChunkReader, ReaderOptions};
use crate::sink::{CsvSink, RowSink};

/// Counters reported at the end of a run (or at cancellation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Well-formed rows evaluated.
    pub rows_read: u64,
    /// Rows that matched the expression and were written.
    pub rows_matched: u64,
    /// Malformed records skipped under [`MalformedRowPolicy::Skip`].
    pub rows_skipped: u64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "read={} matched={} skipped={}",
            self.rows_read, self.rows_matched, self.rows_skipped
        )
    }
}

/// What to do with records whose field count does not match the header.
///
/// A single bad record must not abort a multi-gigabyte run, so the default skips and
/// counts. Decoding and custom-predicate failures are systemic and always abort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedRowPolicy {
    /// Count the record in `rows_skipped` and continue.
    #[default]
    Skip,
    /// Abort the run with [`FilterError::MalformedRow`].
    Abort,
}

/// Cooperative cancellation signal, checked once per chunk boundary (never
/// mid-chunk). On cancellation the pipeline flushes the sink and returns the
/// summary accumulated so far; there is no rollback.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect at the next chunk boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Options controlling a pipeline run.
#[derive(Clone, Default)]
pub struct PipelineOptions {
    /// Skip-and-count or abort on malformed records.
    pub malformed: MalformedRowPolicy,
    /// Optional progress observer.
    pub observer: Option<Arc<dyn ProgressObserver>>,
    /// Optional cancellation token.
    pub cancel: Option<CancelToken>,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("malformed", &self.malformed)
            .field("observer_set", &self.observer.is_some())
            .field("cancel_set", &self.cancel.is_some())
            .finish()
    }
}

/// Drives reader → expression → sink, one chunk at a time.
#[derive(Debug, Default)]
pub struct FilterPipeline {
    options: PipelineOptions,
}

impl FilterPipeline {
    /// Pipeline with the given options.
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// Run the expression over every row of `reader`, writing matches to `sink`.
    ///
    /// The expression is validated against the reader's header first, so
    /// configuration errors surface before any output is written. Matched rows keep
    /// their original field values and column order and are never reordered or
    /// deduplicated.
    pub fn run<R, S>(
        &self,
        reader: &mut ChunkReader<R>,
        expression: &FilterExpr,
        sink: &mut S,
    ) -> FilterResult<Summary>
    where
        R: io::Read,
        S: RowSink + ?Sized,
    {
        expression.validate(reader.header())?;

        let started = Instant::now();
        self.emit(PipelineEvent::RunStarted);
        sink.begin(reader.header())?;

        let mut summary = Summary::default();
        let mut chunk_index = 0u64;
        loop {
            if let Some(token) = &self.options.cancel {
                if token.is_cancelled() {
                    break;
                }
            }
            // The previous chunk was dropped before this pull; at most one chunk is
            // alive at any time.
            let Some(chunk) = reader.next_chunk()? else {
                break;
            };

            for malformed in chunk.malformed() {
                match self.options.malformed {
                    MalformedRowPolicy::Skip => {
                        summary.rows_skipped += 1;
                        self.emit(PipelineEvent::RecordSkipped {
                            record_index: malformed.record_index,
                            expected_fields: malformed.expected_fields,
                            found_fields: malformed.found_fields,
                        });
                    }
                    MalformedRowPolicy::Abort => {
                        return Err(FilterError::MalformedRow {
                            record: malformed.record_index,
                            expected: malformed.expected_fields,
                            found: malformed.found_fields,
                        });
                    }
                }
            }

            let mut matched = 0usize;
            for row in chunk.rows() {
                summary.rows_read += 1;
                if expression.evaluate(row)? {
                    sink.write_row(row)?;
                    summary.rows_matched += 1;
                    matched += 1;
                }
            }
            self.emit(PipelineEvent::ChunkFinished {
                chunk_index,
                rows: chunk.rows().len(),
                matched,
            });
            chunk_index += 1;
        }

        sink.flush()?;
        self.emit(PipelineEvent::RunFinished {
            summary,
            elapsed: started.elapsed(),
        });
        Ok(summary)
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(observer) = &self.options.observer {
            observer.on_event(&event);
        }
    }
}

/// Options for the file-to-file entrypoint [`filter_csv_path`].
#[derive(Clone)]
pub struct RunOptions {
    /// Record parsing and chunking.
    pub reader: ReaderOptions,
    /// Malformed-record policy, observer, cancellation.
    pub pipeline: PipelineOptions,
    /// Explicit encoding label; overrides detection when set.
    pub encoding_override: Option<String>,
    /// Used when the detector cannot decide.
    pub default_encoding: &'static Encoding,
    /// Bytes sampled from the start of the input for detection.
    pub sample_size: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            reader: ReaderOptions::default(),
            pipeline: PipelineOptions::default(),
            encoding_override: None,
            default_encoding: FALLBACK_ENCODING,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("reader", &self.reader)
            .field("pipeline", &self.pipeline)
            .field("encoding_override", &self.encoding_override)
            .field("default_encoding", &self.default_encoding.name())
            .field("sample_size", &self.sample_size)
            .finish()
    }
}

/// Filter `input` into `output` under `expression`.
///
/// Samples the input, resolves the encoding (override > [`HeuristicDetector`] >
/// default), streams the file through a [`FilterPipeline`], and writes matches as
/// UTF-8 delimited text with the same delimiter and quote as the input.
pub fn filter_csv_path(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    expression: &FilterExpr,
    options: &RunOptions,
) -> FilterResult<Summary> {
    let mut file = File::open(input.as_ref())?;
    let mut sample = Vec::with_capacity(options.sample_size);
    file.by_ref()
        .take(options.sample_size as u64)
        .read_to_end(&mut sample)?;
    file.seek(SeekFrom::Start(0))?;

    let encoding = resolve_encoding(
        options.encoding_override.as_deref(),
        &HeuristicDetector,
        &sample,
        options.default_encoding,
    )?;

    let mut reader = ChunkReader::new(BufReader::new(file), encoding, &options.reader)?;
    let out = File::create(output.as_ref())?;
    let mut sink = CsvSink::with_format(
        BufWriter::new(out),
        options.reader.delimiter,
        options.reader.quote,
    );

    FilterPipeline::new(options.pipeline.clone()).run(&mut reader, expression, &mut sink)
}

/// Detect the encoding of a file from a sample of its first bytes.
///
/// Convenience wrapper for callers that construct a [`ChunkReader`] themselves.
pub fn detect_file_encoding(
    path: impl AsRef<Path>,
    detector: &dyn EncodingDetector,
    sample_size: usize,
) -> FilterResult<&'static Encoding> {
    let file = File::open(path.as_ref())?;
    let mut sample = Vec::with_capacity(sample_size);
    file.take(sample_size as u64).read_to_end(&mut sample)?;
    Ok(detector.detect(&sample).unwrap_or(FALLBACK_ENCODING))
}
