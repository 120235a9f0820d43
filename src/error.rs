use thiserror::Error;

/// Convenience result type for filtering operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Error type shared across expression building, reading, and the pipeline.
///
/// Configuration-class variants (`InvalidPattern`, `UnknownColumn`, `EmptyCombinator`,
/// `Spec`, `UnsupportedEncoding`) are reported before any row is read. `MalformedRow`
/// is the only per-row recoverable case; everything else aborts the run.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record-layer error from the CSV reader/writer.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A `regex` predicate was built from a malformed pattern.
    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    /// A predicate references a column the input header does not have.
    #[error("filter references unknown column '{column}'")]
    UnknownColumn { column: String },

    /// An AND/OR combinator was built with no children.
    #[error("{kind} combinator requires at least one child")]
    EmptyCombinator { kind: &'static str },

    /// A declarative filter document could not be compiled.
    #[error("invalid filter spec: {message}")]
    Spec { message: String },

    /// An explicit encoding override names a label `encoding_rs` does not know.
    #[error("unsupported encoding label '{label}'")]
    UnsupportedEncoding { label: String },

    /// The input ended before a header record was read.
    #[error("input contains no header record")]
    EmptyInput,

    /// The input header names the same column twice.
    #[error("duplicate column '{column}' in header")]
    DuplicateColumn { column: String },

    /// Bytes in the input could not be decoded with the selected encoding.
    ///
    /// Mixed or mis-detected encodings mean the input is corrupt; the run aborts.
    #[error("decoding failed near byte {offset} (encoding {encoding})")]
    Decoding { offset: u64, encoding: &'static str },

    /// A data record's field count did not match the header.
    #[error("malformed record {record}: expected {expected} fields, found {found}")]
    MalformedRow {
        record: u64,
        expected: usize,
        found: usize,
    },

    /// A user-supplied predicate callback failed.
    ///
    /// This indicates a configuration bug rather than bad row data; the run aborts.
    #[error("custom predicate '{field}' failed at record {record}: {source}")]
    CustomPredicate {
        field: String,
        record: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
