//! Core data model for streamed registry rows.
//!
//! Input is delimited text whose first record names the columns. The reader turns that
//! record into a shared [`Header`] and every subsequent record into a [`Row`], batched
//! into bounded [`Chunk`]s.

use std::collections::HashMap;
use std::sync::Arc;

/// Ordered column names for one input stream, fixed at stream start.
///
/// Column names are unique within a header; lookups by name are O(1). A `Header` is
/// built once per run and shared by every [`Row`] via `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl Header {
    /// Create a header from ordered column names.
    ///
    /// Returns `None` if a column name appears more than once.
    pub fn new(columns: Vec<String>) -> Option<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return None;
            }
        }
        Some(Self { columns, index })
    }

    /// Ordered column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the header has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the position of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Whether a column with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

/// One decoded data record: raw field values in header order.
///
/// Values are kept verbatim as read from the input; predicates interpret them
/// (numeric, date, boolean) at evaluation time. Each row remembers the 1-based data
/// record index it came from (the header record is not counted).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    header: Arc<Header>,
    record_index: u64,
    values: Vec<String>,
}

impl Row {
    /// Create a row over `header` with values in header order.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not have one entry per header column. The reader
    /// guarantees this; records with the wrong arity become [`MalformedRecord`]s
    /// instead of rows.
    pub fn new(header: Arc<Header>, record_index: u64, values: Vec<String>) -> Self {
        assert!(
            values.len() == header.len(),
            "row has {} values for {} columns",
            values.len(),
            header.len()
        );
        Self {
            header,
            record_index,
            values,
        }
    }

    /// The header this row belongs to.
    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }

    /// 1-based index of this record among the input's data records.
    pub fn record_index(&self) -> u64 {
        self.record_index
    }

    /// Field value by column name.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.header
            .index_of(column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    /// Field values in header order.
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// A data record whose field count did not match the header.
///
/// The reader reports these on the [`Chunk`] they were encountered in rather than
/// dropping them; the pipeline decides whether to skip or abort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    /// 1-based index among the input's data records.
    pub record_index: u64,
    /// Field count the header requires.
    pub expected_fields: usize,
    /// Field count actually found.
    pub found_fields: usize,
}

/// A bounded batch of rows sharing one header.
///
/// Chunks hold at most `chunk_size` rows (the last chunk of a stream may be smaller)
/// and are dropped by the pipeline before the next chunk is requested, which bounds
/// peak memory independently of input size.
#[derive(Debug, Clone)]
pub struct Chunk {
    rows: Vec<Row>,
    malformed: Vec<MalformedRecord>,
}

impl Chunk {
    pub(crate) fn new(rows: Vec<Row>, malformed: Vec<MalformedRecord>) -> Self {
        Self { rows, malformed }
    }

    /// Well-formed rows, in input order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Records in this chunk's range that failed structural validation.
    pub fn malformed(&self) -> &[MalformedRecord] {
        &self.malformed
    }

    /// Whether the chunk carries neither rows nor malformed records.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.malformed.is_empty()
    }
}
