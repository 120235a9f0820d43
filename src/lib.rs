//! `cnpj-filter` streams large CNPJ registry CSV exports through a composable
//! boolean filter, in bounded memory.
//!
//! The federal registry publishes establishment data as multi-gigabyte
//! semicolon-delimited files in a mix of encodings. This crate reads such a file in
//! bounded chunks, evaluates one immutable filter expression against every row, and
//! writes matching rows — values verbatim, original column order — to an output
//! stream. Peak memory depends on the chunk size, never on the file size.
//!
//! ## Building filters
//!
//! Expressions are trees of field predicates under AND/OR/NOT, built in code:
//!
//! ```rust
//! use cnpj_filter::expr::{and, contains, ne, not, or};
//!
//! let expression = and(vec![
//!     or(vec![
//!         contains("CNAE_FISCAL_PRINCIPAL", "7911200"),
//!         contains("CNAE_FISCAL_PRINCIPAL", "7912100"),
//!     ]),
//!     not(contains("CORREIO_ELETRONICO", "@gmail")),
//!     contains("SITUACAO_CADASTRAL", "02"),
//!     ne("TELEFONE_1", ""),
//! ]);
//! ```
//!
//! or loaded from a JSON document in the same shape (see [`expr::spec`]):
//!
//! ```rust
//! use cnpj_filter::expr::FilterSpec;
//!
//! # fn main() -> Result<(), cnpj_filter::FilterError> {
//! let spec = FilterSpec::from_json(r#"{
//!     "op": "AND",
//!     "conditions": [
//!         { "field": "UF", "op": "contains", "value": "MG" },
//!         { "field": "TELEFONE_1", "op": "ne", "value": "" }
//!     ]
//! }"#)?;
//! let expression = spec.compile()?;
//! # let _ = expression;
//! # Ok(())
//! # }
//! ```
//!
//! ## Running the pipeline
//!
//! ```rust
//! use cnpj_filter::expr::contains;
//! use cnpj_filter::pipeline::FilterPipeline;
//! use cnpj_filter::reader::{ChunkReader, ReaderOptions};
//! use cnpj_filter::sink::CsvSink;
//!
//! # fn main() -> Result<(), cnpj_filter::FilterError> {
//! let input: &[u8] = b"CNPJ_BASICO;UF\n11111111;MG\n22222222;SP\n";
//! let mut reader = ChunkReader::new(input, encoding_rs::UTF_8, &ReaderOptions::default())?;
//!
//! let mut out = Vec::new();
//! let summary = {
//!     let mut sink = CsvSink::from_writer(&mut out);
//!     FilterPipeline::default().run(&mut reader, &contains("UF", "MG"), &mut sink)?
//! };
//! assert_eq!(summary.rows_read, 2);
//! assert_eq!(summary.rows_matched, 1);
//! assert_eq!(String::from_utf8(out).unwrap(), "CNPJ_BASICO;UF\n11111111;MG\n");
//! # Ok(())
//! # }
//! ```
//!
//! For file-to-file runs with encoding detection, use
//! [`pipeline::filter_csv_path`].
//!
//! ## Semantics worth knowing
//!
//! - Text operators are case-insensitive unless opted out, and treat a missing or
//!   empty field as the empty string.
//! - Numeric and date operators never raise on unparsable field data: the predicate
//!   is `false` for it, except `ne`/`date_ne`, which are trivially `true`.
//! - A malformed record (wrong field count) is skipped and counted by default; bad
//!   bytes under the selected encoding and failing `custom` callbacks abort the run.
//!
//! ## Modules
//!
//! - [`expr`]: predicates, combinators, and declarative filter documents
//! - [`reader`]: chunked, encoding-aware input
//! - [`pipeline`]: the streaming filter loop, summary counters, cancellation
//! - [`sink`]: output seam and the delimited-text writer
//! - [`encoding`]: encoding detection collaborator
//! - [`progress`]: observer hooks for run progress
//! - [`error`]: the crate-wide error type

pub mod encoding;
pub mod error;
pub mod expr;
pub mod pipeline;
pub mod progress;
pub mod reader;
pub mod sink;
pub mod types;

pub use error::{FilterError, FilterResult};
