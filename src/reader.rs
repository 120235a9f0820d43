//! Chunked reading of delimited registry exports.
//!
//! [`ChunkReader`] wraps any byte stream and yields bounded [`Chunk`]s of decoded
//! rows: a lazy, single-pass, forward-only sequence. The first record is consumed as
//! the header and never yielded as data. Re-scanning an input requires constructing
//! a fresh reader.

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::sync::Arc;

use encoding_rs::Encoding;

use crate::error::{FilterError, FilterResult};
use crate::types::{Chunk, Header, MalformedRecord, Row};

/// Default rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Registry exports are semicolon-delimited.
pub const DEFAULT_DELIMITER: u8 = b';';

/// Default quote character.
pub const DEFAULT_QUOTE: u8 = b'"';

/// Options controlling record parsing and batching.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Rows per chunk; the last chunk of a stream may be smaller. Must be >= 1.
    pub chunk_size: usize,
    /// Field delimiter.
    pub delimiter: u8,
    /// Quote character.
    pub quote: u8,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            delimiter: DEFAULT_DELIMITER,
            quote: DEFAULT_QUOTE,
        }
    }
}

/// Streaming reader producing bounded chunks of rows.
///
/// Records are read as raw bytes and decoded with the encoding chosen for the run.
/// Decoding is strict: bytes the encoding cannot represent abort the stream with
/// [`FilterError::Decoding`] rather than being replaced, because a file that stops
/// decoding mid-way is corrupt input, not row-level noise. Records whose field count
/// does not match the header are reported on their chunk as [`MalformedRecord`]s —
/// the reader never drops data silently and never decides skip-vs-abort itself.
pub struct ChunkReader<R: io::Read> {
    records: csv::ByteRecordsIntoIter<R>,
    header: Arc<Header>,
    encoding: &'static Encoding,
    chunk_size: usize,
    /// 1-based index of the next data record.
    next_record: u64,
    done: bool,
}

impl<R: io::Read> fmt::Debug for ChunkReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkReader")
            .field("header", &self.header)
            .field("encoding", &self.encoding)
            .field("chunk_size", &self.chunk_size)
            .field("next_record", &self.next_record)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<R: io::Read> ChunkReader<R> {
    /// Construct a reader over `input`, consuming the first record as the header.
    ///
    /// Fails on an empty input, a header that cannot be decoded, or duplicate
    /// column names.
    ///
    /// # Panics
    ///
    /// Panics if `options.chunk_size` is zero.
    pub fn new(
        input: R,
        encoding: &'static Encoding,
        options: &ReaderOptions,
    ) -> FilterResult<Self> {
        assert!(options.chunk_size > 0, "chunk_size must be > 0");

        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(options.delimiter)
            .quote(options.quote)
            .from_reader(input);
        let mut records = reader.into_byte_records();

        let first = match records.next() {
            Some(result) => result?,
            None => return Err(FilterError::EmptyInput),
        };
        let mut columns = decode_record(&first, encoding)?;
        // Files written with a UTF-8 BOM carry it on the first column name.
        if let Some(name) = columns.first_mut() {
            if let Some(stripped) = name.strip_prefix('\u{feff}') {
                *name = stripped.to_string();
            }
        }
        let header = build_header(columns)?;

        Ok(Self {
            records,
            header,
            encoding,
            chunk_size: options.chunk_size,
            next_record: 1,
            done: false,
        })
    }

    /// The column set fixed at stream start.
    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }

    /// Encoding used to decode records.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Pull the next chunk, or `None` at end of input.
    ///
    /// At most `chunk_size` rows are materialized per call; the previous chunk is
    /// expected to be dropped by the caller before the next one is requested.
    pub fn next_chunk(&mut self) -> FilterResult<Option<Chunk>> {
        if self.done {
            return Ok(None);
        }

        let mut rows = Vec::new();
        let mut malformed = Vec::new();
        while rows.len() < self.chunk_size {
            let Some(result) = self.records.next() else {
                self.done = true;
                break;
            };
            let record = result?;
            let record_index = self.next_record;
            self.next_record += 1;

            if record.len() != self.header.len() {
                malformed.push(MalformedRecord {
                    record_index,
                    expected_fields: self.header.len(),
                    found_fields: record.len(),
                });
                continue;
            }

            let values = decode_record(&record, self.encoding)?;
            rows.push(Row::new(Arc::clone(&self.header), record_index, values));
        }

        if rows.is_empty() && malformed.is_empty() {
            self.done = true;
            return Ok(None);
        }
        Ok(Some(Chunk::new(rows, malformed)))
    }
}

fn build_header(columns: Vec<String>) -> FilterResult<Arc<Header>> {
    let mut seen = HashSet::new();
    for name in &columns {
        if !seen.insert(name.as_str()) {
            return Err(FilterError::DuplicateColumn {
                column: name.clone(),
            });
        }
    }
    Ok(Arc::new(
        Header::new(columns).expect("column names are unique"),
    ))
}

fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> FilterResult<Vec<String>> {
    let mut values = Vec::with_capacity(record.len());
    for field in record.iter() {
        match encoding.decode_without_bom_handling_and_without_replacement(field) {
            Some(text) => values.push(text.into_owned()),
            None => {
                let offset = record.position().map(|p| p.byte()).unwrap_or(0);
                return Err(FilterError::Decoding {
                    offset,
                    encoding: encoding.name(),
                });
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_8, WINDOWS_1252};

    fn reader_with(input: &'static [u8], chunk_size: usize) -> ChunkReader<&'static [u8]> {
        let options = ReaderOptions {
            chunk_size,
            ..ReaderOptions::default()
        };
        ChunkReader::new(input, UTF_8, &options).unwrap()
    }

    fn drain(reader: &mut ChunkReader<&'static [u8]>) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    const SMALL: &[u8] = b"CNPJ_BASICO;UF\n11111111;MG\n22222222;SP\n33333333;MG\n";

    #[test]
    fn header_is_consumed_not_yielded() {
        let mut reader = reader_with(SMALL, 10);
        assert_eq!(
            reader.header().columns(),
            &["CNPJ_BASICO".to_string(), "UF".to_string()]
        );
        let chunks = drain(&mut reader);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].rows().len(), 3);
        assert_eq!(chunks[0].rows()[0].get("CNPJ_BASICO"), Some("11111111"));
        assert_eq!(chunks[0].rows()[2].record_index(), 3);
    }

    #[test]
    fn chunking_partitions_rows_for_any_chunk_size() {
        for chunk_size in 1..=5 {
            let mut reader = reader_with(SMALL, chunk_size);
            let chunks = drain(&mut reader);
            let all: Vec<&str> = chunks
                .iter()
                .flat_map(|c| c.rows())
                .map(|r| r.get("CNPJ_BASICO").unwrap())
                .collect();
            assert_eq!(all, ["11111111", "22222222", "33333333"], "chunk_size={chunk_size}");
            for chunk in &chunks {
                assert!(chunk.rows().len() <= chunk_size);
            }
        }
    }

    #[test]
    fn wrong_arity_records_are_reported_not_dropped() {
        let input: &[u8] = b"CNPJ_BASICO;UF\n11111111;MG\n22222222\n33333333;MG;extra\n44444444;SP\n";
        let mut reader = reader_with(input, 10);
        let chunks = drain(&mut reader);
        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.rows().len(), 2);
        assert_eq!(
            chunk.malformed(),
            &[
                MalformedRecord {
                    record_index: 2,
                    expected_fields: 2,
                    found_fields: 1
                },
                MalformedRecord {
                    record_index: 3,
                    expected_fields: 2,
                    found_fields: 3
                },
            ][..]
        );
        // Indexing keeps counting past malformed records.
        assert_eq!(chunk.rows()[1].record_index(), 4);
    }

    #[test]
    fn strict_decoding_aborts_on_malformed_bytes() {
        // 0xE3 is not valid UTF-8 outside a multi-byte sequence.
        let input: &[u8] = b"CNPJ_BASICO;MUNICIPIO\n11111111;S\xe3o Paulo\n";
        let mut reader = reader_with(input, 10);
        let err = reader.next_chunk().unwrap_err();
        assert!(matches!(err, FilterError::Decoding { encoding: "UTF-8", .. }));
    }

    #[test]
    fn windows_1252_decodes_legacy_bytes() {
        let input: &[u8] = b"CNPJ_BASICO;MUNICIPIO\n11111111;S\xe3o Paulo\n";
        let mut reader = ChunkReader::new(input, WINDOWS_1252, &ReaderOptions::default()).unwrap();
        let chunk = reader.next_chunk().unwrap().unwrap();
        assert_eq!(chunk.rows()[0].get("MUNICIPIO"), Some("S\u{e3}o Paulo"));
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = ChunkReader::new(&b""[..], UTF_8, &ReaderOptions::default()).unwrap_err();
        assert!(matches!(err, FilterError::EmptyInput));
    }

    #[test]
    fn duplicate_header_columns_are_fatal() {
        let input: &[u8] = b"UF;UF\nMG;SP\n";
        let err = ChunkReader::new(input, UTF_8, &ReaderOptions::default()).unwrap_err();
        assert!(matches!(err, FilterError::DuplicateColumn { column } if column == "UF"));
    }

    #[test]
    fn header_only_input_yields_no_chunks() {
        let input: &[u8] = b"CNPJ_BASICO;UF\n";
        let mut reader = ChunkReader::new(input, UTF_8, &ReaderOptions::default()).unwrap();
        assert!(reader.next_chunk().unwrap().is_none());
        // Still none after exhaustion.
        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn utf8_bom_is_stripped_from_first_column() {
        let input: &[u8] = b"\xef\xbb\xbfCNPJ_BASICO;UF\n11111111;MG\n";
        let reader = ChunkReader::new(input, UTF_8, &ReaderOptions::default()).unwrap();
        assert_eq!(reader.header().index_of("CNPJ_BASICO"), Some(0));
    }

    #[test]
    fn quoted_fields_may_contain_the_delimiter() {
        let input: &[u8] = b"NOME_FANTASIA;UF\n\"PADARIA; CAFE LTDA\";MG\n";
        let mut reader = ChunkReader::new(input, UTF_8, &ReaderOptions::default()).unwrap();
        let chunk = reader.next_chunk().unwrap().unwrap();
        assert_eq!(chunk.rows()[0].get("NOME_FANTASIA"), Some("PADARIA; CAFE LTDA"));
    }
}
