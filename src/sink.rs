//! Output sinks for matched rows.
//!
//! The pipeline hands matched rows to a [`RowSink`] in input order, values verbatim.
//! The trait is the seam toward downstream consumers (the delimited-text writer
//! here, or a transformation stage supplied by the caller).

use std::io;

use crate::error::FilterResult;
use crate::reader::{DEFAULT_DELIMITER, DEFAULT_QUOTE};
use crate::types::{Header, Row};

/// Destination for matched rows.
pub trait RowSink {
    /// Called once before any row, with the input's header.
    fn begin(&mut self, header: &Header) -> FilterResult<()>;

    /// Called for each matched row, in input order.
    fn write_row(&mut self, row: &Row) -> FilterResult<()>;

    /// Called once after the last row (also on cancellation).
    fn flush(&mut self) -> FilterResult<()>;
}

/// Writes matched rows as delimited text: header first, one record per row, UTF-8.
#[derive(Debug)]
pub struct CsvSink<W: io::Write> {
    writer: csv::Writer<W>,
}

impl<W: io::Write> CsvSink<W> {
    /// Sink with the registry defaults (`;` delimiter, `"` quote).
    pub fn from_writer(writer: W) -> Self {
        Self::with_format(writer, DEFAULT_DELIMITER, DEFAULT_QUOTE)
    }

    /// Sink with an explicit delimiter and quote, normally mirroring the reader's.
    pub fn with_format(writer: W, delimiter: u8, quote: u8) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .quote(quote)
            .from_writer(writer);
        Self { writer }
    }
}

impl<W: io::Write> RowSink for CsvSink<W> {
    fn begin(&mut self, header: &Header) -> FilterResult<()> {
        self.writer.write_record(header.columns())?;
        Ok(())
    }

    fn write_row(&mut self, row: &Row) -> FilterResult<()> {
        self.writer.write_record(row.values())?;
        Ok(())
    }

    fn flush(&mut self) -> FilterResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Header;
    use std::sync::Arc;

    #[test]
    fn writes_header_then_rows_with_registry_format() {
        let header = Arc::new(
            Header::new(vec!["CNPJ_BASICO".to_string(), "NOME_FANTASIA".to_string()]).unwrap(),
        );
        let mut out = Vec::new();
        {
            let mut sink = CsvSink::from_writer(&mut out);
            sink.begin(&header).unwrap();
            sink.write_row(&Row::new(
                Arc::clone(&header),
                1,
                vec!["11111111".to_string(), "PADARIA; CAFE".to_string()],
            ))
            .unwrap();
            sink.flush().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "CNPJ_BASICO;NOME_FANTASIA\n11111111;\"PADARIA; CAFE\"\n"
        );
    }
}
