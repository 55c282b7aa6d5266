//! Destinations for the tabular export

use std::io::Write;

use crate::error::DavError;

/// Receives one header row, then any number of data rows.
///
/// Rows are positional and may be shorter than the header: a row only
/// carries the columns that were known when it was produced.
pub trait RowSink {
    fn write_header(&mut self, header: &[String]) -> Result<(), DavError>;

    fn write_row(&mut self, row: &[String]) -> Result<(), DavError>;

    /// Called once after the last row
    fn finish(&mut self) -> Result<(), DavError> {
        Ok(())
    }
}

/// CSV output over any writer
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            // rows written before a late column appeared are shorter than the header
            .flexible(true)
            .from_writer(inner);
        Self { writer }
    }

    pub fn into_inner(self) -> Result<W, DavError> {
        self.writer
            .into_inner()
            .map_err(|e| DavError::Io(e.into_error()))
    }
}

impl<W: Write> RowSink for CsvSink<W> {
    fn write_header(&mut self, header: &[String]) -> Result<(), DavError> {
        self.writer.write_record(header)?;
        Ok(())
    }

    fn write_row(&mut self, row: &[String]) -> Result<(), DavError> {
        self.writer.write_record(row)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DavError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps everything in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
    pub finished: bool,
}

impl RowSink for MemorySink {
    fn write_header(&mut self, header: &[String]) -> Result<(), DavError> {
        self.header = Some(header.to_vec());
        Ok(())
    }

    fn write_row(&mut self, row: &[String]) -> Result<(), DavError> {
        self.rows.push(row.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DavError> {
        self.finished = true;
        Ok(())
    }
}
