//! Column discovery and row buffering for resources with heterogeneous
//! property sets

use std::collections::HashSet;

use tracing::debug;

use super::sink::RowSink;
use crate::error::DavError;
use crate::models::Resource;

/// Name of the fixed leading column
pub const HREF_COLUMN: &str = "href";

/// Accumulates an append-only column list and one buffered row per resource.
///
/// A row holds the href, then a value (possibly empty) for every column known
/// when the row was recorded, then values for the columns this resource
/// introduced. Rows recorded before a column appeared are not back-filled.
#[derive(Debug)]
pub struct SchemaAccumulator {
    columns: Vec<String>,
    known: HashSet<String>,
    excluded: HashSet<String>,
    rows: Vec<Vec<String>>,
}

impl Default for SchemaAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaAccumulator {
    pub fn new() -> Self {
        let mut known = HashSet::new();
        known.insert(HREF_COLUMN.to_string());
        Self {
            columns: vec![HREF_COLUMN.to_string()],
            known,
            excluded: HashSet::new(),
            rows: Vec::new(),
        }
    }

    /// Properties that never become columns, e.g. the folder marker.
    pub fn excluding<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Buffers a row for `resource`, appending any new columns it brings.
    /// Properties without a fetched value are ignored.
    pub fn record(&mut self, resource: &Resource) {
        let mut row = Vec::with_capacity(self.columns.len());
        row.push(resource.display_href());

        for column in &self.columns[1..] {
            row.push(resource.value(column).unwrap_or_default().to_string());
        }

        for property in resource.properties() {
            let Some(value) = property.value.as_deref() else {
                continue;
            };
            if self.known.contains(&property.name) || self.excluded.contains(&property.name) {
                continue;
            }
            debug!("New column '{}' from {}", property.name, resource.href);
            self.known.insert(property.name.clone());
            self.columns.push(property.name.clone());
            row.push(value.to_string());
        }

        self.rows.push(row);
    }

    /// Final header and the buffered rows in recording order.
    pub fn finalize(self) -> (Vec<String>, Vec<Vec<String>>) {
        (self.columns, self.rows)
    }

    /// Writes the header, then every buffered row, then finishes the sink.
    /// Returns the number of data rows written.
    pub fn write_to<K: RowSink + ?Sized>(self, sink: &mut K) -> Result<usize, DavError> {
        let (header, rows) = self.finalize();
        sink.write_header(&header)?;
        for row in &rows {
            sink.write_row(row)?;
        }
        sink.finish()?;
        Ok(rows.len())
    }
}
