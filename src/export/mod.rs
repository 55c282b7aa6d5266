//! Tree traversal and tabular export of WebDAV properties

pub mod listing;
pub mod schema;
pub mod sink;
pub mod traversal;

pub use listing::ListingPrinter;
pub use schema::{SchemaAccumulator, HREF_COLUMN};
pub use sink::{CsvSink, MemorySink, RowSink};
pub use traversal::{PropertySource, Traversal, TraversalObserver, TraversalSummary};

use tracing::info;

use crate::error::DavError;

/// Walks the tree under `start_path`, then writes the header and all
/// buffered rows to `sink`.
///
/// Nothing reaches the sink unless the whole traversal succeeds, so a failed
/// crawl never leaves a half-written table behind. `excluded` names
/// properties (typically the folder marker) that never become columns.
pub async fn export<S, K>(
    source: &S,
    start_path: &str,
    excluded: &[String],
    sink: &mut K,
) -> Result<TraversalSummary, DavError>
where
    S: PropertySource + ?Sized,
    K: RowSink + ?Sized,
{
    let mut accumulator = SchemaAccumulator::new().excluding(excluded.iter().cloned());
    let summary = Traversal::new(source, start_path).run(&mut accumulator).await?;

    let columns = accumulator.columns().len();
    let rows = accumulator.write_to(sink)?;
    info!("Exported {} rows across {} columns", rows, columns);

    Ok(summary)
}
