//! WebDAV tree crawler that exports per-resource PROPFIND metadata as CSV.
//!
//! Property names are discovered first (`propname`, depth 1) and values are
//! fetched per resource (depth 0). The column set grows as new properties
//! appear, and the table is written once the whole tree has been walked.

pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod services;

pub use config::{Credentials, WebDAVConfig};
pub use error::{DavError, ErrorKind};
pub use export::{export, CsvSink, MemorySink, RowSink, SchemaAccumulator, Traversal};
pub use models::{Property, Resource};
pub use services::webdav::{PathResolver, WebDAVService};
