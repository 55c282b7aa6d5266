// WebDAV client modules: path resolution, transport, PROPFIND codec and service

pub mod common;
pub mod paths;
pub mod propfind;
pub mod request;
pub mod service;
pub mod xml;

// Re-export main types for convenience
pub use paths::PathResolver;
pub use request::{RequestBody, RequestExecutor};
pub use service::WebDAVService;
