//! Common utilities shared by the WebDAV services

/// Build the User-Agent string sent with every WebDAV request
pub fn build_user_agent() -> String {
    format!("dav2csv/{} (WebDAV-Export)", env!("CARGO_PKG_VERSION"))
}
