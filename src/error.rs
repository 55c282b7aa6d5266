//! Error type shared by the WebDAV client, the traversal and the row sinks

/// Coarse classification of a [`DavError`], used to decide whether a failure
/// stops the crawl or only drops a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection failure, timeout or an unreadable response body
    TransportFailure,
    /// The server answered with a status the caller does not accept
    ProtocolStatusFailure,
    /// Malformed XML or a multi-status document with an unexpected shape
    XmlParseFailure,
    /// The server returned a property that was never discovered
    DataMismatch,
    /// An href or path could not be placed under the listing URI
    PathResolutionFailure,
    /// Writing the tabular output failed
    OutputFailure,
    /// Invalid client configuration
    ConfigurationFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum DavError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{method} {url} failed with status {status}")]
    UnexpectedStatus {
        method: String,
        url: String,
        status: u16,
    },

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("Property '{property}' returned for {href} was not part of the discovered set")]
    DataMismatch { href: String, property: String },

    #[error("Path resolution error: {0}")]
    PathResolution(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DavError {
    pub fn xml(message: impl Into<String>) -> Self {
        DavError::XmlParse(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DavError::Transport(_) | DavError::Io(_) => ErrorKind::TransportFailure,
            DavError::UnexpectedStatus { .. } => ErrorKind::ProtocolStatusFailure,
            DavError::XmlParse(_) => ErrorKind::XmlParseFailure,
            DavError::DataMismatch { .. } => ErrorKind::DataMismatch,
            DavError::PathResolution(_) => ErrorKind::PathResolutionFailure,
            DavError::Csv(_) => ErrorKind::OutputFailure,
            DavError::Config(_) => ErrorKind::ConfigurationFailure,
        }
    }

    /// Everything except a path resolution failure aborts the traversal.
    pub fn is_fatal(&self) -> bool {
        self.kind() != ErrorKind::PathResolutionFailure
    }
}

impl From<quick_xml::Error> for DavError {
    fn from(e: quick_xml::Error) -> Self {
        DavError::XmlParse(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for DavError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        DavError::XmlParse(format!("invalid attribute: {}", e))
    }
}

impl From<url::ParseError> for DavError {
    fn from(e: url::ParseError) -> Self {
        DavError::PathResolution(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_path_resolution_is_recoverable() {
        let recoverable = DavError::PathResolution("outside listing".to_string());
        assert_eq!(recoverable.kind(), ErrorKind::PathResolutionFailure);
        assert!(!recoverable.is_fatal());

        let mismatch = DavError::DataMismatch {
            href: "https://host/dav/a.txt".to_string(),
            property: "author".to_string(),
        };
        assert_eq!(mismatch.kind(), ErrorKind::DataMismatch);
        assert!(mismatch.is_fatal());

        let status = DavError::UnexpectedStatus {
            method: "PROPFIND".to_string(),
            url: "https://host/dav/".to_string(),
            status: 405,
        };
        assert_eq!(status.kind(), ErrorKind::ProtocolStatusFailure);
        assert!(status.to_string().contains("405"));
    }
}
