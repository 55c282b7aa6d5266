//! Request URI construction and href-to-relative-path mapping

use std::borrow::Cow;

use url::Url;

use crate::error::DavError;

/// Builds absolute request URIs from a server root, a base path and a
/// request path, and maps returned hrefs back to paths relative to a listing.
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// `scheme://host[:port]` plus any path prefix of the server URL
    root: Url,
    /// Always begins and ends with `/`
    base_path: String,
}

impl PathResolver {
    pub fn new(server_url: &str, base_path: &str, port: Option<u16>) -> Result<Self, DavError> {
        let trimmed = server_url.trim().trim_end_matches('/');
        let mut root = Url::parse(trimmed)
            .map_err(|e| DavError::Config(format!("Invalid server URL '{}': {}", trimmed, e)))?;
        if root.cannot_be_a_base() || root.host_str().is_none() {
            return Err(DavError::Config(format!("Server URL '{}' has no host", trimmed)));
        }
        if let Some(port) = port {
            root.set_port(Some(port))
                .map_err(|_| DavError::Config(format!("Cannot set port {} on '{}'", port, trimmed)))?;
        }
        root.set_query(None);
        root.set_fragment(None);

        Ok(Self {
            root,
            base_path: Self::normalize_base_path(base_path),
        })
    }

    /// `"dav"`, `"/dav"` and `"/dav/"` all normalize to `"/dav/"`; an empty
    /// base path normalizes to `"/"`.
    pub fn normalize_base_path(base_path: &str) -> String {
        let trimmed = base_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", trimmed)
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Resolves a logical (unencoded) path under the base path.
    ///
    /// Leading and trailing slashes of `path` are ignored; with
    /// `append_trailing_slash` the result always ends in `/`. Each segment is
    /// percent-encoded, so resolving the same path twice yields the same URI.
    pub fn resolve(&self, path: &str, append_trailing_slash: bool) -> Result<Url, DavError> {
        let mut complete = self.base_path.clone();
        complete.push_str(path.trim().trim_matches('/'));
        if append_trailing_slash && !complete.ends_with('/') {
            complete.push('/');
        }

        let mut url = self.root.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                DavError::PathResolution(format!("'{}' cannot carry a path", self.root))
            })?;
            segments.pop_if_empty();
            segments.extend(complete.trim_start_matches('/').split('/'));
        }
        Ok(url)
    }

    /// Path of `child_href` relative to `listing`, compared case-insensitively
    /// after percent-decoding both sides.
    ///
    /// Returns `None` when the href does not live under the listing URI. An
    /// empty string means the href is the listed directory itself.
    pub fn relative_path(child_href: &Url, listing: &Url) -> Option<String> {
        let child = decode_href(child_href.as_str());
        let listing = decode_href(listing.as_str());
        let listing = listing.strip_suffix('/').unwrap_or(&listing);

        // char by char: case pairs may differ in UTF-8 length
        let mut child_chars = child.char_indices();
        let mut rest_start = 0;
        for expected in listing.chars() {
            let (index, actual) = child_chars.next()?;
            if actual != expected && !actual.to_lowercase().eq(expected.to_lowercase()) {
                return None;
            }
            rest_start = index + actual.len_utf8();
        }

        let rest = &child[rest_start..];
        if !rest.is_empty() && !rest.starts_with('/') {
            // "/docs-old" is a sibling of "/docs", not a child
            return None;
        }
        Some(rest.strip_prefix('/').unwrap_or(rest).to_string())
    }
}

/// Logical path of a child entry, as pushed onto the traversal worklist.
pub fn child_path(parent: &str, relative_path: &str) -> String {
    format!(
        "{}/{}",
        parent.trim_end_matches('/'),
        relative_path.trim_matches('/')
    )
}

/// Strict percent-decoding; `+` stays a plus sign.
pub fn decode_href(href: &str) -> String {
    match urlencoding::decode(href) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => {
            let bytes = urlencoding::decode_binary(href.as_bytes());
            match String::from_utf8_lossy(&bytes) {
                Cow::Borrowed(s) => s.to_string(),
                Cow::Owned(s) => s,
            }
        }
    }
}
