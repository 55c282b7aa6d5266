use url::Url;

use crate::services::webdav::paths::decode_href;

/// A WebDAV property: its identity as seen during name discovery, plus the
/// value filled in by the value fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Local name, without prefix
    pub name: String,
    pub namespace_uri: String,
    /// Prefix the server used for this namespace; empty for a default namespace
    pub namespace_alias: String,
    /// Rendered text content
    pub value: Option<String>,
    /// Inner markup as returned by the server
    pub raw_value: Option<String>,
}

impl Property {
    pub fn new(
        name: impl Into<String>,
        namespace_uri: impl Into<String>,
        namespace_alias: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace_uri: namespace_uri.into(),
            namespace_alias: namespace_alias.into(),
            value: None,
            raw_value: None,
        }
    }

    pub fn set_value(&mut self, value: String, raw_value: String) {
        self.value = Some(value);
        self.raw_value = Some(raw_value);
    }

    /// Discovery-only properties carry no value and are never exported.
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

/// A file or folder returned by a directory listing
#[derive(Debug, Clone)]
pub struct Resource {
    /// Absolute, percent-encoded URL assigned by the server
    pub href: Url,
    /// Path relative to the listed directory; never empty
    pub relative_path: String,
    properties: Vec<Property>,
    is_folder: bool,
}

impl Resource {
    pub fn new(href: Url, relative_path: impl Into<String>) -> Self {
        Self {
            href,
            relative_path: relative_path.into(),
            properties: Vec::new(),
            is_folder: false,
        }
    }

    /// Adds a property keyed by its local name. Returns `false` and keeps the
    /// existing entry when the name is already present.
    pub fn add_property(&mut self, property: Property) -> bool {
        if self.property(&property.name).is_some() {
            return false;
        }
        self.properties.push(property);
        true
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.name == name)
    }

    /// Properties in discovery (document) order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Text value of a property, if it was fetched.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(|p| p.value.as_deref())
    }

    pub fn is_folder(&self) -> bool {
        self.is_folder
    }

    pub fn set_folder(&mut self, is_folder: bool) {
        self.is_folder = is_folder;
    }

    /// The href with percent-encoding removed
    pub fn display_href(&self) -> String {
        decode_href(self.href.as_str())
    }
}
