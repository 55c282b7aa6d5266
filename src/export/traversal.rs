//! Depth-first walk over a WebDAV tree

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::error::DavError;
use crate::models::Resource;
use crate::services::webdav::paths::child_path;
use crate::services::webdav::WebDAVService;

use super::schema::SchemaAccumulator;

/// Where the traversal gets listings and property values from
#[async_trait]
pub trait PropertySource: Send + Sync {
    /// Immediate children of a directory with their property names
    async fn list_names(&self, directory_path: &str) -> Result<Vec<Resource>, DavError>;

    /// Fills in the values of the resource's discovered properties
    async fn fetch_values(&self, resource: &mut Resource) -> Result<StatusCode, DavError>;
}

#[async_trait]
impl PropertySource for WebDAVService {
    async fn list_names(&self, directory_path: &str) -> Result<Vec<Resource>, DavError> {
        WebDAVService::list_names(self, directory_path).await
    }

    async fn fetch_values(&self, resource: &mut Resource) -> Result<StatusCode, DavError> {
        WebDAVService::fetch_values(self, resource).await
    }
}

/// Receives what the traversal finds
pub trait TraversalObserver {
    /// A directory was listed; called before any child is resolved.
    fn directory_listed(&mut self, _path: &str, _children: &[Resource]) -> Result<(), DavError> {
        Ok(())
    }

    /// A child is fully resolved (or, without value fetching, just listed).
    fn resource_resolved(&mut self, resource: Resource) -> Result<(), DavError>;
}

impl TraversalObserver for SchemaAccumulator {
    fn resource_resolved(&mut self, resource: Resource) -> Result<(), DavError> {
        self.record(&resource);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalSummary {
    pub directories_listed: usize,
    pub resources_resolved: usize,
    pub folders_found: usize,
}

/// Sequential depth-first traversal driven by an explicit stack of pending
/// directory paths.
///
/// Children are visited in document order, and subdirectories are pushed as
/// they are seen, so the last subdirectory of a listing is descended into
/// first. The first error from listing, fetching or the observer ends the
/// walk.
pub struct Traversal<'a, S: PropertySource + ?Sized> {
    source: &'a S,
    pending: Vec<String>,
    fetch_values: bool,
}

impl<'a, S: PropertySource + ?Sized> Traversal<'a, S> {
    pub fn new(source: &'a S, start_path: impl Into<String>) -> Self {
        Self {
            source,
            pending: vec![start_path.into()],
            fetch_values: true,
        }
    }

    /// With `false` only the name listings are requested.
    pub fn fetch_values(mut self, fetch_values: bool) -> Self {
        self.fetch_values = fetch_values;
        self
    }

    pub async fn run<O: TraversalObserver + ?Sized>(
        mut self,
        observer: &mut O,
    ) -> Result<TraversalSummary, DavError> {
        let mut summary = TraversalSummary::default();

        while let Some(path) = self.pending.pop() {
            debug!("Traversing '{}' ({} pending)", path, self.pending.len());

            let children = self.source.list_names(&path).await?;
            summary.directories_listed += 1;
            observer.directory_listed(&path, &children)?;

            for mut child in children {
                if child.is_folder() {
                    self.pending.push(child_path(&path, &child.relative_path));
                    summary.folders_found += 1;
                }
                if self.fetch_values {
                    self.source.fetch_values(&mut child).await?;
                }
                observer.resource_resolved(child)?;
                summary.resources_resolved += 1;
            }
        }

        info!(
            "Traversal finished: {} directories listed, {} resources resolved",
            summary.directories_listed, summary.resources_resolved
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Property;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use url::Url;

    /// In-memory tree keyed by logical directory path
    struct FakeSource {
        tree: HashMap<String, Vec<(&'static str, bool)>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(entries: &[(&str, Vec<(&'static str, bool)>)]) -> Self {
            Self {
                tree: entries
                    .iter()
                    .map(|(path, children)| (path.to_string(), children.clone()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PropertySource for FakeSource {
        async fn list_names(&self, directory_path: &str) -> Result<Vec<Resource>, DavError> {
            self.calls.lock().unwrap().push(format!("list {}", directory_path));
            let children = self
                .tree
                .get(directory_path)
                .ok_or_else(|| DavError::xml(format!("no listing for {}", directory_path)))?;
            Ok(children
                .iter()
                .map(|(name, is_folder)| {
                    let href = Url::parse(&format!("https://h{}/{}", directory_path, name)).unwrap();
                    let mut resource = Resource::new(href, *name);
                    resource.add_property(Property::new("displayname", "DAV:", "D"));
                    resource.set_folder(*is_folder);
                    resource
                })
                .collect())
        }

        async fn fetch_values(&self, resource: &mut Resource) -> Result<StatusCode, DavError> {
            self.calls.lock().unwrap().push(format!("fetch {}", resource.relative_path));
            let name = resource.relative_path.clone();
            resource
                .property_mut("displayname")
                .unwrap()
                .set_value(name.clone(), name);
            Ok(StatusCode::MULTI_STATUS)
        }
    }

    #[tokio::test]
    async fn test_depth_first_order() {
        let source = FakeSource::new(&[
            ("/root", vec![("a", true), ("file.txt", false), ("b", true)]),
            ("/root/a", vec![("a1.txt", false)]),
            ("/root/b", vec![("b1", true)]),
            ("/root/b/b1", vec![]),
        ]);

        let mut accumulator = SchemaAccumulator::new();
        let summary = Traversal::new(&source, "/root").run(&mut accumulator).await.unwrap();

        assert_eq!(
            source.calls(),
            vec![
                "list /root",
                "fetch a",
                "fetch file.txt",
                "fetch b",
                "list /root/b",
                "fetch b1",
                "list /root/b/b1",
                "list /root/a",
                "fetch a1.txt",
            ]
        );
        assert_eq!(
            summary,
            TraversalSummary {
                directories_listed: 4,
                resources_resolved: 5,
                folders_found: 3,
            }
        );
        assert_eq!(accumulator.columns(), &["href", "displayname"]);
        assert_eq!(accumulator.rows().len(), 5);
    }

    #[tokio::test]
    async fn test_listing_only_skips_value_fetch() {
        let source = FakeSource::new(&[("/", vec![("a", true)]), ("/a", vec![("x", false)])]);

        let mut accumulator = SchemaAccumulator::new();
        Traversal::new(&source, "/")
            .fetch_values(false)
            .run(&mut accumulator)
            .await
            .unwrap();

        assert_eq!(source.calls(), vec!["list /", "list /a"]);
        // nothing was fetched, so no property becomes a column
        assert_eq!(accumulator.columns(), &["href"]);
    }

    #[tokio::test]
    async fn test_error_stops_traversal() {
        // "/root/missing" has no listing
        let source = FakeSource::new(&[
            ("/root", vec![("missing", true), ("after.txt", false)]),
        ]);

        let mut accumulator = SchemaAccumulator::new();
        let err = Traversal::new(&source, "/root").run(&mut accumulator).await.unwrap_err();
        assert!(matches!(err, DavError::XmlParse(_)));
        assert_eq!(
            source.calls(),
            vec!["list /root", "fetch missing", "fetch after.txt", "list /root/missing"]
        );
    }
}
