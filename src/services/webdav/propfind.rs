//! PROPFIND request bodies and multi-status response parsing for the
//! two-phase (names first, values second) metadata protocol

use std::fmt::Write as _;

use quick_xml::escape::escape;
use tracing::{debug, warn};
use url::Url;

use super::paths::PathResolver;
use super::xml::{parse_document, XmlElement, DAV_NS};
use crate::error::DavError;
use crate::models::{Property, Resource};

/// Asks the server which properties exist, without their values.
pub const PROPNAME_REQUEST: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<propfind xmlns="DAV:">
  <propname/>
</propfind>
"#;

/// Request body naming every discovered property of `resource`.
///
/// DAV properties go under the root `D:` prefix. Every other namespace gets
/// one `xmlns:<alias>` declaration on the `prop` element, reusing the alias
/// seen at discovery. An alias that is empty, reserved, or already bound to
/// a different URI is replaced by a generated `nsN`.
pub fn build_value_request(resource: &Resource) -> String {
    let mut declarations: Vec<(String, String)> = Vec::new();
    let mut elements: Vec<String> = Vec::new();
    let mut generated = 0usize;

    for prop in resource.properties() {
        let name = escape(prop.name.as_str());
        if prop.namespace_uri == DAV_NS {
            elements.push(format!("<D:{} />", name));
            continue;
        }
        if prop.namespace_uri.is_empty() {
            elements.push(format!("<{} xmlns=\"\" />", name));
            continue;
        }

        let alias = match declarations.iter().find(|(_, uri)| *uri == prop.namespace_uri) {
            Some((alias, _)) => alias.clone(),
            None => {
                let alias = if alias_is_usable(&prop.namespace_alias, &declarations) {
                    prop.namespace_alias.clone()
                } else {
                    next_generated_alias(&mut generated, &declarations)
                };
                declarations.push((alias.clone(), prop.namespace_uri.clone()));
                alias
            }
        };
        elements.push(format!("<{}:{} />", alias, name));
    }

    let mut body = String::new();
    body.push_str("<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n");
    body.push_str("<D:propfind xmlns:D=\"DAV:\">\n");
    body.push_str("  <D:prop");
    for (alias, uri) in &declarations {
        let _ = write!(body, " xmlns:{}=\"{}\"", alias, escape(uri.as_str()));
    }
    body.push_str(">\n");
    for element in &elements {
        body.push_str("    ");
        body.push_str(element);
        body.push('\n');
    }
    body.push_str("  </D:prop>\n");
    body.push_str("</D:propfind>\n");
    body
}

fn alias_is_usable(alias: &str, declarations: &[(String, String)]) -> bool {
    !alias.is_empty()
        && alias != "D"
        && !alias.to_ascii_lowercase().starts_with("xml")
        && !declarations.iter().any(|(declared, _)| declared == alias)
}

fn next_generated_alias(generated: &mut usize, declarations: &[(String, String)]) -> String {
    loop {
        let candidate = format!("ns{}", *generated);
        *generated += 1;
        if !declarations.iter().any(|(declared, _)| *declared == candidate) {
            return candidate;
        }
    }
}

fn multistatus_root(body: &str) -> Result<XmlElement, DavError> {
    let root = parse_document(body)?;
    if !root.is(DAV_NS, "multistatus") {
        return Err(DavError::xml(format!(
            "expected a DAV: multistatus document, found <{}>",
            root.qualified_name()
        )));
    }
    Ok(root)
}

/// All `propstat/prop` elements of one `response`, paired with whether their
/// status line is a success (a missing status counts as success).
fn prop_blocks(response: &XmlElement) -> Vec<(&XmlElement, bool)> {
    response
        .children_named(DAV_NS, "propstat")
        .filter_map(|propstat| {
            let prop = propstat.child(DAV_NS, "prop")?;
            let ok = propstat
                .child(DAV_NS, "status")
                .map(|status| status_line_is_success(&status.text()))
                .unwrap_or(true);
            Some((prop, ok))
        })
        .collect()
}

/// `HTTP/1.1 200 OK` -> true
fn status_line_is_success(line: &str) -> bool {
    line.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .map(|code| (200..300).contains(&code))
        .unwrap_or(false)
}

/// Absolute href and relative path of a listed entry. Hrefs that cannot be
/// placed under `listing` are a path resolution failure.
fn locate(raw_href: &str, listing: &Url) -> Result<(Url, String), DavError> {
    let href = listing.join(raw_href)?;
    let relative_path = PathResolver::relative_path(&href, listing).ok_or_else(|| {
        DavError::PathResolution(format!("'{}' is not under listing '{}'", href, listing))
    })?;
    Ok((href, relative_path))
}

/// Parses a depth-1 `propname` response into the children of `listing`.
///
/// The entry for the listed directory itself is skipped, as is any href that
/// does not resolve under the listing URI. A resource is a folder when one of
/// its property names equals `folder_marker`.
pub fn parse_propname_response(
    body: &str,
    listing: &Url,
    folder_marker: &str,
) -> Result<Vec<Resource>, DavError> {
    let root = multistatus_root(body)?;
    let mut resources = Vec::new();

    for response in root.children_named(DAV_NS, "response") {
        let raw_href = response
            .child(DAV_NS, "href")
            .map(|href| href.text())
            .ok_or_else(|| DavError::xml("response element without href"))?;
        let raw_href = raw_href.trim();

        let blocks = prop_blocks(response);
        if blocks.is_empty() {
            return Err(DavError::xml(format!(
                "response for '{}' has no propstat/prop",
                raw_href
            )));
        }

        let (href, relative_path) = match locate(raw_href, listing) {
            Ok(located) => located,
            Err(e) if !e.is_fatal() => {
                warn!("Dropping entry '{}': {}", raw_href, e);
                continue;
            }
            Err(e) => return Err(e),
        };
        if relative_path.is_empty() {
            continue;
        }

        let mut resource = Resource::new(href, relative_path);
        for (prop, _) in blocks {
            for el in prop.elements() {
                let property = Property::new(
                    el.local_name.clone(),
                    el.namespace_uri(),
                    el.prefix.clone().unwrap_or_default(),
                );
                if !resource.add_property(property) {
                    warn!(
                        "Ignoring second property named '{}' on {} ({})",
                        el.local_name,
                        resource.href,
                        el.namespace_uri()
                    );
                }
            }
        }
        let is_folder = resource.property(folder_marker).is_some();
        resource.set_folder(is_folder);

        debug!(
            "Discovered '{}' with {} properties (folder: {})",
            resource.relative_path,
            resource.properties().len(),
            is_folder
        );
        resources.push(resource);
    }

    Ok(resources)
}

/// Applies a depth-0 value response to `resource`.
///
/// Every returned property must have been discovered, otherwise the result
/// is a [`DavError::DataMismatch`]. Values are stored only from propstat
/// blocks with a success status.
pub fn apply_value_response(body: &str, resource: &mut Resource) -> Result<(), DavError> {
    let root = multistatus_root(body)?;
    let response = root
        .child(DAV_NS, "response")
        .ok_or_else(|| DavError::xml("multistatus without a response element"))?;

    let blocks = prop_blocks(response);
    if blocks.is_empty() {
        return Err(DavError::xml(format!(
            "value response for '{}' has no propstat/prop",
            resource.href
        )));
    }

    let href = resource.href.to_string();
    for (prop, ok) in blocks {
        for el in prop.elements() {
            let property = match resource.property_mut(&el.local_name) {
                Some(property) => property,
                None => {
                    return Err(DavError::DataMismatch {
                        href,
                        property: el.local_name.clone(),
                    })
                }
            };
            if ok {
                property.set_value(el.text(), el.inner_xml());
            } else {
                debug!("Property '{}' of {} was not returned", el.local_name, href);
            }
        }
    }

    Ok(())
}
