//! Small namespace-aware XML element tree for multi-status documents

use std::fmt::Write as _;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use crate::error::DavError;

pub const DAV_NS: &str = "DAV:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Resolved namespace URI, `None` when the element is in no namespace
    pub namespace: Option<String>,
    /// Prefix as written in the document
    pub prefix: Option<String>,
    pub local_name: String,
    /// Attributes in document order, keys as written (including `xmlns` ones)
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    fn from_start(ns: ResolveResult<'_>, start: &BytesStart<'_>) -> Result<Self, DavError> {
        let namespace = match ns {
            ResolveResult::Bound(ns) => Some(utf8(ns.into_inner())?.to_string()),
            ResolveResult::Unbound => None,
            ResolveResult::Unknown(prefix) => {
                return Err(DavError::xml(format!(
                    "undeclared namespace prefix '{}'",
                    String::from_utf8_lossy(&prefix)
                )))
            }
        };

        let name = start.name();
        let local_name = utf8(name.local_name().into_inner())?.to_string();
        let prefix = match name.prefix() {
            Some(prefix) => Some(utf8(prefix.into_inner())?.to_string()),
            None => None,
        };

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            namespace,
            prefix,
            local_name,
            attributes,
            children: Vec::new(),
        })
    }

    /// Whether this element is `{ns}local`
    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.local_name == local && self.namespace.as_deref() == Some(ns)
    }

    pub fn namespace_uri(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    /// `prefix:local`, or the bare local name
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.clone(),
        }
    }

    /// Child elements, skipping text
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    pub fn child(&self, ns: &str, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.is(ns, local))
    }

    pub fn children_named<'a>(
        &'a self,
        ns: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |el| el.is(ns, local))
    }

    /// Concatenated text of all descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Markup of the children, re-serialized.
    ///
    /// Each top-level child element carries `xmlns` declarations for the
    /// element prefixes its subtree uses but that were bound further out, so
    /// the fragment parses on its own.
    pub fn inner_xml(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            let mut inherited = Vec::new();
            if let XmlNode::Element(el) = node {
                el.collect_inherited_bindings(&[], &mut inherited);
            }
            write_node(node, &inherited, &mut out);
        }
        out
    }

    /// Prefixes declared by this element's own `xmlns` attributes; `None`
    /// stands for the default namespace.
    fn declared_prefixes(&self) -> impl Iterator<Item = Option<&str>> {
        self.attributes.iter().filter_map(|(key, _)| {
            if key == "xmlns" {
                Some(None)
            } else {
                key.strip_prefix("xmlns:").map(Some)
            }
        })
    }

    fn collect_inherited_bindings<'a>(
        &'a self,
        in_scope: &[Option<&'a str>],
        out: &mut Vec<(Option<String>, String)>,
    ) {
        let mut scope = in_scope.to_vec();
        scope.extend(self.declared_prefixes());

        let prefix = self.prefix.as_deref();
        if let Some(namespace) = &self.namespace {
            let bound = scope.contains(&prefix) || out.iter().any(|(p, _)| p.as_deref() == prefix);
            if !bound {
                out.push((self.prefix.clone(), namespace.clone()));
            }
        }

        for child in self.elements() {
            child.collect_inherited_bindings(&scope, out);
        }
    }

    /// Whitespace-only text next to child elements is layout, not content.
    fn drop_layout_whitespace(&mut self) {
        let has_elements = self.children.iter().any(|n| matches!(n, XmlNode::Element(_)));
        if has_elements {
            self.children.retain(|node| match node {
                XmlNode::Text(text) => !text.trim().is_empty(),
                XmlNode::Element(_) => true,
            });
        }
    }
}

fn write_node(node: &XmlNode, extra_namespaces: &[(Option<String>, String)], out: &mut String) {
    match node {
        XmlNode::Text(text) => out.push_str(&escape(text.as_str())),
        XmlNode::Element(el) => {
            let name = el.qualified_name();
            out.push('<');
            out.push_str(&name);
            for (prefix, uri) in extra_namespaces {
                match prefix {
                    Some(prefix) => {
                        let _ = write!(out, " xmlns:{}=\"{}\"", prefix, escape(uri.as_str()));
                    }
                    None => {
                        let _ = write!(out, " xmlns=\"{}\"", escape(uri.as_str()));
                    }
                }
            }
            for (key, value) in &el.attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape(value.as_str()));
                out.push('"');
            }
            if el.children.is_empty() {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in &el.children {
                    write_node(child, &[], out);
                }
                out.push_str("</");
                out.push_str(&name);
                out.push('>');
            }
        }
    }
}

fn utf8(bytes: &[u8]) -> Result<&str, DavError> {
    std::str::from_utf8(bytes).map_err(|e| DavError::xml(format!("invalid UTF-8 in name: {}", e)))
}

/// Parses a complete document into its root element.
///
/// Text keeps its whitespace. Whitespace-only text is dropped only inside
/// elements that also have child elements. Comments, processing
/// instructions and the declaration are ignored.
pub fn parse_document(body: &str) -> Result<XmlElement, DavError> {
    let mut reader = NsReader::from_str(body);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        match event {
            Event::Start(start) => {
                let el = XmlElement::from_start(ns, &start)?;
                stack.push(el);
            }
            Event::Empty(start) => {
                let el = XmlElement::from_start(ns, &start)?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::End(_) => {
                let mut el = stack
                    .pop()
                    .ok_or_else(|| DavError::xml("closing tag without an open element"))?;
                el.drop_layout_whitespace();
                attach(&mut stack, &mut root, el)?;
            }
            Event::Text(text) => {
                let text = text.unescape()?.into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Event::CData(data) => {
                let text = utf8(&data)?.to_string();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(DavError::xml(format!(
            "unexpected end of document inside <{}>",
            open.qualified_name()
        )));
    }
    root.ok_or_else(|| DavError::xml("document has no root element"))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    el: XmlElement,
) -> Result<(), DavError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(el));
        return Ok(());
    }
    if root.is_some() {
        return Err(DavError::xml("document has more than one root element"));
    }
    *root = Some(el);
    Ok(())
}
