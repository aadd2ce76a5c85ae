//! Namespace-aware element tree and structural queries over OOXML parts.
//!
//! Parts are read once with quick-xml into an owned tree. Queries name
//! elements and attributes by qualified name (`"w:pPr"`, `"w:val"`); the
//! prefix is looked up in the [`Namespaces`] map the document was parsed
//! with, never in the prefixes the part itself happened to declare.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

pub const NS_WORD: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_MATH: &str = "http://schemas.openxmlformats.org/officeDocument/2006/math";
pub const NS_VML: &str = "urn:schemas-microsoft-com:vml";
pub const NS_WORD_DRAWING: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub const NS_MARKUP_COMPAT: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";
const NS_XML: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    #[error("unexpected end of document inside <{0}>")]
    Unclosed(String),

    #[error("document has no root element")]
    Empty,
}

// ---------------------------------------------------------------------------
// Namespace configuration
// ---------------------------------------------------------------------------

/// Prefix → URI bindings used to interpret query names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    map: BTreeMap<String, String>,
}

impl Namespaces {
    /// The fixed prefixes of the WordprocessingML package contract.
    pub fn ooxml() -> Self {
        let map = [
            ("w", NS_WORD),
            ("a", NS_DRAWING),
            ("r", NS_RELATIONSHIPS),
            ("m", NS_MATH),
            ("v", NS_VML),
            ("wp", NS_WORD_DRAWING),
            ("mc", NS_MARKUP_COMPAT),
            ("xml", NS_XML),
        ]
        .into_iter()
        .map(|(p, u)| (p.to_string(), u.to_string()))
        .collect();
        Self { map }
    }

    pub fn with(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.map.insert(prefix.into(), uri.into());
        self
    }

    /// Apply a set of overrides on top of these bindings.
    pub fn extended<'a>(mut self, overrides: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (prefix, uri) in overrides {
            self.map.insert(prefix.clone(), uri.clone());
        }
        self
    }

    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.map.get(prefix).map(|s| s.as_str())
    }

    /// Split `"w:val"` and resolve its prefix. Unprefixed names have no
    /// namespace. An unknown prefix is a query failure: logged, `None`.
    fn resolve<'q>(&self, qname: &'q str) -> Option<(Option<&str>, &'q str)> {
        match qname.split_once(':') {
            Some((prefix, local)) => match self.uri(prefix) {
                Some(uri) => Some((Some(uri), local)),
                None => {
                    log::warn!("Query names unknown namespace prefix '{}' ({})", prefix, qname);
                    None
                }
            },
            None => Some((None, qname)),
        }
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self::ooxml()
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct XmlAttr {
    ns: Option<String>,
    local: String,
    value: String,
}

#[derive(Debug, Clone)]
enum XmlChild {
    Element(XmlNode),
    Text(String),
}

#[derive(Debug, Clone)]
struct XmlNode {
    ns: Option<String>,
    local: String,
    attrs: Vec<XmlAttr>,
    children: Vec<XmlChild>,
}

/// A parsed XML part together with the namespace map queries resolve against.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    namespaces: Namespaces,
    root: XmlNode,
}

impl XmlDocument {
    pub fn parse(xml: &str, namespaces: &Namespaces) -> Result<Self, XmlError> {
        let root = build_tree(xml)?;
        Ok(Self {
            namespaces: namespaces.clone(),
            root,
        })
    }

    pub fn root(&self) -> Element<'_> {
        Element {
            namespaces: &self.namespaces,
            node: &self.root,
        }
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }
}

/// A borrowed view of one element, carrying the namespace map for queries.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    namespaces: &'a Namespaces,
    node: &'a XmlNode,
}

impl<'a> Element<'a> {
    fn wrap(&self, node: &'a XmlNode) -> Element<'a> {
        Element {
            namespaces: self.namespaces,
            node,
        }
    }

    pub fn local_name(&self) -> &'a str {
        &self.node.local
    }

    pub fn namespace(&self) -> Option<&'a str> {
        self.node.ns.as_deref()
    }

    /// Whether this element has the given qualified name.
    pub fn is(&self, qname: &str) -> bool {
        match self.namespaces.resolve(qname) {
            Some((ns, local)) => self.node.local == local && self.node.ns.as_deref() == ns,
            None => false,
        }
    }

    /// All element children, in document order.
    pub fn children(&self) -> impl Iterator<Item = Element<'a>> + 'a {
        let namespaces = self.namespaces;
        let node: &'a XmlNode = self.node;
        node.children.iter().filter_map(move |c| match c {
            XmlChild::Element(node) => Some(Element { namespaces, node }),
            XmlChild::Text(_) => None,
        })
    }

    pub fn children_named(&self, qname: &str) -> Vec<Element<'a>> {
        let Some((ns, local)) = self.namespaces.resolve(qname) else {
            return Vec::new();
        };
        self.node
            .children
            .iter()
            .filter_map(|c| match c {
                XmlChild::Element(n) if n.local == local && n.ns.as_deref() == ns => {
                    Some(self.wrap(n))
                }
                _ => None,
            })
            .collect()
    }

    pub fn child(&self, qname: &str) -> Option<Element<'a>> {
        let (ns, local) = self.namespaces.resolve(qname)?;
        self.node.children.iter().find_map(|c| match c {
            XmlChild::Element(n) if n.local == local && n.ns.as_deref() == ns => {
                Some(self.wrap(n))
            }
            _ => None,
        })
    }

    /// Follow a `/`-separated chain of child steps, e.g. `"w:rPr/w:rFonts"`.
    pub fn path(&self, path: &str) -> Option<Element<'a>> {
        path.split('/')
            .filter(|step| !step.is_empty())
            .try_fold(*self, |el, step| el.child(step))
    }

    /// Every descendant with the given name, depth-first in document order.
    pub fn descendants_named(&self, qname: &str) -> Vec<Element<'a>> {
        let mut out = Vec::new();
        if let Some((ns, local)) = self.namespaces.resolve(qname) {
            collect_descendants(self.node, ns, local, &mut |n| out.push(self.wrap(n)));
        }
        out
    }

    pub fn attr(&self, qname: &str) -> Option<&'a str> {
        let (ns, local) = self.namespaces.resolve(qname)?;
        self.node
            .attrs
            .iter()
            .find(|a| a.local == local && a.ns.as_deref() == ns)
            .map(|a| a.value.as_str())
    }

    /// Direct text children concatenated (no descendant text).
    pub fn own_text(&self) -> String {
        let mut s = String::new();
        for c in &self.node.children {
            if let XmlChild::Text(t) = c {
                s.push_str(t);
            }
        }
        s
    }

    /// All descendant text concatenated.
    pub fn text(&self) -> String {
        let mut s = String::new();
        collect_text(self.node, &mut s);
        s
    }
}

fn collect_descendants<'a>(
    node: &'a XmlNode,
    ns: Option<&str>,
    local: &str,
    push: &mut dyn FnMut(&'a XmlNode),
) {
    for c in &node.children {
        if let XmlChild::Element(n) = c {
            if n.local == local && n.ns.as_deref() == ns {
                push(n);
            }
            collect_descendants(n, ns, local, push);
        }
    }
}

fn collect_text(node: &XmlNode, out: &mut String) {
    for c in &node.children {
        match c {
            XmlChild::Text(t) => out.push_str(t),
            XmlChild::Element(n) => collect_text(n, out),
        }
    }
}

// ---------------------------------------------------------------------------
// Tree construction
// ---------------------------------------------------------------------------

/// In-scope `xmlns` declarations, one frame per open element.
struct ScopeStack {
    frames: Vec<Vec<(String, String)>>,
}

impl ScopeStack {
    fn lookup(&self, prefix: &str) -> Option<String> {
        if prefix == "xml" {
            return Some(NS_XML.to_string());
        }
        self.frames
            .iter()
            .rev()
            .flat_map(|f| f.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, u)| u.clone())
            .filter(|u| !u.is_empty())
    }
}

fn split_qname(raw: &str) -> (&str, &str) {
    match raw.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None => ("", raw),
    }
}

fn open_element(e: &BytesStart<'_>, scopes: &mut ScopeStack) -> XmlNode {
    let mut declared = Vec::new();
    let mut raw_attrs = Vec::new();

    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map(|v| v.to_string())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
        if key == "xmlns" {
            declared.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declared.push((prefix.to_string(), value));
        } else {
            raw_attrs.push((key, value));
        }
    }
    scopes.frames.push(declared);

    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let (prefix, local) = split_qname(&name);
    let ns = scopes.lookup(prefix);

    let attrs = raw_attrs
        .into_iter()
        .map(|(key, value)| {
            let (prefix, local) = split_qname(&key);
            // Unprefixed attributes are in no namespace.
            let ns = if prefix.is_empty() {
                None
            } else {
                scopes.lookup(prefix)
            };
            XmlAttr {
                ns,
                local: local.to_string(),
                value,
            }
        })
        .collect();

    XmlNode {
        ns,
        local: local.to_string(),
        attrs,
        children: Vec::new(),
    }
}

fn build_tree(xml: &str) -> Result<XmlNode, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut scopes = ScopeStack { frames: Vec::new() };
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let node = open_element(e, &mut scopes);
                stack.push(node);
            }
            Ok(Event::Empty(ref e)) => {
                let node = open_element(e, &mut scopes);
                scopes.frames.pop();
                attach(&mut stack, &mut root, node);
            }
            Ok(Event::End(_)) => {
                scopes.frames.pop();
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node);
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(parent) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map(|t| t.to_string())
                        .unwrap_or_else(|_| String::from_utf8_lossy(e).to_string());
                    parent.children.push(XmlChild::Text(text));
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(e).to_string();
                    parent.children.push(XmlChild::Text(text));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(XmlError::Malformed {
                    position,
                    message: e.to_string(),
                })
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::Unclosed(open.local.clone()));
    }
    root.ok_or(XmlError::Empty)
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlChild::Element(node)),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Attribute value helpers
// ---------------------------------------------------------------------------

/// `w:val` of a child element, e.g. `val_of(rpr, "w:sz")`.
pub fn val_of<'a>(parent: &Element<'a>, qname: &str) -> Option<&'a str> {
    parent.child(qname).and_then(|c| c.attr("w:val"))
}

/// An OOXML on/off property: present with no value (or `1`/`true`/`on`)
/// means on; `0`/`false`/`off`/`none` means off; absent means unset.
pub fn on_off(parent: &Element<'_>, qname: &str) -> Option<bool> {
    let el = parent.child(qname)?;
    Some(match el.attr("w:val") {
        None => true,
        Some(v) => !matches!(v, "0" | "false" | "off" | "none"),
    })
}

/// Parse an integer attribute, logging and dropping malformed values.
/// Values outside the 32-bit range OOXML allows are dropped as well.
pub fn int_attr(el: &Element<'_>, qname: &str) -> Option<i64> {
    let raw = el.attr(qname)?;
    let trimmed = raw.trim();
    let value = match trimmed.parse::<i64>() {
        Ok(v) => Some(v),
        // Some producers write fractional twips ("720.0").
        Err(_) => match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && f.abs() <= i32::MAX as f64 => Some(f.round() as i64),
            _ => None,
        },
    };
    match value {
        Some(v) if (i32::MIN as i64..=i32::MAX as i64).contains(&v) => Some(v),
        _ => {
            log::debug!("Ignoring invalid {}=\"{}\" on <{}>", qname, raw, el.local_name());
            None
        }
    }
}
