// HTML document model for pages moving between the editor and the API.
//
// Documents carry an identity (`DocumentId`) that survives cloning. The
// cache-key cache keys its entries on that identity, so an edited copy
// that should not reuse a prepared serialisation must be `fork`ed.

mod parse;
mod render;

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

pub use parse::parse_fragment;
pub use render::{render_nodes, DOCTYPE};

/// Elements that never have children or a closing tag.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text, not markup.
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(crate) fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub(crate) fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document has more than one `{0}` element")]
    DuplicateRoot(&'static str),
}

/// Identity of a document for cache-key purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Element attributes in source order.
#[derive(Debug, Clone, Default, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Replace the value in place if the attribute exists, else append.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(index).1)
    }

    /// Copy every attribute of `other` onto this set.
    pub fn copy_from(&mut self, other: &Attributes) {
        for (name, value) in other.iter() {
            self.set(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Attribute sets compare without regard to order.
impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.iter().all(|(name, value)| other.get(name) == Some(value))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (name, value) in iter {
            attrs.set(name, value);
        }
        attrs
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Attributes,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attrs: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.set(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }
}

/// A DOM node. Equality follows `isEqualNode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Concatenated text a reader would see. Script and style bodies,
    /// comments, and elements hidden with `hidden` or an inline
    /// `display: none` contribute nothing.
    pub fn visible_text(&self) -> String {
        let mut out = String::new();
        collect_visible_text(self, &mut out);
        out
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

fn collect_visible_text(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(text),
        Node::Comment(_) => {}
        Node::Element(element) => {
            if is_raw_text(&element.name) || is_hidden(element) {
                return;
            }
            for child in &element.children {
                collect_visible_text(child, out);
            }
        }
    }
}

fn is_hidden(element: &Element) -> bool {
    if element.attrs.get("hidden").is_some() {
        return true;
    }
    element.attrs.get("style").is_some_and(|style| {
        style.split(';').any(|decl| {
            let mut parts = decl.splitn(2, ':');
            let prop = parts.next().unwrap_or("").trim();
            let value = parts.next().unwrap_or("").trim();
            prop.eq_ignore_ascii_case("display") && value.eq_ignore_ascii_case("none")
        })
    })
}

/// A full HTML document split into its root parts.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    id: DocumentId,
    pub html_attrs: Attributes,
    pub head_attrs: Attributes,
    pub head: Vec<Node>,
    pub body_attrs: Attributes,
    pub body: Vec<Node>,
}

impl HtmlDocument {
    pub fn new() -> Self {
        Self {
            id: DocumentId::new(),
            html_attrs: Attributes::new(),
            head_attrs: Attributes::new(),
            head: Vec::new(),
            body_attrs: Attributes::new(),
            body: Vec::new(),
        }
    }

    pub fn from_body(body: Vec<Node>) -> Self {
        Self { body, ..Self::new() }
    }

    /// Parse a complete document (or a bare fragment, which becomes the body).
    pub fn parse(html: &str) -> Result<Self, DocumentError> {
        parse::parse_document(html)
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Same content under a fresh identity.
    pub fn fork(&self) -> Self {
        Self { id: DocumentId::new(), ..self.clone() }
    }

    /// `<!doctype html>` followed by the serialised `html` element.
    pub fn to_html(&self) -> String {
        render::render_document(self)
    }

    /// Build the HTML to send for `self`, an editor-produced document:
    /// the head children of `loaded` are appended to this document's head,
    /// and the attributes of its `html`, `head` and `body` elements are
    /// copied over (the editor's conversion drops them).
    pub fn transplant_from(mut self, loaded: &HtmlDocument) -> Self {
        self.head.extend(loaded.head.iter().cloned());
        self.html_attrs.copy_from(&loaded.html_attrs);
        self.head_attrs.copy_from(&loaded.head_attrs);
        self.body_attrs.copy_from(&loaded.body_attrs);
        self
    }
}

impl Default for HtmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Content equality; identity is ignored.
impl PartialEq for HtmlDocument {
    fn eq(&self, other: &Self) -> bool {
        self.html_attrs == other.html_attrs
            && self.head_attrs == other.head_attrs
            && self.head == other.head
            && self.body_attrs == other.body_attrs
            && self.body == other.body
    }
}
