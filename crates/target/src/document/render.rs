// HTML serialisation.

use super::{is_raw_text, is_void, Attributes, Element, HtmlDocument, Node};

pub const DOCTYPE: &str = "<!doctype html>";

pub(super) fn render_document(doc: &HtmlDocument) -> String {
    let mut out = String::from(DOCTYPE);
    out.push_str("<html");
    push_attributes(&mut out, &doc.html_attrs);
    out.push_str("><head");
    push_attributes(&mut out, &doc.head_attrs);
    out.push('>');
    push_nodes(&mut out, &doc.head, false);
    out.push_str("</head><body");
    push_attributes(&mut out, &doc.body_attrs);
    out.push('>');
    push_nodes(&mut out, &doc.body, false);
    out.push_str("</body></html>");
    out
}

/// Serialise a node list the way `innerHTML` would.
pub fn render_nodes(nodes: &[Node]) -> String {
    let mut out = String::new();
    push_nodes(&mut out, nodes, false);
    out
}

fn push_nodes(out: &mut String, nodes: &[Node], raw: bool) {
    for node in nodes {
        match node {
            Node::Text(text) if raw => out.push_str(text),
            Node::Text(text) => push_escaped_text(out, text),
            Node::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            Node::Element(element) => push_element(out, element),
        }
    }
}

fn push_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    push_attributes(out, &element.attrs);
    out.push('>');
    if is_void(&element.name) {
        return;
    }
    push_nodes(out, &element.children, is_raw_text(&element.name));
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn push_attributes(out: &mut String, attrs: &Attributes) {
    for (name, value) in attrs.iter() {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        for c in value.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '"' => out.push_str("&quot;"),
                c => out.push(c),
            }
        }
        out.push('"');
    }
}

fn push_escaped_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}
