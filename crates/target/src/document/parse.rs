// Tolerant HTML parser.
//
// Handles the markup Parsoid and the editor produce: well-nested elements,
// void and self-closing tags, raw-text `script`/`style`, comments, doctype,
// and the common character references. It does not implement the HTML5
// insertion modes (implied end tags, foster parenting and so on); stray
// end tags are dropped and open elements close at end of input.

use super::{is_raw_text, is_void, Attributes, DocumentError, Element, HtmlDocument, Node};

/// Parse markup into a list of top-level nodes.
pub fn parse_fragment(html: &str) -> Vec<Node> {
    let mut builder = TreeBuilder::default();
    Tokenizer { input: html, pos: 0 }.run(&mut builder);
    builder.finish()
}

pub(super) fn parse_document(html: &str) -> Result<HtmlDocument, DocumentError> {
    let roots = parse_fragment(html);
    let mut doc = HtmlDocument::new();
    let mut parts = RootParts {
        structured: roots.iter().any(|node| {
            node.as_element().is_some_and(|e| matches!(e.name.as_str(), "html" | "head" | "body"))
        }),
        ..RootParts::default()
    };

    for node in roots {
        match node {
            Node::Element(element) if element.name == "html" => {
                if parts.seen_html {
                    return Err(DocumentError::DuplicateRoot("html"));
                }
                parts.seen_html = true;
                doc.html_attrs = element.attrs;
                for child in element.children {
                    parts.place(&mut doc, child)?;
                }
            }
            other => parts.place(&mut doc, other)?,
        }
    }
    Ok(doc)
}

#[derive(Default)]
struct RootParts {
    /// The markup spells out at least one of `html`, `head` or `body`.
    structured: bool,
    seen_html: bool,
    seen_head: bool,
    seen_body: bool,
}

impl RootParts {
    fn place(&mut self, doc: &mut HtmlDocument, node: Node) -> Result<(), DocumentError> {
        match node {
            Node::Element(element) if element.name == "head" => {
                if self.seen_head {
                    return Err(DocumentError::DuplicateRoot("head"));
                }
                self.seen_head = true;
                doc.head_attrs = element.attrs;
                doc.head = element.children;
            }
            Node::Element(element) if element.name == "body" => {
                if self.seen_body {
                    return Err(DocumentError::DuplicateRoot("body"));
                }
                self.seen_body = true;
                doc.body_attrs = element.attrs;
                doc.body.extend(element.children);
            }
            // Inter-element whitespace and comments around the root
            // elements are not content.
            Node::Text(text) if self.structured && text.trim().is_empty() => {}
            Node::Comment(_) if self.structured => {}
            other => doc.body.push(other),
        }
        Ok(())
    }
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Element>,
    roots: Vec<Node>,
}

impl TreeBuilder {
    fn push_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn push_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        let siblings = match self.stack.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        };
        if let Some(Node::Text(previous)) = siblings.last_mut() {
            previous.push_str(&text);
        } else {
            siblings.push(Node::Text(text));
        }
    }

    fn open(&mut self, element: Element, self_closing: bool) {
        if self_closing || is_void(&element.name) {
            self.push_node(Node::Element(element));
        } else {
            self.stack.push(element);
        }
    }

    fn close(&mut self, name: &str) {
        let Some(pos) = self.stack.iter().rposition(|element| element.name == name) else {
            return;
        };
        while self.stack.len() > pos {
            if let Some(element) = self.stack.pop() {
                self.push_node(Node::Element(element));
            }
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while let Some(element) = self.stack.pop() {
            self.push_node(Node::Element(element));
        }
        self.roots
    }
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn run(&mut self, builder: &mut TreeBuilder) {
        while self.pos < self.input.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                let body = &rest[4..];
                match body.find("-->") {
                    Some(end) => {
                        builder.push_node(Node::Comment(body[..end].to_string()));
                        self.pos += 4 + end + 3;
                    }
                    None => {
                        builder.push_node(Node::Comment(body.to_string()));
                        self.pos = self.input.len();
                    }
                }
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_past('>');
            } else if rest.starts_with("</") {
                self.pos += 2;
                let name = self.read_name();
                self.skip_past('>');
                if !name.is_empty() {
                    builder.close(&name);
                }
            } else if starts_tag(rest) {
                self.pos += 1;
                self.read_start_tag(builder);
            } else {
                let end = next_markup(rest).unwrap_or(rest.len());
                builder.push_text(decode_entities(&rest[..end]));
                self.pos += end;
            }
        }
    }

    fn read_start_tag(&mut self, builder: &mut TreeBuilder) {
        let name = self.read_name();
        let mut element = Element::new(name);
        let self_closing = self.read_attributes(&mut element.attrs);

        if is_raw_text(&element.name) && !self_closing {
            let rest = self.rest();
            let end = find_ascii_case_insensitive(rest, &format!("</{}", element.name));
            let raw = &rest[..end.unwrap_or(rest.len())];
            if !raw.is_empty() {
                element.children.push(Node::Text(raw.to_string()));
            }
            self.pos += raw.len();
            if end.is_some() {
                self.skip_past('>');
            }
            builder.push_node(Node::Element(element));
            return;
        }

        builder.open(element, self_closing);
    }

    /// Returns true when the tag ended with `/>`.
    fn read_attributes(&mut self, attrs: &mut Attributes) -> bool {
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return false;
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                return true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return false;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }

            let name_len = rest
                .find(|c: char| c.is_ascii_whitespace() || c == '=' || c == '>' || c == '/')
                .unwrap_or(rest.len());
            let name = rest[..name_len].to_ascii_lowercase();
            self.pos += name_len;
            self.skip_whitespace();

            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.read_attribute_value()
            } else {
                String::new()
            };
            if !name.is_empty() && attrs.get(&name).is_none() {
                attrs.set(name, value);
            }
        }
    }

    fn read_attribute_value(&mut self) -> String {
        let rest = self.rest();
        let quote = match rest.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => {
                let end = rest
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                self.pos += end;
                return decode_entities(&rest[..end]);
            }
        };
        let body = &rest[1..];
        match body.find(quote) {
            Some(end) => {
                self.pos += 1 + end + 1;
                decode_entities(&body[..end])
            }
            None => {
                self.pos = self.input.len();
                decode_entities(body)
            }
        }
    }

    fn read_name(&mut self) -> String {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        self.pos += end;
        rest[..end].to_ascii_lowercase()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start_matches(|c: char| c.is_ascii_whitespace());
        self.pos += rest.len() - trimmed.len();
    }

    fn skip_past(&mut self, delimiter: char) {
        match self.rest().find(delimiter) {
            Some(idx) => self.pos += idx + delimiter.len_utf8(),
            None => self.pos = self.input.len(),
        }
    }
}

fn starts_tag(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

/// Offset of the next `<` that opens markup; a lone `<` is text.
fn next_markup(s: &str) -> Option<usize> {
    s.char_indices().skip(1).find_map(|(idx, c)| {
        if c != '<' {
            return None;
        }
        let tail = &s[idx..];
        let opens = starts_tag(tail)
            || tail.starts_with("</")
            || tail.starts_with("<!")
            || tail.starts_with("<?");
        opens.then_some(idx)
    })
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Decode the character references that appear in Parsoid output.
/// Unknown references are kept verbatim.
pub(crate) fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').filter(|&semi| semi <= 12).and_then(|semi| {
            decode_reference(&tail[1..semi]).map(|decoded| (decoded, semi))
        }) {
            Some((decoded, semi)) => {
                out.push(decoded);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}
