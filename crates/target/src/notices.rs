// Edit notices shown above the editor.

use std::collections::BTreeMap;

use crate::document::{parse_fragment, Element, Node};

/// Merge remote notices with local messages (each wrapped in `<p>`) and
/// keep those with visible text, indexed by their position in the merged
/// list.
pub fn visible_notices(remote: &[String], local_messages: &[String]) -> BTreeMap<usize, String> {
    let local = local_messages.iter().map(|message| format!("<p>{message}</p>"));
    remote
        .iter()
        .cloned()
        .chain(local)
        .enumerate()
        .filter(|(_, html)| has_visible_text(html))
        .collect()
}

fn has_visible_text(html: &str) -> bool {
    let container = Node::from(Element {
        children: parse_fragment(html),
        ..Element::new("div")
    });
    !container.visible_text().trim().is_empty()
}
