// Initial state of the minor-edit and watch checkboxes.
//
// The parse reply carries the checkboxes as HTML with no `checked` state;
// it is set here from the user's preferences.

use crate::document::{parse_fragment, render_nodes, Node};

pub const MINOR_EDIT_ID: &str = "wpMinoredit";
pub const WATCH_ID: &str = "wpWatchthis";

/// The user options that decide which checkboxes start checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckboxDefaults {
    /// `minordefault`
    pub minor_default: bool,
    /// `watchdefault`
    pub watch_default: bool,
    /// `watchcreations`, which only applies to pages that don't exist yet.
    pub watch_creations: bool,
    /// The page is already on the user's watchlist.
    pub page_watched: bool,
}

impl CheckboxDefaults {
    pub fn minor(&self) -> bool {
        self.minor_default
    }

    pub fn watch(&self, page_exists: bool) -> bool {
        self.watch_default || (self.watch_creations && !page_exists) || self.page_watched
    }
}

/// Set or clear `checked` on the top-level minor-edit and watch inputs of
/// each checkbox snippet. Other snippets are returned unchanged.
pub fn apply_defaults(
    checkboxes: &[String],
    defaults: &CheckboxDefaults,
    page_exists: bool,
) -> Vec<String> {
    checkboxes
        .iter()
        .map(|html| {
            let mut nodes = parse_fragment(html);
            let mut touched = false;
            for node in &mut nodes {
                let Node::Element(element) = node else { continue };
                let checked = match element.attrs.get("id") {
                    Some(MINOR_EDIT_ID) => defaults.minor(),
                    Some(WATCH_ID) => defaults.watch(page_exists),
                    _ => continue,
                };
                if checked {
                    element.attrs.set("checked", "checked");
                } else {
                    element.attrs.remove("checked");
                }
                touched = true;
            }
            if touched {
                render_nodes(&nodes)
            } else {
                html.clone()
            }
        })
        .collect()
}
