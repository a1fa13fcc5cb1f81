//! Per-component styling.
//!
//! Two hooks, both optional:
//!
//! - [`Component::stylesheet`](crate::Component::stylesheet) returns CSS
//!   text, computed once per registration and injected as a `<style>`
//!   first child on every committed render.
//! - [`Component::styles`](crate::Component::styles) returns named
//!   declaration maps. Rendered elements carrying a `styles="a b"`
//!   attribute get the listed maps flattened into their `style`
//!   attribute, camelCase property names kebab-cased on the way out.

use filament_dom::{Document, NodeId};
use indexmap::IndexMap;

use crate::props::kebab_case;

/// Named inline-style maps: name → (css property → value).
pub type StyleMap = IndexMap<String, IndexMap<String, String>>;

/// Flattens the maps named in a `styles` attribute value into one
/// `style` string. Unknown names are skipped.
pub(crate) fn inline_style(maps: &StyleMap, tokens: &str) -> String {
    let mut out = String::new();
    for token in tokens.split_whitespace() {
        let Some(decls) = maps.get(token) else { continue };
        for (prop, value) in decls {
            if !out.is_empty() {
                out.push_str("; ");
            }
            out.push_str(&kebab_case(prop));
            out.push_str(": ");
            out.push_str(value);
        }
    }
    out
}

/// Applies inline styles through the given subtrees (detached render
/// output, before commit).
pub(crate) fn apply_inline(doc: &Document, roots: &[NodeId], maps: &StyleMap) {
    for root in roots {
        apply_subtree(doc, *root, maps);
    }
}

fn apply_subtree(doc: &Document, node: NodeId, maps: &StyleMap) {
    if doc.is_element(node) {
        if let Some(tokens) = doc.get_attribute(node, "styles") {
            let style = inline_style(maps, &tokens);
            if !style.is_empty() {
                doc.set_attribute(node, "style", style);
            }
        }
        for child in doc.children(node) {
            apply_subtree(doc, child, maps);
        }
    }
}
