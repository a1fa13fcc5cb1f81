//! Markup serialization.

use crate::arena::{Arena, NodeData, NodeId};
use crate::parse::is_void;

/// Escapes text-node content.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Escapes an attribute value for double-quoted emission.
pub fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn serialize_node(arena: &Arena, id: NodeId, out: &mut String) {
    match &arena.node(id).data {
        NodeData::Text(text) => out.push_str(&escape_text(text)),
        NodeData::Comment(body) => {
            out.push_str("<!--");
            out.push_str(body);
            out.push_str("-->");
        }
        NodeData::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
            }
            out.push('>');
            if is_void(tag) {
                return;
            }
            // Shadow subtrees are intentionally not serialized.
            for child in &arena.node(id).children {
                serialize_node(arena, *child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

pub(crate) fn serialize_children(arena: &Arena, id: NodeId, out: &mut String) {
    for child in &arena.node(id).children {
        serialize_node(arena, *child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes() {
        assert_eq!(escape_text("a<b>&c"), "a&lt;b&gt;&amp;c");
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
    }
}
