//! Small selector subset for querying the tree.
//!
//! Supported: compound selectors of `tag`, `#id` and `.class`, joined by
//! descendant whitespace (`body .app div.item`). Nothing else — no
//! combinators, no pseudo-classes. Unsupported syntax simply fails to
//! match.

use crate::arena::{Arena, NodeData, NodeId};

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

pub(crate) fn parse_selector(selector: &str) -> Vec<Compound> {
    selector.split_whitespace().map(parse_compound).collect()
}

fn parse_compound(part: &str) -> Compound {
    let mut compound = Compound::default();
    let mut rest = part;
    while !rest.is_empty() {
        let (kind, tail) = match rest.as_bytes()[0] {
            b'#' => ('#', &rest[1..]),
            b'.' => ('.', &rest[1..]),
            _ => ('t', rest),
        };
        let end = tail
            .find(|c| c == '#' || c == '.')
            .unwrap_or(tail.len());
        let name = &tail[..end];
        match kind {
            '#' => compound.id = Some(name.to_string()),
            '.' => compound.classes.push(name.to_string()),
            _ => compound.tag = Some(name.to_ascii_lowercase()),
        }
        rest = &tail[end..];
    }
    compound
}

fn matches_compound(arena: &Arena, id: NodeId, compound: &Compound) -> bool {
    let NodeData::Element { tag, attrs } = &arena.node(id).data else {
        return false;
    };
    if let Some(want) = &compound.tag {
        if tag != want {
            return false;
        }
    }
    if let Some(want) = &compound.id {
        let found = attrs.iter().any(|(n, v)| n == "id" && v == want);
        if !found {
            return false;
        }
    }
    if !compound.classes.is_empty() {
        let class_attr = attrs
            .iter()
            .find(|(n, _)| n == "class")
            .map(|(_, v)| v.as_str())
            .unwrap_or("");
        let classes: Vec<&str> = class_attr.split_whitespace().collect();
        if !compound.classes.iter().all(|c| classes.contains(&c.as_str())) {
            return false;
        }
    }
    true
}

/// True when `id` matches the last compound and its ancestors (up to
/// and including `scope`) match the preceding compounds in order.
pub(crate) fn matches_chain(arena: &Arena, scope: NodeId, id: NodeId, chain: &[Compound]) -> bool {
    let (last, ancestor_chain) = chain.split_last().expect("chain is non-empty");
    if !matches_compound(arena, id, last) {
        return false;
    }
    // Greedily consume the remaining compounds right-to-left while
    // walking up to (and including) the scope element.
    let mut remaining = ancestor_chain;
    let mut current = id;
    while !remaining.is_empty() {
        let Some(parent) = arena.node(current).parent else {
            return false;
        };
        current = parent;
        if matches_compound(arena, current, remaining.last().expect("non-empty")) {
            remaining = &remaining[..remaining.len() - 1];
        }
        if current == scope {
            break;
        }
    }
    remaining.is_empty()
}
