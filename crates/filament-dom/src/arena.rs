//! Node arena: flat storage for the tree.
//!
//! The arena owns every node ever created by a [`Document`](crate::Document).
//! Slots are never recycled, so a [`NodeId`] stays valid for the life of
//! the document even after its node has been detached from the tree. That
//! keeps identity simple for callers that hold on to nodes across
//! re-renders (captured child content, reconciled component elements).

/// Stable identity for a node within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// The payload of a node.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// An element with a tag name and insertion-ordered attributes.
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    /// A text node.
    Text(String),
    /// A comment node. Comments round-trip through serialization because
    /// they carry placeholder identifiers for the component engine.
    Comment(String),
}

#[derive(Debug)]
pub(crate) struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Separate child list for a shadow subtree. Not serialized and not
    /// reached by selectors; the shadow root's parent is the host.
    pub shadow: Option<NodeId>,
}

#[derive(Debug, Default)]
pub(crate) struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
            shadow: None,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Unlinks `id` from its parent's child list. No-op when detached.
    pub fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            let siblings = &mut self.nodes[parent.0].children;
            if let Some(pos) = siblings.iter().position(|c| *c == id) {
                siblings.remove(pos);
            } else if self.nodes[parent.0].shadow == Some(id) {
                self.nodes[parent.0].shadow = None;
            }
        }
    }

    pub fn link(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        debug_assert!(self.nodes[child.0].parent.is_none(), "child must be detached");
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        match index {
            Some(i) if i <= children.len() => children.insert(i, child),
            _ => children.push(child),
        }
    }

    /// Walks the subtree rooted at `id` in document order, including `id`
    /// itself. Shadow subtrees are included (they participate in
    /// connectedness) after the host's light children.
    pub fn walk(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for child in self.nodes[id.0].children.clone() {
            self.walk(child, out);
        }
        if let Some(shadow) = self.nodes[id.0].shadow {
            self.walk(shadow, out);
        }
    }

    /// Like [`Arena::walk`] but stays in the light tree. Selectors and
    /// serialization never cross a shadow boundary.
    pub fn walk_light(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for child in self.nodes[id.0].children.clone() {
            self.walk_light(child, out);
        }
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node.0].parent {
                Some(p) => node = p,
                None => return false,
            }
        }
    }
}
