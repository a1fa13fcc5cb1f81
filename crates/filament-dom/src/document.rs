//! The document: node ownership, tree mutation, tag reactors, scheduling.
//!
//! Mutation methods come in two flavors:
//!
//! - Notifying: [`Document::append_child`], [`Document::remove`],
//!   [`Document::replace_children`], [`Document::set_inner_html`]. These
//!   queue connected/disconnected notifications for registered tags and
//!   drain the queue once the arena borrow is released.
//! - Silent: [`Document::detach`] and everything that builds detached
//!   subtrees. A caller that moves a node and re-inserts it within one
//!   logical operation uses `detach` so the move is not observed as a
//!   disconnect.
//!
//! Reactors run strictly outside the arena borrow and may mutate the
//! tree re-entrantly; nested mutations drain the shared queue to
//! completion, so by the time an outer mutation returns, every reaction
//! it transitively caused has run.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::arena::{Arena, NodeData, NodeId};
use crate::parse::{parse_fragment, ParsedNode};
use crate::schedule::Scheduler;
use crate::selector::{matches_chain, parse_selector};
use crate::serialize::{serialize_children, serialize_node};

/// Callbacks bound to a tag via [`Document::define`].
pub trait ElementReactor {
    /// A matching element entered the connected tree.
    fn connected(&self, doc: &Document, node: NodeId);
    /// A matching element left the connected tree.
    fn disconnected(&self, doc: &Document, node: NodeId);
}

enum Reaction {
    Connected(NodeId),
    Disconnected(NodeId),
}

struct DocInner {
    arena: RefCell<Arena>,
    body: NodeId,
    reactors: RefCell<HashMap<String, Rc<dyn ElementReactor>>>,
    reactions: RefCell<VecDeque<(String, Reaction)>>,
    scheduler: RefCell<Scheduler>,
}

/// Handle over one node arena. Clones share the same document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocInner>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut arena = Arena::default();
        let body = arena.alloc(NodeData::Element { tag: "body".into(), attrs: Vec::new() });
        Document {
            inner: Rc::new(DocInner {
                arena: RefCell::new(arena),
                body,
                reactors: RefCell::new(HashMap::new()),
                reactions: RefCell::new(VecDeque::new()),
                scheduler: RefCell::new(Scheduler::default()),
            }),
        }
    }

    /// The connected root. A node is "connected" when its ancestor chain
    /// reaches this element.
    pub fn body(&self) -> NodeId {
        self.inner.body
    }

    // ------------------------------------------------------------------
    // Node creation and inspection
    // ------------------------------------------------------------------

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner.arena.borrow_mut().alloc(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&self, text: impl Into<String>) -> NodeId {
        self.inner.arena.borrow_mut().alloc(NodeData::Text(text.into()))
    }

    pub fn create_comment(&self, body: impl Into<String>) -> NodeId {
        self.inner.arena.borrow_mut().alloc(NodeData::Comment(body.into()))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<String> {
        match &self.inner.arena.borrow().node(id).data {
            NodeData::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    pub fn comment_text(&self, id: NodeId) -> Option<String> {
        match &self.inner.arena.borrow().node(id).data {
            NodeData::Comment(body) => Some(body.clone()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.inner.arena.borrow().node(id).data, NodeData::Element { .. })
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.inner.arena.borrow().node(id).children.clone()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.inner.arena.borrow().node(id).parent
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        let arena = self.inner.arena.borrow();
        arena.is_ancestor_of(self.inner.body, id)
    }

    /// Concatenated descendant text, light tree only.
    pub fn text_content(&self, id: NodeId) -> String {
        fn collect(arena: &Arena, id: NodeId, out: &mut String) {
            match &arena.node(id).data {
                NodeData::Text(t) => out.push_str(t),
                NodeData::Comment(_) => {}
                NodeData::Element { .. } => {
                    for child in &arena.node(id).children {
                        collect(arena, *child, out);
                    }
                }
            }
        }
        let arena = self.inner.arena.borrow();
        let mut out = String::new();
        collect(&arena, id, &mut out);
        out
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn attributes(&self, id: NodeId) -> Vec<(String, String)> {
        match &self.inner.arena.borrow().node(id).data {
            NodeData::Element { attrs, .. } => attrs.clone(),
            _ => Vec::new(),
        }
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        match &self.inner.arena.borrow().node(id).data {
            NodeData::Element { attrs, .. } => {
                attrs.iter().find(|(n, _)| *n == name).map(|(_, v)| v.clone())
            }
            _ => None,
        }
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    pub fn set_attribute(&self, id: NodeId, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if let NodeData::Element { attrs, .. } = &mut self.inner.arena.borrow_mut().node_mut(id).data {
            match attrs.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = value,
                None => attrs.push((name, value)),
            }
        }
    }

    pub fn remove_attribute(&self, id: NodeId, name: &str) {
        let name = name.to_ascii_lowercase();
        if let NodeData::Element { attrs, .. } = &mut self.inner.arena.borrow_mut().node_mut(id).data {
            attrs.retain(|(n, _)| *n != name);
        }
    }

    /// Replaces the whole attribute list, preserving the given order.
    pub fn set_attributes(&self, id: NodeId, new_attrs: Vec<(String, String)>) {
        if let NodeData::Element { attrs, .. } = &mut self.inner.arena.borrow_mut().node_mut(id).data {
            *attrs = new_attrs
                .into_iter()
                .map(|(n, v)| (n.to_ascii_lowercase(), v))
                .collect();
        }
    }

    // ------------------------------------------------------------------
    // Tree mutation
    // ------------------------------------------------------------------

    /// Unlinks a node without notifications. For moves that re-insert the
    /// node within the same logical operation.
    pub fn detach(&self, id: NodeId) {
        self.inner.arena.borrow_mut().unlink(id);
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Inserts `child` before `reference` (or at the end). Notifies for
    /// the child subtree when the parent is connected.
    pub fn insert_before(&self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        {
            let mut arena = self.inner.arena.borrow_mut();
            arena.unlink(child);
            let index = reference
                .and_then(|r| arena.node(parent).children.iter().position(|c| *c == r));
            arena.link(parent, child, index);
            if arena.is_ancestor_of(self.inner.body, parent) {
                self.queue_subtree(&arena, child, true);
            }
        }
        self.drain_reactions();
    }

    /// Removes a node, notifying registered tags in its subtree.
    pub fn remove(&self, id: NodeId) {
        {
            let mut arena = self.inner.arena.borrow_mut();
            let was_connected = arena.is_ancestor_of(self.inner.body, id);
            arena.unlink(id);
            if was_connected {
                self.queue_subtree(&arena, id, false);
            }
        }
        self.drain_reactions();
    }

    /// Atomically replaces `parent`'s children. Old children that are no
    /// longer connected afterwards get disconnect notifications; every
    /// new child subtree gets connect notifications (reactors are
    /// expected to treat a re-notification of a live element as a no-op).
    pub fn replace_children(&self, parent: NodeId, new_children: Vec<NodeId>) {
        {
            let mut arena = self.inner.arena.borrow_mut();
            let old: Vec<NodeId> = arena.node(parent).children.clone();
            for child in &old {
                arena.unlink(*child);
            }
            for child in &new_children {
                arena.unlink(*child);
            }
            for child in &new_children {
                arena.link(parent, *child, None);
            }
            let parent_connected = arena.is_ancestor_of(self.inner.body, parent);
            if parent_connected {
                for child in old {
                    if !arena.is_ancestor_of(self.inner.body, child) {
                        self.queue_subtree(&arena, child, false);
                    }
                }
                for child in &new_children {
                    self.queue_subtree(&arena, *child, true);
                }
            }
        }
        self.drain_reactions();
    }

    /// Parses markup into detached nodes owned by this document.
    pub fn create_fragment(&self, markup: &str) -> Vec<NodeId> {
        let parsed = parse_fragment(markup);
        let mut arena = self.inner.arena.borrow_mut();
        parsed.into_iter().map(|n| instantiate(&mut arena, n)).collect()
    }

    pub fn set_inner_html(&self, id: NodeId, markup: &str) {
        let nodes = self.create_fragment(markup);
        self.replace_children(id, nodes);
    }

    pub fn set_body_html(&self, markup: &str) {
        self.set_inner_html(self.inner.body, markup);
    }

    // ------------------------------------------------------------------
    // Shadow subtrees
    // ------------------------------------------------------------------

    /// Attaches (or returns the existing) shadow root for `host`. Shadow
    /// content is connected through the host but is invisible to
    /// serialization and selectors rooted outside it.
    pub fn attach_shadow(&self, host: NodeId) -> NodeId {
        if let Some(existing) = self.shadow_root(host) {
            return existing;
        }
        let mut arena = self.inner.arena.borrow_mut();
        let root = arena.alloc(NodeData::Element { tag: "shadow-root".into(), attrs: Vec::new() });
        arena.node_mut(root).parent = Some(host);
        arena.node_mut(host).shadow = Some(root);
        root
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.inner.arena.borrow().node(host).shadow
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    pub fn inner_html(&self, id: NodeId) -> String {
        let arena = self.inner.arena.borrow();
        let mut out = String::new();
        serialize_children(&arena, id, &mut out);
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let arena = self.inner.arena.borrow();
        let mut out = String::new();
        serialize_node(&arena, id, &mut out);
        out
    }

    pub fn body_html(&self) -> String {
        self.inner_html(self.inner.body)
    }

    // ------------------------------------------------------------------
    // Selectors
    // ------------------------------------------------------------------

    pub fn query_selector(&self, selector: &str) -> Option<NodeId> {
        self.query_selector_in(self.inner.body, selector).into_iter().next()
    }

    pub fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        self.query_selector_in(self.inner.body, selector)
    }

    /// Matches within `root`'s subtree (excluding `root` itself), in
    /// document order.
    pub fn query_selector_in(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let chain = parse_selector(selector);
        if chain.is_empty() {
            return Vec::new();
        }
        let arena = self.inner.arena.borrow();
        let mut all = Vec::new();
        for child in arena.node(root).children.clone() {
            arena.walk_light(child, &mut all);
        }
        all.into_iter()
            .filter(|id| matches_chain(&arena, root, *id, &chain))
            .collect()
    }

    pub fn get_element_by_id(&self, id_value: &str) -> Option<NodeId> {
        self.query_selector(&format!("#{}", id_value))
    }

    pub fn get_elements_by_tag_name(&self, tag: &str) -> Vec<NodeId> {
        self.query_selector_all(tag)
    }

    // ------------------------------------------------------------------
    // Tag registration
    // ------------------------------------------------------------------

    /// Binds `tag` to a reactor. Returns `false` (and keeps the existing
    /// binding) when the tag is already defined. Elements with this tag
    /// already in the connected tree are notified in document order.
    pub fn define(&self, tag: &str, reactor: Rc<dyn ElementReactor>) -> bool {
        let tag = tag.to_ascii_lowercase();
        {
            let mut reactors = self.inner.reactors.borrow_mut();
            if reactors.contains_key(&tag) {
                return false;
            }
            reactors.insert(tag.clone(), reactor);
        }
        {
            let arena = self.inner.arena.borrow();
            let mut all = Vec::new();
            arena.walk(self.inner.body, &mut all);
            let mut queue = self.inner.reactions.borrow_mut();
            for id in all {
                if let NodeData::Element { tag: t, .. } = &arena.node(id).data {
                    if *t == tag {
                        queue.push_back((tag.clone(), Reaction::Connected(id)));
                    }
                }
            }
        }
        self.drain_reactions();
        true
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.inner.reactors.borrow().contains_key(&tag.to_ascii_lowercase())
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    pub fn request_frame(&self, cb: impl FnOnce(&Document) + 'static) {
        self.inner.scheduler.borrow_mut().push_frame(Box::new(cb));
    }

    pub fn set_timeout(&self, delay_ms: u64, cb: impl FnOnce(&Document) + 'static) {
        self.inner.scheduler.borrow_mut().push_timer(delay_ms, Box::new(cb));
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.inner.scheduler.borrow().now()
    }

    /// Runs the current frame batch. Frames scheduled during the batch
    /// wait for the next call.
    pub fn next_frame(&self) {
        let frames = self.inner.scheduler.borrow_mut().take_frames();
        for cb in frames {
            cb(self);
            self.drain_reactions();
        }
    }

    /// Advances the virtual clock by `ms`, firing due timers in deadline
    /// order and draining frame batches along the way.
    pub fn advance(&self, ms: u64) {
        let target = self.inner.scheduler.borrow().now().saturating_add(ms);
        loop {
            let cb = self.inner.scheduler.borrow_mut().pop_due(target);
            match cb {
                Some(cb) => {
                    cb(self);
                    self.drain_reactions();
                    while self.inner.scheduler.borrow().has_frames() {
                        self.next_frame();
                    }
                }
                None => break,
            }
        }
        self.inner.scheduler.borrow_mut().settle(target);
        while self.inner.scheduler.borrow().has_frames() {
            self.next_frame();
        }
    }

    /// Pumps frames and timers until both queues are empty, advancing the
    /// clock as far as the latest timer deadline.
    pub fn run_until_stalled(&self) {
        loop {
            while self.inner.scheduler.borrow().has_frames() {
                self.next_frame();
            }
            let deadline = self.inner.scheduler.borrow().next_deadline();
            match deadline {
                Some(d) => {
                    let now = self.inner.scheduler.borrow().now();
                    self.advance(d.saturating_sub(now));
                }
                None => break,
            }
        }
    }

    // ------------------------------------------------------------------
    // Reaction plumbing
    // ------------------------------------------------------------------

    /// Queues connect/disconnect reactions for registered tags in the
    /// subtree at `root`, in document order. Caller holds the arena
    /// borrow; reactions run later, from `drain_reactions`.
    fn queue_subtree(&self, arena: &Arena, root: NodeId, connected: bool) {
        let reactors = self.inner.reactors.borrow();
        if reactors.is_empty() {
            return;
        }
        let mut all = Vec::new();
        arena.walk(root, &mut all);
        let mut queue = self.inner.reactions.borrow_mut();
        for id in all {
            if let NodeData::Element { tag, .. } = &arena.node(id).data {
                if reactors.contains_key(tag) {
                    let reaction = if connected {
                        Reaction::Connected(id)
                    } else {
                        Reaction::Disconnected(id)
                    };
                    queue.push_back((tag.clone(), reaction));
                }
            }
        }
    }

    fn drain_reactions(&self) {
        loop {
            let next = self.inner.reactions.borrow_mut().pop_front();
            let Some((tag, reaction)) = next else { break };
            let reactor = self.inner.reactors.borrow().get(&tag).cloned();
            let Some(reactor) = reactor else { continue };
            match reaction {
                // Stale reactions (the node moved again before dispatch)
                // are skipped; the later mutation queued its own.
                Reaction::Connected(id) => {
                    if self.is_connected(id) {
                        reactor.connected(self, id);
                    }
                }
                Reaction::Disconnected(id) => {
                    if !self.is_connected(id) {
                        reactor.disconnected(self, id);
                    }
                }
            }
        }
    }
}

fn instantiate(arena: &mut Arena, parsed: ParsedNode) -> NodeId {
    match parsed {
        ParsedNode::Text(text) => arena.alloc(NodeData::Text(text)),
        ParsedNode::Comment(body) => arena.alloc(NodeData::Comment(body)),
        ParsedNode::Element { tag, attrs, children } => {
            let id = arena.alloc(NodeData::Element { tag, attrs });
            for child in children {
                let child_id = instantiate(arena, child);
                arena.link(id, child_id, None);
            }
            id
        }
    }
}
