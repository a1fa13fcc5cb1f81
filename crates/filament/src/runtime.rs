//! The runtime: registration, instance lifecycle, and reconciliation.
//!
//! One [`Runtime`] drives one [`Document`]. Registering a component
//! binds its tag in the document; matching elements already connected
//! upgrade immediately, later insertions upgrade as they land. Each
//! upgraded element gets exactly one instance, keyed by its node, which
//! survives moves and parent re-renders and is torn down only when the
//! element actually leaves the tree.
//!
//! # Attach
//!
//! Attaching captures the element's light content (detaching it from
//! the tree; it comes back only where the component interpolates
//! [`RenderContext::children`]), fires `will_connect`, then runs the
//! first render pass synchronously. Child components found in committed
//! markup attach during the commit, depth-first, so by the time an
//! instance's `connected` hook runs its whole subtree is rendered.
//!
//! # Re-render and reconciliation
//!
//! Re-render requests coalesce per instance into the next frame. When a
//! pass commits, component elements in the new markup are matched
//! against the previous commit by structural position (element index
//! path plus tag). A match keeps the existing element and its instance:
//! new attributes are copied over, the new light content is re-captured,
//! and the surviving instance re-renders in place. Unmatched old
//! instances disconnect; unmatched new elements attach fresh.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use filament_dom::{Document, ElementReactor, NodeId};
use once_cell::unsync::OnceCell;

use crate::component::{ChunkEvent, Component, Rendered};
use crate::context::RenderContext;
use crate::error::Error;
use crate::props::{derive_props, kebab_case};
use crate::refs;
use crate::styles;
use crate::value::PropMap;

struct Definition {
    type_id: TypeId,
    factory: Box<dyn Fn() -> Box<dyn Component>>,
    stylesheet: OnceCell<Option<String>>,
}

/// (element index path from the commit root, tag name).
type PathKey = (Vec<usize>, String);

struct Instance {
    owner: u64,
    node: NodeId,
    tag: String,
    /// Taken while a hook or render runs, so re-entrant calls bail out.
    component: Option<Box<dyn Component>>,
    defaults: PropMap,
    /// Props passed to `re_render`; layered over attribute derivation
    /// until the instance disconnects.
    overrides: PropMap,
    children: Vec<NodeId>,
    child_nodes: Vec<NodeId>,
    generation: u64,
    in_tree: bool,
    connected_fired: bool,
    frame_queued: bool,
    prev_keys: HashMap<PathKey, NodeId>,
}

pub(crate) struct RuntimeInner {
    doc: Document,
    defs: RefCell<HashMap<String, Rc<Definition>>>,
    instances: RefCell<HashMap<NodeId, Rc<RefCell<Instance>>>>,
    next_owner: Cell<u64>,
}

/// Bridges document notifications back into the runtime without
/// keeping it alive.
struct RuntimeReactor {
    inner: Weak<RuntimeInner>,
}

impl ElementReactor for RuntimeReactor {
    fn connected(&self, _doc: &Document, node: NodeId) {
        if let Some(rt) = self.inner.upgrade() {
            RuntimeInner::attach(&rt, node);
        }
    }

    fn disconnected(&self, _doc: &Document, node: NodeId) {
        if let Some(rt) = self.inner.upgrade() {
            RuntimeInner::detach(&rt, node);
        }
    }
}

pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(doc: Document) -> Self {
        Runtime {
            inner: Rc::new(RuntimeInner {
                doc,
                defs: RefCell::new(HashMap::new()),
                instances: RefCell::new(HashMap::new()),
                next_owner: Cell::new(1),
            }),
        }
    }

    pub fn document(&self) -> &Document {
        &self.inner.doc
    }

    /// Registers a component under the tag derived from its type name
    /// (`TodoList` → `todo-list`). Returns the tag.
    pub fn register<C: Component + Default>(&self) -> Result<String, Error> {
        let tag = tag_for::<C>()?;
        self.register_impl(&tag, TypeId::of::<C>(), Box::new(|| Box::new(C::default())))?;
        Ok(tag)
    }

    /// Registers a component under an explicit tag.
    pub fn register_as<C: Component + Default>(&self, tag: &str) -> Result<(), Error> {
        self.register_impl(tag, TypeId::of::<C>(), Box::new(|| Box::new(C::default())))
    }

    /// Registers with a custom constructor, for components that take
    /// configuration at build time.
    pub fn register_with<C: Component>(
        &self,
        tag: &str,
        factory: impl Fn() -> C + 'static,
    ) -> Result<(), Error> {
        self.register_impl(tag, TypeId::of::<C>(), Box::new(move || Box::new(factory())))
    }

    fn register_impl(
        &self,
        tag: &str,
        type_id: TypeId,
        factory: Box<dyn Fn() -> Box<dyn Component>>,
    ) -> Result<(), Error> {
        let tag = tag.to_ascii_lowercase();
        if !valid_tag(&tag) {
            return Err(Error::InvalidTagName(tag));
        }
        {
            let mut defs = self.inner.defs.borrow_mut();
            if let Some(existing) = defs.get(&tag) {
                if existing.type_id == type_id {
                    // Re-registering the same component is a no-op.
                    return Ok(());
                }
                return Err(Error::RegistrationConflict(tag));
            }
            defs.insert(
                tag.clone(),
                Rc::new(Definition { type_id, factory, stylesheet: OnceCell::new() }),
            );
        }
        tracing::debug!(tag = %tag, "component registered");
        let reactor = Rc::new(RuntimeReactor { inner: Rc::downgrade(&self.inner) });
        // Upgrades matching elements already in the tree, in document
        // order, before returning.
        self.inner.doc.define(&tag, reactor);
        Ok(())
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.inner.is_registered(tag)
    }

    /// A handle to the instance upgraded on `node`, if any.
    pub fn handle(&self, node: NodeId) -> Option<ComponentHandle> {
        if self.inner.instances.borrow().contains_key(&node) {
            Some(ComponentHandle { runtime: Rc::downgrade(&self.inner), node })
        } else {
            None
        }
    }

    /// Convenience: the handle for the first element matching a
    /// selector.
    pub fn query(&self, selector: &str) -> Option<ComponentHandle> {
        let node = self.inner.doc.query_selector(selector)?;
        self.handle(node)
    }
}

impl RuntimeInner {
    pub(crate) fn is_registered(&self, tag: &str) -> bool {
        self.defs.borrow().contains_key(&tag.to_ascii_lowercase())
    }

    fn effective_props(&self, inst: &Instance) -> PropMap {
        let mut props = derive_props(&self.doc, inst.node, &inst.defaults);
        for (k, v) in &inst.overrides {
            props.insert(k.clone(), v.clone());
        }
        props
    }

    fn make_ctx(rt: &Rc<Self>, inst: &Rc<RefCell<Instance>>) -> RenderContext {
        let i = inst.borrow();
        let props = rt.effective_props(&i);
        RenderContext::new(
            Rc::downgrade(rt),
            rt.doc.clone(),
            i.node,
            i.owner,
            i.generation,
            props,
            i.children.clone(),
            i.child_nodes.clone(),
        )
    }

    fn instance(&self, node: NodeId) -> Option<Rc<RefCell<Instance>>> {
        self.instances.borrow().get(&node).cloned()
    }

    fn attach(rt: &Rc<Self>, node: NodeId) {
        if rt.instances.borrow().contains_key(&node) {
            // Re-notification of a live element (a move or a parent
            // commit); nothing to do.
            return;
        }
        let Some(tag) = rt.doc.tag_name(node) else { return };
        let Some(def) = rt.defs.borrow().get(&tag).cloned() else { return };

        let mut component = (def.factory)();
        let defaults = component.default_props();

        // Capture light content. It leaves the tree now and comes back
        // only where the component interpolates it.
        let child_nodes = rt.doc.children(node);
        for id in &child_nodes {
            rt.doc.detach(*id);
        }
        let children = child_nodes.iter().filter(|id| rt.doc.is_element(**id)).copied().collect();

        let owner = rt.next_owner.get();
        rt.next_owner.set(owner + 1);
        tracing::debug!(tag = %tag, owner, "instance attached");

        let inst = Rc::new(RefCell::new(Instance {
            owner,
            node,
            tag,
            component: None,
            defaults,
            overrides: PropMap::new(),
            children,
            child_nodes,
            generation: 0,
            in_tree: true,
            connected_fired: false,
            frame_queued: false,
            prev_keys: HashMap::new(),
        }));
        rt.instances.borrow_mut().insert(node, inst.clone());

        let mut ctx = Self::make_ctx(rt, &inst);
        component.will_connect(&mut ctx);
        inst.borrow_mut().component = Some(component);

        Self::render_pass(rt, &inst);
    }

    fn detach(rt: &Rc<Self>, node: NodeId) {
        let Some(inst) = rt.instances.borrow_mut().remove(&node) else { return };
        let owner = {
            let mut i = inst.borrow_mut();
            i.in_tree = false;
            i.owner
        };
        let component = inst.borrow_mut().component.take();
        if let Some(mut component) = component {
            let mut ctx = Self::make_ctx(rt, &inst);
            component.disconnected(&mut ctx);
            inst.borrow_mut().component = Some(component);
        }
        refs::release(owner);
        tracing::debug!(owner, "instance detached");
    }

    pub(crate) fn request_re_render(rt: &Rc<Self>, node: NodeId, partial: Option<PropMap>) {
        let Some(inst) = rt.instance(node) else { return };
        {
            let mut i = inst.borrow_mut();
            if let Some(partial) = partial {
                for (k, v) in partial {
                    i.overrides.insert(k, v);
                }
            }
            if i.frame_queued {
                return;
            }
            i.frame_queued = true;
        }
        let rt_w = Rc::downgrade(rt);
        let inst_w = Rc::downgrade(&inst);
        rt.doc.request_frame(move |_| {
            if let (Some(rt), Some(inst)) = (rt_w.upgrade(), inst_w.upgrade()) {
                let live = {
                    let mut i = inst.borrow_mut();
                    i.frame_queued = false;
                    i.in_tree
                };
                if live {
                    RuntimeInner::render_pass(&rt, &inst);
                }
            }
        });
    }

    fn render_pass(rt: &Rc<Self>, inst: &Rc<RefCell<Instance>>) {
        let gen = {
            let mut i = inst.borrow_mut();
            if i.component.is_none() {
                // A hook on this instance is already running.
                return;
            }
            i.generation += 1;
            i.generation
        };
        let mut ctx = Self::make_ctx(rt, inst);
        let mut component = match inst.borrow_mut().component.take() {
            Some(c) => c,
            None => return,
        };
        let rendered = component.render(&mut ctx);
        inst.borrow_mut().component = Some(component);

        match rendered {
            Rendered::Markup(markup) => Self::commit(rt, inst, gen, markup),
            Rendered::Deferred(deferred) => {
                let rt_w = Rc::downgrade(rt);
                let inst_w = Rc::downgrade(inst);
                deferred.on_resolve(move |markup| {
                    if let (Some(rt), Some(inst)) = (rt_w.upgrade(), inst_w.upgrade()) {
                        RuntimeInner::commit(&rt, &inst, gen, markup);
                    }
                });
            }
            Rendered::Incremental(chunks) => {
                let rt_w = Rc::downgrade(rt);
                let inst_w = Rc::downgrade(inst);
                chunks.subscribe(move |event| {
                    if let (Some(rt), Some(inst)) = (rt_w.upgrade(), inst_w.upgrade()) {
                        match event {
                            ChunkEvent::Chunk(markup) => {
                                RuntimeInner::commit(&rt, &inst, gen, markup)
                            }
                            ChunkEvent::Done(Some(markup)) => {
                                RuntimeInner::commit(&rt, &inst, gen, markup)
                            }
                            ChunkEvent::Done(None) => {}
                        }
                    }
                });
            }
        }
    }

    /// Lands one render result. Stale results (the instance left the
    /// tree, or a newer pass started) are discarded.
    fn commit(rt: &Rc<Self>, inst: &Rc<RefCell<Instance>>, gen: u64, markup: String) {
        {
            let i = inst.borrow();
            if !i.in_tree || i.generation != gen {
                tracing::trace!(owner = i.owner, gen, "stale render result discarded");
                return;
            }
        }

        let adopted = Self::materialize(rt, inst, &markup);

        {
            let i = inst.borrow();
            refs::sweep(i.owner, i.generation);
        }

        // Surviving children re-render before this instance's own hook
        // runs, so the hook observes a settled subtree.
        for child in &adopted {
            if !Rc::ptr_eq(child, inst) {
                Self::render_pass(rt, child);
            }
        }

        let first = {
            let mut i = inst.borrow_mut();
            if i.connected_fired {
                false
            } else {
                i.connected_fired = true;
                true
            }
        };
        let component = inst.borrow_mut().component.take();
        if let Some(mut component) = component {
            let mut ctx = Self::make_ctx(rt, inst);
            if first {
                component.connected(&mut ctx);
            } else {
                component.updated(&mut ctx);
            }
            inst.borrow_mut().component = Some(component);
        }
    }

    /// Parses markup, resolves content placeholders, applies styling,
    /// reconciles against the previous commit, and swaps the result in.
    /// Returns the instances kept alive by reconciliation, in discovery
    /// order.
    fn materialize(
        rt: &Rc<Self>,
        inst: &Rc<RefCell<Instance>>,
        markup: &str,
    ) -> Vec<Rc<RefCell<Instance>>> {
        let doc = rt.doc.clone();
        let mut roots = doc.create_fragment(markup);
        Self::resolve_placeholders(&doc, &mut roots);

        let (node, tag) = {
            let i = inst.borrow();
            (i.node, i.tag.clone())
        };
        let def = rt.defs.borrow().get(&tag).cloned();

        // Styling needs the component; taken briefly, hooks never run
        // here.
        let component = inst.borrow_mut().component.take();
        let css = match (&def, &component) {
            (Some(def), Some(c)) => def.stylesheet.get_or_init(|| c.stylesheet()).clone(),
            _ => None,
        };
        let style_maps = component.as_ref().and_then(|c| c.styles());
        inst.borrow_mut().component = component;

        if let Some(maps) = &style_maps {
            styles::apply_inline(&doc, &roots, maps);
        }
        if let Some(css) = css {
            let style = doc.create_element("style");
            doc.append_child(style, doc.create_text(css));
            roots.insert(0, style);
        }

        // Reconcile inside a detached staging element so one traversal
        // covers the top level and the subtrees alike.
        let staging = doc.create_element("staging-root");
        for root in roots.drain(..) {
            doc.append_child(staging, root);
        }
        let prev = inst.borrow().prev_keys.clone();
        let mut new_keys = HashMap::new();
        let mut adopted = Vec::new();
        let mut path = Vec::new();
        Self::reconcile_level(rt, &prev, &mut new_keys, &mut adopted, staging, &mut path);
        let roots: Vec<NodeId> = doc.children(staging);
        for root in &roots {
            doc.detach(*root);
        }

        let target = doc.shadow_root(node).unwrap_or(node);
        // Attaches new child components and disconnects dropped ones
        // before returning.
        doc.replace_children(target, roots);

        inst.borrow_mut().prev_keys = new_keys;
        adopted
    }

    /// Replaces reference-identifier comments with the live nodes they
    /// resolve to. Unresolvable placeholders materialize as nothing.
    fn resolve_placeholders(doc: &Document, roots: &mut Vec<NodeId>) {
        let mut idx = 0;
        while idx < roots.len() {
            let id = roots[idx];
            if let Some(nodes) = placeholder_nodes(doc, id) {
                for n in &nodes {
                    doc.detach(*n);
                }
                roots.splice(idx..=idx, nodes.iter().copied());
                idx += nodes.len();
                continue;
            }
            Self::resolve_in_subtree(doc, id);
            idx += 1;
        }
    }

    fn resolve_in_subtree(doc: &Document, root: NodeId) {
        for child in doc.children(root) {
            if let Some(nodes) = placeholder_nodes(doc, child) {
                for n in nodes {
                    doc.detach(n);
                    doc.insert_before(root, n, Some(child));
                }
                doc.detach(child);
            } else {
                Self::resolve_in_subtree(doc, child);
            }
        }
    }

    /// Walks one level of the staging tree, matching component elements
    /// against the previous commit by (element index path, tag). A
    /// match adopts the old element in place of the new one.
    fn reconcile_level(
        rt: &Rc<Self>,
        prev: &HashMap<PathKey, NodeId>,
        new_keys: &mut HashMap<PathKey, NodeId>,
        adopted: &mut Vec<Rc<RefCell<Instance>>>,
        parent: NodeId,
        path: &mut Vec<usize>,
    ) {
        let doc = rt.doc.clone();
        let mut elem_index = 0usize;
        for child in doc.children(parent) {
            if !doc.is_element(child) {
                continue;
            }
            path.push(elem_index);
            elem_index += 1;
            let tag = doc.tag_name(child).unwrap_or_default();
            let registered = rt.defs.borrow().contains_key(&tag);

            if registered {
                let key = (path.clone(), tag);
                let old_inst = prev
                    .get(&key)
                    .filter(|old| **old != child)
                    .and_then(|old| rt.instance(*old));
                if let Some(old_inst) = old_inst {
                    let old = old_inst.borrow().node;
                    doc.set_attributes(old, doc.attributes(child));
                    // Nested matches swap inside the new subtree before
                    // it becomes the survivor's captured content.
                    Self::reconcile_level(rt, prev, new_keys, adopted, child, path);
                    let child_nodes = doc.children(child);
                    for n in &child_nodes {
                        doc.detach(*n);
                    }
                    {
                        let mut oi = old_inst.borrow_mut();
                        oi.children = child_nodes
                            .iter()
                            .filter(|n| doc.is_element(**n))
                            .copied()
                            .collect();
                        oi.child_nodes = child_nodes;
                    }
                    doc.insert_before(parent, old, Some(child));
                    doc.detach(child);
                    new_keys.insert(key, old);
                    adopted.push(old_inst);
                    path.pop();
                    continue;
                }
                new_keys.insert(key, child);
            }

            Self::reconcile_level(rt, prev, new_keys, adopted, child, path);
            path.pop();
        }
    }
}

/// A live instance seen from the embedder's side.
pub struct ComponentHandle {
    runtime: Weak<RuntimeInner>,
    node: NodeId,
}

impl ComponentHandle {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The props a render pass would observe right now.
    pub fn props(&self) -> PropMap {
        let Some(rt) = self.runtime.upgrade() else { return PropMap::new() };
        let Some(inst) = rt.instance(self.node) else { return PropMap::new() };
        let i = inst.borrow();
        rt.effective_props(&i)
    }

    /// Schedules a re-render, optionally merging props over attribute
    /// derivation. Coalesces with other requests into the next frame.
    pub fn re_render(&self, props: Option<PropMap>) {
        if let Some(rt) = self.runtime.upgrade() {
            RuntimeInner::request_re_render(&rt, self.node, props);
        }
    }

    /// Runs a closure against the concrete component state. `None` when
    /// the instance is gone or is not a `C`.
    pub fn with<C: Component, R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        let rt = self.runtime.upgrade()?;
        let inst = rt.instance(self.node)?;
        let mut component = inst.borrow_mut().component.take()?;
        let result = (component.as_mut() as &mut dyn Any).downcast_mut::<C>().map(f);
        inst.borrow_mut().component = Some(component);
        result
    }
}

/// `Some(nodes)` when `id` is a reference-placeholder comment. A
/// resolvable non-node value or a stale identifier yields an empty
/// list (the placeholder is dropped either way).
fn placeholder_nodes(doc: &Document, id: NodeId) -> Option<Vec<NodeId>> {
    let body = doc.comment_text(id)?;
    if !refs::is_ref_id(body.trim()) {
        return None;
    }
    match refs::resolve(body.trim()) {
        Some(crate::value::Value::Nodes(nodes)) => Some(nodes),
        _ => Some(Vec::new()),
    }
}

/// Derives the registration tag from a type name: last path segment,
/// Pascal → kebab.
fn tag_for<C: 'static>() -> Result<String, Error> {
    let name = std::any::type_name::<C>();
    let last = name.rsplit("::").next().unwrap_or(name);
    let tag = kebab_case(last);
    if valid_tag(&tag) {
        Ok(tag)
    } else {
        Err(Error::InvalidTagName(tag))
    }
}

/// Kebab-case with at least one hyphen, so component tags can never
/// collide with built-in element names.
fn valid_tag(tag: &str) -> bool {
    tag.contains('-')
        && !tag.starts_with('-')
        && !tag.ends_with('-')
        && tag.starts_with(|c: char| c.is_ascii_lowercase())
        && tag.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
