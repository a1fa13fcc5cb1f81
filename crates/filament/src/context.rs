//! The per-call component context.
//!
//! A [`RenderContext`] is handed to every lifecycle hook and render
//! call. It carries the props derived for this pass, snapshots of the
//! light content captured when the instance attached, and the handles a
//! component needs to talk back to its host: expanding templates,
//! scheduling a re-render, reading its own element.

use std::rc::Weak;

use filament_dom::{Document, NodeId};

use crate::props::camel_case;
use crate::runtime::RuntimeInner;
use crate::template::{expand, ExpandScope, Template};
use crate::value::{PropMap, Value};

pub struct RenderContext {
    runtime: Weak<RuntimeInner>,
    doc: Document,
    node: NodeId,
    owner: u64,
    generation: u64,
    props: PropMap,
    children: Vec<NodeId>,
    child_nodes: Vec<NodeId>,
}

impl RenderContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        runtime: Weak<RuntimeInner>,
        doc: Document,
        node: NodeId,
        owner: u64,
        generation: u64,
        props: PropMap,
        children: Vec<NodeId>,
        child_nodes: Vec<NodeId>,
    ) -> Self {
        RenderContext { runtime, doc, node, owner, generation, props, children, child_nodes }
    }

    /// Expands a template into markup, scoped to this instance's
    /// current render generation.
    pub fn html(&self, template: Template) -> String {
        let runtime = self.runtime.upgrade();
        let is_registered = |tag: &str| {
            runtime.as_ref().map(|rt| rt.is_registered(tag)).unwrap_or(false)
        };
        let scope = ExpandScope {
            owner: self.owner,
            generation: self.generation,
            is_registered_tag: &is_registered,
        };
        expand(template, &scope)
    }

    /// Props for this pass: defaults, then attributes, then explicit
    /// re-render overrides.
    pub fn props(&self) -> &PropMap {
        &self.props
    }

    /// One prop by camelCase name; [`Value::Null`] when absent.
    pub fn prop(&self, name: &str) -> Value {
        self.props.get(name).cloned().unwrap_or(Value::Null)
    }

    /// The element content captured at attach time, elements only.
    /// Interpolate it to re-insert the content into rendered markup.
    pub fn children(&self) -> Value {
        Value::Nodes(self.children.clone())
    }

    /// Captured content including text and comment nodes.
    pub fn child_nodes(&self) -> Value {
        Value::Nodes(self.child_nodes.clone())
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// The element's own attributes as a spreadable map, raw values.
    pub fn attributes(&self) -> Value {
        let mut map = PropMap::new();
        for (name, value) in self.doc.attributes(self.node) {
            map.insert(camel_case(&name), Value::String(value));
        }
        Value::Map(map)
    }

    pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
        self.doc.set_attribute(self.node, name, value);
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.doc.get_attribute(self.node, name)
    }

    /// Attaches (or returns) a shadow root on the element. Subsequent
    /// renders commit into it instead of the light tree.
    pub fn attach_shadow(&self) -> NodeId {
        self.doc.attach_shadow(self.node)
    }

    /// Schedules a re-render of this instance. `Some` merges the given
    /// props over everything attribute derivation produces, and the
    /// overrides persist across later passes. Requests made before the
    /// next frame coalesce into one pass.
    pub fn re_render(&self, props: Option<PropMap>) {
        if let Some(rt) = self.runtime.upgrade() {
            RuntimeInner::request_re_render(&rt, self.node, props);
        }
    }

    pub fn set_timeout(&self, delay_ms: u64, cb: impl FnOnce(&Document) + 'static) {
        self.doc.set_timeout(delay_ms, cb);
    }
}
