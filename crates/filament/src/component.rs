//! The component contract.
//!
//! A component is a plain struct registered under a kebab-case tag.
//! The runtime constructs one instance per matching element, drives its
//! lifecycle hooks, and asks it to [`render`](Component::render)
//! whenever the element needs content.
//!
//! `render` returns a [`Rendered`]:
//!
//! - [`Rendered::Markup`] commits synchronously.
//! - [`Rendered::Deferred`] leaves the element empty until the handle
//!   is resolved; the handle can outlive the render call and be
//!   resolved from a timer.
//! - [`Rendered::Incremental`] commits each pushed chunk as it arrives,
//!   then the final markup.
//!
//! Results delivered by a handle from a superseded render pass are
//! discarded: only the newest pass may commit.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::context::RenderContext;
use crate::styles::StyleMap;
use crate::value::PropMap;

pub trait Component: Any {
    /// Produces the element's content. Runs on attach and again on
    /// every re-render, with freshly derived props in the context.
    fn render(&mut self, ctx: &mut RenderContext) -> Rendered;

    /// Runs before the instance's element receives its first content.
    fn will_connect(&mut self, _ctx: &mut RenderContext) {}

    /// Runs after the first render has committed, children included.
    fn connected(&mut self, _ctx: &mut RenderContext) {}

    /// Runs after the instance's element leaves the tree.
    fn disconnected(&mut self, _ctx: &mut RenderContext) {}

    /// Runs after every committed re-render (not the initial one).
    fn updated(&mut self, _ctx: &mut RenderContext) {}

    /// CSS text injected as a `<style>` child on every instance of the
    /// component. Computed once per registration and cached.
    fn stylesheet(&self) -> Option<String> {
        None
    }

    /// Named inline-style maps, applied to rendered elements carrying a
    /// `styles` attribute listing the names.
    fn styles(&self) -> Option<StyleMap> {
        None
    }

    /// Props present before any attribute is read. Attribute-derived
    /// entries override these key by key.
    fn default_props(&self) -> PropMap {
        PropMap::new()
    }
}

/// What a render pass produced.
pub enum Rendered {
    Markup(String),
    Deferred(Deferred),
    Incremental(Chunks),
}

impl From<String> for Rendered {
    fn from(markup: String) -> Self {
        Rendered::Markup(markup)
    }
}

impl From<&str> for Rendered {
    fn from(markup: &str) -> Self {
        Rendered::Markup(markup.to_string())
    }
}

impl From<Deferred> for Rendered {
    fn from(d: Deferred) -> Self {
        Rendered::Deferred(d)
    }
}

impl From<Chunks> for Rendered {
    fn from(c: Chunks) -> Self {
        Rendered::Incremental(c)
    }
}

#[derive(Default)]
struct DeferredState {
    value: Option<String>,
    waiter: Option<Box<dyn FnOnce(String)>>,
}

/// A one-shot markup promise. Clone it, return one clone from `render`,
/// and resolve the other later (typically from a timer callback).
#[derive(Clone, Default)]
pub struct Deferred {
    state: Rc<RefCell<DeferredState>>,
}

impl Deferred {
    pub fn new() -> Self {
        Deferred::default()
    }

    /// Delivers the markup. A second resolution is ignored.
    pub fn resolve(&self, markup: impl Into<String>) {
        let markup = markup.into();
        let waiter = {
            let mut state = self.state.borrow_mut();
            if state.value.is_some() {
                return;
            }
            match state.waiter.take() {
                Some(w) => Some(w),
                None => {
                    state.value = Some(markup.clone());
                    None
                }
            }
        };
        if let Some(waiter) = waiter {
            self.state.borrow_mut().value = Some(markup.clone());
            waiter(markup);
        }
    }

    pub(crate) fn on_resolve(&self, f: impl FnOnce(String) + 'static) {
        let ready = self.state.borrow().value.clone();
        match ready {
            Some(markup) => f(markup),
            None => self.state.borrow_mut().waiter = Some(Box::new(f)),
        }
    }
}

pub(crate) enum ChunkEvent {
    Chunk(String),
    Done(Option<String>),
}

#[derive(Default)]
struct ChunkState {
    buffered: VecDeque<ChunkEvent>,
    subscriber: Option<Rc<dyn Fn(ChunkEvent)>>,
    closed: bool,
}

/// An incremental markup feed. Each pushed chunk commits as it arrives;
/// [`finish`](Chunks::finish) optionally commits a final markup and
/// closes the feed.
#[derive(Clone, Default)]
pub struct Chunks {
    state: Rc<RefCell<ChunkState>>,
}

impl Chunks {
    pub fn new() -> Self {
        Chunks::default()
    }

    pub fn push(&self, markup: impl Into<String>) {
        if self.state.borrow().closed {
            return;
        }
        self.deliver(ChunkEvent::Chunk(markup.into()));
    }

    pub fn finish(&self, markup: Option<String>) {
        if self.state.borrow().closed {
            return;
        }
        self.state.borrow_mut().closed = true;
        self.deliver(ChunkEvent::Done(markup));
    }

    fn deliver(&self, event: ChunkEvent) {
        let subscriber = self.state.borrow().subscriber.clone();
        match subscriber {
            Some(sub) => sub(event),
            None => self.state.borrow_mut().buffered.push_back(event),
        }
    }

    pub(crate) fn subscribe(&self, f: impl Fn(ChunkEvent) + 'static) {
        let f: Rc<dyn Fn(ChunkEvent)> = Rc::new(f);
        loop {
            let event = self.state.borrow_mut().buffered.pop_front();
            match event {
                Some(event) => f(event),
                None => break,
            }
        }
        self.state.borrow_mut().subscriber = Some(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deferred_delivers_once_in_either_order() {
        let d = Deferred::new();
        let got = Rc::new(RefCell::new(Vec::new()));

        let g = got.clone();
        d.on_resolve(move |m| g.borrow_mut().push(m));
        d.resolve("a");
        d.resolve("b");
        assert_eq!(*got.borrow(), vec!["a".to_string()]);

        let d = Deferred::new();
        d.resolve("early");
        let g = got.clone();
        d.on_resolve(move |m| g.borrow_mut().push(m));
        assert_eq!(got.borrow().len(), 2);
        assert_eq!(got.borrow()[1], "early");
    }

    #[test]
    fn chunks_buffer_until_subscribed() {
        let c = Chunks::new();
        c.push("X");
        c.finish(Some("Y".into()));
        c.push("ignored after close");

        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        c.subscribe(move |event| match event {
            ChunkEvent::Chunk(m) => l.borrow_mut().push(format!("chunk:{}", m)),
            ChunkEvent::Done(m) => l.borrow_mut().push(format!("done:{:?}", m)),
        });
        assert_eq!(
            *log.borrow(),
            vec!["chunk:X".to_string(), "done:Some(\"Y\")".to_string()]
        );
    }
}
