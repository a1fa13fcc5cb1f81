//! Deferred and incremental render results under the virtual clock.

use std::cell::RefCell;
use std::rc::Rc;

use filament::{Chunks, Component, Deferred, Document, Rendered, RenderContext, Runtime};

type Log = Rc<RefCell<Vec<String>>>;

struct SlowBox {
    log: Log,
}

impl Component for SlowBox {
    fn connected(&mut self, _ctx: &mut RenderContext) {
        self.log.borrow_mut().push("connected".into());
    }

    fn render(&mut self, ctx: &mut RenderContext) -> Rendered {
        self.log.borrow_mut().push("render".into());
        let deferred = Deferred::new();
        let pending = deferred.clone();
        ctx.set_timeout(100, move |_| pending.resolve("<div>now</div>"));
        deferred.into()
    }
}

#[test]
fn deferred_render_commits_on_resolution() {
    let doc = Document::new();
    doc.set_body_html("<slow-box></slow-box>");
    let runtime = Runtime::new(doc.clone());

    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let factory_log = log.clone();
    runtime
        .register_with("slow-box", move || SlowBox { log: factory_log.clone() })
        .unwrap();

    let el = doc.query_selector("slow-box").unwrap();
    assert_eq!(doc.inner_html(el), "", "empty until the result arrives");
    assert_eq!(*log.borrow(), vec!["render".to_string()]);

    doc.advance(100);
    assert_eq!(doc.inner_html(el), "<div>now</div>");
    assert_eq!(
        *log.borrow(),
        vec!["render".to_string(), "connected".to_string()]
    );
}

struct StaleBox {
    passes: Rc<RefCell<Vec<Deferred>>>,
}

impl Component for StaleBox {
    fn render(&mut self, _ctx: &mut RenderContext) -> Rendered {
        let deferred = Deferred::new();
        self.passes.borrow_mut().push(deferred.clone());
        deferred.into()
    }
}

#[test]
fn superseded_results_are_discarded() {
    let doc = Document::new();
    doc.set_body_html("<stale-box></stale-box>");
    let runtime = Runtime::new(doc.clone());

    let passes: Rc<RefCell<Vec<Deferred>>> = Rc::new(RefCell::new(Vec::new()));
    let factory_passes = passes.clone();
    runtime
        .register_with("stale-box", move || StaleBox { passes: factory_passes.clone() })
        .unwrap();

    let handle = runtime.query("stale-box").unwrap();
    handle.re_render(None);
    doc.next_frame();
    assert_eq!(passes.borrow().len(), 2);

    let el = doc.query_selector("stale-box").unwrap();
    let first = passes.borrow()[0].clone();
    first.resolve("<div>one</div>");
    assert_eq!(doc.inner_html(el), "", "first pass was superseded");

    let second = passes.borrow()[1].clone();
    second.resolve("<div>two</div>");
    assert_eq!(doc.inner_html(el), "<div>two</div>");
}

struct GhostBox {
    log: Log,
    pending: Rc<RefCell<Vec<Deferred>>>,
}

impl Component for GhostBox {
    fn connected(&mut self, _ctx: &mut RenderContext) {
        self.log.borrow_mut().push("connected".into());
    }

    fn disconnected(&mut self, _ctx: &mut RenderContext) {
        self.log.borrow_mut().push("disconnected".into());
    }

    fn render(&mut self, _ctx: &mut RenderContext) -> Rendered {
        let deferred = Deferred::new();
        self.pending.borrow_mut().push(deferred.clone());
        deferred.into()
    }
}

#[test]
fn results_arriving_after_removal_are_discarded() {
    let doc = Document::new();
    doc.set_body_html("<ghost-box></ghost-box>");
    let runtime = Runtime::new(doc.clone());

    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let pending: Rc<RefCell<Vec<Deferred>>> = Rc::new(RefCell::new(Vec::new()));
    let factory_log = log.clone();
    let factory_pending = pending.clone();
    runtime
        .register_with("ghost-box", move || GhostBox {
            log: factory_log.clone(),
            pending: factory_pending.clone(),
        })
        .unwrap();

    let el = doc.query_selector("ghost-box").unwrap();
    doc.remove(el);
    assert_eq!(*log.borrow(), vec!["disconnected".to_string()]);
    assert!(runtime.handle(el).is_none());

    let deferred = pending.borrow()[0].clone();
    deferred.resolve("<div>late</div>");
    assert_eq!(doc.inner_html(el), "", "removed instance takes no result");
    assert_eq!(*log.borrow(), vec!["disconnected".to_string()]);
}

struct FeedBox {
    feed: Chunks,
}

impl Component for FeedBox {
    fn render(&mut self, _ctx: &mut RenderContext) -> Rendered {
        self.feed.clone().into()
    }
}

#[test]
fn incremental_render_commits_each_chunk_then_the_final_markup() {
    let doc = Document::new();
    doc.set_body_html("<feed-box></feed-box>");
    let runtime = Runtime::new(doc.clone());

    let feed = Chunks::new();
    let factory_feed = feed.clone();
    runtime
        .register_with("feed-box", move || FeedBox { feed: factory_feed.clone() })
        .unwrap();

    let el = doc.query_selector("feed-box").unwrap();
    assert_eq!(doc.inner_html(el), "");

    feed.push("<div>X</div>");
    assert_eq!(doc.inner_html(el), "<div>X</div>");

    feed.finish(Some("<div>Y</div>".into()));
    assert_eq!(doc.inner_html(el), "<div>Y</div>");

    // The feed is closed; nothing further lands.
    feed.push("<div>Z</div>");
    assert_eq!(doc.inner_html(el), "<div>Y</div>");
}
