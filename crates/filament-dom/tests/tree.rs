//! End-to-end exercises of the document surface: forgiving parsing,
//! reactors that mutate their own subtree, and the virtual clock.

use std::cell::RefCell;
use std::rc::Rc;

use filament_dom::{Document, ElementReactor, NodeId};

#[test]
fn forgiving_parsing_round_trips() {
    let cases = [
        // Void elements never get a closing tag.
        ("<img src=\"a.png\"><br>", "<img src=\"a.png\"><br>"),
        // Misnested closers pop through; the stray close is dropped.
        ("<b><i>x</b></i>", "<b><i>x</i></b>"),
        // Unclosed elements close at end of input.
        ("<div><span>x", "<div><span>x</span></div>"),
        // A bare `<` that opens no tag is text.
        ("a < b", "a &lt; b"),
        // Entities decode on the way in and re-encode on the way out.
        ("<p title=\"a &quot;b&quot;\">&amp;&lt;</p>", "<p title=\"a &quot;b&quot;\">&amp;&lt;</p>"),
        // Bare attributes serialize bare.
        ("<input disabled>", "<input disabled>"),
    ];
    for (input, expected) in cases {
        let doc = Document::new();
        doc.set_body_html(input);
        assert_eq!(doc.body_html(), expected, "for input {:?}", input);
    }
}

/// Renders `<div>[n]</div>` into every `x-counter`, counting upgrades.
struct Upgrader {
    seen: Rc<RefCell<usize>>,
}

impl ElementReactor for Upgrader {
    fn connected(&self, doc: &Document, node: NodeId) {
        let mut seen = self.seen.borrow_mut();
        *seen += 1;
        doc.set_inner_html(node, &format!("<div>{}</div>", *seen));
    }

    fn disconnected(&self, _doc: &Document, _node: NodeId) {}
}

#[test]
fn reactors_may_mutate_their_own_subtree() {
    let doc = Document::new();
    let seen = Rc::new(RefCell::new(0));
    doc.define("x-counter", Rc::new(Upgrader { seen: seen.clone() }));

    doc.set_body_html("<x-counter></x-counter><x-counter></x-counter>");
    assert_eq!(*seen.borrow(), 2);
    assert_eq!(
        doc.body_html(),
        "<x-counter><div>1</div></x-counter><x-counter><div>2</div></x-counter>"
    );
}

#[test]
fn selectors_reach_through_rendered_content() {
    let doc = Document::new();
    doc.set_body_html(
        r#"<section id="main"><div class="item active">a</div><div class="item">b</div></section>"#,
    );
    assert_eq!(doc.query_selector_all(".item").len(), 2);
    let active = doc.query_selector("#main div.item.active").unwrap();
    assert_eq!(doc.text_content(active), "a");
    assert!(doc.query_selector("#main span").is_none());
}

#[test]
fn run_until_stalled_drains_interleaved_timers_and_frames() {
    let doc = Document::new();
    let log = Rc::new(RefCell::new(Vec::new()));

    let l = log.clone();
    doc.set_timeout(20, move |doc| {
        l.borrow_mut().push("timer");
        let l2 = l.clone();
        doc.request_frame(move |_| l2.borrow_mut().push("frame-after-timer"));
    });
    let l = log.clone();
    doc.request_frame(move |_| l.borrow_mut().push("frame"));

    doc.run_until_stalled();
    assert_eq!(*log.borrow(), vec!["frame", "timer", "frame-after-timer"]);
    assert_eq!(doc.now(), 20);
}
