//! Attribute-derived props: coercion, defaults, and non-string values
//! carried through markup by reference.

use std::cell::RefCell;
use std::rc::Rc;

use filament::{
    html, Component, Document, PropMap, Rendered, RenderContext, Runtime, Value,
};

#[derive(Default)]
struct PropEcho;

impl Component for PropEcho {
    fn default_props(&self) -> PropMap {
        let mut defaults = PropMap::new();
        defaults.insert("num".into(), Value::from(100));
        defaults.insert("str".into(), Value::from("0x"));
        defaults
    }

    fn render(&mut self, ctx: &mut RenderContext) -> Rendered {
        serde_json::to_string(ctx.props()).unwrap().into()
    }
}

#[test]
fn default_props_apply_without_attributes() {
    let doc = Document::new();
    doc.set_body_html("<prop-echo></prop-echo>");
    let runtime = Runtime::new(doc.clone());
    runtime.register::<PropEcho>().unwrap();

    insta::assert_snapshot!(
        doc.body_html(),
        @r###"<prop-echo>{"num":100,"str":"0x"}</prop-echo>"###
    );
}

#[test]
fn attributes_override_defaults_and_coerce() {
    let doc = Document::new();
    doc.set_body_html(r#"<prop-echo num="2" disabled test-item="true"></prop-echo>"#);
    let runtime = Runtime::new(doc.clone());
    runtime.register::<PropEcho>().unwrap();

    let el = doc.query_selector("prop-echo").unwrap();
    // A bare attribute derives the empty string, and "true" stays a
    // string, not a boolean.
    assert_eq!(
        doc.text_content(el),
        r#"{"num":2,"str":"0x","disabled":"","testItem":"true"}"#
    );
}

struct PropProbe {
    seen: Rc<RefCell<Option<PropMap>>>,
}

impl Component for PropProbe {
    fn render(&mut self, ctx: &mut RenderContext) -> Rendered {
        *self.seen.borrow_mut() = Some(ctx.props().clone());
        "".into()
    }
}

#[derive(Default)]
struct PropParent;

impl Component for PropParent {
    fn render(&mut self, ctx: &mut RenderContext) -> Rendered {
        let greet = Value::func(|_| Value::from("hello, world"));
        let data = Value::from(serde_json::json!([1, 2, 3]));
        ctx.html(html![
            "<prop-probe greet=" { greet } " data=" { data } " width=" { 42.42 } "></prop-probe>"
        ])
        .into()
    }
}

#[test]
fn non_string_values_survive_the_trip_through_markup() {
    let doc = Document::new();
    let runtime = Runtime::new(doc.clone());

    let seen = Rc::new(RefCell::new(None));
    let probe_seen = seen.clone();
    runtime
        .register_with("prop-probe", move || PropProbe { seen: probe_seen.clone() })
        .unwrap();
    runtime.register::<PropParent>().unwrap();

    doc.set_body_html("<prop-parent></prop-parent>");

    let seen = seen.borrow();
    let props = seen.as_ref().expect("probe rendered");
    assert_eq!(
        props["greet"].call(&[]).unwrap(),
        Value::from("hello, world")
    );
    assert_eq!(props["data"], Value::from(serde_json::json!([1, 2, 3])));
    assert_eq!(props["width"], Value::Number(42.42));
}

#[test]
fn float_attributes_round_trip() {
    let doc = Document::new();
    doc.set_body_html(r#"<prop-echo num="42.42"></prop-echo>"#);
    let runtime = Runtime::new(doc.clone());
    runtime.register::<PropEcho>().unwrap();

    let handle = runtime.query("prop-echo").unwrap();
    assert_eq!(handle.props()["num"], Value::Number(42.42));
}

#[test]
fn re_render_overrides_layer_over_attributes() {
    let doc = Document::new();
    doc.set_body_html(r#"<prop-echo num="7"></prop-echo>"#);
    let runtime = Runtime::new(doc.clone());
    runtime.register::<PropEcho>().unwrap();

    let handle = runtime.query("prop-echo").unwrap();
    let mut patch = PropMap::new();
    patch.insert("num".into(), Value::from(8));
    handle.re_render(Some(patch));
    doc.next_frame();

    let el = doc.query_selector("prop-echo").unwrap();
    assert!(doc.text_content(el).contains(r#""num":8"#));
    // The attribute itself is untouched.
    assert_eq!(doc.get_attribute(el, "num").as_deref(), Some("7"));
}
