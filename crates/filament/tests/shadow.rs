//! Rendering into a shadow root keeps content out of the light tree.

use filament::{Component, Document, Rendered, RenderContext, Runtime};

#[derive(Default)]
struct VeiledBox;

impl Component for VeiledBox {
    fn will_connect(&mut self, ctx: &mut RenderContext) {
        ctx.attach_shadow();
    }

    fn render(&mut self, _ctx: &mut RenderContext) -> Rendered {
        "<div class=\"secret\">hidden</div>".into()
    }
}

#[test]
fn shadow_content_is_rendered_but_not_serialized() {
    let doc = Document::new();
    doc.set_body_html("<veiled-box></veiled-box>");
    let runtime = Runtime::new(doc.clone());
    runtime.register::<VeiledBox>().unwrap();

    // The light tree stays empty and selectors do not reach in.
    assert_eq!(doc.body_html(), "<veiled-box></veiled-box>");
    assert!(doc.query_selector(".secret").is_none());

    // The content is there, connected, behind the shadow root.
    let host = doc.query_selector("veiled-box").unwrap();
    let root = doc.shadow_root(host).unwrap();
    let secret = doc.query_selector_in(root, ".secret");
    assert_eq!(secret.len(), 1);
    assert!(doc.is_connected(secret[0]));
    assert_eq!(doc.text_content(secret[0]), "hidden");
}
