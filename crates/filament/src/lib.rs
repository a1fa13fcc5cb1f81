//! # Filament - Component Runtime for Custom Tags
//!
//! Filament upgrades custom-tagged elements in an in-memory document
//! into live component instances. It provides:
//!
//! - Template expansion that carries non-string values (callbacks,
//!   structured data, live nodes) through markup loss-free
//! - Props derived from element attributes with total coercion
//! - A per-instance lifecycle: `will_connect`, `render`, `connected`,
//!   `updated`, `disconnected`
//! - Composition: an element's original content is captured and
//!   re-inserted wherever the component interpolates it
//! - Deferred and incremental render results, driven by a virtual clock
//! - Per-component stylesheets and named inline styles
//!
//! The host tree, parser and scheduler live in [`filament_dom`]; this
//! crate is the engine on top.
//!
//! ## Core Concepts
//!
//! - [`Component`]: the trait a component type implements
//! - [`Runtime`]: binds tags to components over one [`Document`]
//! - [`html!`]: builds a [`Template`] from literals and `{ value }`
//!   interpolations; [`RenderContext::html`] expands it
//! - [`Value`]: what can cross a template boundary
//! - [`PropMap`]: insertion-ordered props, camelCase keys
//! - [`refs`]: the registry that round-trips non-string values
//!
//! ## Quick Start
//!
//! ```rust
//! use filament::{html, Component, Document, Rendered, RenderContext, Runtime};
//!
//! #[derive(Default)]
//! struct HelloBadge;
//!
//! impl Component for HelloBadge {
//!     fn render(&mut self, ctx: &mut RenderContext) -> Rendered {
//!         ctx.html(html!["<span>hello, " { ctx.prop("name") } "</span>"]).into()
//!     }
//! }
//!
//! let doc = Document::new();
//! doc.set_body_html(r#"<hello-badge name="world"></hello-badge>"#);
//!
//! let runtime = Runtime::new(doc.clone());
//! runtime.register::<HelloBadge>().unwrap();
//!
//! assert_eq!(
//!     doc.body_html(),
//!     r#"<hello-badge name="world"><span>hello, world</span></hello-badge>"#
//! );
//! ```
//!
//! ## Re-rendering
//!
//! Re-renders are requested, not immediate: requests coalesce into the
//! next frame of the document's virtual clock, and nested component
//! elements that keep their structural position survive with their
//! state and content intact.
//!
//! ```rust
//! # use filament::{html, Component, Document, PropMap, Rendered, RenderContext, Runtime, Value};
//! # #[derive(Default)]
//! # struct HelloBadge;
//! # impl Component for HelloBadge {
//! #     fn render(&mut self, ctx: &mut RenderContext) -> Rendered {
//! #         ctx.html(html!["<span>hello, " { ctx.prop("name") } "</span>"]).into()
//! #     }
//! # }
//! # let doc = Document::new();
//! # doc.set_body_html(r#"<hello-badge name="world"></hello-badge>"#);
//! # let runtime = Runtime::new(doc.clone());
//! # runtime.register::<HelloBadge>().unwrap();
//! let badge = runtime.query("hello-badge").unwrap();
//! let mut props = PropMap::new();
//! props.insert("name".into(), Value::from("filament"));
//! badge.re_render(Some(props));
//! doc.next_frame();
//!
//! assert!(doc.body_html().contains("hello, filament"));
//! ```

mod component;
mod context;
mod error;
mod props;
pub mod refs;
mod runtime;
mod styles;
mod template;
mod value;

pub use component::{Chunks, Component, Deferred, Rendered};
pub use context::RenderContext;
pub use error::Error;
pub use filament_dom::{Document, NodeId};
pub use props::{camel_case, coerce, derive_props, kebab_case};
pub use runtime::{ComponentHandle, Runtime};
pub use styles::StyleMap;
pub use template::Template;
pub use value::{Callback, PropMap, Value};
