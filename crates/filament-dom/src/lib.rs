//! # Filament DOM - In-Memory Host Tree
//!
//! `filament-dom` provides the host-platform services the `filament`
//! component engine builds on: an element tree, markup parsing and
//! serialization, tag-to-reactor binding with upgrade notifications, and
//! a frame/timeout scheduler driven by a virtual clock.
//!
//! The crate is deliberately small. It is not a browser: there is no
//! layout, no events, no CSS engine. It models exactly the surface a
//! component runtime needs — create nodes, move them around, be told when
//! a registered tag enters or leaves the connected tree, and batch visual
//! work behind frame checkpoints.
//!
//! ## Core Concepts
//!
//! - [`Document`]: a cheaply clonable handle over the node arena. All
//!   mutation goes through it.
//! - [`NodeId`]: stable identity for a node. Detaching a node keeps its
//!   id valid; the arena never recycles slots.
//! - [`ElementReactor`]: callback pair a runtime binds to a tag via
//!   [`Document::define`]. Reactors are notified when a matching element
//!   becomes connected or disconnected, in document order.
//! - Scheduler: [`Document::request_frame`] and [`Document::set_timeout`]
//!   queue work against a virtual clock that tests advance explicitly
//!   with [`Document::next_frame`], [`Document::advance`] and
//!   [`Document::run_until_stalled`].
//!
//! ## Quick Start
//!
//! ```rust
//! use filament_dom::Document;
//!
//! let doc = Document::new();
//! doc.set_body_html("<div id=\"greeting\">hello, <b>world</b></div>");
//!
//! let div = doc.get_element_by_id("greeting").unwrap();
//! assert_eq!(doc.text_content(div), "hello, world");
//! assert_eq!(doc.inner_html(div), "hello, <b>world</b>");
//! ```
//!
//! ## Notifications
//!
//! Reactors run after the mutation that triggered them has fully
//! committed and the arena borrow has been released, so a reactor may
//! freely mutate the tree (including replacing the children of the node
//! it was notified about). Nested mutations drain the pending
//! notification queue to completion before the outer mutation returns,
//! which is what makes synchronous component composition possible.

mod arena;
mod document;
mod parse;
mod schedule;
mod selector;
mod serialize;

pub use arena::{NodeData, NodeId};
pub use document::{Document, ElementReactor};
pub use parse::parse_fragment;
pub use serialize::{escape_attr, escape_text};
