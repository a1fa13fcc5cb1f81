//! Template expansion: interleaved literals and values → one markup
//! string.
//!
//! The expander is position-aware. It tracks whether each interpolation
//! site lands in content, inside a tag, inside a quoted attribute value,
//! or right at a tag name, by scanning the literal parts as they are
//! emitted:
//!
//! - Strings and numbers become text (escaped in content position,
//!   quote-safe in attribute position).
//! - `Null` disappears — in the unquoted `attr=` form the dangling
//!   attribute name is removed too, so no attribute is emitted at all.
//! - A literal ending in `...` inside a tag spreads the next value
//!   (a map or object) into one attribute per key, kebab-cased.
//! - Everything else is parked in the reference registry: attribute
//!   position embeds the identifier as the value, content position
//!   emits a `<!--fl-ref-n-->` placeholder that materialization later
//!   replaces with live nodes.
//! - An interpolation directly after `<` or `</` whose value is a
//!   registered tag name substitutes the tag text itself.
//!
//! Expansion never fails. It is a pure function of the template and the
//! interpolated values, apart from inserting registry entries scoped to
//! the rendering instance's current generation.

use filament_dom::{escape_attr, escape_text};

use crate::props::kebab_case;
use crate::refs;
use crate::value::Value;

/// A markup template: literal parts interleaved with values. Usually
/// built with the [`html!`](crate::html) macro.
#[derive(Debug, Default)]
pub struct Template {
    segs: Vec<Seg>,
}

#[derive(Debug)]
enum Seg {
    Text(String),
    Value(Value),
}

impl Template {
    pub fn new() -> Self {
        Template::default()
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.segs.push(Seg::Text(text.into()));
    }

    pub fn push_value(&mut self, value: impl Into<Value>) {
        self.segs.push(Seg::Value(value.into()));
    }

    /// Builder forms, for use without the macro.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.push_value(value);
        self
    }
}

/// Builds a [`Template`] from interleaved string literals and `{ expr }`
/// interpolations:
///
/// ```rust
/// use filament::html;
/// let t = html!["<div class=\"item\">" { "body text" } "</div>"];
/// ```
#[macro_export]
macro_rules! html {
    ($($tok:tt)*) => {{
        #[allow(unused_mut)]
        let mut template = $crate::Template::new();
        $crate::__html_segs!(template, $($tok)*);
        template
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __html_segs {
    ($t:ident,) => {};
    ($t:ident, $lit:literal $($rest:tt)*) => {
        $t.push_text($lit);
        $crate::__html_segs!($t, $($rest)*);
    };
    ($t:ident, { $val:expr } $($rest:tt)*) => {
        $t.push_value($val);
        $crate::__html_segs!($t, $($rest)*);
    };
}

/// Where the next interpolation would land.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Pos {
    Content,
    /// Directly inside `<` or `</`; `name_seen` once tag characters
    /// have been emitted.
    TagName { name_seen: bool },
    InTag,
    Quoted(char),
}

pub(crate) struct ExpandScope<'a> {
    pub owner: u64,
    pub generation: u64,
    pub is_registered_tag: &'a dyn Fn(&str) -> bool,
}

impl ExpandScope<'_> {
    fn store(&self, value: Value) -> String {
        refs::store(self.owner, self.generation, value)
    }
}

pub(crate) fn expand(template: Template, scope: &ExpandScope<'_>) -> String {
    let mut out = String::new();
    let mut pos = Pos::Content;
    let mut spread_next = false;

    for seg in template.segs {
        match seg {
            Seg::Text(text) => {
                let mut text = text.as_str();
                spread_next = false;
                if let Some(stripped) = text.strip_suffix("...") {
                    // Only meaningful in attribute position, checked
                    // after the literal has been scanned.
                    text = stripped;
                    spread_next = true;
                }
                out.push_str(text);
                pos = scan(pos, text);
                if spread_next && !matches!(pos, Pos::InTag | Pos::TagName { .. }) {
                    out.push_str("...");
                    spread_next = false;
                }
            }
            Seg::Value(value) => {
                let spread = std::mem::take(&mut spread_next);
                emit_value(&mut out, &mut pos, value, spread, scope);
            }
        }
    }
    out
}

fn emit_value(out: &mut String, pos: &mut Pos, value: Value, spread: bool, scope: &ExpandScope<'_>) {
    if spread {
        emit_spread(out, value, scope);
        return;
    }
    match *pos {
        Pos::TagName { name_seen: false } => {
            if let Value::String(tag) = &value {
                if (scope.is_registered_tag)(tag) {
                    out.push_str(tag);
                    *pos = Pos::TagName { name_seen: true };
                    return;
                }
            }
            if let Some(text) = value.primitive_text() {
                out.push_str(&escape_text(&text));
            }
        }
        Pos::TagName { name_seen: true } | Pos::InTag => match &value {
            Value::Null => strip_dangling_attr(out),
            _ => match value.primitive_text() {
                Some(text) => out.push_str(&escape_attr(&text)),
                None => out.push_str(&scope.store(value)),
            },
        },
        Pos::Quoted(_) => match &value {
            Value::Null => {}
            _ => match value.primitive_text() {
                Some(text) => out.push_str(&escape_attr(&text)),
                None => out.push_str(&scope.store(value)),
            },
        },
        Pos::Content => match &value {
            Value::Null => {}
            _ => match value.primitive_text() {
                Some(text) => out.push_str(&escape_text(&text)),
                None => {
                    let id = scope.store(value);
                    out.push_str("<!--");
                    out.push_str(&id);
                    out.push_str("-->");
                }
            },
        },
    }
}

fn emit_spread(out: &mut String, value: Value, scope: &ExpandScope<'_>) {
    let pairs: Vec<(String, Value)> = match value {
        Value::Map(map) => map.into_iter().collect(),
        Value::Data(serde_json::Value::Object(map)) => map
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::Null => Value::Null,
                    serde_json::Value::Bool(b) => Value::Bool(b),
                    serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
                    serde_json::Value::String(s) => Value::String(s),
                    other => Value::Data(other),
                };
                (k, value)
            })
            .collect(),
        // Not a spreadable shape; nothing is emitted.
        _ => return,
    };

    for (key, value) in pairs {
        if value.is_null() {
            continue;
        }
        let name = kebab_case(&key);
        let text = match value.primitive_text() {
            Some(text) => text,
            None => scope.store(value),
        };
        out.push(' ');
        out.push_str(&name);
        out.push_str("=\"");
        out.push_str(&escape_attr(&text));
        out.push('"');
    }
}

/// Removes a trailing `name=` (the unquoted form) so that a `Null`
/// interpolation emits no attribute at all.
fn strip_dangling_attr(out: &mut String) {
    if !out.ends_with('=') {
        return;
    }
    let bytes = out.as_bytes();
    let mut cut = out.len() - 1;
    while cut > 0 {
        let b = bytes[cut - 1];
        if b.is_ascii_whitespace() || b == b'<' || b == b'"' || b == b'\'' {
            break;
        }
        cut -= 1;
    }
    out.truncate(cut);
}

/// Advances the position state machine across a literal chunk.
fn scan(mut pos: Pos, text: &str) -> Pos {
    for ch in text.chars() {
        pos = match pos {
            Pos::Content => {
                if ch == '<' {
                    Pos::TagName { name_seen: false }
                } else {
                    Pos::Content
                }
            }
            Pos::TagName { name_seen } => match ch {
                '/' if !name_seen => Pos::TagName { name_seen: false },
                '>' => Pos::Content,
                c if c.is_whitespace() => Pos::InTag,
                _ => Pos::TagName { name_seen: true },
            },
            Pos::InTag => match ch {
                '>' => Pos::Content,
                '"' => Pos::Quoted('"'),
                '\'' => Pos::Quoted('\''),
                _ => Pos::InTag,
            },
            Pos::Quoted(q) => {
                if ch == q {
                    Pos::InTag
                } else {
                    Pos::Quoted(q)
                }
            }
        };
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PropMap;
    use indexmap::indexmap;

    fn plain_scope(f: &dyn Fn(&str) -> bool) -> ExpandScope<'_> {
        ExpandScope { owner: u64::MAX, generation: 1, is_registered_tag: f }
    }

    fn expand_str(t: Template) -> String {
        let none = |_: &str| false;
        expand(t, &plain_scope(&none))
    }

    #[test]
    fn strings_and_numbers_inline() {
        let t = html!["<div>" { "hi" } " " { 42.42 } "</div>"];
        assert_eq!(expand_str(t), "<div>hi 42.42</div>");
    }

    #[test]
    fn content_strings_are_escaped() {
        let t = html!["<p>" { "<b>&" } "</p>"];
        assert_eq!(expand_str(t), "<p>&lt;b&gt;&amp;</p>");
    }

    #[test]
    fn quoted_attribute_values_are_quote_safe() {
        let t = html!["<div title=\"" { "say \"hi\"" } "\"></div>"];
        assert_eq!(
            expand_str(t),
            "<div title=\"say &quot;hi&quot;\"></div>"
        );
    }

    #[test]
    fn null_omits_the_attribute() {
        let t = html!["<div num=" { Value::Null } "></div>"];
        assert_eq!(expand_str(t), "<div ></div>");
        let t = html!["<p>" { Value::Null } "</p>"];
        assert_eq!(expand_str(t), "<p></p>");
    }

    #[test]
    fn null_in_a_quoted_attribute_leaves_it_empty() {
        // Only the unquoted form is stripped; quotes pin the attribute.
        let t = html!["<div num=\"" { Value::Null } "\"></div>"];
        assert_eq!(expand_str(t), "<div num=\"\"></div>");
    }

    #[test]
    fn non_primitives_become_refs_in_attributes() {
        let t = html!["<x-a data=" { serde_json::json!([1, 2]) } "></x-a>"];
        let markup = expand_str(t);
        let id = markup
            .split("data=")
            .nth(1)
            .unwrap()
            .trim_end_matches("></x-a>");
        assert!(refs::is_ref_id(id), "got {:?}", markup);
        assert_eq!(refs::resolve(id).unwrap(), Value::Data(serde_json::json!([1, 2])));
    }

    #[test]
    fn non_primitives_become_placeholders_in_content() {
        let t = html!["<div>" { Value::Nodes(vec![]) } "</div>"];
        let markup = expand_str(t);
        assert!(markup.starts_with("<div><!--fl-ref-"), "got {:?}", markup);
        assert!(markup.ends_with("--></div>"));
    }

    #[test]
    fn spread_expands_maps() {
        let props: PropMap = indexmap! {
            "a".into() => Value::from("testing"),
            "b".into() => Value::from(2.2),
            "FooBar".into() => Value::from("\"ok\""),
            "skipped".into() => Value::Null,
        };
        let t = html!["<div ..." { props } "></div>"];
        assert_eq!(
            expand_str(t),
            "<div a=\"testing\" b=\"2.2\" foo-bar=\"&quot;ok&quot;\"></div>"
        );
    }

    #[test]
    fn spread_expands_json_objects() {
        let t = html!["<div ..." { serde_json::json!({"num": 1, "str": "X"}) } "></div>"];
        assert_eq!(expand_str(t), "<div num=\"1\" str=\"X\"></div>");
    }

    #[test]
    fn ellipsis_in_content_is_literal() {
        let t = html!["wait..." { "done" }];
        assert_eq!(expand_str(t), "wait...done");
    }

    #[test]
    fn dynamic_tag_substitutes_registered_names() {
        let registered = |tag: &str| tag == "x-item";
        let scope = plain_scope(&registered);
        let t = html!["<" { "x-item" } " a=\"1\"></" { "x-item" } ">"];
        assert_eq!(expand(t, &scope), "<x-item a=\"1\"></x-item>");
    }

    #[test]
    fn dynamic_tag_rejects_unregistered_names() {
        let t = html!["<" { "b" } ">"];
        // Not registered: inserted as text, never as a tag.
        assert_eq!(expand_str(t), "<b>");
    }
}
