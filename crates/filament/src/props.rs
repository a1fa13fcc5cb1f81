//! Attribute-to-property derivation.
//!
//! Props are computed, never stored authoritatively on the element: the
//! element's attributes plus the component's constructor-time defaults
//! are the source of truth, and derivation re-runs before every render
//! pass. The whole pipeline is total — there is no such thing as an
//! attribute that fails to coerce.
//!
//! Coercion order per attribute, first hit wins:
//!
//! 1. The raw string is a live reference identifier → the resolved
//!    value, unchanged (this is how callbacks, structured data and
//!    non-string numbers survive the trip through markup).
//! 2. The raw string matches the strict plain-decimal grammar
//!    `-?[0-9]+(\.[0-9]+)?` → a number. No exponents, no leading `+`,
//!    no `.5` / `1.` shorthand.
//! 3. Anything else → the raw string itself. A bare attribute
//!    (`disabled`) derives the empty string, and `"true"` stays a
//!    string, not a boolean.

use filament_dom::{Document, NodeId};

use crate::refs;
use crate::value::{PropMap, Value};

/// `kebab-case` → `camelCase`. Total and deterministic: the same
/// attribute name always derives the same property key.
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// `camelCase` (or `PascalCase`) → `kebab-case`.
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for ch in name.chars() {
        if ch.is_uppercase() {
            if !out.is_empty() {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn is_plain_decimal(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() {
        return false;
    }
    let mut parts = digits.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next();
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match frac_part {
        None => true,
        Some(f) => !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()),
    }
}

/// Coerces one raw attribute string into a property value.
pub fn coerce(raw: &str) -> Value {
    if refs::is_ref_id(raw) {
        if let Some(value) = refs::resolve(raw) {
            return value;
        }
        // Stale identifier: fall through and keep the raw text.
    }
    if is_plain_decimal(raw) {
        if let Ok(n) = raw.parse::<f64>() {
            if n.is_finite() {
                return Value::Number(n);
            }
        }
    }
    Value::String(raw.to_string())
}

/// Computes the effective props for an element: constructor defaults
/// first, then one entry per attribute (camelCased, coerced), attribute
/// values taking precedence. Read-only with respect to the tree.
pub fn derive_props(doc: &Document, el: NodeId, defaults: &PropMap) -> PropMap {
    let mut props = defaults.clone();
    for (name, raw) in doc.attributes(el) {
        props.insert(camel_case(&name), coerce(&raw));
    }
    props
}
