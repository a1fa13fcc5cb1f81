//! The reference registry: opaque identifiers for non-string values.
//!
//! When a template interpolates something that cannot be serialized into
//! markup (a callback, structured data, live nodes), the value is parked
//! here and the generated markup carries only the identifier. The
//! consuming side — attribute-to-prop derivation or placeholder
//! resolution at materialization — resolves the identifier back to the
//! original value, loss-free.
//!
//! The table is a process-wide singleton (thread-local: the runtime is
//! single-threaded and cooperative). Growth is bounded by generation
//! scoping: every entry records the instance that stored it and that
//! instance's render generation. After an instance commits a render
//! pass, [`sweep`] drops only that instance's entries from older
//! generations — never another instance's live entries, which is why the
//! scope is per owner rather than one global counter. If a render pass
//! fails, its sweep simply never runs: a leaked entry is recoverable,
//! a corrupted sibling is not.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::value::Value;

const REF_PREFIX: &str = "fl-ref-";

struct RefEntry {
    value: Value,
    owner: u64,
    generation: u64,
}

#[derive(Default)]
struct RefTable {
    entries: HashMap<String, RefEntry>,
    next_id: u64,
}

thread_local! {
    static REFS: RefCell<RefTable> = RefCell::new(RefTable::default());
}

/// True when `text` has the shape of a reference identifier.
pub fn is_ref_id(text: &str) -> bool {
    text.strip_prefix(REF_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Parks a value and returns a fresh identifier recorded under
/// (`owner`, `generation`).
pub(crate) fn store(owner: u64, generation: u64, value: Value) -> String {
    REFS.with(|refs| {
        let mut table = refs.borrow_mut();
        let id = format!("{}{}", REF_PREFIX, table.next_id);
        table.next_id += 1;
        tracing::trace!(id = %id, owner, generation, "ref stored");
        table.entries.insert(id.clone(), RefEntry { value, owner, generation });
        id
    })
}

/// Resolves an identifier. `None` when unknown or already swept.
pub fn resolve(id: &str) -> Option<Value> {
    REFS.with(|refs| refs.borrow().entries.get(id).map(|e| e.value.clone()))
}

/// Drops `owner`'s entries from generations older than `live`.
pub(crate) fn sweep(owner: u64, live: u64) {
    REFS.with(|refs| {
        refs.borrow_mut()
            .entries
            .retain(|_, e| e.owner != owner || e.generation >= live);
    });
}

/// Drops everything an instance ever stored. Called on disconnect, when
/// no markup of the instance remains to resolve against.
pub(crate) fn release(owner: u64) {
    REFS.with(|refs| {
        refs.borrow_mut().entries.retain(|_, e| e.owner != owner);
    });
}

/// Number of live entries. Diagnostic; used by tests to assert the
/// table stays bounded under repeated re-renders.
pub fn entry_count() -> usize {
    REFS.with(|refs| refs.borrow().entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_resolve_round_trip() {
        let id = store(1, 1, Value::from(42.42));
        assert!(is_ref_id(&id));
        assert_eq!(resolve(&id), Some(Value::Number(42.42)));
    }

    #[test]
    fn ids_are_never_reused() {
        let a = store(1, 1, Value::Null);
        let b = store(1, 1, Value::Null);
        assert_ne!(a, b);
    }

    #[test]
    fn sweep_is_scoped_to_the_owner() {
        let before = entry_count();
        let mine_old = store(10, 1, Value::from("old"));
        let mine_new = store(10, 2, Value::from("new"));
        let theirs = store(11, 1, Value::from("live"));

        sweep(10, 2);
        assert_eq!(resolve(&mine_old), None);
        assert_eq!(resolve(&mine_new), Some(Value::from("new")));
        assert_eq!(resolve(&theirs), Some(Value::from("live")));

        release(10);
        release(11);
        assert_eq!(entry_count(), before);
    }

    #[test]
    fn ref_id_shape() {
        assert!(is_ref_id("fl-ref-0"));
        assert!(is_ref_id("fl-ref-12345"));
        assert!(!is_ref_id("fl-ref-"));
        assert!(!is_ref_id("fl-ref-x"));
        assert!(!is_ref_id("something-else"));
    }
}
