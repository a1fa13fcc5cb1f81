//! Error types for component registration.
//!
//! Registration is the only fallible surface the runtime exposes.
//! Everything downstream is deliberately total: attribute coercion
//! always produces a value, template expansion never fails, and an
//! unresolvable placeholder materializes as nothing. A render function
//! that panics propagates to the embedder unchanged; the runtime's own
//! bookkeeping stays consistent (the pending reference sweep is simply
//! skipped for that pass).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The tag is already bound to a different component type. Binding
    /// the same component to the same tag again is a no-op, not an
    /// error.
    #[error("tag `{0}` is already registered with a different component")]
    RegistrationConflict(String),

    /// Component tags must be kebab-case and contain at least one
    /// hyphen, so they can never collide with built-in element names.
    #[error("invalid component tag name `{0}` (expected kebab-case with a hyphen)")]
    InvalidTagName(String),
}
