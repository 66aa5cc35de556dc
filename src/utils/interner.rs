//! Global String Interner
//!
//! Turns strings into compact integer [`Symbol`]s for cheap comparison and
//! hashing. Scheme names, material names and fragment type names all go
//! through here.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact integer identifier for an interned string.
pub type Symbol = Spur;

/// Interns a string, returning its Symbol.
///
/// Returns the existing Symbol if the string was interned before.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up the Symbol of an already interned string.
///
/// Never allocates; returns `None` if the string was never interned.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a Symbol back to its string.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Pre-interns the names every generator uses.
pub fn preload_common_names() {
    use crate::fragment::NamedFragment;

    let common = [
        crate::generator::DEFAULT_SCHEME_NAME,
        crate::fragment::ffp::TransformFragment::TYPE_NAME,
        crate::fragment::ffp::ColourFragment::TYPE_NAME,
        crate::fragment::ffp::LightingFragment::TYPE_NAME,
        crate::fragment::ffp::TexturingFragment::TYPE_NAME,
        crate::fragment::ffp::FogFragment::TYPE_NAME,
    ];

    for name in common {
        intern(name);
    }
}
