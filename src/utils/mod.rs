//! Utility Module
//!
//! - [`interner`]: String interning for scheme, material and fragment names
//! - [`version_tracker`]: Monotonic revision counters
//!
//! # String Interning
//!
//! Scheme and material names are looked up on every registration and
//! validation call. Interning them once turns those lookups into integer
//! comparisons.
//!
//! ```rust,ignore
//! use myth_shadergen::utils::interner;
//!
//! let sym1 = interner::intern("ShadowCaster");
//! let sym2 = interner::intern("ShadowCaster");
//! assert_eq!(sym1, sym2); // O(1) comparison
//! ```

pub mod interner;
pub mod version_tracker;

pub use interner::Symbol;
pub use version_tracker::ChangeTracker;
