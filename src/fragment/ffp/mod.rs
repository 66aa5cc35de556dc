//! Built-in fixed-function fragments
//!
//! The default composed state of a pass is synthesised from these, one per
//! slot in [`BUILTIN_SLOTS`] order, unless an override occupies the slot.

mod colour;
mod fog;
mod lighting;
mod texturing;
mod transform;

use std::sync::Arc;

pub use colour::ColourFragment;
pub use fog::FogFragment;
pub use lighting::LightingFragment;
pub use texturing::TexturingFragment;
pub use transform::TransformFragment;

use super::{DefaultFactory, FragmentFactory, NamedFragment};

/// `(execution order, type name)` of every fixed-function slot, ascending.
pub const BUILTIN_SLOTS: [(i32, &str); 5] = [
    (TransformFragment::EXECUTION_ORDER, TransformFragment::TYPE_NAME),
    (ColourFragment::EXECUTION_ORDER, ColourFragment::TYPE_NAME),
    (LightingFragment::EXECUTION_ORDER, LightingFragment::TYPE_NAME),
    (TexturingFragment::EXECUTION_ORDER, TexturingFragment::TYPE_NAME),
    (FogFragment::EXECUTION_ORDER, FogFragment::TYPE_NAME),
];

pub(crate) fn builtin_factories() -> [Arc<dyn FragmentFactory>; 5] {
    [
        Arc::new(DefaultFactory::<TransformFragment>::new()),
        Arc::new(DefaultFactory::<ColourFragment>::new()),
        Arc::new(DefaultFactory::<LightingFragment>::new()),
        Arc::new(DefaultFactory::<TexturingFragment>::new()),
        Arc::new(DefaultFactory::<FogFragment>::new()),
    ]
}
