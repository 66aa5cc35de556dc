use std::hash::Hasher;

use crate::draw::{DrawContext, ParameterSink};
use crate::fragment::{Fragment, NamedFragment, impl_fragment_boilerplate, order};

/// Object-to-clip transform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformFragment;

impl NamedFragment for TransformFragment {
    const TYPE_NAME: &'static str = "FFP_Transform";
    const EXECUTION_ORDER: i32 = order::TRANSFORM;
}

impl Fragment for TransformFragment {
    impl_fragment_boilerplate!();

    fn hash_contents(&self, _state: &mut dyn Hasher) {}

    fn update_params(&self, ctx: &DrawContext<'_>, sink: &mut dyn ParameterSink) {
        sink.set_floats(
            "world_view_proj",
            0,
            &ctx.frame.world_view_proj().to_cols_array(),
        );
    }
}
