use std::hash::{Hash, Hasher};

use crate::draw::{DrawContext, ParameterSink};
use crate::errors::Result;
use crate::fragment::{Fragment, NamedFragment, SynthesisContext, impl_fragment_boilerplate, order};
use crate::material::FogMode;

/// Per-vertex fog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FogFragment {
    pub mode: FogMode,
}

impl NamedFragment for FogFragment {
    const TYPE_NAME: &'static str = "FFP_Fog";
    const EXECUTION_ORDER: i32 = order::FOG;
}

impl Fragment for FogFragment {
    impl_fragment_boilerplate!();

    fn hash_contents(&self, mut state: &mut dyn Hasher) {
        self.mode.hash(&mut state);
    }

    fn synthesize(&mut self, ctx: &SynthesisContext<'_>) -> Result<bool> {
        self.mode = ctx.pass.fog;
        Ok(self.mode != FogMode::None)
    }

    fn update_params(&self, ctx: &DrawContext<'_>, sink: &mut dyn ParameterSink) {
        if self.mode == FogMode::None {
            return;
        }
        let fog = &ctx.frame.fog;
        let range = fog.end - fog.start;
        let inv_range = if range.abs() > f32::EPSILON { range.recip() } else { 0.0 };

        sink.set_floats("fog_colour", 0, &fog.colour.to_array());
        sink.set_floats("fog_params", 0, &[fog.density, fog.start, fog.end, inv_range]);
    }
}
