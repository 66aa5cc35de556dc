use std::hash::{Hash, Hasher};

use crate::errors::Result;
use crate::fragment::{Fragment, NamedFragment, SynthesisContext, impl_fragment_boilerplate, order};
use crate::material::TrackVertexColour;

/// Vertex colour routing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColourFragment {
    pub tracking: TrackVertexColour,
}

impl NamedFragment for ColourFragment {
    const TYPE_NAME: &'static str = "FFP_Colour";
    const EXECUTION_ORDER: i32 = order::COLOUR;
}

impl Fragment for ColourFragment {
    impl_fragment_boilerplate!();

    fn hash_contents(&self, mut state: &mut dyn Hasher) {
        self.tracking.hash(&mut state);
    }

    fn synthesize(&mut self, ctx: &SynthesisContext<'_>) -> Result<bool> {
        self.tracking = ctx.pass.vertex_colour_tracking;
        Ok(true)
    }
}
