use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::errors::Result;
use crate::fragment::{Fragment, NamedFragment, SynthesisContext, impl_fragment_boilerplate, order};
use crate::material::TextureUnitDesc;

/// Fixed-function texture stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TexturingFragment {
    pub units: SmallVec<[TextureUnitDesc; 4]>,
}

impl NamedFragment for TexturingFragment {
    const TYPE_NAME: &'static str = "FFP_Texturing";
    const EXECUTION_ORDER: i32 = order::TEXTURING;
}

impl Fragment for TexturingFragment {
    impl_fragment_boilerplate!();

    fn hash_contents(&self, mut state: &mut dyn Hasher) {
        self.units.len().hash(&mut state);
        for (sampler, unit) in self.units.iter().enumerate() {
            sampler.hash(&mut state);
            unit.hash(&mut state);
        }
    }

    fn synthesize(&mut self, ctx: &SynthesisContext<'_>) -> Result<bool> {
        self.units.clone_from(&ctx.pass.texture_units);
        Ok(!self.units.is_empty())
    }
}
