use std::hash::{Hash, Hasher};

use crate::draw::{DrawContext, Light, LightType, ParameterSink};
use crate::errors::{Result, ShaderGenError};
use crate::fragment::{Fragment, NamedFragment, SynthesisContext, impl_fragment_boilerplate, order};
use crate::material::TrackVertexColour;
use crate::state::LightCount;

/// Per-vertex lighting.
///
/// Authoring one with `enabled = false` into a scheme's global state turns
/// lighting off for every pass of that scheme.
#[derive(Debug, Clone, Eq)]
pub struct LightingFragment {
    pub enabled: bool,
    pub light_count: LightCount,
    pub specular: bool,
    pub tracking: TrackVertexColour,
}

impl Default for LightingFragment {
    fn default() -> Self {
        Self {
            enabled: true,
            light_count: LightCount::ZERO,
            specular: false,
            tracking: TrackVertexColour::empty(),
        }
    }
}

// Disabled lighting is one state whatever the other fields hold, matching
// `hash_contents`.
impl PartialEq for LightingFragment {
    fn eq(&self, other: &Self) -> bool {
        match (self.enabled, other.enabled) {
            (false, false) => true,
            (true, true) => {
                self.light_count == other.light_count
                    && self.specular == other.specular
                    && self.tracking == other.tracking
            }
            _ => false,
        }
    }
}

impl LightingFragment {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl NamedFragment for LightingFragment {
    const TYPE_NAME: &'static str = "FFP_Lighting";
    const EXECUTION_ORDER: i32 = order::LIGHTING;
}

impl Fragment for LightingFragment {
    impl_fragment_boilerplate!();

    fn hash_contents(&self, mut state: &mut dyn Hasher) {
        self.enabled.hash(&mut state);
        if self.enabled {
            self.light_count.hash(&mut state);
            self.specular.hash(&mut state);
            self.tracking.hash(&mut state);
        }
    }

    fn synthesize(&mut self, ctx: &SynthesisContext<'_>) -> Result<bool> {
        let pass = ctx.pass;
        if !pass.lighting {
            return Ok(false);
        }

        self.enabled = true;
        self.tracking = pass.vertex_colour_tracking;
        self.specular = pass.has_specular();
        self.light_count = ctx.light_count;

        if let Some(iteration) = pass.iterate_per_light {
            let only = iteration
                .only_type
                .ok_or(ShaderGenError::PerLightIterationWithoutType)?;
            self.light_count = LightCount::only(only, iteration.lights_per_iteration);
        }

        Ok(true)
    }

    fn update_params(&self, ctx: &DrawContext<'_>, sink: &mut dyn ParameterSink) {
        if !self.enabled {
            return;
        }

        sink.set_floats("ambient", 0, &ctx.frame.ambient.to_array());

        let view = ctx.frame.view;
        let mut slot = 0u32;
        for kind in LightType::ALL {
            let mut cursor = 0usize;
            for _ in 0..self.light_count.get(kind) {
                // Take the next light of this type, or a blank one once exhausted.
                let light = match ctx.lights[cursor..].iter().position(|l| l.kind == kind) {
                    Some(offset) => {
                        cursor += offset + 1;
                        &ctx.lights[cursor - 1]
                    }
                    None => {
                        cursor = ctx.lights.len();
                        &Light::BLANK
                    }
                };

                match kind {
                    LightType::Directional => {
                        let dir = view.transform_vector3(-light.direction).normalize_or_zero();
                        sink.set_floats("light_direction", slot, &dir.extend(0.0).to_array());
                    }
                    LightType::Point => {
                        let pos = view.transform_point3(light.position);
                        sink.set_floats("light_position", slot, &pos.extend(1.0).to_array());
                        sink.set_floats("light_attenuation", slot, &light.attenuation.to_array());
                    }
                    LightType::Spot => {
                        let pos = view.transform_point3(light.position);
                        let dir = view.transform_vector3(-light.direction).normalize_or_zero();
                        sink.set_floats("light_position", slot, &pos.extend(1.0).to_array());
                        sink.set_floats("light_direction", slot, &dir.extend(0.0).to_array());
                        sink.set_floats("light_attenuation", slot, &light.attenuation.to_array());
                        sink.set_floats("light_spot", slot, &light.spot.to_array());
                    }
                }

                sink.set_floats("light_diffuse", slot, &light.diffuse.to_array());
                if self.specular {
                    sink.set_floats("light_specular", slot, &light.specular.to_array());
                }
                slot += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::FrameData;
    use crate::material::{PassDesc, PerLightIteration};
    use glam::{Vec3, Vec4};

    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<(&'static str, u32, Vec<f32>)>,
    }

    impl ParameterSink for RecordingSink {
        fn set_floats(&mut self, name: &'static str, index: u32, values: &[f32]) {
            self.calls.push((name, index, values.to_vec()));
        }
    }

    fn ctx(pass: &PassDesc, light_count: LightCount) -> SynthesisContext<'_> {
        SynthesisContext { pass, light_count }
    }

    #[test]
    fn unlit_pass_drops_fragment() {
        let pass = PassDesc {
            lighting: false,
            ..Default::default()
        };
        let mut lighting = LightingFragment::default();
        assert!(!lighting.synthesize(&ctx(&pass, LightCount::ZERO)).unwrap());
    }

    #[test]
    fn per_light_iteration_narrows_to_one_type() {
        let pass = PassDesc {
            iterate_per_light: Some(PerLightIteration {
                only_type: Some(LightType::Spot),
                lights_per_iteration: 2,
            }),
            ..Default::default()
        };
        let mut lighting = LightingFragment::default();
        assert!(lighting
            .synthesize(&ctx(&pass, LightCount::new(4, 4, 4)))
            .unwrap());
        assert_eq!(lighting.light_count, LightCount::new(0, 0, 2));
    }

    #[test]
    fn per_light_iteration_without_type_is_unsupported() {
        let pass = PassDesc {
            iterate_per_light: Some(PerLightIteration {
                only_type: None,
                lights_per_iteration: 1,
            }),
            ..Default::default()
        };
        let mut lighting = LightingFragment::default();
        assert!(lighting.synthesize(&ctx(&pass, LightCount::ZERO)).is_err());
    }

    #[test]
    fn disabled_hash_ignores_other_fields() {
        use xxhash_rust::xxh3::Xxh3;

        let mut a = LightingFragment::disabled();
        let mut b = LightingFragment::disabled();
        b.light_count = LightCount::new(1, 1, 1);

        let mut ha = Xxh3::new();
        a.hash_contents(&mut ha);
        let mut hb = Xxh3::new();
        b.hash_contents(&mut hb);
        assert_eq!(ha.digest128(), hb.digest128());

        a.enabled = true;
        let mut ha = Xxh3::new();
        a.hash_contents(&mut ha);
        assert_ne!(ha.digest128(), hb.digest128());
    }

    #[test]
    fn disabled_equality_ignores_other_fields() {
        let a = LightingFragment::disabled();
        let b = LightingFragment {
            light_count: LightCount::new(1, 0, 0),
            specular: true,
            ..LightingFragment::disabled()
        };
        assert_eq!(a, b);
        assert!(a.eq_contents(&b));
        assert_ne!(a, LightingFragment::default());

        let lit = LightingFragment::default();
        let brighter = LightingFragment {
            light_count: LightCount::new(1, 0, 0),
            ..Default::default()
        };
        assert_ne!(lit, brighter);
    }

    #[test]
    fn update_matches_lights_by_type_and_pads_with_blank() {
        let lighting = LightingFragment {
            light_count: LightCount::new(0, 2, 0),
            ..Default::default()
        };
        let lights = [
            Light::point(Vec3::ONE, Vec4::ONE, Vec4::new(10.0, 1.0, 0.0, 0.0)),
            Light::directional(Vec3::NEG_Y, Vec4::new(0.5, 0.5, 0.5, 1.0)),
        ];
        let frame = FrameData::default();
        let mut sink = RecordingSink::default();

        lighting.update_params(
            &DrawContext {
                frame: &frame,
                lights: &lights,
            },
            &mut sink,
        );

        let diffuse: Vec<_> = sink
            .calls
            .iter()
            .filter(|(name, _, _)| *name == "light_diffuse")
            .collect();
        assert_eq!(diffuse.len(), 2);
        assert_eq!(diffuse[0].2, vec![0.5, 0.5, 0.5, 1.0]);
        assert_eq!(diffuse[1].2, vec![0.0; 4], "Second slot falls back to the blank light");
        assert!(sink.calls.iter().all(|(name, _, _)| *name != "light_position"));
    }
}
