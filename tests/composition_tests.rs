//! Render-State Composition Tests
//!
//! Tests for:
//! - Override priority: pass custom state > scheme global state > defaults
//! - Scheme-wide additions and pass-level shadowing
//! - The shadow-caster end-to-end scenario

use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use myth_shadergen::fragment::order;
use myth_shadergen::material::{FogMode, PerLightIteration};
use myth_shadergen::{
    DefaultFactory, ErrorKind, FogFragment, Fragment, Generator, GeneratorSettings, LightCount,
    LightType, LightingFragment, MaterialLibrary, NamedFragment, NullRealizer, PassDesc,
    RenderState, TechniqueDesc,
};

#[derive(Debug, Clone, Default, PartialEq)]
struct Outline {
    width: u32,
}

impl NamedFragment for Outline {
    const TYPE_NAME: &'static str = "Test_Outline";
    const EXECUTION_ORDER: i32 = order::POST_PROCESS;
}

impl Fragment for Outline {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn execution_order(&self) -> i32 {
        Self::EXECUTION_ORDER
    }

    fn hash_contents(&self, mut state: &mut dyn Hasher) {
        self.width.hash(&mut state);
    }

    fn eq_contents(&self, other: &dyn Fragment) -> bool {
        other.as_any().downcast_ref::<Self>() == Some(self)
    }

    fn copy_from(&mut self, other: &dyn Fragment) {
        if let Some(other) = other.as_any().downcast_ref::<Self>() {
            self.clone_from(other);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn generator(passes: Vec<PassDesc>) -> Generator {
    let _ = env_logger::builder().is_test(true).try_init();

    let library = MaterialLibrary::new()
        .with_technique("MaterialA", TechniqueDesc::new("Default", passes.clone()))
        .with_technique("MaterialB", TechniqueDesc::new("Default", passes));
    let generator = Generator::new(library, NullRealizer, GeneratorSettings::default());
    generator
        .add_factory(Arc::new(DefaultFactory::<Outline>::new()))
        .unwrap();
    generator
}

fn built_state(generator: &Generator, material: &str, pass: usize) -> Arc<RenderState> {
    let handle = generator.pass_handles("Shadow", material).unwrap()[pass];
    Arc::clone(generator.bind_pass(handle).unwrap().state())
}

fn outline_width(state: &RenderState) -> Option<u32> {
    state
        .fragment_by_type(Outline::TYPE_NAME)
        .and_then(|f| f.downcast_ref::<Outline>())
        .map(|o| o.width)
}

#[test]
fn shadow_scheme_disables_lighting() -> anyhow::Result<()> {
    let generator = generator(vec![PassDesc::default()]);
    generator.create_shader_based_technique("MaterialA", "Default", "Shadow")?;
    generator.edit_render_state("Shadow", |state, _| {
        state.add_fragment(Box::new(LightingFragment::disabled()));
    });

    generator.validate_scheme("Shadow")?;
    assert!(generator.is_scheme_valid("Shadow"));

    let state = built_state(&generator, "MaterialA", 0);
    let lighting: Vec<_> = state
        .fragments()
        .filter_map(|f| f.downcast_ref::<LightingFragment>())
        .collect();
    assert_eq!(lighting.len(), 1, "The override replaces the default");
    assert!(!lighting[0].enabled, "Scheme override wins over the lit default");
    Ok(())
}

#[test]
fn generator_from_json_config() -> anyhow::Result<()> {
    let library = MaterialLibrary::from_json_str(
        r#"{ "materials": { "Crate": { "techniques": [
            { "scheme": "Default", "passes": [ { "fog": "Exp" }, { "lighting": false } ] }
        ] } } }"#,
    )?;
    let settings = GeneratorSettings::from_json_str(r#"{ "default_light_count": [1, 0, 0] }"#)?;
    let generator = Generator::new(library, NullRealizer, settings);

    generator.create_shader_based_technique("Crate", "Default", "Shadow")?;
    generator.validate_scheme("Shadow")?;

    let lit = built_state(&generator, "Crate", 0);
    let unlit = built_state(&generator, "Crate", 1);
    assert_eq!(lit.light_count(), Some(LightCount::new(1, 0, 0)));
    assert!(lit.fragment_by_type(FogFragment::TYPE_NAME).is_some());
    assert!(unlit.fragment_by_type(LightingFragment::TYPE_NAME).is_none());
    Ok(())
}

#[test]
fn pass_override_beats_scheme_override() {
    let generator = generator(vec![PassDesc::default()]);
    generator
        .create_shader_based_technique("MaterialA", "Default", "Shadow")
        .unwrap();
    generator.edit_render_state("Shadow", |state, _| {
        state.add_fragment(Box::new(FogFragment {
            mode: FogMode::Linear,
        }));
    });
    generator
        .edit_pass_render_state("Shadow", "MaterialA", 0, |state, _| {
            state.add_fragment(Box::new(FogFragment { mode: FogMode::Exp2 }));
        })
        .unwrap();

    generator.validate_scheme("Shadow").unwrap();

    let fog = built_state(&generator, "MaterialA", 0)
        .fragment_at(FogFragment::EXECUTION_ORDER)
        .and_then(|f| f.downcast_ref::<FogFragment>())
        .map(|f| f.mode);
    assert_eq!(fog, Some(FogMode::Exp2));
}

#[test]
fn scheme_additions_reach_every_pass() {
    let generator = generator(vec![PassDesc::default(), PassDesc::default()]);
    generator
        .create_shader_based_technique("MaterialA", "Default", "Shadow")
        .unwrap();
    generator
        .create_shader_based_technique("MaterialB", "Default", "Shadow")
        .unwrap();
    generator.edit_render_state("Shadow", |state, _| {
        state.add_fragment(Box::new(Outline { width: 2 }));
    });

    generator.validate_scheme("Shadow").unwrap();

    for material in ["MaterialA", "MaterialB"] {
        for pass in 0..2 {
            let state = built_state(&generator, material, pass);
            assert_eq!(outline_width(&state), Some(2));
            let last = state.fragments().last().map(|f| f.type_name());
            assert_eq!(last, Some(Outline::TYPE_NAME), "Fragments stay ordered");
        }
    }
    assert_eq!(generator.cache_len(), 1);
}

#[test]
fn pass_addition_shadows_scheme_addition_at_same_slot() {
    let generator = generator(vec![PassDesc::default()]);
    generator
        .create_shader_based_technique("MaterialA", "Default", "Shadow")
        .unwrap();
    generator
        .create_shader_based_technique("MaterialB", "Default", "Shadow")
        .unwrap();
    generator.edit_render_state("Shadow", |state, _| {
        state.add_fragment(Box::new(Outline { width: 2 }));
    });
    generator
        .edit_pass_render_state("Shadow", "MaterialB", 0, |state, _| {
            state.add_fragment(Box::new(Outline { width: 5 }));
        })
        .unwrap();

    generator.validate_scheme("Shadow").unwrap();

    let a = built_state(&generator, "MaterialA", 0);
    let b = built_state(&generator, "MaterialB", 0);
    assert_eq!(outline_width(&a), Some(2));
    assert_eq!(outline_width(&b), Some(5));
    assert_eq!(b.len(), a.len(), "Only one outline per pass");
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn pass_state_of_unknown_pass_is_not_found() {
    let generator = generator(vec![PassDesc::default()]);
    generator
        .create_shader_based_technique("MaterialA", "Default", "Shadow")
        .unwrap();

    let err = generator
        .edit_pass_render_state("Shadow", "MaterialA", 1, |_, _| ())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let missing_material = generator.edit_pass_render_state("Shadow", "MaterialB", 0, |_, _| ());
    assert!(missing_material.is_err());
    let missing_scheme = generator.edit_pass_render_state("GBuffer", "MaterialA", 0, |_, _| ());
    assert!(missing_scheme.is_err());
}

#[test]
fn scheme_light_limits_feed_lighting() {
    let generator = generator(vec![PassDesc::default()]);
    generator
        .create_shader_based_technique("MaterialA", "Default", "Shadow")
        .unwrap();
    generator.edit_render_state("Shadow", |state, _| {
        state.set_light_count(Some(LightCount::new(0, 3, 0)));
    });

    generator.validate_scheme("Shadow").unwrap();

    let state = built_state(&generator, "MaterialA", 0);
    assert_eq!(state.light_count(), Some(LightCount::new(0, 3, 0)));
    let lighting = state
        .fragment_by_type(LightingFragment::TYPE_NAME)
        .and_then(|f| f.downcast_ref::<LightingFragment>())
        .unwrap();
    assert_eq!(lighting.light_count.get(LightType::Directional), 3);
}

#[test]
fn settings_light_limits_are_the_fallback() {
    let library = MaterialLibrary::new()
        .with_technique("MaterialA", TechniqueDesc::new("Default", vec![PassDesc::default()]));
    let settings = GeneratorSettings {
        default_light_count: LightCount::new(2, 1, 0),
        ..Default::default()
    };
    let generator = Generator::new(library, NullRealizer, settings);
    generator
        .create_shader_based_technique("MaterialA", "Default", "Shadow")
        .unwrap();
    generator.validate_scheme("Shadow").unwrap();

    let state = built_state(&generator, "MaterialA", 0);
    assert_eq!(state.light_count(), Some(LightCount::new(2, 1, 0)));
}

#[test]
fn untyped_per_light_iteration_fails_validation() {
    let pass = PassDesc {
        iterate_per_light: Some(PerLightIteration {
            only_type: None,
            lights_per_iteration: 1,
        }),
        ..Default::default()
    };
    let generator = generator(vec![pass]);
    generator
        .create_shader_based_technique("MaterialA", "Default", "Shadow")
        .unwrap();

    let err = generator.validate_scheme("Shadow").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert!(!generator.is_scheme_valid("Shadow"));

    // Forcing lighting off for the scheme makes the pass buildable.
    generator.edit_render_state("Shadow", |state, _| {
        state.add_fragment(Box::new(LightingFragment::disabled()));
    });
    generator.validate_scheme("Shadow").unwrap();
}

#[test]
fn edited_states_take_fragments_from_the_registry() -> anyhow::Result<()> {
    let generator = generator(vec![PassDesc::default()]);
    generator.create_shader_based_technique("MaterialA", "Default", "Shadow")?;

    generator.edit_render_state("Shadow", |state, registry| -> myth_shadergen::Result<()> {
        let mut lighting = registry.create(LightingFragment::TYPE_NAME)?;
        if let Some(lighting) = lighting.downcast_mut::<LightingFragment>() {
            lighting.enabled = false;
        }
        state.add_fragment(lighting);
        Ok(())
    })?;
    generator.edit_pass_render_state("Shadow", "MaterialA", 0, |state, registry| {
        registry
            .create(Outline::TYPE_NAME)
            .map(|outline| state.add_fragment(outline))
    })??;

    // The lock is free again once the edit returns.
    assert!(generator.has_factory(Outline::TYPE_NAME));
    generator.validate_scheme("Shadow")?;

    let state = built_state(&generator, "MaterialA", 0);
    let lighting = state
        .fragment_by_type(LightingFragment::TYPE_NAME)
        .and_then(|f| f.downcast_ref::<LightingFragment>())
        .map(|l| l.enabled);
    assert_eq!(lighting, Some(false));
    assert_eq!(outline_width(&state), Some(0));
    Ok(())
}

#[test]
fn disabled_lighting_states_share_one_cache_entry() {
    let generator = generator(vec![PassDesc::default()]);
    generator
        .create_shader_based_technique("MaterialA", "Default", "Shadow")
        .unwrap();
    generator
        .create_shader_based_technique("MaterialB", "Default", "Shadow")
        .unwrap();
    generator
        .edit_pass_render_state("Shadow", "MaterialA", 0, |state, _| {
            state.add_fragment(Box::new(LightingFragment::disabled()));
        })
        .unwrap();
    generator
        .edit_pass_render_state("Shadow", "MaterialB", 0, |state, _| {
            state.add_fragment(Box::new(LightingFragment {
                light_count: LightCount::new(1, 0, 0),
                ..LightingFragment::disabled()
            }));
        })
        .unwrap();

    generator.validate_scheme("Shadow").unwrap();

    let a = built_state(&generator, "MaterialA", 0);
    let b = built_state(&generator, "MaterialB", 0);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(generator.cache_stats().collisions, 0);
    assert_eq!(generator.cache_len(), 1);
}

#[test]
fn render_states_lists_final_states_in_pass_order() {
    let unlit = PassDesc {
        lighting: false,
        ..Default::default()
    };
    let generator = generator(vec![PassDesc::default(), unlit]);
    generator
        .create_shader_based_technique("MaterialA", "Default", "Shadow")
        .unwrap();
    assert!(generator.render_states("Shadow", "MaterialA").unwrap().is_empty());

    generator.validate_scheme("Shadow").unwrap();
    let states = generator.render_states("Shadow", "MaterialA").unwrap();
    assert_eq!(states.len(), 2);
    assert!(Arc::ptr_eq(&states[1], &built_state(&generator, "MaterialA", 1)));
    assert!(states[0].fragment_by_type(LightingFragment::TYPE_NAME).is_some());
    assert!(states[1].fragment_by_type(LightingFragment::TYPE_NAME).is_none());

    let err = generator.render_states("GBuffer", "MaterialA").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn changing_default_light_count_rebuilds_schemes() {
    let generator = generator(vec![PassDesc::default()]);
    generator
        .create_shader_based_technique("MaterialA", "Default", "Shadow")
        .unwrap();
    generator.validate_scheme("Shadow").unwrap();
    assert_eq!(generator.default_light_count(), LightCount::ZERO);

    generator.set_default_light_count(LightCount::new(0, 2, 0));
    assert!(!generator.is_scheme_valid("Shadow"));

    generator.validate_scheme("Shadow").unwrap();
    let state = built_state(&generator, "MaterialA", 0);
    assert_eq!(state.light_count(), Some(LightCount::new(0, 2, 0)));
    assert_eq!(generator.settings().default_light_count, LightCount::new(0, 2, 0));
}
