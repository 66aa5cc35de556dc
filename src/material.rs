//! Source material introspection
//!
//! The generator never owns authored materials. It asks a [`MaterialSource`]
//! for the technique a material uses under a given scheme, and reads each
//! pass's fixed-function configuration from a [`PassDesc`].
//!
//! [`MaterialLibrary`] is a plain in-memory source, handy for tooling and
//! tests, and loadable from JSON.

use bitflags::bitflags;
use glam::Vec4;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::draw::LightType;
use crate::errors::Result;

bitflags! {
    /// Material colours that follow the vertex colour.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TrackVertexColour: u8 {
        const AMBIENT  = 1 << 0;
        const DIFFUSE  = 1 << 1;
        const SPECULAR = 1 << 2;
        const EMISSIVE = 1 << 3;
    }
}

bitflags! {
    /// Texture coordinate effects applied by a texture unit.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TextureEffects: u8 {
        const ENVIRONMENT_MAP = 1 << 0;
        const PROJECTIVE      = 1 << 1;
        const TRANSFORM       = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FogMode {
    #[default]
    None,
    Linear,
    Exp,
    Exp2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureType {
    D1,
    #[default]
    D2,
    D3,
    Cube,
}

/// Layer blend operation of a texture unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendOperation {
    Replace,
    #[default]
    Modulate,
    Add,
    Subtract,
    BlendManual,
}

/// Fixed-function configuration of one texture stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureUnitDesc {
    pub texture_type: TextureType,
    pub coord_set: u32,
    pub colour_op: BlendOperation,
    pub alpha_op: BlendOperation,
    pub effects: TextureEffects,
}

/// Multi-pass lighting: the pass is drawn once per group of lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerLightIteration {
    /// `None` means every light type, which generation cannot express.
    pub only_type: Option<LightType>,
    pub lights_per_iteration: u32,
}

/// Authored description of one draw pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassDesc {
    /// The pass already carries hand-written programs.
    pub programmable: bool,
    pub lighting: bool,
    pub vertex_colour_tracking: TrackVertexColour,
    pub shininess: f32,
    pub specular: Vec4,
    pub iterate_per_light: Option<PerLightIteration>,
    pub fog: FogMode,
    pub texture_units: SmallVec<[TextureUnitDesc; 4]>,
}

impl Default for PassDesc {
    fn default() -> Self {
        Self {
            programmable: false,
            lighting: true,
            vertex_colour_tracking: TrackVertexColour::empty(),
            shininess: 0.0,
            specular: Vec4::ZERO,
            iterate_per_light: None,
            fog: FogMode::None,
            texture_units: SmallVec::new(),
        }
    }
}

impl PassDesc {
    /// Specular highlights are visible only with a positive shininess and a non-black colour.
    #[must_use]
    pub fn has_specular(&self) -> bool {
        self.shininess > 0.0 && self.specular.truncate() != glam::Vec3::ZERO
    }
}

/// Authored technique: the passes a material draws with under one scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueDesc {
    pub scheme: String,
    pub passes: Vec<PassDesc>,
}

impl TechniqueDesc {
    #[must_use]
    pub fn new(scheme: impl Into<String>, passes: Vec<PassDesc>) -> Self {
        Self {
            scheme: scheme.into(),
            passes,
        }
    }

    /// Only purely fixed-function techniques can be regenerated.
    #[must_use]
    pub fn is_generation_eligible(&self) -> bool {
        self.passes.iter().all(|p| !p.programmable)
    }
}

/// Material introspection collaborator.
pub trait MaterialSource: Send + Sync {
    fn contains_material(&self, material: &str) -> bool;

    /// Returns the first supported technique of `material` tagged with `scheme`.
    fn find_technique(&self, material: &str, scheme: &str) -> Option<TechniqueDesc>;
}

/// Authored material: an ordered technique list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub techniques: Vec<TechniqueDesc>,
}

/// In-memory [`MaterialSource`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialLibrary {
    materials: FxHashMap<String, MaterialDesc>,
}

impl MaterialLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a library from `{ "materials": { "<name>": { "techniques": [...] } } }`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Adds or replaces a whole material.
    pub fn insert(&mut self, name: impl Into<String>, material: MaterialDesc) {
        self.materials.insert(name.into(), material);
    }

    /// Adds a material with a single technique; returns the library for chaining.
    #[must_use]
    pub fn with_technique(mut self, name: &str, technique: TechniqueDesc) -> Self {
        self.materials
            .entry(name.to_string())
            .or_default()
            .techniques
            .push(technique);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MaterialDesc> {
        self.materials.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl MaterialSource for MaterialLibrary {
    fn contains_material(&self, material: &str) -> bool {
        self.get(material).is_some()
    }

    fn find_technique(&self, material: &str, scheme: &str) -> Option<TechniqueDesc> {
        self.get(material)?
            .techniques
            .iter()
            .find(|t| t.scheme == scheme)
            .cloned()
    }
}
