//! Per-draw inputs
//!
//! Everything the per-draw update hook reads and writes: frame transforms,
//! the active light list, and the [`ParameterSink`] through which composed
//! states push numeric constants into an already-realized program.
//!
//! Nothing in here allocates. Parameter names are `&'static str` so sinks
//! can match them without hashing a heap string.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Light categories, in the order used for per-type light limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightType {
    Point = 0,
    Directional = 1,
    Spot = 2,
}

impl LightType {
    pub const ALL: [LightType; 3] = [Self::Point, Self::Directional, Self::Spot];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A light affecting the object being drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightType,
    pub position: Vec3,
    pub direction: Vec3,
    pub diffuse: Vec4,
    pub specular: Vec4,
    /// `(range, constant, linear, quadratic)`
    pub attenuation: Vec4,
    /// Spot cone `(cos(inner / 2), cos(outer / 2), falloff)`
    pub spot: Vec3,
}

impl Light {
    /// Light used to fill slots the light list cannot satisfy.
    pub const BLANK: Light = Light {
        kind: LightType::Point,
        position: Vec3::ZERO,
        direction: Vec3::NEG_Z,
        diffuse: Vec4::ZERO,
        specular: Vec4::ZERO,
        attenuation: Vec4::new(0.0, 1.0, 0.0, 0.0),
        spot: Vec3::new(1.0, 1.0, 0.0),
    };

    #[must_use]
    pub fn directional(direction: Vec3, diffuse: Vec4) -> Self {
        Self {
            kind: LightType::Directional,
            direction,
            diffuse,
            ..Self::BLANK
        }
    }

    #[must_use]
    pub fn point(position: Vec3, diffuse: Vec4, attenuation: Vec4) -> Self {
        Self {
            kind: LightType::Point,
            position,
            diffuse,
            attenuation,
            ..Self::BLANK
        }
    }
}

/// Fog parameters of the active frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogParams {
    pub colour: Vec4,
    pub start: f32,
    pub end: f32,
    pub density: f32,
}

impl Default for FogParams {
    fn default() -> Self {
        Self {
            colour: Vec4::ONE,
            start: 0.0,
            end: 1.0,
            density: 0.001,
        }
    }
}

/// Per-object and per-frame transform data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameData {
    pub world: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub ambient: Vec4,
    pub fog: FogParams,
}

impl Default for FrameData {
    fn default() -> Self {
        Self {
            world: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            ambient: Vec4::ZERO,
            fog: FogParams::default(),
        }
    }
}

impl FrameData {
    #[inline]
    #[must_use]
    pub fn world_view_proj(&self) -> Mat4 {
        self.projection * self.view * self.world
    }
}

/// Receives numeric constants for the next draw.
///
/// Implemented by the backend per realized program.
pub trait ParameterSink {
    /// Sets the constant `name[index]` to `values`.
    fn set_floats(&mut self, name: &'static str, index: u32, values: &[f32]);
}

/// Read-only inputs handed to every fragment during the per-draw update.
#[derive(Debug, Clone, Copy)]
pub struct DrawContext<'a> {
    pub frame: &'a FrameData,
    pub lights: &'a [Light],
}
