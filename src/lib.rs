#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Render-state composition and compiled-state cache for automatic
//! shader-based technique generation.
//!
//! Authored fixed-function materials are retargeted to named schemes
//! (shadow casters, g-buffer passes, ...) without hand-written programs:
//! each generated pass gets a [`RenderState`] composed from built-in and
//! plugin [`Fragment`]s, deduplicated process-wide by content.

pub mod draw;
pub mod errors;
pub mod fragment;
pub mod generator;
pub mod material;
pub mod settings;
pub mod state;
pub mod utils;

pub use draw::{DrawContext, FogParams, FrameData, Light, LightType, ParameterSink};
pub use errors::{ErrorKind, Result, ShaderGenError};
pub use fragment::ffp::{
    ColourFragment, FogFragment, LightingFragment, TexturingFragment, TransformFragment,
};
pub use fragment::{DefaultFactory, Fragment, FragmentFactory, FragmentRegistry, NamedFragment};
pub use generator::{
    BuildState, DEFAULT_SCHEME_NAME, Generator, NullRealizer, PassBinding, PassHandle, PassTarget,
    ProgramRealizer, Registration, SchemeState, TechniqueKey,
};
pub use material::{MaterialLibrary, MaterialSource, PassDesc, TechniqueDesc};
pub use settings::GeneratorSettings;
pub use state::{CacheStats, LightCount, RenderState, RenderStateCache};
pub use utils::interner;
