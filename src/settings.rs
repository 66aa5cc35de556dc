//! Generator Settings
//!
//! Configuration fixed for the lifetime of a [`Generator`].
//!
//! ```rust,ignore
//! use myth_shadergen::{GeneratorSettings, LightCount};
//!
//! let settings = GeneratorSettings {
//!     default_light_count: LightCount::new(0, 1, 0),
//!     ..Default::default()
//! };
//!
//! // Or from a config file
//! let settings = GeneratorSettings::from_json_str(r#"{ "shader_language": "glsl" }"#)?;
//! ```
//!
//! [`Generator`]: crate::generator::Generator

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::state::LightCount;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Light limits used when neither the pass nor the scheme sets any.
    pub default_light_count: LightCount,

    /// Structurally compare cached states on a hash hit.
    ///
    /// Turning this off trusts the 128-bit content hash alone.
    pub verify_cache_hits: bool,

    /// Passed through to the program realizer.
    pub shader_language: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            default_light_count: LightCount::ZERO,
            verify_cache_hits: true,
            shader_language: "wgsl".to_string(),
        }
    }
}

impl GeneratorSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
