//! Error Types
//!
//! This module defines the error types used throughout the shader generator.
//!
//! # Overview
//!
//! The main error type [`ShaderGenError`] covers every failure mode of the
//! registration, lookup and validation API:
//! - Unknown fragment types, schemes, materials or techniques
//! - Conflicting registrations
//! - Source techniques that cannot be auto-generated
//! - Program realization failures reported by the backend
//!
//! Each variant is classified by [`ErrorKind`] so callers can branch on the
//! category without matching every variant.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_shadergen::errors::{ErrorKind, Result};
//!
//! match generator.create_shader_based_technique("Rock", "Default", "Shadow") {
//!     Ok(_) => {}
//!     Err(e) if e.kind() == ErrorKind::Conflict => log::warn!("{e}"),
//!     Err(e) => return Err(e),
//! }
//! ```
//!
//! The per-draw hook never returns an error; everything that can fail is
//! reported while registering or validating.

use thiserror::Error;

/// Boxed error produced by a program realization backend.
pub type RealizeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure category of a [`ShaderGenError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A looked-up entity does not exist.
    NotFound,
    /// The request contradicts an existing registration.
    Conflict,
    /// The request is well formed but cannot be honoured.
    Unsupported,
    /// The program realization backend rejected a composed state.
    Realization,
}

/// The main error type for the shader generator.
#[derive(Error, Debug)]
pub enum ShaderGenError {
    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// No factory is registered for the fragment type.
    #[error("No fragment factory registered for type '{0}'")]
    FactoryNotFound(String),

    /// The scheme has never been created.
    #[error("Scheme not found: {0}")]
    SchemeNotFound(String),

    /// The material is unknown to the material source, or has no entry.
    #[error("Material not found: {0}")]
    MaterialNotFound(String),

    /// The material has no technique tagged with the source scheme.
    #[error("Material '{material}' has no technique for scheme '{scheme}'")]
    SourceTechniqueNotFound {
        /// Material that was searched
        material: String,
        /// Requested source scheme
        scheme: String,
    },

    /// No generated technique matches the request.
    #[error("No generated technique for material '{material}' under scheme '{scheme}'")]
    TechniqueEntryNotFound {
        /// Material that was searched
        material: String,
        /// Destination scheme
        scheme: String,
    },

    /// Pass index outside the generated technique's pass list.
    #[error("Pass index {index} out of range for material '{material}' (pass count: {count})")]
    PassIndexOutOfBounds {
        /// Material that owns the technique
        material: String,
        /// The invalid index
        index: usize,
        /// Number of passes of the technique
        count: usize,
    },

    // ========================================================================
    // Conflict Errors
    // ========================================================================
    /// A factory with the same type name already exists.
    #[error("A fragment factory of type '{0}' already exists")]
    DuplicateFactory(String),

    /// The destination scheme is already generated from another source technique.
    #[error(
        "Scheme '{dst_scheme}' of material '{material}' is already generated from source scheme '{bound_src}'"
    )]
    SchemeAlreadyBound {
        /// Material concerned
        material: String,
        /// Destination scheme that is already taken
        dst_scheme: String,
        /// Source scheme the destination is bound to
        bound_src: String,
    },

    /// A build was entered while the same entity was still being built.
    #[error("Re-entrant build of scheme '{0}'")]
    ReentrantBuild(String),

    // ========================================================================
    // Unsupported Errors
    // ========================================================================
    /// The source technique contains programmable passes.
    #[error("Technique '{scheme}' of material '{material}' has programmable passes")]
    ProgrammableTechnique {
        /// Material concerned
        material: String,
        /// Source scheme of the technique
        scheme: String,
    },

    /// Per-light iteration requires a single explicit light type.
    #[error("Per-light iteration requires an explicit light type")]
    PerLightIterationWithoutType,

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// The realization backend failed to produce a program.
    #[error("Failed to realize program for scheme '{scheme}'")]
    Realization {
        /// Scheme that was being validated
        scheme: String,
        /// Error reported by the backend
        #[source]
        source: RealizeError,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ShaderGenError {
    /// Returns the failure category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FactoryNotFound(_)
            | Self::SchemeNotFound(_)
            | Self::MaterialNotFound(_)
            | Self::SourceTechniqueNotFound { .. }
            | Self::TechniqueEntryNotFound { .. }
            | Self::PassIndexOutOfBounds { .. } => ErrorKind::NotFound,
            Self::DuplicateFactory(_) | Self::SchemeAlreadyBound { .. } | Self::ReentrantBuild(_) => {
                ErrorKind::Conflict
            }
            Self::ProgrammableTechnique { .. }
            | Self::PerLightIterationWithoutType
            | Self::JsonError(_) => ErrorKind::Unsupported,
            Self::Realization { .. } => ErrorKind::Realization,
        }
    }
}

/// Alias for `Result<T, ShaderGenError>`.
pub type Result<T> = std::result::Result<T, ShaderGenError>;
