//! Program realization seam
//!
//! Turning a composed state into an executable program is the backend's
//! job. The generator only tells it which pass needs a program for which
//! state, and when a pass goes away.

use std::sync::Arc;

use super::entries::PassHandle;
use crate::errors::RealizeError;
use crate::state::RenderState;

/// Identifies the generated pass a program is realized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassTarget<'a> {
    pub handle: PassHandle,
    pub scheme: &'a str,
    pub material: &'a str,
    pub shader_language: &'a str,
}

pub trait ProgramRealizer: Send {
    /// Produces (or reuses) the program backing `state` for `target`.
    ///
    /// Must be idempotent for a state that was already realized.
    fn realize(
        &mut self,
        target: PassTarget<'_>,
        state: &Arc<RenderState>,
    ) -> Result<(), RealizeError>;

    /// The generated pass was destroyed.
    fn release(&mut self, target: PassTarget<'_>) {
        let _ = target;
    }
}

/// Realizer that never produces anything, for tooling and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRealizer;

impl ProgramRealizer for NullRealizer {
    fn realize(&mut self, _: PassTarget<'_>, _: &Arc<RenderState>) -> Result<(), RealizeError> {
        Ok(())
    }
}
