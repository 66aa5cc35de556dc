//! Material → Technique → Pass hierarchy
//!
//! Technique Entries live in a slotmap arena; Material Entries and Schemes
//! refer to them by [`TechniqueKey`]. Pass Entries are owned inline by their
//! technique and addressed as `(technique, index)`.

use std::sync::Arc;

use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::material::PassDesc;
use crate::state::RenderState;
use crate::utils::{ChangeTracker, Symbol, interner};

new_key_type! {
    /// Stable identifier of a generated technique.
    pub struct TechniqueKey;
}

/// Addresses one generated pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassHandle {
    pub technique: TechniqueKey,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemeState {
    #[default]
    Invalid,
    Validating,
    Valid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildState {
    #[default]
    NotBuilt,
    Building,
    Built,
}

/// Outcome of a successful technique registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created(TechniqueKey),
    /// The same source → destination mapping already existed.
    AlreadyRegistered(TechniqueKey),
}

impl Registration {
    #[must_use]
    pub fn key(self) -> TechniqueKey {
        match self {
            Self::Created(key) | Self::AlreadyRegistered(key) => key,
        }
    }
}

pub(crate) struct PassEntry {
    pub source: PassDesc,
    pub custom_state: Option<RenderState>,
    pub final_state: Option<Arc<RenderState>>,
}

impl PassEntry {
    pub fn new(source: PassDesc) -> Self {
        Self {
            source,
            custom_state: None,
            final_state: None,
        }
    }
}

pub(crate) struct TechniqueEntry {
    pub material: Symbol,
    pub src_scheme: Symbol,
    pub dst_scheme: Symbol,
    pub passes: Vec<PassEntry>,
    pub build_state: BuildState,
}

impl TechniqueEntry {
    pub fn material_name(&self) -> &'static str {
        interner::resolve(self.material)
    }

    pub fn scheme_name(&self) -> &'static str {
        interner::resolve(self.dst_scheme)
    }
}

#[derive(Default)]
pub(crate) struct MaterialEntry {
    pub techniques: SmallVec<[TechniqueKey; 2]>,
}

pub(crate) struct Scheme {
    pub name: Symbol,
    pub state: SchemeState,
    pub global_state: Option<RenderState>,
    /// Registration order.
    pub techniques: Vec<TechniqueKey>,
    pub revision: ChangeTracker,
}

impl Scheme {
    pub fn new(name: Symbol) -> Self {
        Self {
            name,
            state: SchemeState::Invalid,
            global_state: None,
            techniques: Vec::new(),
            revision: ChangeTracker::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        interner::resolve(self.name)
    }

    /// Structural change: the next validation must run again.
    pub fn mark_invalid(&mut self) {
        self.state = SchemeState::Invalid;
        self.revision.changed();
    }
}
