//! Render-state fragments
//!
//! A [`Fragment`] is one independently implemented unit of shading behaviour
//! (lighting, fog, texturing, ...) with a fixed execution order. Composed
//! render states are ordered lists of fragments.
//!
//! # Extensibility
//!
//! Fragments are an open plugin interface: third-party code implements
//! [`Fragment`], registers a [`FragmentFactory`] under the fragment's type
//! name, and the generator can then clone, hash and compare instances
//! without knowing the concrete type. For fragments with a default
//! constructor, [`DefaultFactory`] is enough:
//!
//! ```rust,ignore
//! generator.add_factory(Arc::new(DefaultFactory::<MyRimLight>::new()))?;
//! ```
//!
//! # Execution Order
//!
//! Built-in fixed-function slots use the [`order`] constants. Custom
//! fragments pick any other value; the composed state keeps fragments sorted
//! ascending.

pub mod ffp;
pub mod registry;

use std::any::Any;
use std::fmt;
use std::hash::Hasher;

pub use registry::{DefaultFactory, FragmentFactory, FragmentRegistry};

use crate::draw::{DrawContext, ParameterSink};
use crate::errors::Result;
use crate::material::PassDesc;
use crate::state::LightCount;

/// Execution order of the built-in fixed-function slots.
pub mod order {
    pub const TRANSFORM: i32 = 100;
    pub const COLOUR: i32 = 200;
    pub const LIGHTING: i32 = 300;
    pub const TEXTURING: i32 = 400;
    pub const FOG: i32 = 500;
    pub const POST_PROCESS: i32 = 2000;
}

/// Inputs available when deriving a default fragment from an authored pass.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisContext<'a> {
    pub pass: &'a PassDesc,
    /// Light limits resolved for this pass (custom > scheme > settings).
    pub light_count: LightCount,
}

/// One composable unit of shading behaviour.
pub trait Fragment: Any + Send + Sync + fmt::Debug {
    /// Registry key of the factory that creates this fragment.
    fn type_name(&self) -> &'static str;

    fn execution_order(&self) -> i32;

    /// Feeds every field that affects the generated program into `state`.
    fn hash_contents(&self, state: &mut dyn Hasher);

    /// Structural equality with another fragment of any type.
    fn eq_contents(&self, other: &dyn Fragment) -> bool;

    /// Value-copies `other` into `self`. Fragments of another type are ignored.
    fn copy_from(&mut self, other: &dyn Fragment);

    /// Configures `self` as the default for `ctx.pass`.
    ///
    /// Returns `Ok(false)` when the fragment does not apply to the pass and
    /// should be dropped.
    fn synthesize(&mut self, ctx: &SynthesisContext<'_>) -> Result<bool> {
        let _ = ctx;
        Ok(true)
    }

    /// Pushes per-object / per-frame constants. Runs on the draw hot path.
    fn update_params(&self, ctx: &DrawContext<'_>, sink: &mut dyn ParameterSink) {
        let _ = (ctx, sink);
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Fragment + '_ {
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Fragment>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    #[inline]
    #[must_use]
    pub fn downcast_mut<T: Fragment>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Static identity of a concrete fragment type.
pub trait NamedFragment: Fragment + Default {
    const TYPE_NAME: &'static str;
    const EXECUTION_ORDER: i32;
}

/// Implements the identity, equality, copy and downcast parts of
/// [`Fragment`] for a `Clone + PartialEq` type implementing [`NamedFragment`].
macro_rules! impl_fragment_boilerplate {
    () => {
        fn type_name(&self) -> &'static str {
            <Self as $crate::fragment::NamedFragment>::TYPE_NAME
        }

        fn execution_order(&self) -> i32 {
            <Self as $crate::fragment::NamedFragment>::EXECUTION_ORDER
        }

        fn eq_contents(&self, other: &dyn $crate::fragment::Fragment) -> bool {
            other
                .as_any()
                .downcast_ref::<Self>()
                .is_some_and(|other| other == self)
        }

        fn copy_from(&mut self, other: &dyn $crate::fragment::Fragment) {
            match other.as_any().downcast_ref::<Self>() {
                Some(other) => self.clone_from(other),
                None => log::warn!(
                    "Ignoring copy from '{}' into '{}'",
                    other.type_name(),
                    <Self as $crate::fragment::NamedFragment>::TYPE_NAME
                ),
            }
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    };
}

pub(crate) use impl_fragment_boilerplate;
