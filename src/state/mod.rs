//! Composed Render State
//!
//! A [`RenderState`] is the ordered fragment list (plus light limits) that
//! fully describes how one pass is shaded. States are built during
//! validation, deduplicated by content through [`RenderStateCache`], and
//! then only read on the draw hot path.
//!
//! # Ordering
//!
//! Fragments are kept sorted by ascending execution order at all times.
//! Inserting a fragment whose order is already present places it after the
//! existing ones, so [`RenderState::fragment_at`] always resolves to the
//! fragment that was there first.

pub mod cache;

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

pub use cache::{CacheStats, RenderStateCache};

use crate::draw::{DrawContext, LightType, ParameterSink};
use crate::errors::Result;
use crate::fragment::{Fragment, FragmentRegistry};

/// Maximum number of lights per type, indexed by [`LightType::index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LightCount(pub [u32; 3]);

impl LightCount {
    pub const ZERO: Self = Self([0; 3]);

    #[must_use]
    pub const fn new(point: u32, directional: u32, spot: u32) -> Self {
        Self([point, directional, spot])
    }

    /// `count` lights of `kind`, none of the others.
    #[must_use]
    pub fn only(kind: LightType, count: u32) -> Self {
        let mut out = Self::ZERO;
        out.set(kind, count);
        out
    }

    #[inline]
    #[must_use]
    pub fn get(&self, kind: LightType) -> u32 {
        self.0[kind.index()]
    }

    #[inline]
    pub fn set(&mut self, kind: LightType, count: u32) {
        self.0[kind.index()] = count;
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }
}

/// Ordered fragment list plus scalar parameters.
#[derive(Debug, Default)]
pub struct RenderState {
    fragments: Vec<Box<dyn Fragment>>,
    light_count: Option<LightCount>,
}

impl RenderState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Fragments in execution order.
    pub fn fragments(&self) -> impl ExactSizeIterator<Item = &dyn Fragment> {
        self.fragments.iter().map(|f| &**f)
    }

    /// Light limits, if this state sets any.
    #[must_use]
    pub fn light_count(&self) -> Option<LightCount> {
        self.light_count
    }

    pub fn set_light_count(&mut self, light_count: Option<LightCount>) {
        self.light_count = light_count;
    }

    /// First fragment at `order`.
    #[must_use]
    pub fn fragment_at(&self, order: i32) -> Option<&dyn Fragment> {
        let start = self.fragments.partition_point(|f| f.execution_order() < order);
        self.fragments
            .get(start)
            .filter(|f| f.execution_order() == order)
            .map(|f| &**f)
    }

    #[must_use]
    pub fn fragment_by_type(&self, type_name: &str) -> Option<&dyn Fragment> {
        self.fragments
            .iter()
            .find(|f| f.type_name() == type_name)
            .map(|f| &**f)
    }

    /// Adds `fragment`, replacing an existing fragment of the same type.
    ///
    /// Returns the replaced fragment.
    pub fn add_fragment(&mut self, fragment: Box<dyn Fragment>) -> Option<Box<dyn Fragment>> {
        let replaced = self.remove_fragment(fragment.type_name());
        self.insert_sorted(fragment);
        replaced
    }

    pub fn remove_fragment(&mut self, type_name: &str) -> Option<Box<dyn Fragment>> {
        let index = self.fragments.iter().position(|f| f.type_name() == type_name)?;
        Some(self.fragments.remove(index))
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
        self.light_count = None;
    }

    /// Merges clones of `other`'s fragments after this state's fragments.
    ///
    /// Light limits are taken from `other` only if this state sets none.
    pub fn append(&mut self, other: &RenderState, registry: &FragmentRegistry) -> Result<()> {
        let mut clones = Vec::with_capacity(other.fragments.len());
        for fragment in other.fragments() {
            clones.push(registry.clone_fragment(fragment)?);
        }
        for clone in clones {
            self.insert_sorted(clone);
        }
        if self.light_count.is_none() {
            self.light_count = other.light_count;
        }
        Ok(())
    }

    pub(crate) fn insert_sorted(&mut self, fragment: Box<dyn Fragment>) {
        let order = fragment.execution_order();
        let index = self.fragments.partition_point(|f| f.execution_order() <= order);
        self.fragments.insert(index, fragment);
    }

    /// 128-bit content hash over the ordered fragment list and light limits.
    #[must_use]
    pub fn content_hash(&self) -> u128 {
        let mut hasher = Xxh3::new();
        hasher.write_usize(self.fragments.len());
        for fragment in &self.fragments {
            hasher.write(fragment.type_name().as_bytes());
            hasher.write_u8(0xff);
            hasher.write_i32(fragment.execution_order());
            fragment.hash_contents(&mut hasher);
        }
        self.light_count.hash(&mut hasher);
        hasher.digest128()
    }

    /// Structural equality: same fragments in the same order, same limits.
    #[must_use]
    pub fn content_eq(&self, other: &RenderState) -> bool {
        self.light_count == other.light_count
            && self.fragments.len() == other.fragments.len()
            && self
                .fragments
                .iter()
                .zip(&other.fragments)
                .all(|(a, b)| a.execution_order() == b.execution_order() && a.eq_contents(&**b))
    }

    /// Runs every fragment's per-draw parameter update in execution order.
    #[inline]
    pub fn update_params(&self, ctx: &DrawContext<'_>, sink: &mut dyn ParameterSink) {
        for fragment in &self.fragments {
            fragment.update_params(ctx, sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::NamedFragment;
    use crate::fragment::ffp::{FogFragment, LightingFragment, TransformFragment};
    use crate::material::FogMode;

    fn fog(mode: FogMode) -> Box<dyn Fragment> {
        Box::new(FogFragment { mode })
    }

    #[test]
    fn fragments_stay_sorted() {
        let mut state = RenderState::new();
        state.add_fragment(fog(FogMode::Linear));
        state.add_fragment(Box::new(TransformFragment));
        state.add_fragment(Box::new(LightingFragment::default()));

        let orders: Vec<_> = state.fragments().map(|f| f.execution_order()).collect();
        assert_eq!(orders, vec![100, 300, 500]);
    }

    #[test]
    fn add_fragment_replaces_same_type() {
        let mut state = RenderState::new();
        assert!(state.add_fragment(fog(FogMode::Linear)).is_none());
        let replaced = state.add_fragment(fog(FogMode::Exp)).unwrap();

        assert_eq!(replaced.downcast_ref::<FogFragment>().unwrap().mode, FogMode::Linear);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn append_keeps_receiver_first_on_ties() {
        let registry = FragmentRegistry::with_builtins();
        let mut receiver = RenderState::new();
        receiver.add_fragment(fog(FogMode::Linear));
        receiver.set_light_count(Some(LightCount::new(1, 0, 0)));

        let mut other = RenderState::new();
        other.add_fragment(fog(FogMode::Exp2));
        other.add_fragment(Box::new(TransformFragment));
        other.set_light_count(Some(LightCount::new(0, 4, 0)));

        receiver.append(&other, &registry).unwrap();

        assert_eq!(receiver.len(), 3);
        let at_fog = receiver.fragment_at(FogFragment::EXECUTION_ORDER).unwrap();
        assert_eq!(at_fog.downcast_ref::<FogFragment>().unwrap().mode, FogMode::Linear);
        assert_eq!(receiver.light_count(), Some(LightCount::new(1, 0, 0)));
        assert_eq!(other.len(), 2, "Appending must not consume the source");
    }

    #[test]
    fn append_unknown_type_fails() {
        let registry = FragmentRegistry::new();
        let mut other = RenderState::new();
        other.add_fragment(fog(FogMode::Exp));

        let mut receiver = RenderState::new();
        assert!(receiver.append(&other, &registry).is_err());
    }

    #[test]
    fn equal_composition_hashes_equal() {
        let build = |mode| {
            let mut state = RenderState::new();
            state.add_fragment(Box::new(TransformFragment));
            state.add_fragment(fog(mode));
            state.set_light_count(Some(LightCount::ZERO));
            state
        };

        let a = build(FogMode::Exp);
        let b = build(FogMode::Exp);
        let c = build(FogMode::Linear);

        assert_eq!(a.content_hash(), b.content_hash());
        assert!(a.content_eq(&b));
        assert_ne!(a.content_hash(), c.content_hash());
        assert!(!a.content_eq(&c));
    }

    #[test]
    fn light_count_contributes_to_hash() {
        let mut a = RenderState::new();
        a.add_fragment(Box::new(LightingFragment::default()));
        let before = a.content_hash();

        a.set_light_count(Some(LightCount::new(0, 1, 0)));
        assert_ne!(before, a.content_hash());
    }

    #[test]
    fn light_count_by_type() {
        let mut count = LightCount::only(LightType::Spot, 3);
        assert_eq!(count.get(LightType::Spot), 3);
        assert_eq!(count.get(LightType::Point), 0);
        count.set(LightType::Point, 2);
        assert_eq!(count.total(), 5);
        assert_eq!(count, LightCount::new(2, 0, 3));
    }
}
