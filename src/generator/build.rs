//! Pass render-state composition
//!
//! Builds the final composed state of one pass from three layers:
//!
//! 1. The fixed-function defaults synthesised from the authored pass, with
//!    every built-in slot first probed for an override.
//! 2. The scheme-wide global state.
//! 3. The pass's own custom state.
//!
//! Overrides and light limits resolve custom > scheme > default.

use smallvec::SmallVec;

use super::entries::PassEntry;
use crate::errors::Result;
use crate::fragment::ffp::BUILTIN_SLOTS;
use crate::fragment::{Fragment, FragmentRegistry, SynthesisContext};
use crate::state::{LightCount, RenderState};

/// Returns a clone of the override at `order`: the pass custom state first,
/// then the scheme global state.
pub(crate) fn custom_fragment(
    custom: Option<&RenderState>,
    global: Option<&RenderState>,
    order: i32,
    registry: &FragmentRegistry,
) -> Result<Option<Box<dyn Fragment>>> {
    let found = custom
        .and_then(|state| state.fragment_at(order))
        .or_else(|| global.and_then(|state| state.fragment_at(order)));

    found.map(|fragment| registry.clone_fragment(fragment)).transpose()
}

pub(crate) fn build_pass_state(
    pass: &PassEntry,
    global: Option<&RenderState>,
    registry: &FragmentRegistry,
    default_light_count: LightCount,
) -> Result<RenderState> {
    let custom = pass.custom_state.as_ref();

    let light_count = custom
        .and_then(RenderState::light_count)
        .or_else(|| global.and_then(RenderState::light_count))
        .unwrap_or(default_light_count);

    let mut result = RenderState::new();
    result.set_light_count(Some(light_count));

    let ctx = SynthesisContext {
        pass: &pass.source,
        light_count,
    };
    let mut consumed: SmallVec<[i32; 5]> = SmallVec::new();

    for (order, type_name) in BUILTIN_SLOTS {
        if let Some(fragment) = custom_fragment(custom, global, order, registry)? {
            consumed.push(order);
            result.insert_sorted(fragment);
            continue;
        }

        // A removed built-in factory disables that slot.
        if !registry.contains(type_name) {
            continue;
        }

        let mut fragment = registry.create(type_name)?;
        if fragment.synthesize(&ctx)? {
            result.insert_sorted(fragment);
        } else {
            registry.destroy(fragment);
        }
    }

    if let Some(global) = global {
        for fragment in global.fragments() {
            let order = fragment.execution_order();
            let shadowed = custom.is_some_and(|c| c.fragment_at(order).is_some());
            if !consumed.contains(&order) && !shadowed {
                result.insert_sorted(registry.clone_fragment(fragment)?);
            }
        }
    }

    if let Some(custom) = custom {
        for fragment in custom.fragments() {
            if !consumed.contains(&fragment.execution_order()) {
                result.insert_sorted(registry.clone_fragment(fragment)?);
            }
        }
    }

    Ok(result)
}
