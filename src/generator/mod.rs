//! Shader Generator
//!
//! The [`Generator`] façade owns everything needed to retarget authored
//! fixed-function materials to other schemes:
//!
//! - the fragment factory registry
//! - the Material → Technique → Pass hierarchy
//! - the schemes and their global states
//! - the render-state cache
//!
//! # Cold path vs hot path
//!
//! Registration, (in)validation and state editing take one generator-wide
//! lock. Drawing does not: [`Generator::bind_pass`] hands out a
//! [`PassBinding`] once, and [`Generator::notify_render_object`] only reads
//! through that binding.
//!
//! ```rust,ignore
//! let generator = Generator::new(library, NullRealizer, GeneratorSettings::default());
//! generator.create_shader_based_technique("Rock", "Default", "Shadow")?;
//! generator.edit_render_state("Shadow", |state, _| {
//!     state.add_fragment(Box::new(LightingFragment::disabled()));
//! });
//! generator.validate_scheme("Shadow")?;
//!
//! let binding = generator.bind_pass(handle);
//! // per draw, no lock:
//! Generator::notify_render_object(binding.as_ref(), &frame, &lights, &mut sink, false);
//! ```

mod build;
mod entries;
mod realize;

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

pub use entries::{BuildState, PassHandle, Registration, SchemeState, TechniqueKey};
pub use realize::{NullRealizer, PassTarget, ProgramRealizer};

use entries::{MaterialEntry, PassEntry, Scheme, TechniqueEntry};

use crate::draw::{DrawContext, FrameData, Light, ParameterSink};
use crate::errors::{Result, ShaderGenError};
use crate::fragment::{Fragment, FragmentFactory, FragmentRegistry};
use crate::material::MaterialSource;
use crate::settings::GeneratorSettings;
use crate::state::{CacheStats, LightCount, RenderState, RenderStateCache};
use crate::utils::{Symbol, interner};

/// Scheme name used by techniques that were not assigned one.
pub const DEFAULT_SCHEME_NAME: &str = "ShaderGeneratorDefaultScheme";

/// A published final state, readable without the generator lock.
#[derive(Debug, Clone)]
pub struct PassBinding {
    state: Arc<RenderState>,
    scheme: Symbol,
    revision: u64,
}

impl PassBinding {
    #[must_use]
    pub fn state(&self) -> &Arc<RenderState> {
        &self.state
    }

    /// Scheme revision at the time of binding.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

pub struct Generator {
    inner: Mutex<GeneratorInner>,
}

struct GeneratorInner {
    settings: GeneratorSettings,
    registry: FragmentRegistry,
    source: Box<dyn MaterialSource>,
    realizer: Box<dyn ProgramRealizer>,
    techniques: SlotMap<TechniqueKey, TechniqueEntry>,
    materials: FxHashMap<Symbol, MaterialEntry>,
    schemes: FxHashMap<Symbol, Scheme>,
    cache: RenderStateCache,
}

impl Generator {
    pub fn new(
        source: impl MaterialSource + 'static,
        realizer: impl ProgramRealizer + 'static,
        settings: GeneratorSettings,
    ) -> Self {
        interner::preload_common_names();
        log::debug!(
            "Creating shader generator (language: {}, default lights: {:?})",
            settings.shader_language,
            settings.default_light_count
        );

        Self {
            inner: Mutex::new(GeneratorInner {
                cache: RenderStateCache::new(settings.verify_cache_hits),
                settings,
                registry: FragmentRegistry::with_builtins(),
                source: Box::new(source),
                realizer: Box::new(realizer),
                techniques: SlotMap::with_key(),
                materials: FxHashMap::default(),
                schemes: FxHashMap::default(),
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> GeneratorSettings {
        self.inner.lock().settings.clone()
    }

    #[must_use]
    pub fn default_light_count(&self) -> LightCount {
        self.inner.lock().settings.default_light_count
    }

    /// Changes the light limits used by passes that set none.
    ///
    /// Every scheme is marked for a full rebuild.
    pub fn set_default_light_count(&self, light_count: LightCount) {
        let mut inner = self.inner.lock();
        if inner.settings.default_light_count == light_count {
            return;
        }
        inner.settings.default_light_count = light_count;
        let schemes: Vec<_> = inner.schemes.keys().copied().collect();
        for sym in schemes {
            inner.invalidate_all(sym);
        }
    }

    // ========================================================================
    // Fragment registry
    // ========================================================================

    pub fn add_factory(&self, factory: Arc<dyn FragmentFactory>) -> Result<()> {
        self.inner.lock().registry.add_factory(factory)
    }

    /// Unregisters a factory; a no-op if none is registered under `type_name`.
    pub fn remove_factory(&self, type_name: &str) -> Option<Arc<dyn FragmentFactory>> {
        self.inner.lock().registry.remove_factory(type_name)
    }

    #[must_use]
    pub fn has_factory(&self, type_name: &str) -> bool {
        self.inner.lock().registry.contains(type_name)
    }

    pub fn create_fragment(&self, type_name: &str) -> Result<Box<dyn Fragment>> {
        self.inner.lock().registry.create(type_name)
    }

    pub fn destroy_fragment(&self, fragment: Box<dyn Fragment>) {
        self.inner.lock().registry.destroy(fragment);
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Generates a technique for `dst_scheme` from `material`'s `src_scheme` technique.
    ///
    /// Registering the same mapping twice is a no-op. Binding `dst_scheme`
    /// to a second source scheme of the same material is a conflict.
    pub fn create_shader_based_technique(
        &self,
        material: &str,
        src_scheme: &str,
        dst_scheme: &str,
    ) -> Result<Registration> {
        self.inner
            .lock()
            .create_technique(material, src_scheme, dst_scheme)
    }

    /// Destroys the technique generated for `material` from `src_scheme` into `dst_scheme`.
    ///
    /// The scheme and its global state survive.
    pub fn remove_shader_based_technique(
        &self,
        material: &str,
        src_scheme: &str,
        dst_scheme: &str,
    ) -> Result<()> {
        let mut inner = self.inner.lock();

        let material_sym = interner::get(material)
            .filter(|sym| inner.materials.contains_key(sym))
            .ok_or_else(|| ShaderGenError::MaterialNotFound(material.to_string()))?;
        let dst = interner::get(dst_scheme)
            .filter(|sym| inner.schemes.contains_key(sym))
            .ok_or_else(|| ShaderGenError::SchemeNotFound(dst_scheme.to_string()))?;
        let src = interner::get(src_scheme);

        let key = inner
            .find_technique(material_sym, dst)
            .filter(|key| Some(inner.techniques[*key].src_scheme) == src)
            .ok_or_else(|| ShaderGenError::TechniqueEntryNotFound {
                material: material.to_string(),
                scheme: dst_scheme.to_string(),
            })?;

        inner.destroy_technique(key);
        Ok(())
    }

    /// Destroys every technique generated for `material`. Returns how many there were.
    pub fn remove_all_shader_based_techniques(&self, material: &str) -> Result<usize> {
        let mut inner = self.inner.lock();

        let keys = interner::get(material)
            .and_then(|sym| inner.materials.get(&sym))
            .map(|entry| entry.techniques.clone())
            .ok_or_else(|| ShaderGenError::MaterialNotFound(material.to_string()))?;

        for &key in &keys {
            inner.destroy_technique(key);
        }
        Ok(keys.len())
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Builds and realizes every pass under `scheme` that is not built yet.
    ///
    /// A no-op for a scheme that is already valid.
    pub fn validate_scheme(&self, scheme: &str) -> Result<()> {
        self.inner.lock().validate_scheme(scheme)
    }

    /// Builds and realizes only `material`'s technique under `scheme`.
    ///
    /// Does not change whether the scheme as a whole is valid.
    pub fn validate_material(&self, scheme: &str, material: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let key = inner.technique_key(scheme, material)?;
        if inner.techniques[key].build_state == BuildState::Built {
            return Ok(());
        }
        inner.build_technique(key)
    }

    /// Forces every pass under `scheme` to be rebuilt on the next validation.
    ///
    /// Unknown schemes are ignored.
    pub fn invalidate_scheme(&self, scheme: &str) {
        let mut inner = self.inner.lock();
        if let Some(sym) = interner::get(scheme) {
            inner.invalidate_all(sym);
        }
    }

    /// Forces `material`'s technique under `scheme` to be rebuilt.
    ///
    /// Unknown names are ignored.
    pub fn invalidate_material(&self, scheme: &str, material: &str) {
        let mut inner = self.inner.lock();
        if let Ok(key) = inner.technique_key(scheme, material) {
            let technique = &mut inner.techniques[key];
            technique.build_state = BuildState::NotBuilt;
            let dst = technique.dst_scheme;
            if let Some(scheme) = inner.schemes.get_mut(&dst) {
                scheme.mark_invalid();
            }
        }
    }

    // ========================================================================
    // State editing
    // ========================================================================

    /// Edits the scheme-wide global state, created on demand.
    ///
    /// The scheme is created if needed and marked for a full rebuild. `edit`
    /// runs under the generator lock and receives the fragment registry, so
    /// fragments can be created without calling back into the generator:
    ///
    /// ```rust,ignore
    /// generator.edit_render_state("Shadow", |state, registry| {
    ///     state.add_fragment(registry.create("FFP_Lighting")?);
    ///     Ok::<_, ShaderGenError>(())
    /// })?;
    /// ```
    ///
    /// `edit` must not call any `Generator` method.
    pub fn edit_render_state<R>(
        &self,
        scheme: &str,
        edit: impl FnOnce(&mut RenderState, &FragmentRegistry) -> R,
    ) -> R {
        let sym = interner::intern(scheme);
        let mut inner = self.inner.lock();
        inner.scheme_entry(sym);
        inner.invalidate_all(sym);

        let GeneratorInner {
            registry, schemes, ..
        } = &mut *inner;
        let state = schemes
            .entry(sym)
            .or_insert_with(|| Scheme::new(sym))
            .global_state
            .get_or_insert_with(RenderState::new);
        edit(state, registry)
    }

    /// Edits one pass's custom state, created on demand.
    ///
    /// The owning technique is marked for rebuild. Same locking rules as
    /// [`Generator::edit_render_state`].
    pub fn edit_pass_render_state<R>(
        &self,
        scheme: &str,
        material: &str,
        pass_index: usize,
        edit: impl FnOnce(&mut RenderState, &FragmentRegistry) -> R,
    ) -> Result<R> {
        let mut inner = self.inner.lock();
        let key = inner.technique_key(scheme, material)?;

        let technique = &mut inner.techniques[key];
        let count = technique.passes.len();
        if pass_index >= count {
            return Err(ShaderGenError::PassIndexOutOfBounds {
                material: material.to_string(),
                index: pass_index,
                count,
            });
        }
        technique.build_state = BuildState::NotBuilt;
        let dst = technique.dst_scheme;
        if let Some(scheme) = inner.schemes.get_mut(&dst) {
            scheme.mark_invalid();
        }

        let GeneratorInner {
            registry,
            techniques,
            ..
        } = &mut *inner;
        let state = techniques[key].passes[pass_index]
            .custom_state
            .get_or_insert_with(RenderState::new);
        Ok(edit(state, registry))
    }

    // ========================================================================
    // Hot path
    // ========================================================================

    /// Binds a generated pass for drawing. `None` until its scheme was validated.
    #[must_use]
    pub fn bind_pass(&self, handle: PassHandle) -> Option<PassBinding> {
        let inner = self.inner.lock();
        let technique = inner.techniques.get(handle.technique)?;
        let state = technique.passes.get(handle.index)?.final_state.clone()?;
        let revision = inner
            .schemes
            .get(&technique.dst_scheme)
            .map_or(0, |scheme| scheme.revision.version());

        Some(PassBinding {
            state,
            scheme: technique.dst_scheme,
            revision,
        })
    }

    /// `true` if nothing structural changed in the binding's scheme since it was taken.
    #[must_use]
    pub fn is_binding_current(&self, binding: &PassBinding) -> bool {
        self.inner
            .lock()
            .schemes
            .get(&binding.scheme)
            .is_some_and(|scheme| scheme.revision.version() == binding.revision)
    }

    /// Per-draw update: pushes per-object and per-frame constants of the bound pass.
    ///
    /// Does nothing for an unbound pass or when `suppress_updates` is set.
    /// Takes no lock and does not allocate.
    #[inline]
    pub fn notify_render_object(
        binding: Option<&PassBinding>,
        frame: &FrameData,
        lights: &[Light],
        sink: &mut dyn ParameterSink,
        suppress_updates: bool,
    ) {
        if suppress_updates {
            return;
        }
        let Some(binding) = binding else {
            return;
        };
        let ctx = DrawContext { frame, lights };
        binding.state.update_params(&ctx, sink);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Handles of every pass generated for `material` under `scheme`.
    pub fn pass_handles(&self, scheme: &str, material: &str) -> Result<Vec<PassHandle>> {
        let inner = self.inner.lock();
        let key = inner.technique_key(scheme, material)?;
        let count = inner.techniques[key].passes.len();
        Ok((0..count)
            .map(|index| PassHandle {
                technique: key,
                index,
            })
            .collect())
    }

    /// Final states of `material`'s passes under `scheme`, in pass order.
    ///
    /// Empty until the technique was built.
    pub fn render_states(&self, scheme: &str, material: &str) -> Result<Vec<Arc<RenderState>>> {
        let inner = self.inner.lock();
        let key = inner.technique_key(scheme, material)?;
        Ok(inner.techniques[key]
            .passes
            .iter()
            .filter_map(|pass| pass.final_state.clone())
            .collect())
    }

    /// Scheme names, sorted.
    #[must_use]
    pub fn scheme_names(&self) -> Vec<&'static str> {
        let inner = self.inner.lock();
        let mut names: Vec<_> = inner.schemes.values().map(Scheme::name).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn has_scheme(&self, scheme: &str) -> bool {
        let inner = self.inner.lock();
        interner::get(scheme).is_some_and(|sym| inner.schemes.contains_key(&sym))
    }

    #[must_use]
    pub fn scheme_state(&self, scheme: &str) -> Option<SchemeState> {
        let inner = self.inner.lock();
        inner.scheme(scheme).map(|s| s.state)
    }

    #[must_use]
    pub fn is_scheme_valid(&self, scheme: &str) -> bool {
        self.scheme_state(scheme) == Some(SchemeState::Valid)
    }

    /// Monotonic counter bumped by every structural change to `scheme`.
    #[must_use]
    pub fn scheme_revision(&self, scheme: &str) -> Option<u64> {
        let inner = self.inner.lock();
        inner.scheme(scheme).map(|s| s.revision.version())
    }

    /// Number of techniques generated for `scheme`.
    #[must_use]
    pub fn technique_count(&self, scheme: &str) -> usize {
        let inner = self.inner.lock();
        inner.scheme(scheme).map_or(0, |s| s.techniques.len())
    }

    #[must_use]
    pub fn technique_build_state(&self, key: TechniqueKey) -> Option<BuildState> {
        self.inner.lock().techniques.get(key).map(|t| t.build_state)
    }

    #[must_use]
    pub fn material_count(&self) -> usize {
        self.inner.lock().materials.len()
    }

    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.inner.lock().cache.len()
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.lock().cache.stats()
    }

    /// Drops cached states no pass or binding references anymore.
    pub fn trim_render_state_cache(&self) -> usize {
        let dropped = self.inner.lock().cache.trim();
        log::debug!("Trimmed {dropped} unused render states");
        dropped
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        let keys: Vec<_> = inner.techniques.keys().collect();
        for key in keys {
            inner.destroy_technique(key);
        }
    }
}

impl GeneratorInner {
    fn scheme(&self, name: &str) -> Option<&Scheme> {
        interner::get(name).and_then(|sym| self.schemes.get(&sym))
    }

    fn scheme_entry(&mut self, sym: Symbol) -> &mut Scheme {
        self.schemes.entry(sym).or_insert_with(|| {
            log::debug!("Created scheme '{}'", interner::resolve(sym));
            Scheme::new(sym)
        })
    }

    /// Marks the scheme invalid and every technique in it for rebuild.
    fn invalidate_all(&mut self, sym: Symbol) {
        let Some(scheme) = self.schemes.get_mut(&sym) else {
            return;
        };
        scheme.mark_invalid();
        for &key in &scheme.techniques {
            if let Some(technique) = self.techniques.get_mut(key) {
                technique.build_state = BuildState::NotBuilt;
            }
        }
    }

    fn find_technique(&self, material: Symbol, dst_scheme: Symbol) -> Option<TechniqueKey> {
        self.materials
            .get(&material)?
            .techniques
            .iter()
            .copied()
            .find(|key| self.techniques[*key].dst_scheme == dst_scheme)
    }

    fn technique_key(&self, scheme: &str, material: &str) -> Result<TechniqueKey> {
        let dst = interner::get(scheme)
            .filter(|sym| self.schemes.contains_key(sym))
            .ok_or_else(|| ShaderGenError::SchemeNotFound(scheme.to_string()))?;

        interner::get(material)
            .and_then(|sym| self.find_technique(sym, dst))
            .ok_or_else(|| ShaderGenError::TechniqueEntryNotFound {
                material: material.to_string(),
                scheme: scheme.to_string(),
            })
    }

    fn create_technique(
        &mut self,
        material: &str,
        src_scheme: &str,
        dst_scheme: &str,
    ) -> Result<Registration> {
        if !self.source.contains_material(material) {
            return Err(ShaderGenError::MaterialNotFound(material.to_string()));
        }

        let material_sym = interner::intern(material);
        let src = interner::intern(src_scheme);
        let dst = interner::intern(dst_scheme);

        if let Some(key) = self.find_technique(material_sym, dst) {
            let bound = self.techniques[key].src_scheme;
            if bound == src {
                return Ok(Registration::AlreadyRegistered(key));
            }
            return Err(ShaderGenError::SchemeAlreadyBound {
                material: material.to_string(),
                dst_scheme: dst_scheme.to_string(),
                bound_src: interner::resolve(bound).to_string(),
            });
        }

        let source = self
            .source
            .find_technique(material, src_scheme)
            .ok_or_else(|| ShaderGenError::SourceTechniqueNotFound {
                material: material.to_string(),
                scheme: src_scheme.to_string(),
            })?;
        if !source.is_generation_eligible() {
            return Err(ShaderGenError::ProgrammableTechnique {
                material: material.to_string(),
                scheme: src_scheme.to_string(),
            });
        }

        let key = self.techniques.insert(TechniqueEntry {
            material: material_sym,
            src_scheme: src,
            dst_scheme: dst,
            passes: source.passes.into_iter().map(PassEntry::new).collect(),
            build_state: BuildState::NotBuilt,
        });
        self.materials
            .entry(material_sym)
            .or_default()
            .techniques
            .push(key);

        let scheme = self.scheme_entry(dst);
        scheme.techniques.push(key);
        scheme.mark_invalid();

        log::debug!("Generated technique '{src_scheme}' -> '{dst_scheme}' for material '{material}'");
        Ok(Registration::Created(key))
    }

    fn destroy_technique(&mut self, key: TechniqueKey) {
        let Some(technique) = self.techniques.remove(key) else {
            return;
        };

        let realized = technique
            .passes
            .iter()
            .enumerate()
            .filter(|(_, pass)| pass.final_state.is_some());
        for (index, _) in realized {
            self.realizer.release(PassTarget {
                handle: PassHandle {
                    technique: key,
                    index,
                },
                scheme: technique.scheme_name(),
                material: technique.material_name(),
                shader_language: &self.settings.shader_language,
            });
        }

        if let Some(entry) = self.materials.get_mut(&technique.material) {
            entry.techniques.retain(|k| *k != key);
            if entry.techniques.is_empty() {
                self.materials.remove(&technique.material);
            }
        }
        if let Some(scheme) = self.schemes.get_mut(&technique.dst_scheme) {
            scheme.techniques.retain(|k| *k != key);
            scheme.mark_invalid();
        }

        log::debug!(
            "Removed technique '{}' of material '{}'",
            technique.scheme_name(),
            technique.material_name()
        );
    }

    fn validate_scheme(&mut self, name: &str) -> Result<()> {
        let sym = interner::get(name)
            .filter(|sym| self.schemes.contains_key(sym))
            .ok_or_else(|| ShaderGenError::SchemeNotFound(name.to_string()))?;

        let scheme = self.scheme_entry(sym);
        match scheme.state {
            SchemeState::Valid => return Ok(()),
            SchemeState::Validating => return Err(ShaderGenError::ReentrantBuild(name.to_string())),
            SchemeState::Invalid => scheme.state = SchemeState::Validating,
        }
        let keys = scheme.techniques.clone();

        log::debug!("Validating scheme '{name}' ({} techniques)", keys.len());
        for key in keys {
            if self.techniques[key].build_state == BuildState::Built {
                continue;
            }
            if let Err(e) = self.build_technique(key) {
                self.scheme_entry(sym).state = SchemeState::Invalid;
                return Err(e);
            }
        }

        self.scheme_entry(sym).state = SchemeState::Valid;
        Ok(())
    }

    /// Builds, caches and realizes every pass of one technique.
    ///
    /// Final states are published only once every pass succeeded.
    fn build_technique(&mut self, key: TechniqueKey) -> Result<()> {
        let Self {
            settings,
            registry,
            realizer,
            techniques,
            schemes,
            cache,
            ..
        } = self;

        let technique = &mut techniques[key];
        if technique.build_state == BuildState::Building {
            return Err(ShaderGenError::ReentrantBuild(technique.scheme_name().to_string()));
        }
        technique.build_state = BuildState::Building;

        let global = schemes
            .get(&technique.dst_scheme)
            .and_then(|scheme| scheme.global_state.as_ref());

        let mut built = Vec::with_capacity(technique.passes.len());
        for (index, pass) in technique.passes.iter().enumerate() {
            let state = match build::build_pass_state(
                pass,
                global,
                registry,
                settings.default_light_count,
            ) {
                Ok(state) => cache.get_or_insert(state),
                Err(e) => {
                    technique.build_state = BuildState::NotBuilt;
                    return Err(e);
                }
            };

            let target = PassTarget {
                handle: PassHandle {
                    technique: key,
                    index,
                },
                scheme: technique.scheme_name(),
                material: technique.material_name(),
                shader_language: &settings.shader_language,
            };
            if let Err(source) = realizer.realize(target, &state) {
                // Undo programs for passes that never had a published state.
                for (done, pass) in technique.passes.iter().enumerate().take(index) {
                    if pass.final_state.is_none() {
                        realizer.release(PassTarget {
                            handle: PassHandle {
                                technique: key,
                                index: done,
                            },
                            ..target
                        });
                    }
                }
                technique.build_state = BuildState::NotBuilt;
                return Err(ShaderGenError::Realization {
                    scheme: technique.scheme_name().to_string(),
                    source,
                });
            }
            built.push(state);
        }

        for (pass, state) in technique.passes.iter_mut().zip(built) {
            pass.final_state = Some(state);
        }
        technique.build_state = BuildState::Built;
        log::trace!(
            "Built {} passes of '{}' for scheme '{}'",
            technique.passes.len(),
            technique.material_name(),
            technique.scheme_name()
        );
        Ok(())
    }
}
