//! Fragment Factory Registry
//!
//! Maps a fragment type name to the [`FragmentFactory`] that creates and
//! destroys fragments of that type. At most one factory exists per name.

use std::marker::PhantomData;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{Fragment, NamedFragment};
use crate::errors::{Result, ShaderGenError};
use crate::utils::interner::{self, Symbol};

/// Creates and destroys fragments of one type.
pub trait FragmentFactory: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn create(&self) -> Box<dyn Fragment>;

    fn destroy(&self, fragment: Box<dyn Fragment>) {
        drop(fragment);
    }
}

/// Factory for any [`NamedFragment`], constructing instances with `Default`.
pub struct DefaultFactory<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> DefaultFactory<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for DefaultFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NamedFragment> FragmentFactory for DefaultFactory<T> {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn create(&self) -> Box<dyn Fragment> {
        Box::new(T::default())
    }
}

/// Registry of fragment factories keyed by interned type name.
#[derive(Default)]
pub struct FragmentRegistry {
    factories: FxHashMap<Symbol, Arc<dyn FragmentFactory>>,
}

impl FragmentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the fixed-function fragments.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for factory in super::ffp::builtin_factories() {
            registry.factories.insert(intern_type(factory.as_ref()), factory);
        }
        registry
    }

    /// Registers `factory`; fails if its type name is already taken.
    pub fn add_factory(&mut self, factory: Arc<dyn FragmentFactory>) -> Result<()> {
        let key = intern_type(factory.as_ref());
        if self.factories.contains_key(&key) {
            return Err(ShaderGenError::DuplicateFactory(
                factory.type_name().to_string(),
            ));
        }
        log::debug!("Registered fragment factory '{}'", factory.type_name());
        self.factories.insert(key, factory);
        Ok(())
    }

    /// Unregisters the factory for `type_name`, returning it if it existed.
    pub fn remove_factory(&mut self, type_name: &str) -> Option<Arc<dyn FragmentFactory>> {
        let removed = interner::get(type_name).and_then(|key| self.factories.remove(&key));
        if removed.is_none() {
            log::warn!("No fragment factory '{type_name}' to remove");
        }
        removed
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        interner::get(type_name).is_some_and(|key| self.factories.contains_key(&key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    fn factory(&self, type_name: &str) -> Option<&Arc<dyn FragmentFactory>> {
        interner::get(type_name).and_then(|key| self.factories.get(&key))
    }

    /// Creates a fresh fragment of `type_name`.
    pub fn create(&self, type_name: &str) -> Result<Box<dyn Fragment>> {
        self.factory(type_name)
            .map(|factory| factory.create())
            .ok_or_else(|| ShaderGenError::FactoryNotFound(type_name.to_string()))
    }

    /// Routes destruction to the owning factory; unknown types are simply dropped.
    pub fn destroy(&self, fragment: Box<dyn Fragment>) {
        match self.factory(fragment.type_name()) {
            Some(factory) => factory.destroy(fragment),
            None => log::warn!(
                "Destroying fragment '{}' without a registered factory",
                fragment.type_name()
            ),
        }
    }

    /// Creates an independent copy of `fragment` through its factory.
    pub fn clone_fragment(&self, fragment: &dyn Fragment) -> Result<Box<dyn Fragment>> {
        let mut clone = self.create(fragment.type_name())?;
        clone.copy_from(fragment);
        Ok(clone)
    }
}

fn intern_type(factory: &dyn FragmentFactory) -> Symbol {
    interner::intern(factory.type_name())
}
