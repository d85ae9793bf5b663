//! Statically linked module providers
//!
//! Providers are module constructors compiled into the host binary. The
//! configuration enables them by name, and the engine registers the modules
//! they build exactly like modules loaded from native artifacts.

use std::collections::HashMap;
use std::sync::Arc;

use super::{bundled, Module};
use crate::ffi::LoadError;

/// Constructor for a provided module.
pub type ModuleFactory = fn() -> Arc<dyn Module>;

#[derive(Default)]
pub struct ModuleProviders {
    factories: HashMap<String, ModuleFactory>,
}

impl ModuleProviders {
    /// Create an empty provider set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider set holding the modules bundled with Arbor.
    pub fn with_bundled() -> Self {
        let mut providers = Self::new();
        providers.register(bundled::MATH, bundled::math_module);
        providers.register(bundled::DEBUG, bundled::debug_module);
        providers
    }

    /// Add or replace the factory for `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: ModuleFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Build the module provided under `name`.
    pub fn instantiate(&self, name: &str) -> Result<Arc<dyn Module>, LoadError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| LoadError::UnknownProvider(name.to_string()))?;
        Ok(factory())
    }

    /// Provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}
