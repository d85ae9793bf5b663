//! Module Registry
//!
//! Keeps the modules the engine resolves imports against, keyed by module
//! name. Registering under an existing name replaces the previous module
//! entirely.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{info, warn};

use super::Module;

#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` under its own name, returning the module it displaced.
    pub fn register(&mut self, module: Arc<dyn Module>) -> Option<Arc<dyn Module>> {
        let name = module.name().to_string();
        let previous = self.modules.insert(name.clone(), module);
        if previous.is_some() {
            warn!("module '{}' re-registered, previous definition dropped", name);
        } else {
            info!("module '{}' registered", name);
        }
        previous
    }

    /// Get a module by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Registered module names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}
