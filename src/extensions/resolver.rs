//! Map-backed module
//!
//! [`Resolver`] is the canonical [`Module`]: a name plus a table of
//! extensions keyed by field.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{Extension, Module};

pub struct Resolver {
    module_name: String,
    execers: HashMap<String, Arc<dyn Extension>>,
}

impl Resolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            execers: HashMap::new(),
        }
    }

    /// Insert or replace the extension for `name`. Always succeeds.
    pub fn register(&mut self, name: impl Into<String>, ext: Arc<dyn Extension>) -> bool {
        self.execers.insert(name.into(), ext);
        true
    }

    /// Builder form of [`Resolver::register`].
    pub fn with(mut self, name: impl Into<String>, ext: Arc<dyn Extension>) -> Self {
        self.register(name, ext);
        self
    }

    /// Registered field names, sorted.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.execers.keys().map(|s| s.as_str()).collect();
        fields.sort_unstable();
        fields
    }

    pub fn len(&self) -> usize {
        self.execers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.execers.is_empty()
    }
}

impl Module for Resolver {
    fn resolve(&self, field: &str) -> Option<Arc<dyn Extension>> {
        self.execers.get(field).cloned()
    }

    fn name(&self) -> &str {
        &self.module_name
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("module_name", &self.module_name)
            .field("fields", &self.fields())
            .finish()
    }
}
