//! Import Resolution Engine
//!
//! [`Host`] answers the guest linker's `(module, field)` requests. Each
//! request is independent:
//!
//! 1. `env` + one of the four reserved stack fields -> [`Builtin`]
//! 2. otherwise the module registry, then the module's own `resolve`
//!
//! Globals only resolve for `env.STACKTOP_ASM`.

use std::fmt;
use std::sync::Arc;

use log::{debug, trace};

use super::error::{LinkError, LinkResult};
use super::stack::AuxStack;
use crate::extensions::{Extension, HostCall, Module, ModuleRegistry};

/// Reserved host namespace.
pub const ENV_MODULE: &str = "env";

/// Reserved global exposing the current stack top.
pub const STACKTOP_GLOBAL: &str = "STACKTOP_ASM";

// =============================================================================
// Builtins
// =============================================================================

/// Auxiliary stack primitives reachable under [`ENV_MODULE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    PushStack,
    IncrementStack,
    StackTop,
    PopStack,
}

impl Builtin {
    pub const ALL: [Builtin; 4] = [
        Builtin::PushStack,
        Builtin::IncrementStack,
        Builtin::StackTop,
        Builtin::PopStack,
    ];

    /// Map a reserved field name to its builtin.
    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "__pushstack__" => Some(Builtin::PushStack),
            "__incrementstack__" => Some(Builtin::IncrementStack),
            "__stacktop__" => Some(Builtin::StackTop),
            "__popstack__" => Some(Builtin::PopStack),
            _ => None,
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            Builtin::PushStack => "__pushstack__",
            Builtin::IncrementStack => "__incrementstack__",
            Builtin::StackTop => "__stacktop__",
            Builtin::PopStack => "__popstack__",
        }
    }

    /// Run the primitive. `args[0]` is the increment for `__incrementstack__`.
    pub fn call(&self, stack: &mut AuxStack, args: &[i64]) -> LinkResult<i64> {
        match self {
            Builtin::PushStack => Ok(stack.push()),
            Builtin::IncrementStack => {
                let delta = args.first().copied().ok_or_else(|| LinkError::MissingArgument {
                    field: self.field().to_string(),
                })?;
                Ok(stack.increment(delta))
            }
            Builtin::StackTop => Ok(stack.top()),
            Builtin::PopStack => stack.pop(),
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", ENV_MODULE, self.field())
    }
}

// =============================================================================
// Bound Callables
// =============================================================================

/// A resolved import, ready to be called any number of times.
#[derive(Clone)]
pub enum HostFunc {
    Builtin(Builtin),
    Extension {
        module: String,
        field: String,
        ext: Arc<dyn Extension>,
    },
}

impl HostFunc {
    /// Invoke the callable once with the guest's arguments.
    pub fn call(&self, stack: &mut AuxStack, args: &[i64]) -> LinkResult<i64> {
        match self {
            HostFunc::Builtin(builtin) => builtin.call(stack, args),
            HostFunc::Extension { module, field, ext } => {
                trace!("invoking {}.{} with {:?}", module, field, args);
                let mut call = HostCall::new(stack, args);
                ext.invoke(&mut call)
            }
        }
    }

    /// `(module, field)` this callable was resolved from.
    pub fn import_name(&self) -> (&str, &str) {
        match self {
            HostFunc::Builtin(builtin) => (ENV_MODULE, builtin.field()),
            HostFunc::Extension { module, field, .. } => (module.as_str(), field.as_str()),
        }
    }
}

impl fmt::Debug for HostFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (module, field) = self.import_name();
        f.debug_struct("HostFunc")
            .field("module", &module)
            .field("field", &field)
            .field("builtin", &matches!(self, HostFunc::Builtin(_)))
            .finish()
    }
}

// =============================================================================
// Host
// =============================================================================

/// Module registry plus auxiliary stack: everything a guest import can reach.
#[derive(Debug, Default)]
pub struct Host {
    registry: ModuleRegistry,
    stack: AuxStack,
}

impl Host {
    /// Empty registry, stack top at `stack_top`.
    pub fn new(stack_top: i64) -> Self {
        Self {
            registry: ModuleRegistry::new(),
            stack: AuxStack::new(stack_top),
        }
    }

    /// Register a module, replacing any module with the same name.
    pub fn register_module(&mut self, module: Arc<dyn Module>) -> Option<Arc<dyn Module>> {
        self.registry.register(module)
    }

    /// Registered modules.
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Current `StackTop` / `CallStack`.
    pub fn stack(&self) -> &AuxStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut AuxStack {
        &mut self.stack
    }

    /// Resolve a function import.
    pub fn resolve_func(&self, module: &str, field: &str) -> LinkResult<HostFunc> {
        if module == ENV_MODULE {
            if let Some(builtin) = Builtin::from_field(field) {
                debug!("resolved {} to builtin", builtin);
                return Ok(HostFunc::Builtin(builtin));
            }
        }

        let found = self
            .registry
            .get(module)
            .ok_or_else(|| LinkError::UnknownModule {
                module: module.to_string(),
            })?;
        let ext = found
            .resolve(field)
            .ok_or_else(|| LinkError::UnknownField {
                module: module.to_string(),
                field: field.to_string(),
            })?;

        debug!("resolved {}.{} to extension", module, field);
        Ok(HostFunc::Extension {
            module: module.to_string(),
            field: field.to_string(),
            ext,
        })
    }

    /// Resolve a global import. Only `env.STACKTOP_ASM` exists.
    pub fn resolve_global(&self, module: &str, field: &str) -> LinkResult<i64> {
        if module == ENV_MODULE && field == STACKTOP_GLOBAL {
            return Ok(self.stack.top());
        }
        Err(LinkError::UnsupportedGlobal {
            module: module.to_string(),
            field: field.to_string(),
        })
    }

    /// Resolve and invoke in one step.
    pub fn call(&mut self, module: &str, field: &str, args: &[i64]) -> LinkResult<i64> {
        let func = self.resolve_func(module, field)?;
        func.call(&mut self.stack, args)
    }
}
