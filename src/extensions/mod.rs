//! Extension System for Arbor
//!
//! Extensions are native callables a guest program imports by `(module, field)`.
//! They are grouped into [`Module`]s, which the engine keeps in a
//! [`ModuleRegistry`] keyed by module name.
//!
//! # Architecture
//!
//! ```text
//! Guest import:    (import "math" "add" (func ...))
//!                          |
//!                          v
//! Registry:        "math" -> Arc<dyn Module>
//!                          |
//!                          v
//! Module:          resolve("add") -> Arc<dyn Extension>
//!                          |
//!                          v
//! Invocation:      ext.invoke(&mut HostCall { args, stack }) -> i64
//! ```
//!
//! Modules come from two places: statically linked [`providers`] (including
//! the [`bundled`] ones) and native artifacts opened by
//! [`crate::ffi::ExtensionLoader`].

pub mod bundled;
pub mod providers;
pub mod registry;
pub mod resolver;

use std::fmt;
use std::sync::Arc;

use crate::vm::{AuxStack, LinkResult};

pub use providers::{ModuleFactory, ModuleProviders};
pub use registry::ModuleRegistry;
pub use resolver::Resolver;

// =============================================================================
// Calling Context
// =============================================================================

/// Calling context for one extension invocation.
///
/// Carries the integer arguments of the guest call and the engine's auxiliary
/// stack. It only exists for the duration of a single `invoke`.
pub struct HostCall<'a> {
    stack: &'a mut AuxStack,
    args: &'a [i64],
}

impl<'a> HostCall<'a> {
    /// Context for a call with `args` against the engine's `stack`.
    pub fn new(stack: &'a mut AuxStack, args: &'a [i64]) -> Self {
        Self { stack, args }
    }

    /// All arguments of the guest call, in parameter order.
    pub fn args(&self) -> &[i64] {
        self.args
    }

    /// Argument at `index`, if the guest passed one.
    pub fn arg(&self, index: usize) -> Option<i64> {
        self.args.get(index).copied()
    }

    /// The engine's auxiliary stack.
    pub fn stack(&self) -> &AuxStack {
        &*self.stack
    }

    /// Drive the auxiliary stack from inside an extension.
    pub fn stack_mut(&mut self) -> &mut AuxStack {
        &mut *self.stack
    }
}

impl fmt::Debug for HostCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCall")
            .field("args", &self.args)
            .field("stack_top", &self.stack.top())
            .finish()
    }
}

// =============================================================================
// Extension / Module
// =============================================================================

/// A unit of native behavior invocable from guest code.
pub trait Extension: Send + Sync {
    /// Run the extension and produce its single integer result.
    fn invoke(&self, call: &mut HostCall<'_>) -> LinkResult<i64>;

    /// Textual signature of the extension. Reserved; empty unless an
    /// implementation chooses to describe itself.
    fn signature(&self) -> &str {
        ""
    }
}

/// A named, field-indexed bundle of extensions.
pub trait Module: Send + Sync {
    /// Look up the extension registered under `field`.
    fn resolve(&self, field: &str) -> Option<Arc<dyn Extension>>;

    /// Module name. Stable for the lifetime of the module.
    fn name(&self) -> &str;

    /// Import declaration contributed by this module. Reserved; empty.
    fn import(&self) -> String {
        String::new()
    }
}

/// Closure-backed extension.
pub struct ExtensionFn<F> {
    func: F,
}

impl<F> ExtensionFn<F>
where
    F: Fn(&mut HostCall<'_>) -> LinkResult<i64> + Send + Sync,
{
    /// Wrap `func`; see [`extension_fn`] for the shared form.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Extension for ExtensionFn<F>
where
    F: Fn(&mut HostCall<'_>) -> LinkResult<i64> + Send + Sync,
{
    fn invoke(&self, call: &mut HostCall<'_>) -> LinkResult<i64> {
        (self.func)(call)
    }
}

/// Wrap a closure as a shareable extension.
pub fn extension_fn<F>(func: F) -> Arc<dyn Extension>
where
    F: Fn(&mut HostCall<'_>) -> LinkResult<i64> + Send + Sync + 'static,
{
    Arc::new(ExtensionFn::new(func))
}
