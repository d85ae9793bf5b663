//! Arbor virtual machine
//!
//! [`Vm`] ties together the pieces a guest run needs:
//!
//! - a [`GuestRuntime`], the embedded execution engine that decodes and steps
//!   the guest bytecode
//! - a [`Host`], which resolves the guest's imports against the module
//!   registry and owns the auxiliary stack
//! - the entry export to start from
//!
//! Extensions are loaded before the runtime is first run, in the order given;
//! a later module with the same name replaces an earlier one.
//!
//! # Example
//!
//! ```ignore
//! use arbor::vm::{Vm, WasmiRuntime};
//!
//! let runtime = WasmiRuntime::new(&wasm)?;
//! let mut vm = Vm::new(runtime, "main");
//! vm.load_providers(&ModuleProviders::with_bundled(), &["math"])?;
//! let result = vm.run()?;
//! ```

mod error;
mod host;
mod stack;
#[cfg(feature = "wasmi")]
mod wasmi_runtime;

use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use crate::config::ArborConfig;
use crate::extensions::{Module, ModuleProviders};
use crate::ffi::ExtensionLoader;

pub use error::{LinkError, LinkResult, VmError, VmResult};
pub use host::{Builtin, Host, HostFunc, ENV_MODULE, STACKTOP_GLOBAL};
pub use stack::AuxStack;
#[cfg(feature = "wasmi")]
pub use wasmi_runtime::WasmiRuntime;

/// Result reported for a failed run.
pub const RUN_FAILED: i64 = -1;

/// The embedded execution engine seam.
///
/// An implementation owns the decoded guest program. During [`run`] it
/// resolves every import through the [`Host`] and calls the returned
/// [`HostFunc`]s synchronously whenever the guest calls an import.
///
/// [`run`]: GuestRuntime::run
pub trait GuestRuntime {
    /// Identifier of a resolved export.
    type Entry: Clone;

    /// Look up an exported function by name.
    fn function_export(&self, name: &str) -> Option<Self::Entry>;

    /// Execute the guest from `entry` to completion.
    fn run(&mut self, entry: &Self::Entry, host: &mut Host) -> VmResult<i64>;

    /// Human-readable dump of the engine's current call frames.
    fn stack_trace(&self) -> String;
}

impl Host {
    /// Build a host from configuration: providers first, then artifacts
    /// opened through `loader`, each in the order listed.
    pub fn from_config(
        config: &ArborConfig,
        providers: &ModuleProviders,
        loader: &ExtensionLoader,
    ) -> VmResult<Self> {
        let mut host = Host::new(config.vm.stack_top);
        for name in &config.extensions.providers {
            host.register_module(providers.instantiate(name)?);
        }
        for path in &config.extensions.paths {
            let module = loader.load(&path.to_string_lossy())?;
            info!("module '{}' loaded from {}", module.name(), path.display());
            host.register_module(module);
        }
        Ok(host)
    }
}

/// A guest program bound to its host: one engine instance, driven by one
/// thread at a time.
pub struct Vm<R: GuestRuntime> {
    runtime: R,
    host: Host,
    entrypoint: String,
    entry: Option<R::Entry>,
    loader: ExtensionLoader,
}

impl<R: GuestRuntime> Vm<R> {
    /// Create a VM with an empty module registry.
    pub fn new(runtime: R, entrypoint: impl Into<String>) -> Self {
        Self::with_host(runtime, entrypoint, Host::default())
    }

    /// Create a VM over a prepared host.
    pub fn with_host(runtime: R, entrypoint: impl Into<String>, host: Host) -> Self {
        Self {
            runtime,
            host,
            entrypoint: entrypoint.into(),
            entry: None,
            loader: ExtensionLoader::new(),
        }
    }

    /// Create a VM and load the given extension artifacts in order.
    pub fn with_extensions<P: AsRef<Path>>(
        runtime: R,
        entrypoint: impl Into<String>,
        paths: &[P],
    ) -> VmResult<Self> {
        let mut vm = Self::new(runtime, entrypoint);
        vm.load_modules(paths)?;
        Ok(vm)
    }

    /// Create a VM from configuration: initial stack top, entrypoint,
    /// providers, then artifacts.
    pub fn from_config(
        runtime: R,
        config: &ArborConfig,
        providers: &ModuleProviders,
    ) -> VmResult<Self> {
        let loader = ExtensionLoader::with_search_paths(&config.extensions.search_paths);
        let host = Host::from_config(config, providers, &loader)?;
        Ok(Self {
            runtime,
            host,
            entrypoint: config.vm.entrypoint.clone(),
            entry: None,
            loader,
        })
    }

    /// Load one extension artifact and register its module.
    pub fn load(&mut self, path: impl AsRef<Path>) -> VmResult<()> {
        let path = path.as_ref();
        let module = self.loader.load(&path.to_string_lossy())?;
        info!("module '{}' loaded from {}", module.name(), path.display());
        self.host.register_module(module);
        Ok(())
    }

    /// Load extension artifacts in order, stopping at the first failure.
    pub fn load_modules<P: AsRef<Path>>(&mut self, paths: &[P]) -> VmResult<()> {
        for path in paths {
            self.load(path)?;
        }
        Ok(())
    }

    /// Instantiate the named providers in order and register their modules.
    pub fn load_providers<S: AsRef<str>>(
        &mut self,
        providers: &ModuleProviders,
        names: &[S],
    ) -> VmResult<()> {
        for name in names {
            let module = providers.instantiate(name.as_ref())?;
            self.host.register_module(module);
        }
        Ok(())
    }

    /// Register a module for resolving.
    pub fn register_module(&mut self, module: Arc<dyn Module>) {
        self.host.register_module(module);
    }

    /// Run the guest from the configured entry export.
    ///
    /// A missing entry export is reported before any guest code or extension
    /// runs. Link errors raised while the guest runs abort the whole run.
    pub fn run(&mut self) -> VmResult<i64> {
        let entry = match &self.entry {
            Some(entry) => entry.clone(),
            None => {
                let entry = self
                    .runtime
                    .function_export(&self.entrypoint)
                    .ok_or_else(|| VmError::EntryNotFound(self.entrypoint.clone()))?;
                self.entry = Some(entry.clone());
                entry
            }
        };

        debug!("running entry '{}'", self.entrypoint);
        self.runtime.run(&entry, &mut self.host)
    }

    /// Run the guest, folding any failure into [`RUN_FAILED`].
    pub fn run_or_failed(&mut self) -> (i64, Option<VmError>) {
        match self.run() {
            Ok(value) => (value, None),
            Err(e) => (RUN_FAILED, Some(e)),
        }
    }

    /// The runtime's stack trace.
    pub fn stack_trace(&self) -> String {
        self.runtime.stack_trace()
    }

    /// Print the runtime's stack trace to stderr.
    pub fn print_stack_trace(&self) {
        eprintln!("{}", self.stack_trace());
    }

    /// Name of the export the run starts from.
    pub fn entrypoint(&self) -> &str {
        &self.entrypoint
    }

    /// Current `StackTop`.
    pub fn stack_top(&self) -> i64 {
        self.host.stack().top()
    }

    /// Saved frames (`CallStack`), oldest first.
    pub fn call_stack(&self) -> &[i64] {
        self.host.stack().saved()
    }

    /// Module registry and auxiliary stack.
    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Mutable access to the host, e.g. to reset the stack between runs.
    pub fn host_mut(&mut self) -> &mut Host {
        &mut self.host
    }

    /// The embedded execution engine.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Loader used by [`Vm::load`]; add search paths for bare artifact names.
    pub fn loader_mut(&mut self) -> &mut ExtensionLoader {
        &mut self.loader
    }
}
