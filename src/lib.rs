//! Arbor - host-function linkage for embedded bytecode guests
//!
//! Arbor sits between a guest program running inside an embedded execution
//! engine and the native code implementing the functions that guest imports.
//!
//! # Features
//!
//! - **Extension modules**: named bundles of native callables, imported by
//!   `(module, field)`
//! - **Import resolution**: builtins first, then the module registry; unknown
//!   modules and fields are typed link errors that abort the run
//! - **Auxiliary stack**: `__pushstack__`, `__incrementstack__`,
//!   `__stacktop__` and `__popstack__` under `env`, plus the
//!   `env.STACKTOP_ASM` global
//! - **Native artifacts**: shared libraries exporting an `Env` module
//!   declaration, loaded with libloading
//! - **Static providers**: modules compiled into the host, enabled by name
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use arbor::extensions::{extension_fn, Resolver};
//! use arbor::vm::Host;
//!
//! let mut host = Host::new(0);
//! host.register_module(Arc::new(
//!     Resolver::new("math").with("add", extension_fn(|_| Ok(7))),
//! ));
//!
//! let add = host.resolve_func("math", "add").unwrap();
//! assert_eq!(add.call(host.stack_mut(), &[]), Ok(7));
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Guest program  │  WebAssembly (wasmi feature) or any GuestRuntime
//! └────────┬────────┘
//!          │ (module, field)
//!          ▼
//! ┌─────────────────┐
//! │      Host       │  builtins ─ AuxStack
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ ModuleRegistry  │  providers + native artifacts
//! └─────────────────┘
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod extensions;
pub mod ffi;
pub mod vm;

// Re-export commonly used types
pub use config::{ArborConfig, ConfigError};
pub use extensions::{
    extension_fn, Extension, ExtensionFn, HostCall, Module, ModuleProviders, ModuleRegistry,
    Resolver,
};
pub use ffi::{ExtensionLoader, LoadError, NativeModule, NativeModuleDecl};
pub use vm::{AuxStack, GuestRuntime, Host, HostFunc, LinkError, Vm, VmError, RUN_FAILED};
#[cfg(feature = "wasmi")]
pub use vm::WasmiRuntime;
