//! FFI Module for Arbor
//!
//! Loads extension modules packaged as native shared libraries.
//!
//! # Architecture
//!
//! ```text
//! arbor.toml / --ext path
//!       │
//!       ▼
//! ExtensionLoader (search paths, platform filenames)
//!       │
//!       ▼
//! Dynamic Loader (libloading) ── symbol "Env"
//!       │
//!       ▼
//! NativeModuleDecl::validate (ABI version, name, resolve)
//!       │
//!       ▼
//! NativeModule ── registered in the engine's ModuleRegistry
//! ```
//!
//! # Example
//!
//! ```ignore
//! let loader = ExtensionLoader::new();
//! let module = loader.load("/path/to/libmath_ext.so")?;
//! assert_eq!(module.name(), "math");
//! ```

mod abi;
mod loader;

pub use abi::{
    NativeCall, NativeFn, NativeImportFn, NativeIncrementFn, NativeModuleDecl, NativePopFn,
    NativeResolveFn, NativeStackFn, ENV_SYMBOL, NATIVE_ABI_VERSION,
};
pub use loader::{ExtensionLoader, LoadError, NativeModule};
