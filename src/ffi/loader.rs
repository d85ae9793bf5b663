//! Extension Loader
//!
//! Safe wrapper around libloading for opening extension artifacts and
//! turning their `Env` declaration into a [`Module`].

use std::ffi::{c_void, CStr, CString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::{Library, Symbol};
use log::{debug, info};
use thiserror::Error;

use super::abi::{NativeCall, NativeFn, NativeModuleDecl, ENV_SYMBOL};
use crate::extensions::{Extension, HostCall, Module};
use crate::vm::{AuxStack, LinkError, LinkResult};

/// Setup-time failures while obtaining a module.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open extension artifact '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("symbol '{symbol}' not found in '{}': {source}", path.display())]
    MissingSymbol {
        path: PathBuf,
        symbol: String,
        #[source]
        source: libloading::Error,
    },

    #[error("'{}' does not export a valid module: {reason}", path.display())]
    NotAModule { path: PathBuf, reason: String },

    #[error("unknown module provider: {0}")]
    UnknownProvider(String),
}

// =============================================================================
// Native Module
// =============================================================================

/// A module backed by a [`NativeModuleDecl`].
///
/// Holds the library handle (when loaded from disk) so the declaration and
/// every resolved entry point stay mapped for as long as they are reachable.
pub struct NativeModule {
    name: String,
    decl: *const NativeModuleDecl,
    library: Option<Arc<Library>>,
}

// `decl` points to an immutable static inside `library` (or in this binary).
unsafe impl Send for NativeModule {}
unsafe impl Sync for NativeModule {}

impl NativeModule {
    /// Wrap a declaration linked into the current binary.
    pub fn from_static(decl: &'static NativeModuleDecl) -> Result<Self, LoadError> {
        // Safety: a 'static declaration's name pointer is 'static as well.
        let name = unsafe { decl.validate() }.map_err(|reason| LoadError::NotAModule {
            path: PathBuf::from("<static>"),
            reason,
        })?;
        Ok(Self {
            name,
            decl,
            library: None,
        })
    }

    fn decl(&self) -> &NativeModuleDecl {
        // Safety: validated non-null at construction and kept alive by `library`.
        unsafe { &*self.decl }
    }
}

impl Module for NativeModule {
    fn resolve(&self, field: &str) -> Option<Arc<dyn Extension>> {
        let c_field = CString::new(field).ok()?;
        let resolve = self.decl().resolve?;
        // Safety: the artifact contract requires `resolve` to accept any
        // NUL-terminated string and return a valid entry point or null.
        let func = unsafe { resolve(c_field.as_ptr()) }?;
        Some(Arc::new(NativeExtension {
            func,
            _library: self.library.clone(),
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn import(&self) -> String {
        let Some(import) = self.decl().import else {
            return String::new();
        };
        // Safety: the hook returns null or a NUL-terminated 'static string.
        unsafe {
            let ptr = import();
            if ptr.is_null() {
                String::new()
            } else {
                CStr::from_ptr(ptr).to_string_lossy().into_owned()
            }
        }
    }
}

impl fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeModule")
            .field("name", &self.name)
            .field("dynamic", &self.library.is_some())
            .finish()
    }
}

/// A resolved native entry point.
struct NativeExtension {
    func: NativeFn,
    _library: Option<Arc<Library>>,
}

impl Extension for NativeExtension {
    fn invoke(&self, call: &mut HostCall<'_>) -> LinkResult<i64> {
        let (args, arg_count) = {
            let args = call.args();
            (args.as_ptr(), args.len())
        };
        let mut context = StackContext {
            stack: call.stack_mut(),
            fault: None,
        };
        let native = NativeCall {
            args,
            arg_count,
            host: (&mut context as *mut StackContext<'_>).cast(),
            stack_push: native_push,
            stack_increment: native_increment,
            stack_top: native_top,
            stack_pop: native_pop,
        };
        // Safety: `native`, the argument slice and `context` outlive the call.
        let value = unsafe { (self.func)(&native) };
        match context.fault {
            Some(fault) => Err(fault),
            None => Ok(value),
        }
    }
}

// =============================================================================
// Stack Callbacks
// =============================================================================

/// What `NativeCall::host` points to for the duration of one call.
struct StackContext<'a> {
    stack: &'a mut AuxStack,
    fault: Option<LinkError>,
}

/// # Safety
///
/// `host` must be the pointer placed in the `NativeCall` of a call still in
/// progress.
unsafe fn context<'a>(host: *mut c_void) -> &'a mut StackContext<'a> {
    &mut *host.cast()
}

unsafe extern "C" fn native_push(host: *mut c_void) -> i64 {
    context(host).stack.push()
}

unsafe extern "C" fn native_increment(host: *mut c_void, delta: i64) -> i64 {
    context(host).stack.increment(delta)
}

unsafe extern "C" fn native_top(host: *mut c_void) -> i64 {
    context(host).stack.top()
}

unsafe extern "C" fn native_pop(host: *mut c_void, status: *mut i32) -> i64 {
    let context = context(host);
    let (value, code) = match context.stack.pop() {
        Ok(value) => (value, 0),
        Err(fault) => {
            // First fault wins; the stack itself is left as it was.
            context.fault.get_or_insert(fault);
            (context.stack.top(), 1)
        }
    };
    if !status.is_null() {
        *status = code;
    }
    value
}

// =============================================================================
// Loader
// =============================================================================

/// Artifact loader with search paths
pub struct ExtensionLoader {
    search_paths: Vec<PathBuf>,
}

impl ExtensionLoader {
    /// Create a loader that searches the current directory.
    pub fn new() -> Self {
        let mut search_paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            search_paths.push(cwd);
        }
        Self { search_paths }
    }

    /// Create a loader that searches `paths` in order, then the current
    /// directory.
    pub fn with_search_paths<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut loader = Self::new();
        for path in paths.iter().rev() {
            loader.add_search_path(path);
        }
        loader
    }

    /// Add a search path, consulted before the defaults.
    pub fn add_search_path(&mut self, path: impl AsRef<Path>) {
        self.search_paths.insert(0, path.as_ref().to_path_buf());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find an artifact by path or bare name.
    pub fn find_artifact(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.exists() {
            return Some(path.to_path_buf());
        }

        let lib_name = library_filename(name);
        for search_path in &self.search_paths {
            for candidate in [search_path.join(name), search_path.join(&lib_name)] {
                if candidate.exists() {
                    return Some(candidate);
                }
            }
        }

        None
    }

    /// Open an artifact and validate its `Env` declaration.
    ///
    /// Names not found on the search paths are handed to the platform loader
    /// unchanged, so system libraries resolve the usual way.
    pub fn load(&self, name: &str) -> Result<Arc<dyn Module>, LoadError> {
        let path = self
            .find_artifact(name)
            .unwrap_or_else(|| PathBuf::from(name));
        info!("loading extension artifact {}", path.display());

        // Safety: opening a library runs its initializers. Artifacts are
        // trusted the same way any linked code is.
        let library = unsafe { Library::new(&path) }.map_err(|source| LoadError::Open {
            path: path.clone(),
            source,
        })?;

        let decl: *const NativeModuleDecl = {
            // Safety: the symbol is read as an address only; its layout is
            // checked by `validate` below.
            let symbol: Symbol<*const NativeModuleDecl> =
                unsafe { library.get(ENV_SYMBOL.as_bytes()) }.map_err(|source| {
                    LoadError::MissingSymbol {
                        path: path.clone(),
                        symbol: ENV_SYMBOL.to_string(),
                        source,
                    }
                })?;
            *symbol
        };

        if decl.is_null() {
            return Err(LoadError::NotAModule {
                path,
                reason: format!("'{}' is null", ENV_SYMBOL),
            });
        }

        // Safety: non-null pointer to the exported static.
        let name = unsafe { (*decl).validate() }
            .map_err(|reason| LoadError::NotAModule {
                path: path.clone(),
                reason,
            })?;

        debug!("artifact {} provides module '{}'", path.display(), name);
        Ok(Arc::new(NativeModule {
            name,
            decl,
            library: Some(Arc::new(library)),
        }))
    }
}

impl Default for ExtensionLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Construct the platform-specific library filename
pub(crate) fn library_filename(name: &str) -> String {
    #[cfg(target_os = "linux")]
    {
        if name.starts_with("lib") && name.ends_with(".so") {
            name.to_string()
        } else {
            format!("lib{}.so", name)
        }
    }

    #[cfg(target_os = "macos")]
    {
        if name.starts_with("lib") && name.ends_with(".dylib") {
            name.to_string()
        } else {
            format!("lib{}.dylib", name)
        }
    }

    #[cfg(target_os = "windows")]
    {
        if name.ends_with(".dll") {
            name.to_string()
        } else {
            format!("{}.dll", name)
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        name.to_string()
    }
}
