//! Native extension ABI
//!
//! An extension artifact is a shared library exporting one static named
//! `Env` of type [`NativeModuleDecl`]. Everything crossing the boundary is
//! `#[repr(C)]`, so artifacts may be built by any toolchain that can emit a
//! C-compatible static.
//!
//! ```ignore
//! use arbor::ffi::{NativeCall, NativeFn, NativeModuleDecl};
//! use std::ffi::{c_char, CStr};
//!
//! unsafe extern "C" fn seven(_call: *const NativeCall) -> i64 {
//!     7
//! }
//!
//! unsafe extern "C" fn alloca(call: *const NativeCall) -> i64 {
//!     let call = &*call;
//!     call.push();
//!     call.increment(call.args().first().copied().unwrap_or(0))
//! }
//!
//! unsafe extern "C" fn resolve(field: *const c_char) -> Option<NativeFn> {
//!     match CStr::from_ptr(field).to_bytes() {
//!         b"seven" => Some(seven),
//!         b"alloca" => Some(alloca),
//!         _ => None,
//!     }
//! }
//!
//! #[no_mangle]
//! pub static Env: NativeModuleDecl = NativeModuleDecl::new(c"lucky", resolve);
//! ```

use std::ffi::{c_char, c_void, CStr};

/// Version of the layout below. Artifacts built against another version are
/// rejected at load time.
pub const NATIVE_ABI_VERSION: u32 = 2;

/// Name of the exported module declaration.
pub const ENV_SYMBOL: &str = "Env";

/// Stack callbacks take the opaque `host` pointer of the current call.
pub type NativeStackFn = unsafe extern "C" fn(host: *mut c_void) -> i64;

/// `__incrementstack__` counterpart.
pub type NativeIncrementFn = unsafe extern "C" fn(host: *mut c_void, delta: i64) -> i64;

/// `__popstack__` counterpart. Writes 0 to `status` on success and 1 on
/// underflow; `status` may be null. An underflow aborts the guest run once
/// the native function returns, whatever it does with the status.
pub type NativePopFn = unsafe extern "C" fn(host: *mut c_void, status: *mut i32) -> i64;

/// One guest call, as seen by native code: the integer arguments plus the
/// auxiliary stack of the calling engine.
#[repr(C)]
#[derive(Debug)]
pub struct NativeCall {
    pub args: *const i64,
    pub arg_count: usize,
    pub host: *mut c_void,
    pub stack_push: NativeStackFn,
    pub stack_increment: NativeIncrementFn,
    pub stack_top: NativeStackFn,
    pub stack_pop: NativePopFn,
}

impl NativeCall {
    /// View the arguments as a slice.
    ///
    /// # Safety
    ///
    /// `args` must point to `arg_count` readable `i64`s for the lifetime of
    /// the returned slice. The host guarantees this for the duration of a
    /// [`NativeFn`] call.
    pub unsafe fn args<'a>(&self) -> &'a [i64] {
        if self.args.is_null() || self.arg_count == 0 {
            &[]
        } else {
            std::slice::from_raw_parts(self.args, self.arg_count)
        }
    }

    /// Save the current stack top and return it.
    ///
    /// # Safety
    ///
    /// Only valid inside the [`NativeFn`] call that received `self`.
    pub unsafe fn push(&self) -> i64 {
        (self.stack_push)(self.host)
    }

    /// Move the stack top by `delta` and return the new top.
    ///
    /// # Safety
    ///
    /// Only valid inside the [`NativeFn`] call that received `self`.
    pub unsafe fn increment(&self, delta: i64) -> i64 {
        (self.stack_increment)(self.host, delta)
    }

    /// # Safety
    ///
    /// Only valid inside the [`NativeFn`] call that received `self`.
    pub unsafe fn top(&self) -> i64 {
        (self.stack_top)(self.host)
    }

    /// Restore the most recently saved top, or `None` on underflow.
    ///
    /// # Safety
    ///
    /// Only valid inside the [`NativeFn`] call that received `self`.
    pub unsafe fn pop(&self) -> Option<i64> {
        let mut status = 0;
        let value = (self.stack_pop)(self.host, &mut status);
        (status == 0).then_some(value)
    }
}

/// A native extension entry point.
pub type NativeFn = unsafe extern "C" fn(call: *const NativeCall) -> i64;

/// Field lookup: returns the entry point for a NUL-terminated field name.
pub type NativeResolveFn = unsafe extern "C" fn(field: *const c_char) -> Option<NativeFn>;

/// Import declaration hook. Reserved.
pub type NativeImportFn = unsafe extern "C" fn() -> *const c_char;

/// The value exported under [`ENV_SYMBOL`].
#[repr(C)]
#[derive(Debug)]
pub struct NativeModuleDecl {
    pub abi_version: u32,
    pub name: *const c_char,
    pub resolve: Option<NativeResolveFn>,
    pub import: Option<NativeImportFn>,
}

// The declaration is immutable after export and only holds pointers to
// 'static data inside the artifact.
unsafe impl Sync for NativeModuleDecl {}
unsafe impl Send for NativeModuleDecl {}

impl NativeModuleDecl {
    pub const fn new(name: &'static CStr, resolve: NativeResolveFn) -> Self {
        Self {
            abi_version: NATIVE_ABI_VERSION,
            name: name.as_ptr(),
            resolve: Some(resolve),
            import: None,
        }
    }

    /// Check that this declaration satisfies the module capability set and
    /// return the module name.
    ///
    /// # Safety
    ///
    /// `name`, when non-null, must point to a NUL-terminated string that
    /// outlives the declaration.
    pub unsafe fn validate(&self) -> Result<String, String> {
        if self.abi_version != NATIVE_ABI_VERSION {
            return Err(format!(
                "ABI version {} does not match host version {}",
                self.abi_version, NATIVE_ABI_VERSION
            ));
        }
        if self.resolve.is_none() {
            return Err("declaration has no resolve function".to_string());
        }
        if self.name.is_null() {
            return Err("declaration has no module name".to_string());
        }
        let name = CStr::from_ptr(self.name)
            .to_str()
            .map_err(|e| format!("module name is not valid UTF-8: {}", e))?;
        if name.is_empty() {
            return Err("module name is empty".to_string());
        }
        Ok(name.to_string())
    }
}
