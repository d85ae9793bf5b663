//! An extension built against a newer ABI than the host understands.
//! Loading it must fail without registering anything.

use std::ffi::c_char;

use arbor::ffi::{NativeFn, NativeModuleDecl, NATIVE_ABI_VERSION};

unsafe extern "C" fn resolve(_field: *const c_char) -> Option<NativeFn> {
    None
}

#[no_mangle]
#[allow(non_upper_case_globals)]
pub static Env: NativeModuleDecl = NativeModuleDecl {
    abi_version: NATIVE_ABI_VERSION + 7,
    name: c"calc".as_ptr(),
    resolve: Some(resolve),
    import: None,
};
