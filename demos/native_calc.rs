//! A native `calc` extension module
//!
//! Build with `cargo build --example native_calc`, then load
//! `target/debug/examples/libnative_calc.so` with `arbor modules --ext`.
//!
//! | Field | Result |
//! |-------|--------|
//! | add | sum of all arguments |
//! | frame | saves the stack top, grows it by `args[0]`, returns the new top |
//! | unwind | restores the saved top; an underflow aborts the run |

use std::ffi::{c_char, CStr};

use arbor::ffi::{NativeCall, NativeFn, NativeModuleDecl};

unsafe extern "C" fn add(call: *const NativeCall) -> i64 {
    (*call).args().iter().fold(0i64, |acc, v| acc.wrapping_add(*v))
}

unsafe extern "C" fn frame(call: *const NativeCall) -> i64 {
    let call = &*call;
    call.push();
    call.increment(call.args().first().copied().unwrap_or(0))
}

unsafe extern "C" fn unwind(call: *const NativeCall) -> i64 {
    (*call).pop().unwrap_or(-1)
}

unsafe extern "C" fn resolve(field: *const c_char) -> Option<NativeFn> {
    match CStr::from_ptr(field).to_bytes() {
        b"add" => Some(add),
        b"frame" => Some(frame),
        b"unwind" => Some(unwind),
        _ => None,
    }
}

#[no_mangle]
#[allow(non_upper_case_globals)]
pub static Env: NativeModuleDecl = NativeModuleDecl::new(c"calc", resolve);
