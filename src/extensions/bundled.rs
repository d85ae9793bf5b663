//! Bundled modules
//!
//! | Module | Field | Result |
//! |--------|-------|--------|
//! | math | add, sub, mul | wrapping `a op b` |
//! | math | min, max | `min(a, b)`, `max(a, b)` |
//! | math | abs | wrapping `abs(a)` |
//! | debug | log | logs `a`, returns it |
//! | debug | stacktop | current auxiliary stack top |
//!
//! Missing arguments read as zero.

use std::sync::Arc;

use log::info;

use super::{extension_fn, HostCall, Module, Resolver};

pub const MATH: &str = "math";
pub const DEBUG: &str = "debug";

fn operands(call: &HostCall<'_>) -> (i64, i64) {
    (call.arg(0).unwrap_or(0), call.arg(1).unwrap_or(0))
}

pub fn math_module() -> Arc<dyn Module> {
    let resolver = Resolver::new(MATH)
        .with(
            "add",
            extension_fn(|call| {
                let (a, b) = operands(call);
                Ok(a.wrapping_add(b))
            }),
        )
        .with(
            "sub",
            extension_fn(|call| {
                let (a, b) = operands(call);
                Ok(a.wrapping_sub(b))
            }),
        )
        .with(
            "mul",
            extension_fn(|call| {
                let (a, b) = operands(call);
                Ok(a.wrapping_mul(b))
            }),
        )
        .with(
            "min",
            extension_fn(|call| {
                let (a, b) = operands(call);
                Ok(a.min(b))
            }),
        )
        .with(
            "max",
            extension_fn(|call| {
                let (a, b) = operands(call);
                Ok(a.max(b))
            }),
        )
        .with(
            "abs",
            extension_fn(|call| Ok(call.arg(0).unwrap_or(0).wrapping_abs())),
        );
    Arc::new(resolver)
}

pub fn debug_module() -> Arc<dyn Module> {
    let resolver = Resolver::new(DEBUG)
        .with(
            "log",
            extension_fn(|call| {
                let value = call.arg(0).unwrap_or(0);
                info!("guest log: {}", value);
                Ok(value)
            }),
        )
        .with("stacktop", extension_fn(|call| Ok(call.stack().top())));
    Arc::new(resolver)
}
