//! Shared test harness: a scripted guest runtime.
//!
//! `ScriptRuntime` stands in for a real engine. Each export is a list of
//! steps; every import the script names is resolved through the host before
//! the first step runs, the way an engine links a module at instantiation.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arbor::extensions::{extension_fn, Extension, Resolver};
use arbor::vm::{GuestRuntime, Host, HostFunc, VmResult};

#[derive(Debug, Clone)]
pub enum Step {
    /// Call an import and keep its result.
    Call {
        module: String,
        field: String,
        args: Vec<i64>,
    },
    /// Read a global import.
    Global { module: String, field: String },
    /// Produce a constant.
    Const(i64),
}

pub fn call(module: &str, field: &str, args: &[i64]) -> Step {
    Step::Call {
        module: module.to_string(),
        field: field.to_string(),
        args: args.to_vec(),
    }
}

pub fn global(module: &str, field: &str) -> Step {
    Step::Global {
        module: module.to_string(),
        field: field.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct ScriptRuntime {
    exports: HashMap<String, Vec<Step>>,
    trace: Vec<String>,
}

impl ScriptRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn export(mut self, name: &str, steps: Vec<Step>) -> Self {
        self.exports.insert(name.to_string(), steps);
        self
    }

    /// Imports executed so far, as `module.field`.
    pub fn trace(&self) -> &[String] {
        &self.trace
    }
}

impl GuestRuntime for ScriptRuntime {
    type Entry = String;

    fn function_export(&self, name: &str) -> Option<String> {
        self.exports.contains_key(name).then(|| name.to_string())
    }

    fn run(&mut self, entry: &String, host: &mut Host) -> VmResult<i64> {
        let steps = self.exports.get(entry).cloned().unwrap_or_default();

        let mut linked: HashMap<(String, String), HostFunc> = HashMap::new();
        let mut globals: HashMap<(String, String), i64> = HashMap::new();
        for step in &steps {
            match step {
                Step::Call { module, field, .. } => {
                    let func = host.resolve_func(module, field)?;
                    linked.insert((module.clone(), field.clone()), func);
                }
                Step::Global { module, field } => {
                    let value = host.resolve_global(module, field)?;
                    globals.insert((module.clone(), field.clone()), value);
                }
                Step::Const(_) => {}
            }
        }

        let mut last = 0;
        for step in steps {
            last = match step {
                Step::Call {
                    module,
                    field,
                    args,
                } => {
                    self.trace.push(format!("{}.{}", module, field));
                    let func = &linked[&(module, field)];
                    func.call(host.stack_mut(), &args)?
                }
                Step::Global { module, field } => globals[&(module, field)],
                Step::Const(value) => value,
            };
        }
        Ok(last)
    }

    fn stack_trace(&self) -> String {
        format!("script: {}", self.trace.join(" -> "))
    }
}

/// An extension that counts its invocations and returns `value`.
pub fn counting(value: i64) -> (Arc<dyn Extension>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let ext = extension_fn(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    });
    (ext, count)
}

/// `math` module whose `add` returns 7 and counts its calls.
pub fn counting_math() -> (Arc<Resolver>, Arc<AtomicUsize>) {
    let (add, count) = counting(7);
    (Arc::new(Resolver::new("math").with("add", add)), count)
}

pub fn invocations(count: &AtomicUsize) -> usize {
    count.load(Ordering::SeqCst)
}
