//! wasmi execution backend
//!
//! Guest bytecode is a WebAssembly module. Every import is resolved through
//! the [`Host`] when the module is instantiated; function imports become
//! host closures that receive the call's arguments as their context, and
//! `env.STACKTOP_ASM` style globals are materialised from the current stack
//! top.

use wasmi::core::{HostError, ValType};
use wasmi::{Caller, Engine, ExternType, Func, Global, Linker, Module, Store, Val};

use super::{GuestRuntime, Host, LinkError, VmError, VmResult};

impl HostError for LinkError {}

pub struct WasmiRuntime {
    engine: Engine,
    module: Module,
    last_entry: Option<String>,
    last_fault: Option<String>,
}

impl WasmiRuntime {
    /// Decode and validate a WebAssembly module.
    pub fn new(wasm: &[u8]) -> VmResult<Self> {
        let engine = Engine::default();
        let module = Module::new(&engine, wasm).map_err(|e| VmError::Runtime(e.to_string()))?;
        Ok(Self {
            engine,
            module,
            last_entry: None,
            last_fault: None,
        })
    }

    /// `(module, field)` of every import, in declaration order.
    pub fn imports(&self) -> Vec<(String, String)> {
        self.module
            .imports()
            .map(|import| (import.module().to_string(), import.name().to_string()))
            .collect()
    }

    fn link(&self, store: &mut Store<Host>) -> VmResult<Linker<Host>> {
        let mut linker = <Linker<Host>>::new(&self.engine);

        for import in self.module.imports() {
            let (module, field) = (import.module(), import.name());
            match import.ty() {
                ExternType::Func(func_ty) => {
                    let host_func = store.data().resolve_func(module, field)?;
                    let result_ty = func_ty.results().first().copied();
                    let func = Func::new(
                        &mut *store,
                        func_ty.clone(),
                        move |mut caller: Caller<'_, Host>,
                              params: &[Val],
                              results: &mut [Val]|
                              -> Result<(), wasmi::Error> {
                            let args: Vec<i64> = params.iter().map(val_to_i64).collect();
                            let value = host_func
                                .call(caller.data_mut().stack_mut(), &args)
                                .map_err(wasmi::Error::host)?;
                            if let (Some(slot), Some(ty)) = (results.first_mut(), result_ty) {
                                *slot = i64_to_val(value, ty);
                            }
                            Ok(())
                        },
                    );
                    linker
                        .define(module, field, func)
                        .map_err(|e| VmError::Runtime(e.to_string()))?;
                }
                ExternType::Global(global_ty) => {
                    let value = store.data().resolve_global(module, field)?;
                    let global = Global::new(
                        &mut *store,
                        i64_to_val(value, global_ty.content()),
                        global_ty.mutability(),
                    );
                    linker
                        .define(module, field, global)
                        .map_err(|e| VmError::Runtime(e.to_string()))?;
                }
                _ => {
                    return Err(LinkError::UnsupportedImport {
                        module: module.to_string(),
                        field: field.to_string(),
                    }
                    .into())
                }
            }
        }

        Ok(linker)
    }

    fn execute(&self, store: &mut Store<Host>, entry: &str) -> VmResult<i64> {
        let linker = self.link(store)?;
        let pre = linker
            .instantiate(&mut *store, &self.module)
            .map_err(fault)?;
        let instance = pre.start(&mut *store).map_err(fault)?;

        let func = instance
            .get_func(&*store, entry)
            .ok_or_else(|| VmError::EntryNotFound(entry.to_string()))?;
        let ty = func.ty(&*store);
        let params: Vec<Val> = ty.params().iter().map(|t| Val::default(*t)).collect();
        let mut results: Vec<Val> = ty.results().iter().map(|t| Val::default(*t)).collect();

        func.call(&mut *store, &params, &mut results).map_err(fault)?;
        Ok(results.first().map(val_to_i64).unwrap_or(0))
    }
}

impl GuestRuntime for WasmiRuntime {
    type Entry = String;

    fn function_export(&self, name: &str) -> Option<String> {
        self.module
            .exports()
            .find(|export| export.name() == name && matches!(export.ty(), ExternType::Func(_)))
            .map(|export| export.name().to_string())
    }

    fn run(&mut self, entry: &String, host: &mut Host) -> VmResult<i64> {
        self.last_entry = Some(entry.clone());
        self.last_fault = None;

        let mut store = Store::new(&self.engine, std::mem::take(host));
        let result = self.execute(&mut store, entry);
        *host = store.into_data();

        if let Err(e) = &result {
            self.last_fault = Some(e.to_string());
        }
        result
    }

    fn stack_trace(&self) -> String {
        let entry = self.last_entry.as_deref().unwrap_or("<not started>");
        match &self.last_fault {
            Some(fault) => format!("wasmi: entry '{}' aborted\n  at: {}", entry, fault),
            None => format!("wasmi: entry '{}', no active fault", entry),
        }
    }
}

fn fault(err: wasmi::Error) -> VmError {
    match err.downcast_ref::<LinkError>() {
        Some(link) => VmError::Link(link.clone()),
        None => VmError::Trap(err.to_string()),
    }
}

fn val_to_i64(val: &Val) -> i64 {
    match val {
        Val::I32(v) => i64::from(*v),
        Val::I64(v) => *v,
        _ => 0,
    }
}

fn i64_to_val(value: i64, ty: ValType) -> Val {
    match ty {
        ValType::I32 => Val::I32(value as i32),
        ValType::I64 => Val::I64(value),
        other => Val::default(other),
    }
}
