//! Engine run tests
//!
//! Drives `Vm` end to end with the scripted runtime from `common`: entry
//! lookup, link-time and call-time failures, the auxiliary stack across a
//! run, and module setup from providers and configuration.

mod common;

use arbor::config::ArborConfig;
use arbor::extensions::ModuleProviders;
use arbor::ffi::LoadError;
use arbor::vm::{LinkError, Vm, VmError, RUN_FAILED};
use common::{call, counting_math, global, invocations, ScriptRuntime, Step};

// ============================================================================
// Entry Export
// ============================================================================

#[test]
fn test_run_calls_extension() {
    let runtime = ScriptRuntime::new().export("main", vec![call("math", "add", &[3, 4])]);
    let mut vm = Vm::new(runtime, "main");
    let (math, count) = counting_math();
    vm.register_module(math);

    assert_eq!(vm.run().unwrap(), 7);
    assert_eq!(invocations(&count), 1);
    assert_eq!(vm.runtime().trace(), ["math.add"]);
}

#[test]
fn test_missing_entry_runs_nothing() {
    let runtime = ScriptRuntime::new().export("main", vec![call("math", "add", &[])]);
    let mut vm = Vm::new(runtime, "start");
    let (math, count) = counting_math();
    vm.register_module(math);

    let err = vm.run().unwrap_err();
    assert!(matches!(&err, VmError::EntryNotFound(name) if name == "start"));
    assert_eq!(err.to_string(), "entry function not found: start");

    let (result, err) = vm.run_or_failed();
    assert_eq!(result, RUN_FAILED);
    assert!(err.is_some());
    assert_eq!(invocations(&count), 0);
    assert!(vm.runtime().trace().is_empty());
}

#[test]
fn test_run_twice_reuses_entry() {
    let runtime = ScriptRuntime::new().export("main", vec![call("math", "add", &[])]);
    let mut vm = Vm::new(runtime, "main");
    let (math, count) = counting_math();
    vm.register_module(math);

    vm.run().unwrap();
    vm.run().unwrap();
    assert_eq!(invocations(&count), 2);
}

// ============================================================================
// Link Failures
// ============================================================================

#[test]
fn test_unknown_import_aborts_before_any_call() {
    let runtime = ScriptRuntime::new().export(
        "main",
        vec![call("math", "add", &[]), call("gfx", "draw", &[])],
    );
    let mut vm = Vm::new(runtime, "main");
    let (math, count) = counting_math();
    vm.register_module(math);

    let err = vm.run().unwrap_err();
    assert_eq!(
        err.as_link_error(),
        Some(&LinkError::UnknownModule {
            module: "gfx".to_string()
        })
    );
    assert_eq!(invocations(&count), 0);
}

#[test]
fn test_unknown_field_reports_failure() {
    let runtime = ScriptRuntime::new().export("main", vec![call("math", "sqrt", &[16])]);
    let mut vm = Vm::new(runtime, "main");
    let (math, _) = counting_math();
    vm.register_module(math);

    let (result, err) = vm.run_or_failed();
    assert_eq!(result, RUN_FAILED);
    assert!(matches!(
        err.as_ref().and_then(VmError::as_link_error),
        Some(LinkError::UnknownField { .. })
    ));
    assert!(vm.stack_trace().starts_with("script:"));
}

#[test]
fn test_unsupported_global_aborts() {
    let runtime = ScriptRuntime::new().export("main", vec![global("env", "tableBase")]);
    let mut vm = Vm::new(runtime, "main");

    assert!(matches!(
        vm.run(),
        Err(VmError::Link(LinkError::UnsupportedGlobal { .. }))
    ));
}

// ============================================================================
// Auxiliary Stack
// ============================================================================

#[test]
fn test_push_increment_pop_restores_top() {
    let runtime = ScriptRuntime::new().export(
        "main",
        vec![
            call("env", "__pushstack__", &[]),
            call("env", "__incrementstack__", &[16]),
            call("env", "__stacktop__", &[]),
        ],
    );
    let mut vm = Vm::with_host(runtime, "main", arbor::vm::Host::new(5));

    assert_eq!(vm.run().unwrap(), 21);
    assert_eq!(vm.stack_top(), 21);
    assert_eq!(vm.call_stack(), [5]);
}

#[test]
fn test_balanced_frames_leave_call_stack_empty() {
    let runtime = ScriptRuntime::new().export(
        "main",
        vec![
            call("env", "__pushstack__", &[]),
            call("env", "__incrementstack__", &[16]),
            call("env", "__pushstack__", &[]),
            call("env", "__incrementstack__", &[8]),
            call("env", "__popstack__", &[]),
            call("env", "__popstack__", &[]),
        ],
    );
    let mut vm = Vm::with_host(runtime, "main", arbor::vm::Host::new(5));

    assert_eq!(vm.run().unwrap(), 5);
    assert_eq!(vm.stack_top(), 5);
    assert!(vm.call_stack().is_empty());
}

#[test]
fn test_stacktop_global_is_read_at_link_time() {
    let runtime = ScriptRuntime::new().export(
        "main",
        vec![
            call("env", "__incrementstack__", &[100]),
            global("env", "STACKTOP_ASM"),
        ],
    );
    let mut vm = Vm::with_host(runtime, "main", arbor::vm::Host::new(7));

    assert_eq!(vm.run().unwrap(), 7);
    assert_eq!(vm.stack_top(), 107);
}

#[test]
fn test_pop_underflow_aborts_run() {
    let runtime = ScriptRuntime::new().export(
        "main",
        vec![
            call("env", "__popstack__", &[]),
            Step::Const(42),
        ],
    );
    let mut vm = Vm::with_host(runtime, "main", arbor::vm::Host::new(5));

    let (result, err) = vm.run_or_failed();
    assert_eq!(result, RUN_FAILED);
    assert_eq!(
        err.as_ref().and_then(VmError::as_link_error),
        Some(&LinkError::StackUnderflow)
    );
    assert_eq!(vm.stack_top(), 5);
}

#[test]
fn test_increment_without_argument_aborts() {
    let runtime =
        ScriptRuntime::new().export("main", vec![call("env", "__incrementstack__", &[])]);
    let mut vm = Vm::new(runtime, "main");

    assert!(matches!(
        vm.run(),
        Err(VmError::Link(LinkError::MissingArgument { .. }))
    ));
}

// ============================================================================
// Module Setup
// ============================================================================

#[test]
fn test_load_providers() {
    let runtime = ScriptRuntime::new().export("main", vec![call("math", "add", &[3, 4])]);
    let mut vm = Vm::new(runtime, "main");
    vm.load_providers(&ModuleProviders::with_bundled(), &["math"])
        .unwrap();

    assert_eq!(vm.run().unwrap(), 7);
}

#[test]
fn test_unknown_provider_fails_setup() {
    let mut vm = Vm::new(ScriptRuntime::new(), "main");
    let err = vm
        .load_providers(&ModuleProviders::with_bundled(), &["math", "gfx"])
        .unwrap_err();

    assert!(matches!(err, VmError::Load(LoadError::UnknownProvider(ref name)) if name == "gfx"));
    assert!(vm.host().registry().contains("math"));
}

#[test]
fn test_failed_load_leaves_registry_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("libmissing.so");

    let mut vm = Vm::new(ScriptRuntime::new(), "main");
    vm.load_providers(&ModuleProviders::with_bundled(), &["debug"])
        .unwrap();

    let err = vm.load(&missing).unwrap_err();
    assert!(matches!(err, VmError::Load(LoadError::Open { .. })));
    assert_eq!(vm.host().registry().names(), vec!["debug"]);
}

#[cfg(target_os = "linux")]
#[test]
fn test_library_without_module_is_rejected() {
    let mut vm = Vm::new(ScriptRuntime::new(), "main");
    vm.load_providers(&ModuleProviders::with_bundled(), &["math"])
        .unwrap();

    let err = vm.load("libc.so.6").unwrap_err();
    assert!(matches!(err, VmError::Load(LoadError::MissingSymbol { .. })));
    assert_eq!(vm.host().registry().names(), vec!["math"]);
}

#[test]
fn test_with_extensions_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let paths = [dir.path().join("liba.so"), dir.path().join("libb.so")];

    let result = Vm::with_extensions(ScriptRuntime::new(), "main", &paths);
    assert!(matches!(result, Err(VmError::Load(LoadError::Open { .. }))));
}

#[test]
fn test_from_config() {
    let config: ArborConfig = toml::from_str(
        r#"
[vm]
entrypoint = "start"
stack_top = 4096

[extensions]
providers = ["math", "debug"]
"#,
    )
    .unwrap();

    let runtime = ScriptRuntime::new().export(
        "start",
        vec![
            call("debug", "stacktop", &[]),
            call("math", "add", &[3, 4]),
        ],
    );
    let mut vm = Vm::from_config(runtime, &config, &ModuleProviders::with_bundled()).unwrap();

    assert_eq!(vm.entrypoint(), "start");
    assert_eq!(vm.stack_top(), 4096);
    assert_eq!(vm.run().unwrap(), 7);
    assert_eq!(vm.runtime().trace(), ["debug.stacktop", "math.add"]);
}

#[test]
fn test_from_config_search_paths() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ArborConfig::default();
    config.extensions.search_paths.push(dir.path().to_path_buf());

    let mut vm = Vm::from_config(ScriptRuntime::new(), &config, &ModuleProviders::new()).unwrap();
    assert_eq!(vm.loader_mut().search_paths()[0], dir.path());
}
