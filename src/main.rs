//! Arbor - host-function linkage for embedded bytecode guests
//!
//! Main CLI entry point for running guest programs and inspecting extension modules.

use anyhow::{Context, Result};
use arbor::config::ArborConfig;
use arbor::extensions::ModuleProviders;
use arbor::ffi::ExtensionLoader;
use arbor::vm::Host;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
#[cfg(feature = "wasmi")]
use {
    arbor::vm::{Vm, WasmiRuntime},
    std::fs,
};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(version)]
#[command(about = "Run guest programs against native extension modules", long_about = None)]
struct Cli {
    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the modules a configuration makes importable
    Modules {
        /// Config file (default: nearest arbor.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Extension artifact to load (repeatable)
        #[arg(long = "ext", value_name = "PATH")]
        extensions: Vec<PathBuf>,

        /// Statically linked provider to enable (repeatable)
        #[arg(long = "provider", value_name = "NAME")]
        providers: Vec<String>,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a WebAssembly guest
    #[cfg(feature = "wasmi")]
    Run {
        /// Guest module (.wasm)
        input: PathBuf,

        /// Entry export (overrides config)
        #[arg(short, long)]
        entry: Option<String>,

        /// Config file (default: nearest arbor.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Extension artifact to load (repeatable)
        #[arg(long = "ext", value_name = "PATH")]
        extensions: Vec<PathBuf>,

        /// Statically linked provider to enable (repeatable)
        #[arg(long = "provider", value_name = "NAME")]
        providers: Vec<String>,
    },
}

#[derive(Serialize)]
struct ModuleListing {
    name: String,
    import: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Modules {
            config,
            extensions,
            providers,
            json,
        } => {
            let config = resolve_config(config.as_deref(), extensions, providers)?;
            cmd_modules(&config, json)
        }
        #[cfg(feature = "wasmi")]
        Commands::Run {
            input,
            entry,
            config,
            extensions,
            providers,
        } => {
            let mut config = resolve_config(config.as_deref(), extensions, providers)?;
            if let Some(entry) = entry {
                config.vm.entrypoint = entry;
            }
            cmd_run(&input, &config)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

/// Load the config file and append command-line modules after its own.
fn resolve_config(
    path: Option<&Path>,
    extensions: Vec<PathBuf>,
    providers: Vec<String>,
) -> Result<ArborConfig> {
    let mut config = match path {
        Some(path) => ArborConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ArborConfig::load_from_cwd().context("Failed to load arbor.toml")?,
    };
    config.extensions.providers.extend(providers);
    config.extensions.paths.extend(extensions);
    Ok(config)
}

fn cmd_modules(config: &ArborConfig, json: bool) -> Result<()> {
    let providers = ModuleProviders::with_bundled();
    let loader = ExtensionLoader::with_search_paths(&config.extensions.search_paths);
    let host =
        Host::from_config(config, &providers, &loader).context("Failed to set up extensions")?;

    let listing: Vec<ModuleListing> = host
        .registry()
        .names()
        .into_iter()
        .filter_map(|name| host.registry().get(name))
        .map(|module| ModuleListing {
            name: module.name().to_string(),
            import: module.import(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else if listing.is_empty() {
        println!("No modules registered.");
        println!("Available providers: {}", providers.names().join(", "));
    } else {
        for module in &listing {
            println!("{}", module.name);
        }
    }
    Ok(())
}

#[cfg(feature = "wasmi")]
fn cmd_run(input: &Path, config: &ArborConfig) -> Result<()> {
    let wasm = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let runtime = WasmiRuntime::new(&wasm).context("Failed to load guest module")?;
    let mut vm = Vm::from_config(runtime, config, &ModuleProviders::with_bundled())
        .context("Failed to set up extensions")?;

    match vm.run() {
        Ok(value) => {
            println!("{}", value);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            vm.print_stack_trace();
            println!("{}", arbor::RUN_FAILED);
            std::process::exit(1);
        }
    }
}
