//! fwdeps CLI
//!
//! Entry point for the `fwdeps` command-line tool.

use clap::{Parser, Subcommand};
use fwdeps::config::{parse_cli_override, FeatureOverride, DEFAULT_CONFIG_PATH};
use fwdeps::merge::{CommandScriptHost, DeferredScripts, ScheduledScript};
use fwdeps::resolver::ProjectProbe;
use fwdeps::{ProjectConfig, Resolution, Resolver};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "fwdeps")]
#[command(about = "Resolve enabled firmware features into a build configuration", version)]
struct Cli {
    /// Path to the project file
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Per-build feature override (repeatable)
    #[arg(long = "set", value_name = "NAME=FRAGMENT", global = true)]
    overrides: Vec<String>,

    /// Increase diagnostic output (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve features and print the resulting build configuration
    Resolve {
        /// Write JSON to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Run extra scripts instead of listing them
        #[arg(long)]
        run_scripts: bool,
    },

    /// Check whether features are enabled (exit 0 only if all are)
    Enabled {
        #[arg(required = true)]
        features: Vec<String>,
    },

    /// Print the preprocessor macro table
    Macros,

    /// Print the compiler used for probing
    Locate,

    /// List the ingested feature table
    Features,
}

/// `resolve` output
#[derive(Serialize)]
struct ResolveReport<'a> {
    #[serde(flatten)]
    resolution: &'a Resolution,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    scripts: Vec<ScheduledScript>,
}

fn main() {
    let cli = Cli::parse();

    let project = match ProjectConfig::from_file(&cli.config) {
        Ok(project) => project,
        Err(e) => {
            init_logging(cli.verbose);
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };
    init_logging(cli.verbose.max(project.env.custom_verbose));

    let overrides = match cli
        .overrides
        .iter()
        .map(|arg| parse_cli_override(arg.as_str()))
        .collect::<Result<Vec<FeatureOverride>, _>>()
    {
        Ok(overrides) => overrides,
        Err(e) => fail(e),
    };

    let root = project_root(&cli.config);
    let resolver = match Resolver::for_project(&project, &overrides, &root) {
        Ok(resolver) => resolver,
        Err(e) => fail(e),
    };

    match cli.command {
        Commands::Resolve {
            output,
            run_scripts,
        } => run_resolve(&resolver, &project, &root, output, run_scripts),
        Commands::Enabled { features } => run_enabled(&resolver, &features),
        Commands::Macros => run_macros(&resolver),
        Commands::Locate => run_locate(&resolver),
        Commands::Features => run_features(&resolver),
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn fail(error: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", error);
    process::exit(1);
}

/// Directory holding the project file
fn project_root(config: &Path) -> PathBuf {
    match config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(format!("Error serializing output: {}", e)),
    }
}

fn run_resolve(
    resolver: &Resolver<ProjectProbe>,
    project: &ProjectConfig,
    root: &Path,
    output: Option<PathBuf>,
    run_scripts: bool,
) {
    let initial = project.build_configuration();

    let (resolution, scheduled) = if run_scripts {
        let mut host = CommandScriptHost::new(Some(root));
        match resolver.resolve(initial, &mut host) {
            Ok(resolution) => (resolution, Vec::new()),
            Err(e) => fail(e),
        }
    } else {
        let mut host = DeferredScripts::new();
        match resolver.resolve(initial, &mut host) {
            Ok(resolution) => (resolution, host.into_scheduled()),
            Err(e) => fail(e),
        }
    };

    let report = ResolveReport {
        resolution: &resolution,
        scripts: scheduled,
    };

    match output {
        Some(path) => {
            let json = match serde_json::to_string_pretty(&report) {
                Ok(json) => json,
                Err(e) => fail(format!("Error serializing output: {}", e)),
            };
            if let Err(e) = fs::write(&path, json) {
                fail(format!("Failed to write {}: {}", path.display(), e));
            }
            eprintln!("Wrote: {}", path.display());
        }
        None => print_json(&report),
    }
}

fn run_enabled(resolver: &Resolver<ProjectProbe>, features: &[String]) {
    let mut all_enabled = true;
    for feature in features {
        match resolver.is_enabled(feature) {
            Ok(enabled) => {
                println!("{}: {}", feature, if enabled { "enabled" } else { "disabled" });
                all_enabled &= enabled;
            }
            Err(e) => fail(e),
        }
    }
    process::exit(if all_enabled { 0 } else { 1 });
}

fn run_macros(resolver: &Resolver<ProjectProbe>) {
    match resolver.macro_table() {
        Ok(table) => print_json(table),
        Err(e) => fail(e),
    }
}

fn run_locate(resolver: &Resolver<ProjectProbe>) {
    let compiler = resolver.evaluator().source().compiler();
    println!("{} ({})", compiler.path.display(), compiler.source);
}

fn run_features(resolver: &Resolver<ProjectProbe>) {
    let table: Vec<_> = resolver.table().iter().collect();
    print_json(&table);
}
