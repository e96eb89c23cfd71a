//! iac-local CLI
//!
//! Entry point for the `iac-local` command-line tool.

use clap::{Parser, Subcommand};
use iac_discovery::{has_extension, walk, PathResolver, ResolvedLocation, TraversalEntry};
use iac_local::config::PROJECT_CONFIG_FILE;
use iac_local::{CacheDir, EffectiveConfig, Settings};
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "iac-local")]
#[command(about = "Local policy bundle cache and scan input discovery", version)]
struct Cli {
    /// Path to project config file (default: .iac-local.toml when present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Cache directory holding the policy bundle
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the local cache directory if needed
    Init,

    /// Extract a bundle archive (tar or tar.gz) into the cache
    Extract {
        /// Archive to extract; reads stdin when omitted or "-"
        archive: Option<PathBuf>,
    },

    /// Report bundle validity and the custom rules checksum
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List the files a scan of PATH would cover
    Discover {
        /// File or directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Maximum directory depth below PATH
        #[arg(long)]
        max_depth: Option<usize>,

        /// Include files of every extension
        #[arg(long)]
        all_files: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let max_depth = match &cli.command {
        Commands::Discover { max_depth, .. } => *max_depth,
        _ => None,
    };
    let config = match load_config(cli.config, cli.cache_dir, max_depth) {
        Ok(config) => config,
        Err(e) => fail("Error loading config", &*e),
    };
    let settings = match config.settings() {
        Ok(settings) => settings,
        Err(e) => fail("Error loading config", &e),
    };

    match cli.command {
        Commands::Init => run_init(&settings.cache()),
        Commands::Extract { archive } => run_extract(&settings.cache(), archive),
        Commands::Status { json } => run_status(&settings.cache(), json),
        Commands::Discover {
            path,
            all_files,
            json,
            ..
        } => run_discover(&settings, &path, all_files, json),
        Commands::Config => match config.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => fail("Error serializing output", &e),
        },
    }
}

fn load_config(
    config_path: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    max_depth: Option<usize>,
) -> Result<EffectiveConfig, Box<dyn Error>> {
    let project = config_path.or_else(|| {
        let default = PathBuf::from(PROJECT_CONFIG_FILE);
        default.is_file().then_some(default)
    });

    let mut overrides = Map::new();
    if let Some(dir) = cache_dir {
        overrides.insert("cache_dir".to_string(), json!(dir.to_string_lossy()));
    }
    if let Some(depth) = max_depth {
        overrides.insert("discovery".to_string(), json!({ "max_depth": depth }));
    }
    let overrides = (!overrides.is_empty()).then_some(Value::Object(overrides));

    Ok(EffectiveConfig::build(project.as_deref(), overrides)?)
}

fn run_init(cache: &CacheDir) {
    if let Err(e) = cache.ensure() {
        fail("Error", &e);
    }
    println!("Cache directory ready: {}", cache.path().display());
}

fn run_extract(cache: &CacheDir, archive: Option<PathBuf>) {
    if let Err(e) = cache.ensure() {
        fail("Error", &e);
    }

    let result = match archive {
        Some(path) if path != Path::new("-") => {
            eprintln!("Extracting {}...", path.display());
            cache.extract_bundle_file(&path)
        }
        _ => {
            eprintln!("Extracting bundle from stdin...");
            cache.extract_bundle(io::stdin().lock())
        }
    };

    match result {
        Ok(summary) => println!(
            "Extracted {} entries ({} bytes) into {}",
            summary.entries,
            summary.bytes,
            cache.path().display()
        ),
        Err(e) => fail("Error", &e),
    }
}

fn run_status(cache: &CacheDir, json: bool) {
    let status = cache.bundle_status();

    if json {
        match serde_json::to_string_pretty(&status) {
            Ok(out) => println!("{}", out),
            Err(e) => fail("Error serializing output", &e),
        }
    } else {
        println!("Cache directory: {}", status.cache_dir.display());
        for engine in &status.engines {
            println!(
                "  {:<16} {}",
                engine.engine.to_string(),
                if engine.valid { "valid" } else { "missing" }
            );
        }
        println!(
            "Custom rules checksum: {}",
            status.custom_rules_checksum.as_deref().unwrap_or("none")
        );
    }

    if !status.is_complete() {
        process::exit(1);
    }
}

fn run_discover(settings: &Settings, path: &Path, all_files: bool, json: bool) {
    let resolver = match PathResolver::from_current_dir() {
        Ok(resolver) => resolver,
        Err(e) => fail("Error reading working directory", &e),
    };
    let extensions: &[String] = if all_files {
        &[]
    } else {
        &settings.discovery.extensions
    };

    let root = resolver.resolve(path);
    let is_dir = fs::symlink_metadata(&root)
        .map(|meta| meta.is_dir())
        .unwrap_or(false);

    let mut locations: Vec<ResolvedLocation> = Vec::new();
    if is_dir {
        for entry in walk(&root, settings.discovery.max_depth) {
            match entry {
                Ok(TraversalEntry::File { file_name, .. }) => {
                    if has_extension(&file_name, extensions) {
                        locations.push(resolver.compute_paths(&file_name, path));
                    }
                }
                Ok(TraversalEntry::Directory(_)) => {}
                Err(e) => fail("Traversal error", &e),
            }
        }
    } else if root.exists() {
        locations.push(resolver.compute_paths(&root, path));
    } else {
        eprintln!("Error: path not found: {}", path.display());
        process::exit(1);
    }
    debug!(files = locations.len(), root = %root.display(), "discovery finished");

    if json {
        match serde_json::to_string_pretty(&locations) {
            Ok(out) => println!("{}", out),
            Err(e) => fail("Error serializing output", &e),
        }
    } else {
        for location in &locations {
            println!("{}: {}", location.project_name, location.target_file.display());
        }
    }
}

/// Print `err` and its causes, then exit with status 1.
fn fail(context: &str, err: &dyn Error) -> ! {
    eprintln!("{}: {}", context, err);
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
    process::exit(1);
}
