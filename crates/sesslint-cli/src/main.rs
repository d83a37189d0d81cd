use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;

use sesslint_core::version;
use sesslint_scan::{scan, summarize, ScanConfig};
use sesslint_schema::Registry;

/// Exit code for fatal startup errors (unloadable ruleset, bad input path).
const EXIT_FATAL: i32 = 2;

#[derive(Parser)]
#[command(
    name = "sesslint",
    version,
    about = "Validate coding-agent session logs against versioned schemas"
)]
struct Cli {
    /// Session file or project directory to validate
    path: PathBuf,

    /// Print every violation plus a snippet of each offending record
    #[arg(short, long)]
    verbose: bool,

    /// Directory containing the versioned schema documents
    /// (default: $SESSLINT_SCHEMA_DIR, then schemas/ beside the binary,
    /// then ./schemas)
    #[arg(long)]
    schema_dir: Option<PathBuf>,

    /// Ruleset version to fall back to when no fingerprint matches
    #[arg(long, default_value = version::GOLDEN)]
    default_version: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(clean) => std::process::exit(if clean { 0 } else { 1 }),
        Err(e) => {
            eprintln!("sesslint: {e:#}");
            std::process::exit(EXIT_FATAL);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let schema_dir = resolve_schema_dir(cli.schema_dir.clone())?;
    let registry = Registry::load(&schema_dir, version::CANDIDATES)?;

    let config = ScanConfig {
        default_version: cli.default_version.clone(),
        ..ScanConfig::default()
    };

    let result = scan(&cli.path, &registry, &config)?;
    print!("{}", summarize(&result, cli.verbose));
    Ok(result.is_clean())
}

/// Flag, then env var, then `schemas/` beside the executable, then `./schemas`.
fn resolve_schema_dir(flag: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os("SESSLINT_SCHEMA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let beside = parent.join("schemas");
            if beside.is_dir() {
                return Ok(beside);
            }
        }
    }
    let local = PathBuf::from("schemas");
    if local.is_dir() {
        return Ok(local);
    }
    bail!("no schema directory found; pass --schema-dir or set SESSLINT_SCHEMA_DIR");
}
