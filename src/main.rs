use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use autoscan::core::{Autoloader, AutoloaderConfig, CacheFormat};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "autoscan",
    version = "0.1.0",
    author = "autoscan developers",
    about = "Resolve declared type names to source files through a cached directory index"
)]
struct Cli {
    /// Directory holding the index cache
    #[arg(short, long, value_name = "PATH")]
    cache_dir: PathBuf,

    /// Directory to scan; repeat to watch several, later ones win on collisions
    #[arg(short, long = "dir", value_name = "PATH", required = true)]
    dirs: Vec<PathBuf>,

    /// Comma-separated list of file suffixes to scan
    #[arg(
        short,
        long,
        value_name = "EXTS",
        value_delimiter = ',',
        default_value = ".php,.inc"
    )]
    ext: Vec<String>,

    /// Cache file name prefix
    #[arg(short, long, value_name = "NAME", default_value = "autoscan")]
    namespace: String,

    /// Cache encoding: json, bincode
    #[arg(short, long, value_name = "FORMAT", value_enum, default_value_t = FormatArg::Json)]
    format: FormatArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Resolve one or more type names
    Resolve {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Rescan the directories and print the symbol table
    Index,
    /// Delete the cached index for these directories
    Clear,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
#[value(rename_all = "kebab-case")]
enum FormatArg {
    Json,
    Bincode,
}

impl From<FormatArg> for CacheFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => CacheFormat::Json,
            FormatArg::Bincode => CacheFormat::Bincode,
        }
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let Cli {
        cache_dir,
        dirs,
        ext,
        namespace,
        format,
        command,
    } = cli;

    let extensions: Vec<String> = ext
        .into_iter()
        .map(|ext| ext.trim().to_string())
        .filter(|ext| !ext.is_empty())
        .collect();

    let config = AutoloaderConfig::new(&cache_dir)
        .with_namespace(namespace)
        .with_extensions(extensions)
        .with_cache_format(format.into());

    let mut loader = Autoloader::new(config)?;
    for dir in &dirs {
        loader.add_directory(dir)?;
    }
    loader.register()?;

    let start_time = Instant::now();

    let exit = match command {
        Command::Resolve { names } => {
            let mut missed = 0usize;
            for name in &names {
                if loader.resolve(name) {
                    let path = loader
                        .snapshot()
                        .lookup(name)
                        .map(|path| path.display().to_string())
                        .unwrap_or_default();
                    println!("{} -> {}", name, path);
                } else {
                    println!("{}: not found", name);
                    missed += 1;
                }
            }
            println!(
                "Materialized {} file(s), rescanned: {}",
                loader.materializer().loaded().len(),
                loader.has_rescanned()
            );
            if missed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Index => {
            loader.refresh();
            let snapshot = loader.snapshot();
            for (identifier, path) in &snapshot.symbols {
                println!("{} -> {}", identifier, path.display());
            }
            println!(
                "Indexed {} symbol(s) in {} file(s)",
                snapshot.symbols.len(),
                snapshot.freshness.len()
            );
            ExitCode::SUCCESS
        }
        Command::Clear => {
            let removed = match loader.fingerprint() {
                Some(fingerprint) => loader.cache().remove(fingerprint.as_str())?,
                None => false,
            };
            if removed {
                println!("Cache entry removed");
            } else {
                println!("No cache entry for these directories");
            }
            ExitCode::SUCCESS
        }
    };

    println!("Completed in {:.3}s", start_time.elapsed().as_secs_f64());
    Ok(exit)
}
