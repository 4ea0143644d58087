use clap::{Parser, Subcommand};
use imgsync::{config, output, sync};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Flags that override `imgsync.toml` for one run.
#[derive(clap::Args, Clone, Default)]
struct PipelineArgs {
    /// Source image directory
    #[arg(long)]
    input: Option<PathBuf>,

    /// Generated image directory
    #[arg(long)]
    output: Option<PathBuf>,

    /// Mapping file (default: <input>/_mapping.json)
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Generated constants file (.dart, .ts, .tsx or .js)
    #[arg(long)]
    constants: Option<PathBuf>,

    /// Encoder quality for JPEG and AVIF (1-100)
    #[arg(long)]
    quality: Option<u32>,

    /// Salt for obfuscated names
    #[arg(long)]
    salt: Option<String>,

    /// Obfuscate output names to this many digest characters (0 disables)
    #[arg(long)]
    obfuscate_length: Option<usize>,

    /// Keep PNG sources as PNG
    #[arg(long)]
    no_normalize: bool,
}

impl PipelineArgs {
    /// Convert the flags into a TOML overlay for [`config::load_config`].
    fn to_overlay(&self) -> toml::Value {
        use toml::Value;
        let mut root = toml::map::Map::new();
        let mut obfuscation = toml::map::Map::new();
        let path = |p: &PathBuf| Value::String(p.to_string_lossy().into_owned());

        if let Some(input) = &self.input {
            root.insert("input_dir".into(), path(input));
        }
        if let Some(output) = &self.output {
            root.insert("output_dir".into(), path(output));
        }
        if let Some(mapping) = &self.mapping {
            root.insert("mapping_file".into(), path(mapping));
        }
        if let Some(quality) = self.quality {
            root.insert("quality".into(), Value::Integer(i64::from(quality)));
        }
        if let Some(constants) = &self.constants {
            let mut table = toml::map::Map::new();
            table.insert("file".into(), path(constants));
            root.insert("constants".into(), Value::Table(table));
        }
        if let Some(salt) = &self.salt {
            obfuscation.insert("salt".into(), Value::String(salt.clone()));
        }
        match self.obfuscate_length {
            Some(0) => {
                obfuscation.insert("enabled".into(), Value::Boolean(false));
            }
            Some(length) => {
                obfuscation.insert("enabled".into(), Value::Boolean(true));
                obfuscation.insert("length".into(), Value::Integer(length as i64));
            }
            None => {}
        }
        if !obfuscation.is_empty() {
            root.insert("obfuscation".into(), Value::Table(obfuscation));
        }
        if self.no_normalize {
            let mut table = toml::map::Map::new();
            table.insert("enabled".into(), Value::Boolean(false));
            root.insert("normalization".into(), Value::Table(table));
        }
        Value::Table(root)
    }
}

#[derive(Parser)]
#[command(name = "imgsync")]
#[command(about = "Incremental image asset compressor with generated constants")]
#[command(long_about = "\
Incremental image asset compressor with generated constants

Source images are compressed into the output directory, optionally renamed
to salted digests, and exposed to application code through a generated Dart
or TypeScript constants file. Only new or changed sources are re-encoded;
outputs whose source disappeared are deleted.

Source names start with a lowercase letter, continue with letters, digits or
underscores, and may end in a density suffix:

  raw/
  ├── _mapping.json          # Written by imgsync
  ├── icon_foo.png           # → iconFoo
  ├── icon_foo@2x.png        # density variant of iconFoo
  └── banners/
      └── hero_1.jpg         # → hero1

Run 'imgsync gen-config' to generate a documented imgsync.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./imgsync.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show per-file decisions and debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync outputs, mapping and constants with the input directory
    Sync {
        #[command(flatten)]
        args: PipelineArgs,

        /// Ignore the mapping and re-encode every image
        #[arg(long)]
        force: bool,
    },
    /// Report what a sync would do without changing anything
    Check {
        #[command(flatten)]
        args: PipelineArgs,
    },
    /// Print a stock imgsync.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Sync { args, force } => {
            let cfg = load(cli.config.as_ref(), &args)?;
            init_thread_pool(&cfg.processing);
            let settings = cfg.to_settings(force)?;

            let verbose = cli.verbose;
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    if !verbose && matches!(event, sync::SyncEvent::Unchanged { .. }) {
                        continue;
                    }
                    for line in output::format_sync_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = sync::sync(&settings, Some(tx));
            printer.join().ok();
            let outcome = result?;

            let constants = settings
                .constants
                .as_ref()
                .map(|c| c.file.display().to_string());
            for line in output::format_sync_summary(&outcome, constants.as_deref()) {
                println!("{}", line);
            }
            if !outcome.failures.is_empty() {
                std::process::exit(1);
            }
        }
        Command::Check { args } => {
            let cfg = load(cli.config.as_ref(), &args)?;
            init_thread_pool(&cfg.processing);
            let plan = sync::plan(&cfg.to_settings(false)?)?;
            for line in output::format_plan(&plan) {
                println!("{}", line);
            }
            if !plan.is_clean() {
                std::process::exit(1);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Resolve the config file and layer the CLI flags over it.
fn load(
    explicit: Option<&PathBuf>,
    args: &PipelineArgs,
) -> Result<config::SyncConfig, config::ConfigError> {
    let path = config::find_config(explicit.map(PathBuf::as_path))?;
    tracing::debug!(config = ?path, "loading configuration");
    config::load_config(path.as_deref(), args.to_overlay())
}

/// Diagnostics go to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. The config can lower the count, never raise it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
