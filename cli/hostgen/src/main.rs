//! hostgen CLI: generates embedded-module glue for Silverfir host modules.
//!
//! `hostgen <interface.wat> <out-dir>` writes `<stem>_gen.h` and
//! `<stem>_gen.c` into `<out-dir>`.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::level_filters::LevelFilter;

use hostgen::{GeneratorConfig, Wat2Wasm};

#[derive(Parser)]
#[command(
    name = "hostgen",
    version,
    about = "Generate C glue (embedded module, trampolines, binding table) for a host module"
)]
struct Cli {
    /// Interface WAT file
    #[arg(required_unless_present = "check_tool")]
    file: Option<PathBuf>,
    /// Output folder (must exist)
    #[arg(required_unless_present = "check_tool")]
    out_dir: Option<PathBuf>,
    /// TOML file with generator settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Program used to compile the interface file (default: wat2wasm)
    #[arg(long, env = "HOSTGEN_WAT2WASM")]
    compiler: Option<String>,
    /// Bytes per line in the embedded array
    #[arg(long)]
    bytes_per_line: Option<usize>,
    /// Summary format printed after generation
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// Check that the compiler can be located and exit
    #[arg(long)]
    check_tool: bool,
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
    None,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            _ => LevelFilter::DEBUG,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref(), cli.compiler, cli.bytes_per_line)?;

    if cli.check_tool {
        return check_tool(&config);
    }

    let (Some(file), Some(out_dir)) = (cli.file, cli.out_dir) else {
        bail!("both an interface file and an output directory are required");
    };

    let compiler = Wat2Wasm::new(config.compiler.clone());
    let report = hostgen::generate(&file, &out_dir, &config, &compiler)
        .with_context(|| format!("generating host module from {}", file.display()))?;

    match cli.format {
        Format::Text => print!("{report}"),
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::None => {}
    }
    Ok(())
}

/// Defaults, then the config file, then command-line overrides.
fn resolve_config(
    path: Option<&Path>,
    compiler: Option<String>,
    bytes_per_line: Option<usize>,
) -> Result<GeneratorConfig> {
    let mut config = match path {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(compiler) = compiler {
        config.compiler = compiler;
    }
    if let Some(width) = bytes_per_line {
        config.bytes_per_line = width;
    }
    config.validate()?;
    Ok(config)
}

fn check_tool(config: &GeneratorConfig) -> Result<()> {
    let compiler = Wat2Wasm::new(config.compiler.clone());
    let located = hostgen::compiler::locate_program(compiler.program())
        .ok_or_else(|| anyhow::anyhow!("{} not found. Please make sure it's in the PATH", compiler.program()))?;
    let version = compiler.version()?;
    println!("{}: {} ({})", compiler.program(), version, located.display());
    Ok(())
}
