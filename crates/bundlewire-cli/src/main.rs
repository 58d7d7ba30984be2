mod resolve;
mod universe;
mod validate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "bundlewire")]
#[command(about = "Resolve the wiring of modular bundles")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve bundles of a universe file and print their wiring
    Resolve(resolve::ResolveArgs),

    /// Parse every manifest of a universe file and summarize it
    Validate(validate::ValidateArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // RUST_LOG still wins over -v
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Resolve(args) => resolve::execute(args),
        Commands::Validate(args) => validate::execute(args),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
