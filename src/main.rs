//! mesa-partes-pdf CLI - actas and informes periciales from case JSON

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use mesa_partes_pdf::{DocumentConfig, DocumentKind, generate_to_file};

#[derive(Parser)]
#[command(name = "mesa-partes-pdf")]
#[command(version)]
#[command(about = "Generate the PDF actas and informes periciales of a Mesa de Partes case", long_about = None)]
struct Cli {
    /// Document to produce
    #[arg(value_enum)]
    kind: DocumentKind,

    /// Case record (JSON)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output PDF file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Layout configuration (JSON); built-in A4 letterhead when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emblem image drawn in the letterhead (PNG or JPEG)
    #[arg(long, value_name = "FILE")]
    emblem: Option<PathBuf>,

    /// Log page breaks and font details
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = match &cli.config {
        Some(path) => match DocumentConfig::from_json_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => DocumentConfig::default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(emblem) = cli.emblem {
        config.letterhead.emblem_path = Some(emblem);
    }

    match generate_to_file(cli.kind, &cli.input, &cli.output, &config) {
        Ok(()) => {
            println!("{} -> {}", cli.input.display(), cli.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
