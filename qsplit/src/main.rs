//! qsplit CLI - split a Qualtrics export into per-respondent documents
//!
//! ```bash
//! qsplit -i export.csv                  # exports/000.json, 001.json, ...
//! qsplit -i export.csv -t report.typ    # ... plus 000.typ/000.pdf via typst
//! cat export.csv | qsplit               # read the export from stdin
//! qsplit columns -i export.csv          # show the column metadata table
//! ```

use clap::{Args, Parser, Subcommand};
use qsplit::logs::{self, LogFormat};
use qsplit::{
    inspect, run, ConvertOptions, InputSource, DEFAULT_BINDING, DEFAULT_COMPILER,
    DEFAULT_EXPORT_DIR,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "qsplit", version)]
#[command(about = "Split a Qualtrics CSV export into one JSON file per respondent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    convert: ConvertArgs,
}

#[derive(Args)]
struct ConvertArgs {
    /// CSV input file (if not specified, reads from STDIN)
    #[arg(short = 'i', long = "csvfile", value_name = "FILE")]
    csvfile: Option<PathBuf>,

    /// Typst document input file (default is not to use typst)
    #[arg(short = 't', long = "typstfile", value_name = "FILE")]
    typstfile: Option<PathBuf>,

    /// Output folder for json and (maybe) typst and pdf files
    #[arg(short = 'o', long, value_name = "DIR", env = "QSPLIT_EXPORT_DIR", default_value = DEFAULT_EXPORT_DIR)]
    export_dir: PathBuf,

    /// CSV delimiter (auto-detect if not specified)
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Variable name the Typst template reads answers from
    #[arg(long, default_value = DEFAULT_BINDING)]
    binding: String,

    /// Typst executable
    #[arg(long, value_name = "PROGRAM", env = "QSPLIT_TYPST", default_value = DEFAULT_COMPILER)]
    typst_bin: String,

    /// Progress log format
    #[arg(long, value_enum, env = "QSPLIT_LOG_FORMAT", default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl ConvertArgs {
    fn into_options(self) -> ConvertOptions {
        ConvertOptions {
            input: InputSource::from_path(self.csvfile),
            delimiter: self.delimiter,
            export_dir: self.export_dir,
            template: self.typstfile,
            binding: self.binding,
            compiler: self.typst_bin,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the column metadata table as JSON without writing any file
    Columns {
        /// CSV input file (if not specified, reads from STDIN)
        #[arg(short = 'i', long = "csvfile", value_name = "FILE")]
        csvfile: Option<PathBuf>,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Columns { csvfile, delimiter }) => cmd_columns(csvfile, delimiter),
        None => cmd_convert(cli.convert),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_convert(args: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    logs::init(args.log_format);
    let options = args.into_options();

    let summary = run(&options)?;

    if !summary.collisions.is_empty() {
        eprintln!(
            "⚠️  {} ImportId(s) shared by several columns",
            summary.collisions.len()
        );
    }
    if !summary.rendered.is_empty() {
        eprintln!("📄 Compiled {} documents", summary.rendered.len());
    }
    eprintln!("✨ Done!");
    Ok(())
}

fn cmd_columns(
    csvfile: Option<PathBuf>,
    delimiter: Option<char>,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = inspect(&InputSource::from_path(csvfile), delimiter)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
