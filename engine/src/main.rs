//! csvshape CLI - Extract JSON documents from CSV exports
//!
//! # Main Commands
//!
//! ```bash
//! csvshape process input.csv -c config.json   # CSV to newline-delimited JSON documents
//! csvshape check-config config.json           # Validate a configuration file
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! csvshape records input.csv                  # Just tokenize the CSV to JSON
//! csvshape preprocess input.csv -c cfg.json   # Records after the processors ran
//! csvshape processors                         # Show available record processors
//! csvshape example-config                     # Show example configuration
//! ```
//!
//! When `--config` is omitted the path is read from `CSVSHAPE_CONFIG`,
//! which may also be set in a `.env` file.

use clap::{Parser, Subcommand};
use csvshape::{
    load_config, logs::LOG_BROADCASTER, processors_description, read_records, Csv, Pipeline, ReadOptions, CONFIG_ENV,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "csvshape")]
#[command(about = "Extract JSON documents from CSV exports with a declarative config", long_about = None)]
struct Cli {
    /// Silence progress logs on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: CSV → processors → extractors → JSON documents
    Process {
        /// Input CSV file
        input: PathBuf,

        /// Configuration file (default: $CSVSHAPE_CONFIG)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        read: ReadArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a pretty JSON array instead of one document per line
        #[arg(long)]
        array: bool,

        /// Also write the document ids, one per line
        #[arg(long)]
        ids: Option<PathBuf>,
    },

    /// Tokenize a CSV file and output the raw records as JSON
    Records {
        /// Input CSV file
        input: PathBuf,

        #[command(flatten)]
        read: ReadArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Output the records after the configured processors ran
    Preprocess {
        /// Input CSV file
        input: PathBuf,

        /// Configuration file (default: $CSVSHAPE_CONFIG)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        read: ReadArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a configuration file
    CheckConfig {
        /// Configuration file (default: $CSVSHAPE_CONFIG)
        config: Option<PathBuf>,
    },

    /// Show available record processors
    Processors,

    /// Show example configuration
    ExampleConfig,
}

#[derive(clap::Args)]
struct ReadArgs {
    /// CSV delimiter
    #[arg(short, long, default_value = ",")]
    delimiter: char,

    /// Input encoding label (auto-detect if not specified)
    #[arg(short, long)]
    encoding: Option<String>,
}

impl ReadArgs {
    fn options(&self) -> Result<ReadOptions, Box<dyn std::error::Error>> {
        let delimiter = u8::try_from(self.delimiter)
            .map_err(|_| format!("delimiter must be a single-byte character, got '{}'", self.delimiter))?;
        Ok(ReadOptions { delimiter, encoding: self.encoding.clone() })
    }
}

fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if cli.quiet {
        LOG_BROADCASTER.set_echo(false);
    }

    let result = match cli.command {
        Commands::Process { input, config, read, output, array, ids } => {
            cmd_process(&input, config, &read, output.as_deref(), array, ids.as_deref())
        }
        Commands::Records { input, read, output } => cmd_records(&input, &read, output.as_deref()),
        Commands::Preprocess { input, config, read, output } => cmd_preprocess(&input, config, &read, output.as_deref()),
        Commands::CheckConfig { config } => cmd_check_config(config),
        Commands::Processors => cmd_processors(),
        Commands::ExampleConfig => cmd_example_config(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Explicit path, or the one named by the environment.
fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let path = std::env::var(CONFIG_ENV)
        .map_err(|_| format!("no configuration given: pass --config or set {}", CONFIG_ENV))?;
    Ok(PathBuf::from(path))
}

fn load_pipeline(config: Option<PathBuf>) -> Result<Pipeline, Box<dyn std::error::Error>> {
    let path = config_path(config)?;
    eprintln!("⚙️  Config: {}", path.display());
    Ok(Pipeline::new(load_config(&path)?)?)
}

fn cmd_process(
    input: &Path,
    config: Option<PathBuf>,
    read: &ReadArgs,
    output: Option<&Path>,
    array: bool,
    ids: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = load_pipeline(config)?;
    let result = pipeline.process_file(input, &read.options()?)?;

    eprintln!("\n📦 Documents: {}", result.documents.len());

    let json = if array { result.to_json_array()? } else { result.to_json_lines()? };
    write_output(&json, output)?;

    if let Some(ids_path) = ids {
        if result.ids.is_empty() {
            eprintln!("   ⚠️  No id parameters configured, skipping ids");
        } else {
            fs::write(ids_path, result.ids.join("\n"))?;
            eprintln!("   💾 Ids saved to: {}", ids_path.display());
        }
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_records(input: &Path, read: &ReadArgs, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Tokenizing CSV: {}", input.display());
    let records = read_records(input, &read.options()?)?;
    eprintln!("✅ Read {} records", records.len());

    let json = serde_json::to_string_pretty(&records)?;
    write_output(&json, output)?;
    Ok(())
}

fn cmd_preprocess(
    input: &Path,
    config: Option<PathBuf>,
    read: &ReadArgs,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = load_pipeline(config)?;
    let records = read_records(input, &read.options()?)?;
    eprintln!("📄 Read {} records from {}", records.len(), input.display());

    let records = pipeline.preprocess(records)?;
    eprintln!("✅ {} records after {} processors", records.len(), pipeline.config().pre_processor.len());

    let json = serde_json::to_string_pretty(&records)?;
    write_output(&json, output)?;
    Ok(())
}

fn cmd_check_config(config: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path(config)?;
    eprintln!("✔️  Validating: {}", path.display());

    let config = load_config(&path)?;
    eprintln!("   Processors: {}", config.pre_processor.len());
    eprintln!("   Cells: {}", config.cell_locations.len());
    eprintln!("   Concatenated cells: {}", config.concat_cell_locations.len());
    eprintln!("   Tables: {}", config.table_locations.len());
    eprintln!("   Time fields: {}", config.time_fields.len());
    if let Some(table) = config.separated_tables().next() {
        eprintln!("   Separated by table: {}", table.name);
    }
    eprintln!("✅ Configuration valid");
    Ok(())
}

fn cmd_example_config() -> Result<(), Box<dyn std::error::Error>> {
    let config = Csv::example();
    let json = config.to_json()?;
    println!("{}", json);
    Ok(())
}

fn cmd_processors() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", processors_description());
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
