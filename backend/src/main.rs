//! Fieldmap CLI - Map CSV columns onto contact records and submit them
//!
//! # Main Commands
//!
//! ```bash
//! fieldmap serve                                   # Start HTTP server (port 3000)
//! fieldmap map input.csv --name Name --email Mail  # Map and validate, print JSON
//! fieldmap submit input.csv --name Name --email Mail --endpoint http://host/users
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! fieldmap parse input.csv                         # Tokenize only
//! fieldmap check input.csv --field email --column Mail
//! ```

use clap::{Args, Parser, Subcommand};
use fieldmap::{
    check_column, map_file, parse_file, Config, FieldMapping, LogicalField, PipelineError,
    SubmissionOutcome, Submitter,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "fieldmap")]
#[command(about = "Map CSV columns onto contact records and submit them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize a CSV file and output headers and rows as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the live column check for one field
    Check {
        /// Input CSV file
        input: PathBuf,

        /// Logical field (name, email, phone, address)
        #[arg(short, long)]
        field: String,

        /// Source column
        #[arg(short, long)]
        column: String,
    },

    /// Map and validate a CSV file, output the dataset as JSON
    Map {
        /// Input CSV file
        input: PathBuf,

        #[command(flatten)]
        mapping: MappingArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Map, validate and submit a CSV file
    Submit {
        /// Input CSV file
        input: PathBuf,

        #[command(flatten)]
        mapping: MappingArgs,

        /// Override FIELDMAP_ENDPOINT
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: FIELDMAP_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Source column for each logical field
#[derive(Args)]
struct MappingArgs {
    /// Column for `name`
    #[arg(long)]
    name: String,

    /// Column for `email`
    #[arg(long)]
    email: String,

    /// Column for `phone`
    #[arg(long, default_value = "")]
    phone: String,

    /// Column for `address`
    #[arg(long, default_value = "")]
    address: String,
}

impl From<MappingArgs> for FieldMapping {
    fn from(args: MappingArgs) -> Self {
        FieldMapping {
            name: args.name,
            email: args.email,
            phone: args.phone,
            address: args.address,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()).await,

        Commands::Check { input, field, column } => cmd_check(&input, &field, &column).await,

        Commands::Map { input, mapping, output } => {
            cmd_map(&input, mapping.into(), output.as_deref()).await
        }

        Commands::Submit { input, mapping, endpoint } => {
            cmd_submit(&input, mapping.into(), endpoint).await
        }

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn cmd_parse(input: &Path, output: Option<&Path>) -> CliResult {
    let config = Config::from_env()?;
    tracing::info!("Parsing CSV: {}", input.display());

    let result = parse_file(input, config.max_file_size).await?;
    tracing::info!("Encoding: {}", result.encoding);
    tracing::info!("Columns: {}", result.table.headers.join(", "));
    tracing::info!("Parsed {} rows", result.table.rows.len());

    let json = serde_json::to_string_pretty(&result.table)?;
    write_output(&json, output)
}

async fn cmd_check(input: &Path, field: &str, column: &str) -> CliResult {
    let config = Config::from_env()?;
    let field: LogicalField = field.parse()?;

    let result = parse_file(input, config.max_file_size).await?;
    if result.table.column_index(column).is_none() {
        return Err(format!("Column '{}' does not exist in {}", column, input.display()).into());
    }

    match check_column(&result.table, field, column) {
        Some(issue) => Err(issue.to_string().into()),
        None => {
            tracing::info!("Column \"{}\" is valid for \"{}\"", column, field);
            Ok(())
        }
    }
}

async fn cmd_map(input: &Path, mapping: FieldMapping, output: Option<&Path>) -> CliResult {
    let config = Config::from_env()?;
    let result = map_file(input, &mapping, config.max_file_size).await?;

    let json = serde_json::to_string_pretty(&result.dataset)?;
    write_output(&json, output)
}

async fn cmd_submit(input: &Path, mapping: FieldMapping, endpoint: Option<String>) -> CliResult {
    let mut config = Config::from_env()?;
    if let Some(url) = endpoint {
        config = config.with_endpoint(url)?;
    }
    let submitter = Submitter::from_config(&config)?;

    let result = map_file(input, &mapping, config.max_file_size).await?;

    match submitter.submit(&result.dataset).await {
        SubmissionOutcome::Failed(e) => Err(PipelineError::from(e).into()),
        outcome => {
            tracing::info!("Submission {}: {} records sent to {}", outcome, result.dataset.len(), submitter.endpoint());
            Ok(())
        }
    }
}

async fn cmd_serve(port: Option<u16>) -> CliResult {
    let mut config = Config::from_env()?;
    if let Some(port) = port {
        config = config.with_port(port);
    }
    fieldmap::server::start_server(config).await?;
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            tracing::info!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
