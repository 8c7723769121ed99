use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use faram_core::{
    accumulate_differential_errors, accumulate_errors, accumulate_values, analyze_errors,
    compile_schema, AccumulateOptions, ErrorNode, Schema,
};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "faram")]
#[command(about = "Validate and sanitize JSON form values against a faram schema")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output file (defaults to stdout if not specified)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full validation pass and report field errors
    Validate {
        /// Form value JSON file
        input: PathBuf,

        /// Schema document
        #[arg(long)]
        schema: PathBuf,
    },

    /// Print the sanitized output value
    Sanitize {
        /// Form value JSON file
        input: PathBuf,

        /// Schema document
        #[arg(long)]
        schema: PathBuf,

        /// Keep falsy leaves verbatim instead of dropping them
        #[arg(long)]
        keep_falsy: bool,

        /// JSON replacement for falsy leaves and empty containers
        #[arg(long, value_name = "JSON")]
        falsy_value: Option<String>,
    },

    /// Re-validate only what changed between two values
    Diff {
        /// New form value JSON file
        input: PathBuf,

        /// Previous form value JSON file
        #[arg(long)]
        old: PathBuf,

        /// Schema document
        #[arg(long)]
        schema: PathBuf,

        /// Field errors computed for the previous value (recomputed if omitted)
        #[arg(long)]
        errors: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

/// Schema documents carry no node-level validation, so every error is a
/// field error.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationReport {
    field_errors: Option<ErrorNode>,
    valid: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for JSON
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let output = cli.output.as_ref();
    match cli.command {
        Commands::Validate { input, schema } => {
            let schema = load_schema(&schema)?;
            let value: Value = read_json(&input, "form value")?;

            let field_errors = accumulate_errors(&value, &schema);
            let valid = !analyze_errors(field_errors.as_ref());
            tracing::debug!(valid, "validation finished");

            let report = ValidationReport {
                field_errors,
                valid,
            };
            write_json(&report, output, cli.format)?;
        }
        Commands::Sanitize {
            input,
            schema,
            keep_falsy,
            falsy_value,
        } => {
            let schema = load_schema(&schema)?;
            let value: Value = read_json(&input, "form value")?;

            let falsy_value = falsy_value
                .map(|raw| {
                    serde_json::from_str::<Value>(&raw)
                        .with_context(|| format!("Invalid --falsy-value JSON: {raw}"))
                })
                .transpose()?;
            let options = AccumulateOptions {
                no_falsy_values: keep_falsy,
                falsy_value,
            };

            let sanitized = accumulate_values(Some(&value), &schema, &options);
            write_json(&sanitized, output, cli.format)?;
        }
        Commands::Diff {
            input,
            old,
            schema,
            errors,
        } => {
            let schema = load_schema(&schema)?;
            let new_value: Value = read_json(&input, "new form value")?;
            let old_value: Value = read_json(&old, "old form value")?;

            let old_error: Option<ErrorNode> = match errors {
                Some(path) => read_json(&path, "field errors")?,
                None => accumulate_errors(&old_value, &schema),
            };

            let result = accumulate_differential_errors(
                &old_value,
                &new_value,
                old_error.as_ref(),
                &schema,
            );
            write_json(&result, output, cli.format)?;
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {what} file: {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse {what} from: {}", path.display()))
}

fn load_schema(path: &Path) -> Result<Schema> {
    let document: Value = read_json(path, "schema")?;
    compile_schema(&document).map_err(|e| anyhow::Error::from(e).context("Invalid schema"))
}

fn write_json<T: Serialize>(val: &T, path: Option<&PathBuf>, format: OutputFormat) -> Result<()> {
    let mut writer: Box<dyn Write> = if let Some(p) = path {
        let file = File::create(p)
            .with_context(|| format!("Failed to create output file: {}", p.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    writeln!(writer).context("Failed to write trailing newline")?;
    writer.flush().context("Failed to flush output")?;

    Ok(())
}
