use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use encoding_rs::Encoding;
use html_span_table::{
    Document, ExtractOptions, ExtractionReport, RowSelection, SpanMode,
    extract_html_bytes_to_csv_string, extract_html_bytes_to_json_string,
};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(
    name = "htmltable",
    version,
    about = "Extract records from HTML tables with merged cells"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract table rows as JSON records or merged CSV.
    Extract(ExtractArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Input HTML path, or `-` for stdin.
    #[arg(short, long)]
    input: PathBuf,

    /// Output path; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// CSS selector of the table.
    #[arg(short, long, default_value = "table")]
    selector: String,

    /// Header rows without a <thead>, or body rows to drop with one. 0 infers.
    #[arg(long, default_value_t = 0)]
    skip_rows: usize,

    /// Extract every matching table instead of the first.
    #[arg(long)]
    all: bool,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Body row selection like 1-3,5.
    #[arg(long)]
    rows: Option<String>,

    /// Fail when a row's spans disagree with the header width.
    #[arg(long)]
    strict: bool,

    /// Base URL for resolving image sources used as cell values.
    #[arg(long)]
    base_url: Option<String>,

    /// Input encoding label such as windows-1252.
    #[arg(long)]
    encoding: Option<String>,

    /// CSV delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Drop table_id column from CSV output.
    #[arg(long = "notable")]
    no_table: bool,

    /// Single-line JSON.
    #[arg(long)]
    compact: bool,

    /// Print the field template instead of records.
    #[arg(long)]
    layout: bool,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_options(args: &ExtractArgs) -> Result<ExtractOptions> {
    let rows = args
        .rows
        .as_deref()
        .map(RowSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid row selection: {error}"))
        .context("failed to parse --rows")?;

    let base_url = args
        .base_url
        .as_deref()
        .map(|value| {
            Url::parse(value).with_context(|| format!("failed to parse --base-url '{value}'"))
        })
        .transpose()?;

    let encoding = args
        .encoding
        .as_deref()
        .map(|label| {
            Encoding::for_label(label.trim().as_bytes())
                .ok_or_else(|| anyhow!("unknown encoding '{label}'"))
        })
        .transpose()
        .context("failed to parse --encoding")?;

    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }

    Ok(ExtractOptions {
        skip_rows: args.skip_rows,
        span_mode: if args.strict {
            SpanMode::Strict
        } else {
            SpanMode::BestEffort
        },
        rows,
        all_tables: args.all,
        base_url,
        encoding,
        delimiter: args.delimiter as u8,
        no_table: args.no_table,
        ..ExtractOptions::default()
    })
}

fn read_input(args: &ExtractArgs) -> Result<Vec<u8>> {
    if args.input.as_os_str() == "-" {
        let mut buffer = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buffer)
            .context("failed to read HTML from stdin")?;
        return Ok(buffer);
    }
    std::fs::read(&args.input)
        .with_context(|| format!("failed to read '{}'", args.input.display()))
}

fn write_output(args: &ExtractArgs, text: &str) -> Result<()> {
    match &args.output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write '{}'", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
            stdout.flush().context("failed to write to stdout")
        }
    }
}

fn log_report(report: &ExtractionReport, verbose: bool) {
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} table_id={:?} row={:?} column={:?}: {}",
                warning.code, warning.table_id, warning.row, warning.column, warning.message
            );
        }
    }
}

/// Returns the number of records written, or of layout fields with `--layout`.
fn run_extract(args: &ExtractArgs) -> Result<usize> {
    let options = parse_options(args)?;
    let input = read_input(args)?;
    let source = args.input.display();

    if args.layout {
        let layout = Document::from_bytes(&input, options.encoding)
            .layout(&args.selector, &options)
            .with_context(|| format!("failed to build table layout from '{source}'"))?;
        write_output(args, &layout.template(!args.compact)?)?;
        return Ok(layout.placeholder_count());
    }

    let (text, report) = match args.format {
        Format::Json => {
            extract_html_bytes_to_json_string(&input, &args.selector, &options, !args.compact)
        }
        Format::Csv => extract_html_bytes_to_csv_string(&input, &args.selector, &options),
    }
    .with_context(|| format!("failed to extract tables from '{source}'"))?;

    write_output(args, &text)?;
    log_report(&report, args.verbose);
    Ok(report.row_count)
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("html_span_table=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract(args) => match run_extract(&args) {
            Ok(count) if count > 0 => ExitCode::SUCCESS,
            Ok(_) => ExitCode::from(2),
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
    }
}
