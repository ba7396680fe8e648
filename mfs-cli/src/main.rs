use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use mfs_ingest::{load_first_sheet, HeaderLocator, ParsedStatement, StatementParser, Upload};
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod config;
mod output;
mod state;

use output::{FileReport, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "mfs", version, about = "MFS statement ingestion and canonicalization")]
struct Cli {
    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Config file (default: $MFS_HOME/config.toml, ~/.mfs/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse statement files into canonical records
    Parse {
        /// Spreadsheet exports (.xlsx/.xls/.ods) or text dumps (.csv/.tsv/.txt)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Use this format instead of detecting one per file
        #[arg(long)]
        format: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,

        /// Write output here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show header-row scoring for one file
    Headers {
        file: PathBuf,

        #[arg(long)]
        format: Option<String>,
    },

    /// List configured formats
    Formats,

    /// Config file helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config file
    Init,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config_file = cli.config.as_deref();

    match cli.command {
        Command::Parse {
            files,
            format,
            output,
            out,
        } => {
            let cfg = config::load_config(config_file)?;
            let parser = cfg.parser(format.as_deref())?;
            parse_command(parser, files, output, out).await?;
        }

        Command::Headers { file, format } => {
            let cfg = config::load_config(config_file)?;
            let parser = cfg.parser(format.as_deref())?;
            headers_command(&parser, &file).await?;
        }

        Command::Formats => {
            let cfg = config::load_config(config_file)?;
            let registry = cfg.registry();
            for f in registry.iter() {
                let critical: Vec<&str> = f.critical_fields.iter().map(|c| c.as_str()).collect();
                println!("{}", f.name);
                println!("  critical fields : {}", critical.join(", "));
                println!(
                    "  needs           : {} of {} critical headers",
                    f.scoring.required_critical(),
                    critical.len()
                );
                println!("  threshold       : {:.2}", f.scoring.confidence_threshold);
                println!("  date order      : {:?}", f.date_order);
                println!("  catalog entries : {}", f.catalog.len());
                println!("  default headers : {}", f.default_headers.join(" | "));
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config(config_file)?,
        },
    }

    Ok(())
}

async fn read_upload(path: &Path) -> Result<Upload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Upload::new(name, bytes))
}

async fn parse_one(parser: StatementParser, path: PathBuf) -> Result<ParsedStatement> {
    let upload = read_upload(&path).await?;
    let parsed = tokio::task::spawn_blocking(move || parser.parse(&upload))
        .await
        .context("parser task failed")?
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(parsed)
}

/// Parse every file concurrently; results come back in input order.
async fn parse_all(parser: &StatementParser, files: Vec<PathBuf>) -> Result<Vec<(PathBuf, Result<ParsedStatement>)>> {
    let mut set = JoinSet::new();
    for (idx, path) in files.iter().cloned().enumerate() {
        let parser = parser.clone();
        set.spawn(async move { (idx, parse_one(parser, path).await) });
    }

    let mut slots: Vec<Option<Result<ParsedStatement>>> = files.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (idx, result) = joined.context("parse task panicked")?;
        slots[idx] = Some(result);
    }

    Ok(files
        .into_iter()
        .zip(slots)
        .filter_map(|(path, slot)| slot.map(|r| (path, r)))
        .collect())
}

async fn parse_command(
    parser: StatementParser,
    files: Vec<PathBuf>,
    output: OutputFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for (path, result) in parse_all(&parser, files).await? {
        match result {
            Ok(statement) => reports.push(FileReport {
                file: path.display().to_string(),
                statement,
            }),
            Err(e) => {
                error!(file = %path.display(), "{e:#}");
                failures.push(e);
            }
        }
    }

    let rendered = output::render(&reports, output)?;
    match &out {
        Some(p) => {
            std::fs::write(p, &rendered).with_context(|| format!("write {}", p.display()))?;
            eprintln!("Wrote {} file(s) to {}", reports.len(), p.display());
        }
        None => print!("{rendered}"),
    }

    if let Some(first) = failures.into_iter().next() {
        return Err(first);
    }
    Ok(())
}

async fn headers_command(parser: &StatementParser, file: &Path) -> Result<()> {
    let upload = read_upload(file).await?;
    let sheet = load_first_sheet(&upload.name, &upload.bytes)?;
    if sheet.rows.is_empty() {
        bail!("{}: first sheet has no rows", file.display());
    }

    for format in parser.registry().iter() {
        let locator = HeaderLocator::new(format);
        println!("[{}] threshold {:.2}", format.name, format.scoring.confidence_threshold);
        println!("  {:>4}  {:>9}  {:>6}  {:>8}  {:>7}", "row", "non-empty", "mapped", "critical", "score");
        for s in locator.score_rows(&sheet.rows) {
            println!(
                "  {:>4}  {:>9}  {:>6}  {:>8}  {:>7.2}",
                s.row + 1,
                s.non_empty,
                s.mapped,
                s.matched_critical,
                s.score
            );
        }
    }

    let parsed = parser.parse_sheet(&upload, &sheet);
    let d = &parsed.diagnostics;
    println!();
    println!("format      : {}", parsed.format);
    println!(
        "header row  : {}{}",
        d.header_row + 1,
        if d.header_fallback.is_some() { " (fallback)" } else { "" }
    );
    println!("headers     : {}", parsed.headers.join(" | "));
    if let Some(identified) = &parsed.identified_headers {
        println!("sheet row   : {}", identified.join(" | "));
    }
    println!("coverage    : {} critical field(s)", d.critical_coverage);
    println!("records     : {} of {} data rows", parsed.records.len(), d.data_rows);
    for w in &d.warnings {
        println!("warning     : {w}");
    }
    Ok(())
}
