//! Rich-text three-way merge tool CLI.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use richtext_3dm::html::print_to_string_pretty;
use richtext_3dm::{annotate, parse_file, DiffConfig, EditType, ThreeWayDiff};
use tracing_subscriber::EnvFilter;

/// Three-way diff and merge for rich-text documents
#[derive(Parser)]
#[command(name = "rtm")]
#[command(version)]
#[command(about = "Three-way diff and merge for rich-text documents", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge two edited versions relative to their common origin
    #[command(visible_alias = "m")]
    Merge {
        /// Origin file (common ancestor)
        origin: PathBuf,
        /// Left version
        left: PathBuf,
        /// Right version
        right: PathBuf,
        /// Output file (default: stdout)
        output: Option<PathBuf>,

        /// Write the merge even if the versions conflict
        #[arg(short, long)]
        force: bool,

        /// Indent block-level tags in the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// List the differences between the origin and one version
    #[command(visible_alias = "d")]
    Diff {
        /// Origin file
        origin: PathBuf,
        /// Edited version
        other: PathBuf,
    },

    /// Report whether two versions conflict, with the conflict log as XML
    #[command(visible_alias = "c")]
    Check {
        /// Origin file (common ancestor)
        origin: PathBuf,
        /// Left version
        left: PathBuf,
        /// Right version
        right: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => DiffConfig::load_from_file(path)?,
        None => DiffConfig::default(),
    };

    match cli.command {
        Commands::Merge {
            origin,
            left,
            right,
            output,
            force,
            pretty,
        } => run_merge(&origin, &left, &right, output.as_deref(), force, pretty, config),
        Commands::Diff { origin, other } => run_diff(&origin, &other, &config),
        Commands::Check {
            origin,
            left,
            right,
        } => run_check(&origin, &left, &right, config),
    }
}

fn load_session(
    origin: &Path,
    left: &Path,
    right: &Path,
    config: DiffConfig,
) -> Result<ThreeWayDiff, Box<dyn std::error::Error>> {
    let doc_origin = parse_file(origin)?;
    let doc_left = parse_file(left)?;
    let doc_right = parse_file(right)?;
    tracing::debug!(
        origin = %origin.display(),
        left = %left.display(),
        right = %right.display(),
        "parsed input documents"
    );
    Ok(ThreeWayDiff::with_config(&doc_origin, &doc_left, &doc_right, config))
}

/// Runs the three-way merge.
fn run_merge(
    origin: &Path,
    left: &Path,
    right: &Path,
    output_path: Option<&Path>,
    force: bool,
    pretty: bool,
    config: DiffConfig,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let session = load_session(origin, left, right, config)?;

    if session.is_conflicting() {
        let count = session.conflict_log().conflict_count();
        if !force {
            eprintln!("MERGE FAILED: {} conflicts.", count);
            return Ok(ExitCode::FAILURE);
        }
        eprintln!("Warning: writing merge despite {} conflicts.", count);
    }

    let markup = if pretty {
        print_to_string_pretty(session.merged())
    } else {
        session.merged_markup()
    };

    let mut output: Box<dyn Write> = match output_path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };
    output.write_all(markup.as_bytes())?;
    if !pretty {
        writeln!(output)?;
    }
    output.flush()?;

    let log = session.edit_log();
    let skipped = log.count_by_type(EditType::Skipped);
    let unresolved = log.count_by_type(EditType::Unresolved);
    if skipped > 0 || unresolved > 0 {
        eprintln!(
            "Merge complete with {} skipped and {} unresolved edits.",
            skipped, unresolved
        );
    } else {
        eprintln!("Merge complete.");
    }

    Ok(ExitCode::SUCCESS)
}

/// Lists the two-way differences.
fn run_diff(
    origin: &Path,
    other: &Path,
    config: &DiffConfig,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let doc_origin = parse_file(origin)?;
    let doc_other = parse_file(other)?;
    let annotation = annotate(&doc_origin, &doc_other, &config.align);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for entry in &annotation.entries {
        writeln!(out, "{:<8} {}", entry.modification.name(), entry.node.borrow().content())?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Reports the conflict verdict.
fn run_check(
    origin: &Path,
    left: &Path,
    right: &Path,
    config: DiffConfig,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let session = load_session(origin, left, right, config)?;
    let conflicting = session.is_conflicting();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    session.conflict_log().write_xml(&mut out)?;

    if conflicting {
        eprintln!("Conflicting.");
        Ok(ExitCode::FAILURE)
    } else {
        eprintln!("No conflicts.");
        Ok(ExitCode::SUCCESS)
    }
}
