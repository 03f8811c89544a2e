//! binspect - Print the structure of tagged binary container files
//!
//! This tool reads container files and prints their header fields,
//! records area statistics, details entries and record type distribution.

mod report;

use anyhow::{bail, Context, Result};
use binspect_core::{decode_details_from_header, decode_header, Scanner, ScannerConfig};
use clap::{Args, Parser};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Print the structure of tagged binary container files
#[derive(Parser, Debug)]
#[command(name = "binspect")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    #[command(flatten)]
    modes: DisplayModes,

    /// Maximum number of records to scan per file (0 = unlimited)
    #[arg(long, default_value = "0")]
    max_records: usize,

    /// Only inspect files with this extension when walking a directory
    #[arg(long)]
    extension: Option<String>,

    /// Skip files whose content is identical to a file already inspected
    #[arg(long)]
    skip_duplicates: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single container file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of container files to process recursively
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Sections to print for each file (header only when none is given)
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DisplayModes {
    /// Print the header fields
    #[arg(long)]
    header: bool,

    /// Print records area statistics and per-type counts
    #[arg(long)]
    records: bool,

    /// Print the details entries
    #[arg(long)]
    details: bool,

    /// Print the type code of every record in file order
    #[arg(long)]
    distrib: bool,

    /// Print every section
    #[arg(short, long)]
    all: bool,
}

impl DisplayModes {
    /// Expand `--all` and fall back to the header when nothing was selected
    fn resolve(self) -> Self {
        if self.all {
            return Self {
                header: true,
                records: true,
                details: true,
                distrib: true,
                all: true,
            };
        }
        if !(self.header || self.records || self.details || self.distrib) {
            return Self {
                header: true,
                ..self
            };
        }
        self
    }
}

/// Tracks inspected file contents for duplicate detection
#[derive(Default)]
struct FileRegistry {
    /// Maps content hash -> first path seen with that content
    seen: HashMap<String, PathBuf>,
    /// Statistics
    stats: RegistryStats,
}

#[derive(Default)]
struct RegistryStats {
    files_seen: usize,
    duplicates_skipped: usize,
    inspected: usize,
}

impl FileRegistry {
    fn new() -> Self {
        Self::default()
    }

    /// Compute a short hash of the content (first 16 chars of blake3)
    fn content_hash(data: &[u8]) -> String {
        let hash = blake3::hash(data);
        hash.to_hex()[..16].to_string()
    }

    /// Register a file and return the path of an earlier identical file, if any
    fn register(&mut self, path: &Path, content_hash: &str) -> Option<PathBuf> {
        if let Some(first) = self.seen.get(content_hash) {
            debug!(
                "Skipping duplicate: {} (same content as {}, hash: {})",
                path.display(),
                first.display(),
                content_hash
            );
            self.stats.duplicates_skipped += 1;
            return Some(first.clone());
        }

        self.seen.insert(content_hash.to_string(), path.to_path_buf());
        None
    }

    fn print_summary(&self) {
        info!(
            "Summary: {} files seen, {} inspected, {} duplicates skipped",
            self.stats.files_seen, self.stats.inspected, self.stats.duplicates_skipped
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, file, &mut out)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, directory, &mut out)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Process a single container file
fn process_single_file<W: Write>(cli: &Cli, file: &Path, out: &mut W) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let mut registry = FileRegistry::new();
    process_file(cli, file, &mut registry, out)
}

/// Process a directory of container files recursively
fn process_directory<W: Write>(cli: &Cli, directory: &Path, out: &mut W) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut registry = FileRegistry::new();

    // Walk the directory
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        // Skip directories
        if !path.is_file() {
            continue;
        }

        if !is_candidate(path, cli.extension.as_deref()) {
            trace!("Skipping: {}", path.display());
            continue;
        }

        if let Err(e) = process_file(cli, path, &mut registry, out) {
            // Log error but continue with other files
            warn!("Error processing {}: {:#}", path.display(), e);
        }
    }

    registry.print_summary();
    Ok(())
}

/// Decide whether a walked file should be inspected
fn is_candidate(path: &Path, extension: Option<&str>) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    // Skip hidden files
    if name.starts_with('.') {
        return false;
    }

    match extension {
        Some(wanted) => path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(wanted.trim_start_matches('.')))
            .unwrap_or(false),
        None => true,
    }
}

/// Read one file and print the selected sections
fn process_file<W: Write>(
    cli: &Cli,
    path: &Path,
    registry: &mut FileRegistry,
    out: &mut W,
) -> Result<()> {
    trace!("Reading {}", path.display());
    let data =
        fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))?;
    trace!("Read {} bytes from {}", data.len(), path.display());
    registry.stats.files_seen += 1;

    if cli.skip_duplicates {
        let content_hash = FileRegistry::content_hash(&data);
        if let Some(first) = registry.register(path, &content_hash) {
            writeln!(
                out,
                "file \"{}\" is identical to \"{}\", skipped",
                path.display(),
                first.display()
            )?;
            return Ok(());
        }
    }

    let scanner = Scanner::with_config(ScannerConfig::new().max_records(cli.max_records));
    inspect_buffer(cli.modes.resolve(), &scanner, path, &data, out)
        .with_context(|| format!("Failed to write report for {}", path.display()))?;
    registry.stats.inspected += 1;
    Ok(())
}

/// Decode `data` and print the sections selected in `modes`
fn inspect_buffer<W: Write>(
    modes: DisplayModes,
    scanner: &Scanner,
    path: &Path,
    data: &[u8],
    out: &mut W,
) -> io::Result<()> {
    report::write_file_line(out, path)?;

    let header = decode_header(data);
    match &header {
        Ok(header) => {
            if let Err(e) = header.check_consistency() {
                warn!("{}: {}", path.display(), e);
            }
        }
        Err(e) => warn!("{}: {}", path.display(), e),
    }

    if modes.header {
        report::write_header(out, &header)?;
    }

    let scan = (modes.records || modes.distrib).then(|| match &header {
        Ok(header) => scanner.scan_from_header(data, header),
        Err(e) => Err(e.clone()),
    });
    if let Some(Ok(scan)) = &scan {
        if scan.stats.invalid_records > 0 {
            warn!(
                "{}: {} invalid record(s) in records area",
                path.display(),
                scan.stats.invalid_records
            );
        }
    }

    if modes.records {
        if let Some(scan) = &scan {
            report::write_records(out, scan)?;
        }
    }

    if modes.details {
        let details = match &header {
            Ok(header) => decode_details_from_header(data, header),
            Err(e) => Err(e.clone()),
        };
        if let Ok(Some(e)) = details.as_ref().map(|d| d.error.as_ref()) {
            warn!("{}: {}", path.display(), e);
        }
        report::write_details(out, &details)?;
    }

    if modes.distrib {
        if let Some(scan) = &scan {
            report::write_distribution(out, scan)?;
        }
    }

    Ok(())
}
