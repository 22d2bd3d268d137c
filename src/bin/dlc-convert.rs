//! dlc-convert - Search for DeepLabCut output files and convert them
//!
//! Usage:
//!   dlc-convert                                 # scan the current directory
//!   dlc-convert /data/project
//!   dlc-convert /data/project -F json -D ./converted --overwrite
//!   dlc-convert /data/project --report report.json

use std::fs;
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser as ClapParser, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use dlc_convert::convert::{BatchSummary, ConvertOptions, Converter, OutputFormat};
use dlc_convert::scan;

#[derive(ValueEnum, Clone, Debug)]
enum FormatArg {
    /// Comma-separated values (MATLAB `readtable`)
    Csv,
    /// JSON document (MATLAB `jsondecode`)
    Json,
}

#[derive(ValueEnum, Clone, Debug)]
enum ReportFormatArg {
    /// JSON format
    Json,
    /// Human-readable text
    Text,
}

#[derive(ClapParser)]
#[command(
    version,
    about = "Searches for DeepLabCut output HDF5 files and converts them",
    long_about = "Recursively searches a directory for the HDF5 prediction files DeepLabCut\n\
                  writes and converts each of them into a MATLAB-friendly format.\n\n\
                  Converted file names are printed to stdout as they complete; failures\n\
                  are reported to stderr and do not stop the run."
)]
struct Cli {
    /// The directory to recursively search for HDF5 files from
    directory: Option<PathBuf>,

    /// The output file format
    #[arg(short = 'F', long, value_enum, default_value = "csv")]
    fileformat: FormatArg,

    /// The output directory to write the converted files to. Defaults to
    /// the same directory as the original file
    #[arg(short = 'D', long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Overwrite the data when the output file already exists
    #[arg(long)]
    overwrite: bool,

    /// Additional file-name filter for candidate files
    #[arg(long, value_name = "GLOB")]
    pattern: Option<String>,

    /// Write a summary report of the run
    #[arg(long, value_name = "REPORT_FILE")]
    report: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value = "json")]
    report_format: ReportFormatArg,

    /// Show what would be converted without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Debug log file
    #[arg(short, long, value_name = "FILE")]
    debuglogfile: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn init_logger(filter_level: log::LevelFilter, logfile: Option<PathBuf>) {
    let mut loggers: Vec<Box<dyn simplelog::SharedLogger>> = vec![simplelog::TermLogger::new(
        filter_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    ) as Box<dyn simplelog::SharedLogger>];
    if let Some(filename) = logfile {
        loggers.push(simplelog::WriteLogger::new(
            log::LevelFilter::Debug,
            simplelog::Config::default(),
            File::create(filename).unwrap(),
        ) as Box<dyn simplelog::SharedLogger>)
    }
    simplelog::CombinedLogger::init(loggers).unwrap();
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logger(args.verbose.log_level_filter(), args.debuglogfile.clone());

    let format = match args.fileformat {
        FormatArg::Csv => OutputFormat::Csv,
        FormatArg::Json => OutputFormat::Json,
    };

    let directory = args.directory.clone().unwrap_or_else(|| PathBuf::from("."));
    let pattern = args
        .pattern
        .as_deref()
        .map(glob::Pattern::new)
        .transpose()
        .context("invalid --pattern glob")?;

    let mut options = ConvertOptions::new(format).with_overwrite(args.overwrite);
    if let Some(ref dir) = args.output_dir {
        options = options.with_output_dir(dir);
    }
    let converter = Converter::new(options);

    let candidates = scan::find_candidates(&directory, pattern.as_ref());
    log::info!(
        "{} candidate file(s) under {}",
        candidates.len(),
        directory.display()
    );

    if args.dry_run {
        for src in &candidates {
            println!("{} -> {}", src.display(), converter.dest_path(src).display());
        }
        eprintln!("(dry run - no files were written)");
        return Ok(());
    }

    let start = Instant::now();
    let mut summary = BatchSummary::new(&directory, args.output_dir.as_deref(), format);
    for src in &candidates {
        let outcome = converter.convert_file(src);
        if outcome.is_converted() {
            let name = src
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| src.display().to_string());
            println!("{}", name);
        } else if outcome.is_skipped() {
            log::info!(
                "skipped {}: {}",
                src.display(),
                outcome.message.as_deref().unwrap_or("")
            );
        } else {
            log::error!(
                "{}: {}",
                src.display(),
                outcome.message.as_deref().unwrap_or("failed")
            );
        }
        summary.push(outcome);
    }
    summary.duration_ms = start.elapsed().as_millis() as u64;

    eprintln!();
    eprint!("{}", summary.to_text());

    if let Some(ref report_path) = args.report {
        let content = match args.report_format {
            ReportFormatArg::Json => summary.to_json()?,
            ReportFormatArg::Text => summary.to_text(),
        };
        fs::write(report_path, content)
            .with_context(|| format!("failed to write {}", report_path.display()))?;
        eprintln!("✓ Report written to {}", report_path.display());
    }

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
