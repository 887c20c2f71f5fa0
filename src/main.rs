use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use data_shredder::report::{self, human_size};
use data_shredder::{
    CancelToken, RunSummary, Shredder, Target, WipeConfig, WipeMethod, WipeObserver, plan_targets,
};

const RULE: &str =
    "-------------------------------------------------------------------------------";

/// Data Shredder - secure multi-pass deletion of files and folders
///
/// Note: SSDs and other wear-levelled flash cannot guarantee secure erasure.
/// Prefer full-disk encryption and vendor secure erase where required.
#[derive(Parser)]
#[command(name = "data_shredder")]
#[command(version)]
struct Cli {
    /// Files or folders to shred
    #[arg(required = true)]
    targets: Vec<PathBuf>,

    /// Wipe method: ZERO, RANDOM, DOD3, NIST1 or GUTMANN
    #[arg(short, long, value_parser = parse_method)]
    method: Option<WipeMethod>,

    /// Skip read-back verification of fixed-pattern passes
    #[arg(long)]
    no_verify: bool,

    /// Delete without renaming first
    #[arg(long)]
    no_rename: bool,

    /// Number of random renames before deletion
    #[arg(long)]
    renames: Option<u32>,

    /// Bytes written per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Only shred the direct children of folder targets
    #[arg(long)]
    no_recursive: bool,

    /// Reset access/modification times to the epoch before unlink
    #[arg(long)]
    scrub_timestamps: bool,

    /// Config file (TOML); defaults to the user config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the report here (.json for JSON, anything else for CSV)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,

    /// List only - show what would be shredded, touch nothing
    #[arg(long)]
    list: bool,

    /// No progress - don't display % done
    #[arg(long)]
    no_progress: bool,
}

fn parse_method(s: &str) -> data_shredder::Result<WipeMethod> {
    s.parse()
}

struct ConsoleProgress {
    enabled: bool,
    started: Instant,
}

impl WipeObserver for ConsoleProgress {
    fn target_finished(&mut self, index: usize, total: usize) {
        if !self.enabled || total == 0 {
            return;
        }
        let percent = index * 100 / total;
        let elapsed = self.started.elapsed().as_secs_f64();
        let left = elapsed / index as f64 * (total - index) as f64;
        let mins = (left / 60.0) as u64;

        if mins > 0 {
            print!("\rShredding: {}% complete (ETA ~ {}m)", percent, mins);
        } else {
            print!("\rShredding: {}% complete          ", percent);
        }
        let _ = io::stdout().flush();
        if index == total {
            println!();
        }
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    if cli.list {
        list_only(&cli.targets, &config);
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{RULE}\nData Shredder - Started\nTargets: {}\nMethod: {}\nOptions: {}\n{RULE}",
        cli.targets.len(),
        config.method.label(),
        format_options(&config)
    );

    if !cli.yes && !confirm()? {
        println!("Aborted.");
        return Ok(ExitCode::SUCCESS);
    }

    let cancel = CancelToken::new();
    let handle = cancel.clone();
    ctrlc::set_handler(move || handle.cancel()).context("failed to install Ctrl-C handler")?;

    let mut targets: Vec<Target> = cli.targets.iter().map(Target::new).collect();
    let mut rows = Vec::new();
    let mut progress = ConsoleProgress {
        enabled: !cli.no_progress,
        started: Instant::now(),
    };

    let started = Instant::now();
    let mut shredder = Shredder::new(config, cancel);
    let summary = shredder.run(&mut targets, &mut rows, &mut progress);

    for target in &targets {
        println!("{:<14} {}", target.status.to_string(), target.path.display());
    }
    print_summary(&summary, started.elapsed().as_secs_f64());

    if let Some(path) = &cli.report {
        report::export(&rows, path)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        println!("Report saved: {}", path.display());
    }

    Ok(if summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn build_config(cli: &Cli) -> Result<WipeConfig> {
    let mut config = WipeConfig::load(cli.config.as_deref()).context("failed to load config")?;

    if let Some(method) = cli.method {
        config.method = method;
    }
    if cli.no_verify {
        config.verify = false;
    }
    if cli.no_rename {
        config.rename_before_delete = false;
    }
    if let Some(renames) = cli.renames {
        config.rename_count = renames;
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    if cli.no_recursive {
        config.recursive = false;
    }
    if cli.scrub_timestamps {
        config.scrub_timestamps = true;
    }

    config.validate()?;
    Ok(config)
}

fn format_options(config: &WipeConfig) -> String {
    let mut result = Vec::new();

    result.push(format!("method={}", config.method));
    if config.verify {
        result.push("verify".to_string());
    }
    if config.effective_renames() > 0 {
        result.push(format!("renames={}", config.effective_renames()));
    }
    result.push(format!("chunk={}", human_size(config.chunk_size as u64)));
    if !config.recursive {
        result.push("no-recursive".to_string());
    }
    if config.scrub_timestamps {
        result.push("scrub-timestamps".to_string());
    }

    result.join(" ")
}

fn confirm() -> Result<bool> {
    print!("Are you sure? This operation is irreversible. [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn list_only(paths: &[PathBuf], config: &WipeConfig) {
    let passes = config.method.passes();
    let plan: Vec<String> = passes.iter().map(|p| p.to_string()).collect();
    println!("Method: {} [{}]", config.method.label(), plan.join(", "));

    for path in plan_targets(paths, config.recursive) {
        let size = Target::new(&path).size;
        println!("Would shred file: {} ({})", path.display(), human_size(size));
    }
    for path in paths.iter().filter(|p| p.is_dir()) {
        println!("Would remove directory: {}", path.display());
    }
}

fn print_summary(summary: &RunSummary, elapsed: f64) {
    println!(
        "{RULE}\n\
         Data Shredder - Finished{}\n\n\
         Statistics:\n\
         \x20   Deleted: {}\n\
         \x20   Failed: {}\n\
         \x20   Missing: {}\n\
         \x20   Links removed: {}\n\
         \x20   Partial directories: {}\n\
         \x20   Bytes overwritten: {}\n\n\
         Elapsed time: {:.1} seconds\n\
         {RULE}",
        if summary.cancelled { " (cancelled)" } else { "" },
        summary.deleted,
        summary.failed,
        summary.missing,
        summary.links_removed,
        summary.partial,
        human_size(summary.bytes_wiped),
        elapsed,
    );
}
