//! The per-target wipe pipeline and the batch driver around it.

use std::cmp::Reverse;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use filetime::FileTime;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::cancel::CancelToken;
use crate::config::WipeConfig;
use crate::error::{Result, WipeError};
use crate::method::WipeMethod;
use crate::overwrite::{overwrite_pass, verify_pass};
use crate::rename::{obfuscate, random_name};
use crate::report::{ReportRow, RunSummary, Verification, WipeResult, human_size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    Pending,
    Finished(WipeResult),
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetStatus::Pending => f.write_str("PENDING"),
            TargetStatus::Finished(result) => f.write_str(result.as_str()),
        }
    }
}

/// A caller-owned entry in the target list.
#[derive(Debug, Clone)]
pub struct Target {
    pub path: PathBuf,
    /// Size when the target was added; 0 for directories and missing paths.
    pub size: u64,
    pub status: TargetStatus,
}

impl Target {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let size = fs::symlink_metadata(&path)
            .ok()
            .filter(|m| m.is_file())
            .map_or(0, |m| m.len());
        Self {
            path,
            size,
            status: TargetStatus::Pending,
        }
    }
}

/// Hooks into a running wipe. Every method defaults to doing nothing.
pub trait WipeObserver {
    /// A pass has been written and synced, before any verification.
    fn pass_written(&mut self, _path: &Path, _pass: usize, _total: usize) {}

    fn row_recorded(&mut self, _row: &ReportRow) {}

    /// `index` is 1-based.
    fn target_finished(&mut self, _index: usize, _total: usize) {}
}

pub struct NoopObserver;

impl WipeObserver for NoopObserver {}

/// What has been done to the current file so far; survives into error rows.
struct FileProgress {
    path: PathBuf,
    size: u64,
    passes: u32,
    renamed: u32,
}

pub struct Shredder {
    config: WipeConfig,
    cancel: CancelToken,
    names: Box<dyn FnMut() -> String>,
    remover: Box<dyn FnMut(&Path) -> io::Result<()>>,
}

impl Shredder {
    pub fn new(config: WipeConfig, cancel: CancelToken) -> Self {
        Self {
            config,
            cancel,
            names: Box::new(random_name),
            remover: Box::new(|path: &Path| fs::remove_file(path)),
        }
    }

    /// Replace the random rename generator.
    pub fn with_name_source<F>(mut self, names: F) -> Self
    where
        F: FnMut() -> String + 'static,
    {
        self.names = Box::new(names);
        self
    }

    /// Replace the call that unlinks a wiped file.
    pub fn with_remover<F>(mut self, remover: F) -> Self
    where
        F: FnMut(&Path) -> io::Result<()> + 'static,
    {
        self.remover = Box::new(remover);
        self
    }

    pub fn config(&self) -> &WipeConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Wipe every target in order, appending rows to `report`.
    ///
    /// Stops starting new targets once cancellation is requested. Targets
    /// that were never started keep `TargetStatus::Pending`.
    pub fn run(
        &mut self,
        targets: &mut [Target],
        report: &mut Vec<ReportRow>,
        observer: &mut dyn WipeObserver,
    ) -> RunSummary {
        let total = targets.len();
        let first_row = report.len();
        info!(
            "wiping {} target(s) with {} (verify: {}, renames: {})",
            total,
            self.config.method.label(),
            self.config.verify,
            self.config.effective_renames()
        );

        for (index, target) in targets.iter_mut().enumerate() {
            if self.cancel.is_cancelled() {
                info!("cancelled, {} target(s) not started", total - index);
                break;
            }
            target.status = self.wipe_target(&target.path, report, observer);
            observer.target_finished(index + 1, total);
        }

        let mut summary = RunSummary::default();
        for row in &report[first_row..] {
            summary.record(row);
        }
        summary.cancelled = self.cancel.is_cancelled();
        summary
    }

    /// Wipe one top-level target, file or directory.
    pub fn wipe_target(
        &mut self,
        path: &Path,
        report: &mut Vec<ReportRow>,
        observer: &mut dyn WipeObserver,
    ) -> TargetStatus {
        let is_dir = fs::symlink_metadata(path).is_ok_and(|m| m.is_dir());
        if is_dir {
            return self.wipe_directory(path, report, observer);
        }

        let row = self.wipe_file(path, observer);
        let status = TargetStatus::Finished(row.result);
        record(row, report, observer);
        status
    }

    /// Wipe the files under `dir` deepest first, removing directories as they
    /// empty. `dir` itself gets a row only when it is left behind: PARTIAL
    /// when its removal fails, ERROR when cancellation stopped the walk.
    pub fn wipe_directory(
        &mut self,
        dir: &Path,
        report: &mut Vec<ReportRow>,
        observer: &mut dyn WipeObserver,
    ) -> TargetStatus {
        let start = Instant::now();
        let mut entries = Vec::new();
        for entry in tree_walker(dir, self.config.recursive) {
            match entry {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("skipping unreadable entry under {}: {}", dir.display(), e),
            }
        }

        for entry in deepest_first(entries) {
            if self.cancel.is_cancelled() {
                let row = directory_row(dir, self.config.method, start, WipeResult::Error)
                    .with_error(WipeError::Cancelled.to_string());
                record(row, report, observer);
                return TargetStatus::Finished(WipeResult::Error);
            }
            if entry.depth() == 0 {
                continue;
            }
            if entry.file_type().is_dir() {
                if let Err(e) = fs::remove_dir(entry.path()) {
                    debug!("could not remove {}: {}", entry.path().display(), e);
                }
                continue;
            }

            let row = self.wipe_file(entry.path(), observer);
            record(row, report, observer);
        }

        match fs::remove_dir(dir) {
            Ok(()) => {
                info!("removed directory {}", dir.display());
                TargetStatus::Finished(WipeResult::Deleted)
            }
            Err(e) => {
                let row = directory_row(dir, self.config.method, start, WipeResult::Partial)
                    .with_error(e.to_string());
                record(row, report, observer);
                TargetStatus::Finished(WipeResult::Partial)
            }
        }
    }

    /// Run the full pipeline for one file and always return its row.
    pub fn wipe_file(&mut self, path: &Path, observer: &mut dyn WipeObserver) -> ReportRow {
        let start = Instant::now();
        let mut progress = FileProgress {
            path: path.to_path_buf(),
            size: 0,
            passes: 0,
            renamed: 0,
        };

        match self.try_wipe_file(&mut progress, observer) {
            Ok(mut row) => {
                if row.result != WipeResult::Missing {
                    row.duration_sec = start.elapsed().as_secs_f64();
                }
                row
            }
            Err(e) => ReportRow {
                path: progress.path.display().to_string(),
                method: self.config.method,
                size: progress.size,
                passes: progress.passes,
                renamed: progress.renamed,
                verified: Verification::No,
                duration_sec: start.elapsed().as_secs_f64(),
                result: WipeResult::Error,
                error: e.to_string(),
            },
        }
    }

    fn try_wipe_file(
        &mut self,
        progress: &mut FileProgress,
        observer: &mut dyn WipeObserver,
    ) -> Result<ReportRow> {
        let method = self.config.method;
        let path = progress.path.clone();

        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(ReportRow::missing(&path, method));
            }
            Err(e) => return Err(e.into()),
        };
        // Never follow a link; drop the entry itself
        if meta.file_type().is_symlink() {
            fs::remove_file(&path)?;
            return Ok(ReportRow::link_removed(&path, method));
        }

        ensure_writable(&path);

        // Open in place for read/write, without truncating
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let size = file.metadata()?.len();
        progress.size = size;

        let passes = method.passes();
        let mut verified_any = false;
        for (i, pattern) in passes.iter().enumerate() {
            let pass = i + 1;
            overwrite_pass(&mut file, size, self.config.chunk_size, *pattern, &self.cancel)?;
            progress.passes += 1;
            debug!("pass {}/{} ({}) done for {}", pass, passes.len(), pattern, path.display());
            observer.pass_written(&path, pass, passes.len());

            if !self.config.verify {
                continue;
            }
            // Only fixed passes can be read back; random ones are skipped
            match pattern.fixed_byte() {
                Some(byte) => {
                    if !verify_pass(&mut file, size, self.config.chunk_size, byte)? {
                        return Err(WipeError::VerificationFailed { pass });
                    }
                    verified_any = true;
                    debug!("pass {} verified", pass);
                }
                None => debug!("pass {} verification skipped (random pattern)", pass),
            }
        }
        // Close the handle before renaming
        drop(file);

        let renames = self.config.effective_renames();
        let outcome = obfuscate(&path, renames, &mut self.names);
        progress.path = outcome.path;
        progress.renamed = outcome.renamed;

        if self.config.scrub_timestamps {
            let epoch = FileTime::zero();
            if let Err(e) = filetime::set_file_times(&progress.path, epoch, epoch) {
                debug!("could not reset timestamps on {}: {}", progress.path.display(), e);
            }
        }

        // Now delete the file
        self.unlink(&progress.path)?;

        let verified = if self.config.verify && verified_any {
            Verification::Yes
        } else {
            Verification::NotApplicable
        };
        Ok(ReportRow {
            path: progress.path.display().to_string(),
            method,
            size,
            passes: progress.passes,
            renamed: progress.renamed,
            verified,
            duration_sec: 0.0,
            result: WipeResult::Deleted,
            error: String::new(),
        })
    }

    /// Remove a file, retrying once after forcing it writable on a permission error.
    fn unlink(&mut self, path: &Path) -> io::Result<()> {
        match (self.remover)(path) {
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                debug!("unlink of {} denied, retrying writable", path.display());
                ensure_writable(path);
                (self.remover)(path)
            }
            other => other,
        }
    }
}

fn directory_row(dir: &Path, method: WipeMethod, start: Instant, result: WipeResult) -> ReportRow {
    ReportRow {
        path: dir.display().to_string(),
        method,
        size: 0,
        passes: 0,
        renamed: 0,
        verified: Verification::NotApplicable,
        duration_sec: start.elapsed().as_secs_f64(),
        result,
        error: String::new(),
    }
}

fn record(row: ReportRow, report: &mut Vec<ReportRow>, observer: &mut dyn WipeObserver) {
    match row.result {
        WipeResult::Deleted => info!(
            "[OK] {} ({}) in {:.2}s",
            row.path,
            human_size(row.size),
            row.duration_sec
        ),
        WipeResult::Error | WipeResult::Partial => {
            warn!("[{}] {}: {}", row.result, row.path, row.error)
        }
        _ => info!("[{}] {}", row.result, row.path),
    }
    observer.row_recorded(&row);
    report.push(row);
}

/// Best-effort: give the owner write permission. Failures are only logged.
#[cfg_attr(not(unix), allow(clippy::permissions_set_readonly_false))]
pub fn ensure_writable(path: &Path) {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            debug!("cannot stat {}: {}", path.display(), e);
            return;
        }
    };
    let mut perms = meta.permissions();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = perms.mode();
        if mode & 0o200 != 0 {
            return;
        }
        perms.set_mode(mode | 0o200);
    }
    #[cfg(not(unix))]
    {
        if !perms.readonly() {
            return;
        }
        perms.set_readonly(false);
    }

    if let Err(e) = fs::set_permissions(path, perms) {
        warn!("could not make {} writable: {}", path.display(), e);
    }
}

fn tree_walker(root: &Path, recursive: bool) -> WalkDir {
    let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    if recursive {
        walker
    } else {
        walker.max_depth(1)
    }
}

/// Snapshot order for a directory target: deepest entries first, so every
/// directory is emptied before its own removal is attempted. Taking the
/// snapshot up front also keeps renames from racing the listing.
fn deepest_first(mut entries: Vec<DirEntry>) -> Vec<DirEntry> {
    entries.sort_by_key(|e| Reverse(e.depth()));
    entries
}

/// Files a run over `paths` would touch, deepest first, without touching them.
pub fn plan_targets(paths: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut planned = Vec::new();
    for path in paths {
        let Ok(meta) = fs::symlink_metadata(path) else {
            continue;
        };
        if !meta.is_dir() {
            planned.push(path.clone());
            continue;
        }
        let entries = tree_walker(path, recursive).into_iter().filter_map(|e| e.ok());
        planned.extend(
            deepest_first(entries.collect())
                .into_iter()
                .filter(|e| !e.file_type().is_dir())
                .map(|e| e.into_path()),
        );
    }
    planned
}
