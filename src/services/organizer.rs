//! Asset file organization
//!
//! Places the files of matched bundles into the destination directory:
//! - Creates per-title asset folders (e.g., "Dune (2021)/") in folder mode
//! - Derives canonical names ("poster.jpg", "Season03.jpg", "Dune (2021).jpg")
//! - Copies, moves or hardlinks files, skipping ones already in place
//! - Removes stale images left behind when an override changes the extension
//!
//! Dry-run mode evaluates exactly the same decisions but never touches the
//! destination; every reported line carries a `[DRY RUN] ` prefix instead.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::file_matcher::MatchRecord;
use super::file_utils::{files_identical, is_same_file};
use super::filename_parser::{SeasonMarkers, split_extension};
use super::scanner::AssetInventory;

pub const DRY_RUN_PREFIX: &str = "[DRY RUN] ";

const RENAMED_ARROW: &str = "-renamed->";
const NOT_RENAMED_ARROW: &str = "-not-renamed->>";

/// How a file is transferred into the destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    #[default]
    Copy,
    Move,
    Hardlink,
}

impl FileAction {
    /// Capitalized name used in report lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::Copy => "Copy",
            Self::Move => "Move",
            Self::Hardlink => "Hardlink",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Hardlink => "hardlink",
        }
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-file failures. Logged and skipped; never abort a run.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("Unable to find season number for {file}")]
    MissingSeasonNumber { file: String },

    #[error("Unable to create asset folder {}: {source}", path.display())]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to compare {} with {}: {source}", source_path.display(), destination.display())]
    Compare {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to {action} file {} to {}: {source}", source_path.display(), destination.display())]
    Transfer {
        action: FileAction,
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Options for one materialize pass
#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    pub destination_dir: PathBuf,
    /// Place files in `<destination>/<folder>/` instead of flat `<folder>.<ext>` files
    pub asset_folders: bool,
    pub dry_run: bool,
    pub action: FileAction,
    /// Skip files whose name would not change
    pub print_only_renames: bool,
    pub season_markers: SeasonMarkers,
}

impl OrganizeOptions {
    pub fn new(destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            destination_dir: destination_dir.into(),
            asset_folders: false,
            dry_run: false,
            action: FileAction::Copy,
            print_only_renames: false,
            season_markers: SeasonMarkers::default(),
        }
    }
}

/// One planned file placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameOperation {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub action: FileAction,
    /// Whether the action is (or in dry-run would be) carried out
    pub would_execute: bool,
}

/// Everything a materialize pass reports
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganizeReport {
    /// Human-readable lines in processing order
    pub messages: Vec<String>,
    /// Newly placed file stems (flat mode) or newly created folders (folder mode)
    pub notifications: Vec<String>,
    pub operations: Vec<RenameOperation>,
}

/// Decision taken for a single file before anything is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferPlan {
    Execute,
    /// Copy target already has identical contents
    SkipIdentical,
    /// Hardlink target already is the source file
    SkipSameFile,
}

/// Destinations and folders already handled earlier in the same pass.
///
/// Dry-run never writes, so later decisions consult this instead of the disk.
#[derive(Debug, Default)]
struct PassState {
    /// Destination -> source whose contents it holds (or would hold)
    placed: HashMap<PathBuf, PathBuf>,
    created_folders: HashSet<PathBuf>,
}

/// Name of the temporary link created next to `destination` before it is
/// renamed into place.
fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.link-tmp", name))
}

/// Canonical destination name for an asset file.
///
/// Season posters become `Season<NN>` (folder mode) or `<folder>_Season<NN>`;
/// everything else becomes `poster` or `<folder>`. The extension is kept.
pub fn destination_file_name(
    file_name: &str,
    folder: &str,
    asset_folders: bool,
    markers: &SeasonMarkers,
) -> Result<String, OrganizeError> {
    let (_, extension) = split_extension(file_name);

    if markers.contains_marker(file_name) {
        let tag = markers
            .season_tag(file_name)
            .ok_or_else(|| OrganizeError::MissingSeasonNumber {
                file: file_name.to_string(),
            })?;
        let season = format!("Season{:02}", tag.number());
        return Ok(if asset_folders {
            format!("{}{}", season, extension)
        } else {
            format!("{}_{}{}", folder, season, extension)
        });
    }

    Ok(if asset_folders {
        format!("poster{}", extension)
    } else {
        format!("{}{}", folder, extension)
    })
}

/// Places matched asset files into the destination directory
pub struct Organizer<'a> {
    options: &'a OrganizeOptions,
}

impl<'a> Organizer<'a> {
    pub fn new(options: &'a OrganizeOptions) -> Self {
        Self { options }
    }

    fn line(&self, message: String) -> String {
        if self.options.dry_run {
            format!("{}{}", DRY_RUN_PREFIX, message)
        } else {
            message
        }
    }

    /// Place every file of every record. Failures are logged per file.
    pub fn materialize(&self, records: &[MatchRecord], inventory: &AssetInventory) -> OrganizeReport {
        let mut report = OrganizeReport::default();
        let mut state = PassState::default();
        let total = records.len();

        for (i, record) in records.iter().enumerate() {
            debug!(
                title = %record.source_title,
                folder = %record.folder,
                files = record.files.len(),
                progress = i + 1,
                total = total,
                "Placing asset files"
            );

            let target_dir = if self.options.asset_folders {
                match self.ensure_folder(&record.folder, &mut state, &mut report) {
                    Ok(dir) => dir,
                    Err(e) => {
                        error!(folder = %record.folder, error = %e, "Skipping asset folder");
                        continue;
                    }
                }
            } else {
                self.options.destination_dir.clone()
            };

            for file in &record.files {
                if let Err(e) =
                    self.place_file(file, record, &target_dir, inventory, &mut state, &mut report)
                {
                    error!(file = %file.display(), error = %e, "Failed to place asset file");
                }
            }
        }

        info!(
            messages = report.messages.len(),
            notifications = report.notifications.len(),
            dry_run = self.options.dry_run,
            "Asset placement complete"
        );

        report
    }

    /// Make sure `<destination>/<folder>` exists (or would exist in dry-run).
    fn ensure_folder(
        &self,
        folder: &str,
        state: &mut PassState,
        report: &mut OrganizeReport,
    ) -> Result<PathBuf, OrganizeError> {
        let dir = self.options.destination_dir.join(folder);
        if dir.is_dir() || state.created_folders.contains(&dir) {
            return Ok(dir);
        }

        if !self.options.dry_run {
            fs::create_dir_all(&dir).map_err(|source| OrganizeError::CreateFolder {
                path: dir.clone(),
                source,
            })?;
        }
        report
            .messages
            .push(self.line(format!("Creating asset folder: {}", folder)));
        report.notifications.push(folder.to_string());
        state.created_folders.insert(dir.clone());
        Ok(dir)
    }

    fn place_file(
        &self,
        file: &Path,
        record: &MatchRecord,
        target_dir: &Path,
        inventory: &AssetInventory,
        state: &mut PassState,
        report: &mut OrganizeReport,
    ) -> Result<(), OrganizeError> {
        let old_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let new_name = destination_file_name(
            &old_name,
            &record.folder,
            self.options.asset_folders,
            &self.options.season_markers,
        )?;
        let destination = target_dir.join(&new_name);

        if inventory.is_override_source(file) {
            self.remove_stale(&new_name, target_dir, &record.folder, report);
        }

        let arrow = if new_name != old_name {
            RENAMED_ARROW
        } else if self.options.print_only_renames {
            debug!(file = %old_name, "Name unchanged, not reported");
            return Ok(());
        } else {
            NOT_RENAMED_ARROW
        };

        let plan = self.plan_transfer(file, &destination, state)?;
        report.operations.push(RenameOperation {
            source_path: file.to_path_buf(),
            destination_path: destination.clone(),
            action: self.options.action,
            would_execute: plan == TransferPlan::Execute,
        });

        match plan {
            TransferPlan::SkipIdentical | TransferPlan::SkipSameFile => {
                debug!(
                    action = %self.options.action,
                    destination = %destination.display(),
                    "File already exists"
                );
                state.placed.insert(destination, file.to_path_buf());
                return Ok(());
            }
            TransferPlan::Execute => {}
        }

        if !self.options.dry_run {
            self.transfer(file, &destination)?;
        }
        state.placed.insert(destination, file.to_path_buf());

        report.messages.push(self.line(format!(
            "Action Type: {}: {} {} {}",
            self.options.action.label(),
            old_name,
            arrow,
            new_name
        )));
        if !self.options.asset_folders {
            let (stem, _) = split_extension(&new_name);
            report.notifications.push(stem.to_string());
        }

        Ok(())
    }

    /// Shared by dry-run and real runs so both report the same outcome.
    /// A destination placed earlier in the pass is compared through the
    /// source placed there.
    fn plan_transfer(
        &self,
        source: &Path,
        destination: &Path,
        state: &PassState,
    ) -> Result<TransferPlan, OrganizeError> {
        let compare_err = |source_err: io::Error| OrganizeError::Compare {
            source_path: source.to_path_buf(),
            destination: destination.to_path_buf(),
            source: source_err,
        };

        let existing = match state.placed.get(destination) {
            Some(placed) => Some(placed.as_path()),
            None if destination.is_file() => Some(destination),
            None => None,
        };

        match (self.options.action, existing) {
            (FileAction::Copy, Some(existing)) => {
                if files_identical(source, existing).map_err(compare_err)? {
                    Ok(TransferPlan::SkipIdentical)
                } else {
                    Ok(TransferPlan::Execute)
                }
            }
            (FileAction::Hardlink, Some(existing)) => {
                if is_same_file(source, existing).map_err(compare_err)? {
                    Ok(TransferPlan::SkipSameFile)
                } else {
                    Ok(TransferPlan::Execute)
                }
            }
            _ => Ok(TransferPlan::Execute),
        }
    }

    fn transfer(&self, source: &Path, destination: &Path) -> Result<(), OrganizeError> {
        let action = self.options.action;
        let transfer_err = |e: io::Error| OrganizeError::Transfer {
            action,
            source_path: source.to_path_buf(),
            destination: destination.to_path_buf(),
            source: e,
        };

        match action {
            FileAction::Copy => fs::copy(source, destination).map(|_| ()).map_err(transfer_err),
            FileAction::Move => match fs::rename(source, destination) {
                Ok(()) => Ok(()),
                Err(e) => {
                    // Cross-filesystem: copy then delete
                    debug!(error = %e, "Rename failed, falling back to copy and remove");
                    fs::copy(source, destination).map_err(transfer_err)?;
                    fs::remove_file(source).map_err(transfer_err)
                }
            },
            FileAction::Hardlink => {
                // A failed link must leave the existing destination in place
                let staging = staging_path(destination);
                if staging.exists() {
                    fs::remove_file(&staging).map_err(transfer_err)?;
                }
                fs::hard_link(source, &staging).map_err(transfer_err)?;
                if let Err(e) = fs::rename(&staging, destination) {
                    if let Err(cleanup) = fs::remove_file(&staging) {
                        warn!(path = %staging.display(), error = %cleanup, "Failed to remove temporary link");
                    }
                    return Err(transfer_err(e));
                }
                Ok(())
            }
        }
    }

    /// Remove files in `target_dir` sharing the stem of `new_name` but with another extension.
    fn remove_stale(&self, new_name: &str, target_dir: &Path, folder: &str, report: &mut OrganizeReport) {
        let (new_stem, new_ext) = split_extension(new_name);

        let entries = match fs::read_dir(target_dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(directory = %target_dir.display(), error = %e, "Unable to list destination");
                }
                return;
            }
        };

        let mut stale: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
            .filter(|name| {
                let (stem, ext) = split_extension(name);
                stem == new_stem && ext != new_ext
            })
            .collect();
        stale.sort();

        let location = if self.options.asset_folders {
            folder.to_string()
        } else {
            self.options.destination_dir.display().to_string()
        };

        for name in stale {
            if !self.options.dry_run {
                let path = target_dir.join(&name);
                if let Err(source) = fs::remove_file(&path) {
                    let err = OrganizeError::Remove { path, source };
                    error!(error = %err, "Failed to remove stale asset");
                    continue;
                }
            }
            report
                .messages
                .push(self.line(format!("Removed {} from {}", name, location)));
        }
    }
}
