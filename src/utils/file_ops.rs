use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use crate::{KeyTag, MatchResult, RenameOutcome, RenameStatus, Result};

/// Encodes key and tempo into filenames as `<stem>_(<key>_<tempo>bpm).<ext>`.
///
/// A file counts as already tagged when its stem contains the parenthesised
/// tag that would be generated for it, so repeated runs reach a fixed point.
pub struct RenameApplier {
    dry_run: bool,
}

impl RenameApplier {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// The parenthesised tag body, e.g. `(A minor_128bpm)` or `(C#)`.
    pub fn tag_text(tag: &KeyTag) -> String {
        match &tag.tempo {
            Some(tempo) => format!("({}_{}bpm)", sanitize(&tag.key), sanitize(tempo)),
            None => format!("({})", sanitize(&tag.key)),
        }
    }

    pub fn is_tagged(path: &Path, tag: &KeyTag) -> bool {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().contains(&Self::tag_text(tag)))
            .unwrap_or(false)
    }

    /// True when the stem ends in any `_(...)` tag, whoever wrote it.
    pub fn has_any_tag(path: &Path) -> bool {
        let Some(stem) = path.file_stem() else {
            return false;
        };
        let stem = stem.to_string_lossy();
        stem.strip_suffix(')')
            .and_then(|rest| rest.rfind("_(").map(|i| &rest[i + 2..]))
            .map_or(false, |body| !body.trim().is_empty() && !body.contains(['(', ')']))
    }

    pub fn destination(path: &Path, tag: &KeyTag) -> Option<PathBuf> {
        let stem = path.file_stem()?.to_string_lossy();
        let new_name = match path.extension() {
            Some(ext) => format!("{}_{}.{}", stem, Self::tag_text(tag), ext.to_string_lossy()),
            None => format!("{}_{}", stem, Self::tag_text(tag)),
        };
        Some(path.with_file_name(new_name))
    }

    pub fn apply_match(&self, matched: &MatchResult) -> RenameOutcome {
        self.apply(&matched.track.path, &matched.record.tag())
    }

    /// Rename one file. Every failure is captured in the outcome.
    pub fn apply(&self, path: &Path, tag: &KeyTag) -> RenameOutcome {
        if Self::is_tagged(path, tag) {
            log::info!("Already tagged: {}", path.display());
            return RenameOutcome::new(path, None, RenameStatus::SkippedAlreadyTagged)
                .with_reason(format!("name already contains {}", Self::tag_text(tag)));
        }

        if !path.exists() {
            log::warn!("Skipped: '{}' no longer exists", path.display());
            return RenameOutcome::new(path, None, RenameStatus::Failed)
                .with_reason("source file no longer exists");
        }

        let Some(destination) = Self::destination(path, tag) else {
            return RenameOutcome::new(path, None, RenameStatus::Failed)
                .with_reason("path has no file name");
        };

        if destination == path {
            return RenameOutcome::new(path, Some(destination), RenameStatus::SkippedAlreadyTagged)
                .with_reason("already named correctly");
        }

        if destination.exists() {
            log::warn!("Destination already exists: {}", destination.display());
            return RenameOutcome::new(path, Some(destination), RenameStatus::SkippedCollision)
                .with_reason("destination already exists");
        }

        if self.dry_run {
            log::info!("[dry-run] Would rename {} -> {}", path.display(), destination.display());
            return RenameOutcome::new(path, Some(destination), RenameStatus::Planned);
        }

        match fs::rename(path, &destination) {
            Ok(()) => {
                log::info!(
                    "Renamed: {} -> {}",
                    display_name(path),
                    display_name(&destination)
                );
                RenameOutcome::new(path, Some(destination), RenameStatus::Renamed)
            }
            Err(e) => {
                log::warn!("Failed to rename '{}': {}", path.display(), e);
                RenameOutcome::new(path, Some(destination), RenameStatus::Failed)
                    .with_reason(e.to_string())
            }
        }
    }
}

/// Delete every file below `dir` except `.gitkeep`, then any directories left empty.
/// Returns the number of files removed (or that would be removed on a dry run).
pub fn clean_downloads(dir: impl AsRef<Path>, dry_run: bool) -> Result<usize> {
    let dir = dir.as_ref();
    let mut removed = 0;

    for entry in WalkDir::new(dir).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("Error accessing entry: {}", err);
                continue;
            }
        };
        let path = entry.path();

        if entry.file_type().is_dir() {
            let is_empty = fs::read_dir(path)?.next().is_none();
            if is_empty {
                if dry_run {
                    log::info!("[dry-run] Would remove empty dir: {}", path.display());
                } else {
                    fs::remove_dir(path)?;
                }
            }
        } else if entry.file_name() != ".gitkeep" {
            if dry_run {
                log::info!("[dry-run] Would remove file: {}", path.display());
            } else {
                fs::remove_file(path)?;
            }
            removed += 1;
        }
    }

    log::info!("Downloads cleanup complete ({} files)", removed);
    Ok(removed)
}

pub fn ensure_directory(path: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(path.as_ref())?;
    Ok(())
}

// Tag values stay bracket-free; title normalization strips one nesting level only
fn sanitize(value: &str) -> String {
    value
        .replace(['/', '\\', ':'], "-")
        .replace(['(', ')', '[', ']'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}
