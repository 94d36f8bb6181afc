/// Replace a catalog file atomically, keeping a timestamped copy of the old one
use chrono::Local;
use log::debug;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BackupOutcome {
    pub backup_path: Option<PathBuf>,
    pub final_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("Failed to create backup of {}: {message}", .path.display())]
    BackupCreate { path: PathBuf, message: String },
}

/// Write `contents` to a sibling temp file, then rename it over `target`.
/// With `keep_backup`, an existing target is first copied to
/// `<name>.bak.<timestamp>`.
pub fn backup_and_swap(
    target: &Path,
    contents: &[u8],
    keep_backup: bool,
) -> Result<BackupOutcome, BackupError> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let backup_path = if keep_backup && target.exists() {
        let candidate = backup_path_for(target, &parent);
        fs::copy(target, &candidate).map_err(|err| BackupError::BackupCreate {
            path: target.to_path_buf(),
            message: err.to_string(),
        })?;
        debug!("backed up {} to {}", target.display(), candidate.display());
        Some(candidate)
    } else {
        None
    };

    let temp_path = build_temp_path(target);
    let written = write_synced(&temp_path, contents).and_then(|_| replace(&temp_path, target));
    if let Err(err) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(BackupError::Io(err));
    }

    Ok(BackupOutcome {
        backup_path,
        final_path: target.to_path_buf(),
    })
}

fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(target_os = "windows")]
fn replace(temp_path: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(temp_path, target) {
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            fs::remove_file(target)?;
            fs::rename(temp_path, target)
        }
        other => other,
    }
}

#[cfg(not(target_os = "windows"))]
fn replace(temp_path: &Path, target: &Path) -> io::Result<()> {
    fs::rename(temp_path, target)
}

fn backup_path_for(target: &Path, parent: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d%H%M%S");
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".into());
    let mut candidate = parent.join(format!("{name}.bak.{timestamp}"));
    let mut attempt = 1;
    while candidate.exists() {
        candidate = parent.join(format!("{name}.bak.{timestamp}.{attempt}"));
        attempt += 1;
    }
    candidate
}

fn build_temp_path(target: &Path) -> PathBuf {
    let mut temp = target.to_path_buf();
    let suffix = format!(".tmp.{}", std::process::id());
    match temp.file_name() {
        Some(name) => {
            let mut os_string = name.to_os_string();
            os_string.push(suffix);
            temp.set_file_name(os_string);
        }
        None => temp.push(format!("catalog{suffix}")),
    }
    temp
}
