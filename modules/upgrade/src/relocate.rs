use crate::Relocation;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use upgrade_core::{Result, UpgradeError};

/// Move the legacy attachment directory to `to`. A missing source is not an error.
pub fn relocate_attachments(from: &Path, to: &Path) -> Result<Relocation> {
    let fail = |source: std::io::Error| UpgradeError::Relocation { from: from.to_path_buf(), to: to.to_path_buf(), source };
    if !from.exists() {
        return Ok(Relocation::NotPresent);
    }
    if to.exists() {
        let empty = fs::read_dir(to).map_err(fail)?.next().is_none();
        if !empty {
            return Err(fail(std::io::Error::new(ErrorKind::AlreadyExists, "destination attachment directory is not empty")));
        }
        fs::remove_dir(to).map_err(fail)?;
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(fail)?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(Relocation::Moved { from: from.to_path_buf(), to: to.to_path_buf() }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Relocation::NotPresent),
        Err(e) => Err(fail(e)),
    }
}

/// Remove the legacy file and its WAL side files.
pub(crate) fn delete_legacy_files(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        match fs::remove_file(&name) {
            Ok(()) => log::info!("removed {}", Path::new(&name).display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("could not remove {}: {e}", Path::new(&name).display()),
        }
    }
}
