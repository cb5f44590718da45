use crate::core::host::ModHost;
use crate::core::installer::StatusBoard;
use crate::core::package::PackageReader;
use crate::models::error::SError;
use crate::models::modpack::Modpack;
use crate::models::paths::{HostPathRules, PackageKind};
use crate::utils::file::FileUtils;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, instrument, warn};

/// Every manifest and archive directly inside `dir`, sorted by file name.
/// A missing directory lists as empty.
pub fn list(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut packs: Vec<Utf8PathBuf> = dir
        .read_dir_utf8()?
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && PackageKind::from_path(p).is_some())
        .collect();
    packs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(packs)
}

pub fn delete(reader: &mut PackageReader, path: &Utf8Path) -> Result<(), SError> {
    reader.forget(path);
    if !FileUtils::remove_any(path)? {
        return Err(SError::FileOrDirectoryNotFound(path.to_string()));
    }
    info!("deleted {path}");
    Ok(())
}

/// True when every entry's package is present on the host.
pub fn is_installed(pack: &Modpack, host: &dyn ModHost) -> bool {
    pack.entries.keys().all(|id| host.is_installed(id))
}

/// Removes every entry's package file, plus its save directory when the
/// entry carried data. The pack itself is left as it is. Returns the ids
/// that were removed.
#[instrument(skip_all, fields(pack = %pack.name))]
pub fn uninstall(pack: &Modpack, paths: &HostPathRules, status: &StatusBoard) -> Vec<String> {
    let mut removed = Vec::new();
    for (id, entry) in &pack.entries {
        match FileUtils::remove_any(&paths.package_file(id)) {
            Ok(true) => removed.push(id.clone()),
            Ok(false) => continue,
            Err(e) => {
                warn!("could not remove {id}: {e}");
                continue;
            }
        }
        if entry.has_data() {
            if let Err(e) = FileUtils::remove_any(&paths.mod_save_dir(id)) {
                warn!("could not remove save data of {id}: {e}");
            }
        }
    }

    info!("uninstalled {} mods", removed.len());
    status.raise_restart();
    removed
}
