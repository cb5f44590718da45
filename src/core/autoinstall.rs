use crate::config::global::GlobalState;
use crate::core::fetcher::PackageFetcher;
use crate::core::fingerprint::fingerprint_file;
use crate::core::installer::{InstallReport, Installer};
use crate::core::package::PackageReader;
use crate::models::error::SError;
use crate::models::paths::PackageKind;
use camino::{Utf8Path, Utf8PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// File stem the host drops into its root to request an install on launch.
pub const AUTOLOAD_STEM: &str = "loadit";

#[derive(Debug, PartialEq)]
pub enum AutoInstall {
    NoPackage,
    /// Same bytes as the last auto-install.
    Unchanged(Utf8PathBuf),
    Installed {
        path: Utf8PathBuf,
        report: InstallReport,
    },
}

/// `loadit.geode_modpack` wins over `loadit.geode_modlist`.
pub fn find_autoload(root: &Utf8Path) -> Option<Utf8PathBuf> {
    [PackageKind::Archive, PackageKind::Manifest]
        .into_iter()
        .map(|kind| root.join(format!("{AUTOLOAD_STEM}.{}", kind.extension())))
        .find(|p| p.is_file())
}

/// Installs the `loadit` package under `root` unless its fingerprint matches
/// the one recorded in `state`. The caller persists `state` afterwards.
#[instrument(skip(state, reader, installer, cancel))]
pub async fn run_autoinstall<F: PackageFetcher>(
    root: &Utf8Path,
    state: &mut GlobalState,
    reader: &mut PackageReader,
    installer: &Installer<F>,
    cancel: &CancellationToken,
) -> Result<AutoInstall, SError> {
    let Some(path) = find_autoload(root) else {
        debug!("no {AUTOLOAD_STEM} package in {root}");
        return Ok(AutoInstall::NoPackage);
    };

    let hash = fingerprint_file(&path)?;
    if state.autoinstall_hash == Some(hash) {
        debug!("{path} unchanged since last install");
        return Ok(AutoInstall::Unchanged(path));
    }

    info!("auto-installing {path}");
    let mut pack = reader.load(&path)?;
    let mut report = installer.install(&mut pack, cancel).await?;
    // Auto-installs always end in a restart so the host picks up the pack.
    report.needs_restart = true;
    installer.status().raise_restart();

    // Installing rewrites the package, so remember the final bytes.
    state.autoinstall_hash = Some(pack.fingerprint);
    Ok(AutoInstall::Installed { path, report })
}
