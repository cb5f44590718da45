pub mod config;
pub mod core;
pub mod logging;
pub mod models;
pub mod utils;

use crate::config::global::GlobalState;
use crate::config::AppSettings;
use crate::core::autoinstall::{run_autoinstall, AutoInstall};
use crate::core::fetcher::HttpFetcher;
use crate::core::host::DirectoryHost;
use crate::core::installer::Installer;
use crate::core::package::PackageReader;
use crate::core::store;
use crate::models::error::SError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Startup entry: prepares the host layout, then installs a dropped-in
/// `loadit` package if it changed since last launch.
pub fn run() {
    let settings = AppSettings::load().unwrap_or_else(|e| {
        eprintln!("failed to load settings, using defaults: {e}");
        AppSettings::default()
    });

    let _guard = match logging::init_logging(&settings.log_dir(), &settings.log_level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("logging disabled: {e}");
            None
        }
    };

    if let Err(e) = try_run(&settings) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn try_run(settings: &AppSettings) -> Result<(), SError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| SError::AsyncRuntimeError(e.to_string()))?;

    runtime.block_on(async {
        let host = DirectoryHost::from_paths(settings.host_paths());
        host.ensure_layout()?;

        let packs = store::list(&settings.host_paths().packs)?;
        info!("{} packs in {}", packs.len(), settings.host_paths().packs);

        let mut reader = PackageReader::new(settings.cache_capacity);
        let installer = Installer::new(
            settings.host_paths(),
            HttpFetcher::default(),
            settings.install_settings(),
        );
        let mut state = GlobalState::load();
        let cancel = CancellationToken::new();

        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });

        let outcome =
            run_autoinstall(&settings.host_root, &mut state, &mut reader, &installer, &cancel)
                .await?;
        match outcome {
            AutoInstall::NoPackage => {}
            AutoInstall::Unchanged(path) => info!("{path} already installed"),
            AutoInstall::Installed { path, report } => {
                state.save()?;
                for (id, reason) in &report.failed {
                    warn!("{id} was not downloaded: {reason}");
                }
                info!(
                    "installed {path}: {} downloaded, {} files copied",
                    report.downloaded.len(),
                    report.copied_files
                );
                if report.needs_restart {
                    info!("restart the host to apply changes");
                }
            }
        }
        Ok(())
    })
}
