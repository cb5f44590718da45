use crate::core::decompression::Decompression;
use crate::core::fetcher::{download_url, FetchResponse, PackageFetcher, DEFAULT_REGISTRY};
use crate::core::package::persist;
use crate::models::error::SError;
use crate::models::modpack::{Entry, Modpack};
use crate::models::package::LoadedPackage;
use crate::models::paths::{ArchiveLayout, HostPathRules, PackageKind};
use crate::utils::file::FileUtils;
use crate::utils::id::unpack_dir_name;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallState {
    NotStarted,
    FilesCopied,
    DrainingProgress,
    Done,
}

impl InstallState {
    /// Derived purely from the manifest, so it survives restarts.
    pub fn of(pack: &Modpack) -> Self {
        match (pack.files_installed, &pack.install_progress) {
            (None, _) => Self::NotStarted,
            (Some(_), None) => Self::FilesCopied,
            (Some(_), Some(queue)) if queue.is_empty() => Self::Done,
            (Some(_), Some(_)) => Self::DrainingProgress,
        }
    }
}

/// What the presentation layer polls while an install runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct InstallStatus {
    pub title: String,
    pub percentage: u8,
    pub needs_restart: bool,
    pub finished: bool,
}

#[derive(Clone, Debug, Default)]
pub struct StatusBoard(Arc<Mutex<InstallStatus>>);

impl StatusBoard {
    pub fn snapshot(&self) -> InstallStatus {
        self.0.lock().clone()
    }

    pub fn begin(&self, title: &str) {
        let mut s = self.0.lock();
        s.title = title.to_string();
        s.percentage = 0;
        s.finished = false;
    }

    pub fn set_fraction(&self, fraction: f32) {
        self.0.lock().percentage = (fraction.clamp(0.0, 1.0) * 100.0).round() as u8;
    }

    pub fn raise_restart(&self) {
        self.0.lock().needs_restart = true;
    }

    pub fn finish(&self) {
        let mut s = self.0.lock();
        s.title.clear();
        s.percentage = 0;
        s.finished = true;
    }
}

/// Whether a failed download is tried again before moving on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_secs(2),
        }
    }
}

#[derive(Clone, Debug)]
pub struct InstallSettings {
    pub registry_base: String,
    pub retry: RetryPolicy,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            registry_base: DEFAULT_REGISTRY.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FetchOutcome {
    AlreadyPresent,
    Downloaded,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// The work queue was created from `entries`.
    QueueInitialized(usize),
    Processed { id: String, fetch: FetchOutcome },
    Finished,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstallReport {
    pub copied_files: usize,
    pub processed: Vec<String>,
    pub downloaded: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub needs_restart: bool,
}

/// Drives one package from `NotStarted` to `Done`, persisting after every
/// step so a restart resumes at the next undone entry.
pub struct Installer<F> {
    paths: HostPathRules,
    fetcher: F,
    settings: InstallSettings,
    status: StatusBoard,
}

impl<F: PackageFetcher> Installer<F> {
    pub fn new(paths: HostPathRules, fetcher: F, settings: InstallSettings) -> Self {
        Self {
            paths,
            fetcher,
            settings,
            status: StatusBoard::default(),
        }
    }

    pub fn status(&self) -> StatusBoard {
        self.status.clone()
    }

    pub fn paths(&self) -> &HostPathRules {
        &self.paths
    }

    /// Runs every remaining transition. Calling it on a finished package is a no-op.
    #[instrument(skip_all, fields(pack = %pack.path))]
    pub async fn install(
        &self,
        pack: &mut LoadedPackage,
        cancel: &CancellationToken,
    ) -> Result<InstallReport, SError> {
        let mut report = InstallReport::default();

        if let Some(copied) = self.copy_files(pack).await? {
            report.copied_files = copied;
            report.needs_restart |= copied > 0;
        }

        loop {
            match self.step(pack, &mut report, cancel).await? {
                StepOutcome::Finished => break,
                StepOutcome::QueueInitialized(n) => debug!("{n} entries queued"),
                StepOutcome::Processed { id, fetch } => debug!("{id}: {fetch:?}"),
            }
        }

        if report.needs_restart {
            info!("install finished, restart required");
            self.status.raise_restart();
        } else {
            info!("install finished, nothing changed");
        }
        self.status.finish();
        Ok(report)
    }

    /// The one-time copy of bundled trees. Returns `None` when it already ran.
    pub async fn copy_files(&self, pack: &mut LoadedPackage) -> Result<Option<usize>, SError> {
        if pack.modpack.files_installed.is_some() {
            debug!("files already installed for {}", pack.path);
            return Ok(None);
        }

        let copied = match pack.kind {
            PackageKind::Manifest => 0,
            PackageKind::Archive => {
                self.status.begin("copying files");
                let archive = pack.path.clone();
                let paths = self.paths.clone();
                let unpack = paths.temp.join(unpack_dir_name(&pack.modpack.name));
                spawn_blocking(move || copy_bundled_trees(&archive, &unpack, &paths)).await??
            }
        };

        pack.modpack.files_installed = Some(true);
        persist_in_background(pack).await?;
        info!("copied {copied} bundled files");
        Ok(Some(copied))
    }

    /// Performs exactly one drain transition.
    pub async fn step(
        &self,
        pack: &mut LoadedPackage,
        report: &mut InstallReport,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome, SError> {
        if pack.modpack.install_progress.is_none() {
            let queue = pack.modpack.entries.clone();
            let n = queue.len();
            pack.modpack.install_progress = Some(queue);
            persist_in_background(pack).await?;
            return Ok(StepOutcome::QueueInitialized(n));
        }

        let Some((id, entry)) = pack
            .modpack
            .next_pending()
            .map(|(id, entry)| (id.clone(), entry.clone()))
        else {
            return Ok(StepOutcome::Finished);
        };

        self.status.begin(&id);
        report.needs_restart |= self.restore_data(&id, &entry);

        if let Some(queue) = pack.modpack.install_progress.as_mut() {
            queue.shift_remove(&id);
        }
        persist_in_background(pack).await?;

        let fetch = if self.paths.package_file(&id).is_file() {
            debug!("{id} already present, no download");
            FetchOutcome::AlreadyPresent
        } else {
            match self.download(&id, cancel).await {
                Err(SError::OperationCancelled) => {
                    self.requeue(pack, id, entry).await?;
                    return Err(SError::OperationCancelled);
                }
                other => other?,
            }
        };
        report.processed.push(id.clone());

        match &fetch {
            FetchOutcome::Downloaded => {
                report.downloaded.push(id.clone());
                report.needs_restart = true;
            }
            FetchOutcome::Failed(reason) => report.failed.push((id.clone(), reason.clone())),
            FetchOutcome::AlreadyPresent => {}
        }

        Ok(StepOutcome::Processed { id, fetch })
    }

    /// Puts an interrupted entry back at the head of the queue so the next
    /// run fetches it. Its data files are rewritten then, which is harmless.
    async fn requeue(&self, pack: &mut LoadedPackage, id: String, entry: Entry) -> Result<(), SError> {
        info!("{id} interrupted, queued again");
        if let Some(queue) = pack.modpack.install_progress.as_mut() {
            queue.shift_insert(0, id, entry);
        }
        persist_in_background(pack).await
    }

    /// Writes `settings.json`/`saved.json` for one entry. A write failure is
    /// logged and does not stop the drain. Returns whether anything was written.
    fn restore_data(&self, id: &str, entry: &Entry) -> bool {
        let mut wrote = false;
        for (blob, target) in [
            (&entry.settings, self.paths.settings_file(id)),
            (&entry.saved, self.paths.saved_file(id)),
        ] {
            let Some(blob) = blob else { continue };
            let result = serde_json::to_vec(blob)
                .map_err(SError::from)
                .and_then(|bytes| FileUtils::write_creating_dirs(&target, &bytes));
            match result {
                Ok(()) => wrote = true,
                Err(e) => error!("failed to write {target}: {e}"),
            }
        }
        wrote
    }

    async fn download(&self, id: &str, cancel: &CancellationToken) -> Result<FetchOutcome, SError> {
        let url = download_url(&self.settings.registry_base, id);
        let status = self.status.clone();
        let on_progress = move |fraction: f32| status.set_fraction(fraction);
        let attempts = self.settings.retry.max_attempts.max(1);

        let mut last_failure = String::new();
        for attempt in 1..=attempts {
            if attempt > 1 {
                debug!("retrying {id} (attempt {attempt}/{attempts})");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(SError::OperationCancelled),
                    _ = tokio::time::sleep(self.settings.retry.backoff) => {}
                }
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SError::OperationCancelled),
                r = self.fetcher.fetch(&url, &on_progress) => r,
            };

            match result {
                Ok(response) if response.is_success() => {
                    let target = self.paths.package_file(id);
                    return match FileUtils::write_creating_dirs(&target, &response.body) {
                        Ok(()) => {
                            info!("downloaded {id} ({} bytes)", response.body.len());
                            Ok(FetchOutcome::Downloaded)
                        }
                        Err(e) => {
                            error!("failed to save {target}: {e}");
                            Ok(FetchOutcome::Failed(e.to_string()))
                        }
                    };
                }
                Ok(FetchResponse { status, .. }) => {
                    warn!("download of {id} failed with HTTP {status}");
                    last_failure = format!("HTTP {status}");
                }
                Err(e) => {
                    warn!("download of {id} failed: {e}");
                    last_failure = e.to_string();
                }
            }
        }

        Ok(FetchOutcome::Failed(last_failure))
    }
}

/// Unpacks the archive and copies its `mods/`, `config/` and `saves/` trees
/// over the host directories.
fn copy_bundled_trees(
    archive: &camino::Utf8Path,
    unpack: &camino::Utf8Path,
    paths: &HostPathRules,
) -> Result<usize, SError> {
    let layout = ArchiveLayout::default();
    FileUtils::remove_any(unpack)?;
    Decompression::extract(archive, unpack)?;

    let mut copied = 0;
    for (tree, target) in [
        (&layout.mods, &paths.mods),
        (&layout.config, &paths.config),
        (&layout.saves, &paths.saves),
    ] {
        let src = unpack.join(tree);
        if src.is_dir() {
            copied += FileUtils::copy_recursive(&src, target)?;
        }
    }

    if let Err(e) = FileUtils::remove_any(unpack) {
        warn!("could not clean up {unpack}: {e}");
    }
    Ok(copied)
}

async fn persist_in_background(pack: &mut LoadedPackage) -> Result<(), SError> {
    let mut owned = pack.clone();
    *pack = spawn_blocking(move || persist(&mut owned).map(|_| owned)).await??;
    Ok(())
}
