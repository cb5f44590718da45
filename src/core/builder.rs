use crate::config::AppSettings;
use crate::core::host::ModHost;
use crate::core::package::{BundleRequest, PackageWriter, WriteReport};
use crate::core::redactor::redact;
use crate::models::error::SError;
use crate::models::modpack::{Entry, IncludeFlag, Modpack};
use crate::models::task_status::TaskStatus;
use crate::utils::context::{StatusSender, TaskContext};
use crate::utils::id::file_stem;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fmt::Write as _;
use tracing::{debug, info, instrument, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildStep {
    SelectEntries,
    ReviewSelection,
    Configure,
    Finalize,
    Built,
}

/// How one selected id goes into the pack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub installed: bool,
    /// "as id including files" vs "as id without files".
    pub include_files: bool,
}

/// One interactive build. Owned by the caller and handed to the builder;
/// only one is meaningful at a time.
#[derive(Clone, Debug)]
pub struct BuildSession {
    pub modpack: Modpack,
    selected: IndexMap<String, Selection>,
    step: BuildStep,
    reserved: Vec<String>,
}

impl BuildSession {
    /// The loader and this tool are reserved from the start.
    pub fn new(modpack: Modpack, settings: &AppSettings) -> Self {
        Self {
            modpack,
            selected: IndexMap::new(),
            step: BuildStep::SelectEntries,
            reserved: settings.reserved_ids(),
        }
    }

    /// Starts editing an existing pack with its entries preselected.
    pub fn from_existing(mut modpack: Modpack, settings: &AppSettings, host: &dyn ModHost) -> Self {
        let ids: Vec<String> = modpack.entries.keys().cloned().collect();
        modpack.files_installed = None;
        modpack.install_progress = None;
        let mut session = Self::new(modpack, settings);
        for id in ids {
            session.insert_selection(host, id);
        }
        session
    }

    pub fn step(&self) -> BuildStep {
        self.step
    }

    pub fn selected(&self) -> &IndexMap<String, Selection> {
        &self.selected
    }

    /// Adds an id that must never enter the pack.
    pub fn reserve(&mut self, id: &str) {
        if !self.is_reserved(id) {
            self.reserved.push(id.to_string());
        }
    }

    pub fn is_reserved(&self, id: &str) -> bool {
        self.reserved.iter().any(|r| r == id)
    }

    fn expect_step(&self, step: BuildStep) -> Result<(), SError> {
        if self.step == step {
            Ok(())
        } else {
            Err(SError::InvalidStep(format!(
                "expected {step:?}, session is at {:?}",
                self.step
            )))
        }
    }

    pub fn next(&mut self) -> Result<BuildStep, SError> {
        self.step = match self.step {
            BuildStep::SelectEntries => BuildStep::ReviewSelection,
            BuildStep::ReviewSelection => BuildStep::Configure,
            BuildStep::Configure => BuildStep::Finalize,
            other => {
                return Err(SError::InvalidStep(format!("no step after {other:?}")));
            }
        };
        Ok(self.step)
    }

    pub fn back(&mut self) -> Result<BuildStep, SError> {
        self.step = match self.step {
            BuildStep::ReviewSelection => BuildStep::SelectEntries,
            BuildStep::Configure => BuildStep::ReviewSelection,
            BuildStep::Finalize => BuildStep::Configure,
            other => {
                return Err(SError::InvalidStep(format!("no step before {other:?}")));
            }
        };
        Ok(self.step)
    }

    fn insert_selection(&mut self, host: &dyn ModHost, id: String) {
        let installed = host.is_installed(&id);
        self.selected.entry(id).or_insert(Selection {
            installed,
            include_files: installed,
        });
    }

    // --- Step 1 ---

    /// Unknown or uninstalled ids are kept as id-only references.
    pub fn select(&mut self, host: &dyn ModHost, id: &str) -> Result<Selection, SError> {
        self.expect_step(BuildStep::SelectEntries)?;
        self.insert_selection(host, id.to_string());
        Ok(self.selected[id])
    }

    pub fn deselect(&mut self, id: &str) -> Result<bool, SError> {
        self.expect_step(BuildStep::SelectEntries)?;
        Ok(self.selected.shift_remove(id).is_some())
    }

    pub fn add_loaded_mods(&mut self, host: &dyn ModHost) -> Result<usize, SError> {
        self.expect_step(BuildStep::SelectEntries)?;
        let before = self.selected.len();
        for id in host.installed_ids() {
            self.insert_selection(host, id);
        }
        Ok(self.selected.len() - before)
    }

    pub fn remove_all(&mut self) -> Result<(), SError> {
        self.expect_step(BuildStep::SelectEntries)?;
        self.selected.clear();
        Ok(())
    }

    // --- Step 2 ---

    /// Flips files on or off for one id. Uninstalled ids cannot carry files.
    pub fn toggle_files(&mut self, id: &str) -> Result<bool, SError> {
        self.expect_step(BuildStep::ReviewSelection)?;
        let sel = self
            .selected
            .get_mut(id)
            .ok_or_else(|| SError::ModNotFound(id.to_string()))?;
        if sel.installed {
            sel.include_files = !sel.include_files;
        }
        Ok(sel.include_files)
    }

    /// Turns files off everywhere if any installed id has them, on otherwise.
    pub fn toggle_all_files(&mut self) -> Result<bool, SError> {
        self.expect_step(BuildStep::ReviewSelection)?;
        let target = !self.selected.values().any(|s| s.include_files);
        for sel in self.selected.values_mut().filter(|s| s.installed) {
            sel.include_files = target;
        }
        Ok(target)
    }

    // --- Step 3 ---

    pub fn set_field(&mut self, key: &str, raw: &str) -> Result<(), SError> {
        self.expect_step(BuildStep::Configure)?;
        self.modpack.set_field(key, raw)
    }

    pub fn toggle_include(&mut self, flag: IncludeFlag) -> Result<bool, SError> {
        self.expect_step(BuildStep::Configure)?;
        Ok(self.modpack.include.toggle(flag))
    }

    /// Review text shown before the build is confirmed.
    pub fn summary(&self) -> String {
        let pack = &self.modpack;
        let inc = pack.include;
        let mut out = String::new();
        let _ = writeln!(out, "### Metadata:");
        let _ = writeln!(out, "- name: {}", pack.name);
        let _ = writeln!(out, "- creator: {}", pack.creator);
        let _ = writeln!(out, "### Options:");
        let _ = writeln!(out, "- include settings data: {} (supports modlist)", inc.settings);
        let _ = writeln!(out, "- include saved data: {} (supports modlist)", inc.saved);
        let _ = writeln!(out, "- include config: {} (only works for modpacks)", inc.config);
        let _ = writeln!(out, "- include saves: {} (only works for modpacks)", inc.saves);
        let _ = writeln!(out, "### Selected mods:");
        for (id, sel) in &self.selected {
            let suffix = if self.is_reserved(id) {
                " (always excluded)"
            } else if sel.include_files {
                ""
            } else {
                " (only as id without files)"
            };
            let _ = writeln!(out, "- {id}{suffix}");
        }
        out
    }
}

pub struct PackageBuilder;

impl PackageBuilder {
    /// Runs the Finalize step. Progress lines go to the status channel bound
    /// by [`TaskContext`]; if that channel is gone the build is abandoned.
    #[instrument(skip_all, fields(pack = %session.modpack.name))]
    pub fn build(
        session: &mut BuildSession,
        host: &dyn ModHost,
        out_dir: &Utf8Path,
    ) -> Result<WriteReport, SError> {
        session.expect_step(BuildStep::Finalize)?;

        let stem = file_stem(&session.modpack.name);
        TaskContext::log(format!("creating \"{stem}\" pack"))?;

        let include = session.modpack.include;
        let paths = host.paths().clone();
        session.modpack.entries.clear();
        session.modpack.files_installed = None;
        session.modpack.install_progress = None;

        let mut bundles = Vec::new();
        let selected: Vec<(String, Selection)> =
            session.selected.iter().map(|(k, v)| (k.clone(), *v)).collect();

        let total = selected.len().max(1);
        for (i, (id, sel)) in selected.into_iter().enumerate() {
            TaskContext::emit(TaskStatus::Progress {
                title: id.clone(),
                percentage: (i * 100 / total) as u8,
            })?;
            if session.is_reserved(&id) {
                debug!("{id} is reserved, leaving it out");
                continue;
            }

            let installed = host.installed_mod(&id);
            let mut entry = Entry::default();
            if let Some(m) = &installed {
                if include.settings {
                    entry.settings = m.settings.as_ref().map(redact);
                }
                if include.saved {
                    entry.saved = m.saved.as_ref().map(redact);
                }
            }

            match (&installed, sel.include_files) {
                (Some(m), true) => bundles.push(BundleRequest {
                    mod_id: id.clone(),
                    package_path: m.package_path.clone(),
                    config_dir: include.config.then(|| paths.mod_config_dir(&id)),
                    save_dir: include.saves.then(|| paths.mod_save_dir(&id)),
                }),
                (None, true) => warn!("{id} is no longer installed, adding it by id only"),
                _ => {}
            }

            TaskContext::log(format!("adding {id} entry"))?;
            let dump = serde_json::to_string(&entry)?;
            TaskContext::log(format!("{id} entry: {dump}"))?;
            session.modpack.entries.insert(id, entry);
        }

        let report = PackageWriter::write(
            out_dir,
            &stem,
            &session.modpack,
            &bundles,
            &mut |line| TaskContext::log(line),
        )?;

        let path = &report.package.path;
        info!("created {path} ({} bundled)", report.bundled.len());
        TaskContext::emit(TaskStatus::Finished(path.to_string()))?;
        session.step = BuildStep::Built;
        Ok(report)
    }

    /// Runs [`PackageBuilder::build`] on the blocking pool, streaming to `channel`.
    pub async fn build_in_background<H>(
        mut session: BuildSession,
        host: H,
        out_dir: Utf8PathBuf,
        channel: StatusSender,
    ) -> Result<(BuildSession, WriteReport), SError>
    where
        H: ModHost + Send + 'static,
    {
        TaskContext::provide(channel, move || {
            Self::build(&mut session, &host, &out_dir).map(|report| (session, report))
        })
        .await?
    }
}
