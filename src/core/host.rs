use crate::models::error::SError;
use crate::models::paths::{HostPathRules, PACKAGE_EXT};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use std::fs;
use tracing::warn;

/// What the builder needs to know about one installed mod.
#[derive(Clone, Debug, PartialEq)]
pub struct InstalledMod {
    pub id: String,
    pub package_path: Utf8PathBuf,
    /// Saved settings; `None` when the mod has none.
    pub settings: Option<Value>,
    /// The mod's save container; `None` when empty.
    pub saved: Option<Value>,
}

/// The host application's view of its installed mods.
pub trait ModHost {
    fn paths(&self) -> &HostPathRules;

    /// Ids of every installed mod, in a stable order.
    fn installed_ids(&self) -> Vec<String>;

    fn installed_mod(&self, id: &str) -> Option<InstalledMod>;

    fn is_installed(&self, id: &str) -> bool {
        self.installed_mod(id).is_some()
    }
}

/// Host backed by plain directories: `<mods>/<id>.geode` packages and
/// `<saves>/<id>/{settings,saved}.json` data files.
#[derive(Clone, Debug)]
pub struct DirectoryHost {
    paths: HostPathRules,
}

impl DirectoryHost {
    pub fn new(root: &Utf8Path) -> Self {
        Self {
            paths: HostPathRules::new(root),
        }
    }

    pub fn from_paths(paths: HostPathRules) -> Self {
        Self { paths }
    }

    pub fn ensure_layout(&self) -> Result<(), SError> {
        self.paths.create_all().map_err(Into::into)
    }

    fn read_blob(path: &Utf8Path) -> Option<Value> {
        let raw = fs::read_to_string(path).ok()?;
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) if map.is_empty() => None,
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(e) => {
                warn!("ignoring unreadable {path}: {e}");
                None
            }
        }
    }
}

impl ModHost for DirectoryHost {
    fn paths(&self) -> &HostPathRules {
        &self.paths
    }

    fn installed_ids(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.paths.mods) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| Utf8PathBuf::from_path_buf(e.path()).ok())
            .filter(|p| p.is_file() && p.extension() == Some(PACKAGE_EXT))
            .filter_map(|p| p.file_stem().map(str::to_string))
            .collect();
        ids.sort();
        ids
    }

    fn installed_mod(&self, id: &str) -> Option<InstalledMod> {
        let package_path = self.paths.package_file(id);
        if !package_path.is_file() {
            return None;
        }
        Some(InstalledMod {
            id: id.to_string(),
            settings: Self::read_blob(&self.paths.settings_file(id)),
            saved: Self::read_blob(&self.paths.saved_file(id)),
            package_path,
        })
    }
}
