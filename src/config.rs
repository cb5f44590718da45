pub mod global;

use crate::core::installer::{InstallSettings, RetryPolicy};
use crate::core::fetcher::DEFAULT_REGISTRY;
use crate::models::paths::HostPathRules;
use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const APP_NAME: &str = "mod_packer";

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "mod-packer", APP_NAME)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub version: u8,
    /// Root of the host application's data (`mods/`, `config/`, `saves/`...).
    pub host_root: Utf8PathBuf,
    pub registry_base: String,
    /// The mod loader itself; never added to a pack.
    pub loader_id: String,
    /// This tool's own mod id; never added to a pack.
    pub tool_id: String,
    pub player_name: Option<String>,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    /// `None` keeps every parsed archive.
    pub cache_capacity: Option<usize>,
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        let host_root = project_dirs()
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.data_dir().to_path_buf()).ok())
            .or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
                    .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
            })
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        Self {
            version: 0,
            host_root,
            registry_base: DEFAULT_REGISTRY.to_string(),
            loader_id: "geode.loader".to_string(),
            tool_id: "mod_packer".to_string(),
            player_name: None,
            retry_attempts: 1,
            retry_backoff_ms: 2000,
            cache_capacity: None,
            log_level: "info".to_string(),
        }
    }
}

impl AppSettings {
    pub fn load() -> Result<AppSettings, confy::ConfyError> {
        confy::load(APP_NAME, None)
    }

    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, None, self)
    }

    pub fn host_paths(&self) -> HostPathRules {
        HostPathRules::new(&self.host_root)
    }

    /// Daily log files; falls back to `<host_root>/logs`.
    pub fn log_dir(&self) -> Utf8PathBuf {
        project_dirs()
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.data_local_dir().join("logs")).ok())
            .unwrap_or_else(|| self.host_root.join("logs"))
    }

    pub fn reserved_ids(&self) -> Vec<String> {
        vec![self.loader_id.clone(), self.tool_id.clone()]
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.max(1),
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn install_settings(&self) -> InstallSettings {
        InstallSettings {
            registry_base: self.registry_base.clone(),
            retry: self.retry_policy(),
        }
    }

    /// Creator recorded in new packs: configured name, then the OS user.
    pub fn player_name(&self) -> String {
        self.player_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "player".to_string())
    }
}
