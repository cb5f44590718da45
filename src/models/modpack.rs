use crate::models::error::SError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Entries = IndexMap<String, Entry>;

/// Per-mod record. Presence of `settings`/`saved` means the mod needs that
/// data restored on install.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Entry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved: Option<Value>,
}

impl Entry {
    pub fn has_data(&self) -> bool {
        self.settings.is_some() || self.saved.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncludeFlag {
    Settings,
    Saved,
    Config,
    Saves,
}

/// What the builder captures. Session state only, never serialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IncludeFlags {
    pub settings: bool,
    pub saved: bool,
    pub config: bool,
    pub saves: bool,
}

impl Default for IncludeFlags {
    fn default() -> Self {
        Self {
            settings: true,
            saved: false,
            config: true,
            saves: false,
        }
    }
}

impl IncludeFlags {
    pub fn get(&self, flag: IncludeFlag) -> bool {
        match flag {
            IncludeFlag::Settings => self.settings,
            IncludeFlag::Saved => self.saved,
            IncludeFlag::Config => self.config,
            IncludeFlag::Saves => self.saves,
        }
    }

    pub fn toggle(&mut self, flag: IncludeFlag) -> bool {
        let slot = match flag {
            IncludeFlag::Settings => &mut self.settings,
            IncludeFlag::Saved => &mut self.saved,
            IncludeFlag::Config => &mut self.config,
            IncludeFlag::Saves => &mut self.saves,
        };
        *slot = !*slot;
        *slot
    }
}

/// The manifest document shared by `.geode_modlist` files and the
/// `this.geode_modlist` member of archives.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Modpack {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default)]
    pub entries: Entries,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_installed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_progress: Option<Entries>,
    /// Keys added by hand through the field editor.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub include: IncludeFlags,
}

impl Modpack {
    pub fn new(player_name: &str) -> Self {
        Self {
            name: format!("{player_name}'s modpack"),
            creator: player_name.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, SError> {
        let mut pack: Modpack = serde_json::from_str(raw)?;
        pack.infer_include_flags();
        Ok(pack)
    }

    pub fn to_json(&self) -> Result<String, SError> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    /// Packs that already carry settings or saved data keep capturing them.
    pub fn infer_include_flags(&mut self) {
        if self.entries.values().any(|e| e.settings.is_some()) {
            self.include.settings = true;
        }
        if self.entries.values().any(|e| e.saved.is_some()) {
            self.include.saved = true;
        }
    }

    pub fn default_about(&self) -> String {
        format!(
            "\n# {}\nCreated by {}\n\nNo description provided...",
            self.name, self.creator
        )
    }

    fn field(&self, key: &str) -> Option<Value> {
        match key {
            "name" => Some(Value::String(self.name.clone())),
            "creator" => Some(Value::String(self.creator.clone())),
            "logo" => self.logo.clone().map(Value::String),
            "about" => self.about.clone().map(Value::String),
            "entries" => serde_json::to_value(&self.entries).ok(),
            "files_installed" => self.files_installed.map(Value::Bool),
            "install_progress" => self
                .install_progress
                .as_ref()
                .and_then(|p| serde_json::to_value(p).ok()),
            other => self.extra.get(other).cloned(),
        }
    }

    /// String view of a top-level key; empty when absent or not a string.
    pub fn as_str(&self, key: &str) -> String {
        match self.field(key) {
            Some(Value::String(s)) => s,
            _ => String::new(),
        }
    }

    /// JSON view of a top-level key; an empty object when absent.
    pub fn as_json(&self, key: &str) -> Value {
        self.field(key).unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Applies a hand-typed JSON value. On any error the previous value is kept.
    pub fn set_field(&mut self, key: &str, raw: &str) -> Result<(), SError> {
        let invalid = |msg: String| SError::InvalidField(key.to_string(), msg);
        let value: Value = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;

        match key {
            "name" | "creator" => {
                let Value::String(s) = value else {
                    return Err(invalid("expected a string".into()));
                };
                if key == "name" {
                    self.name = s;
                } else {
                    self.creator = s;
                }
            }
            "logo" | "about" => {
                let parsed = match value {
                    Value::String(s) => Some(s),
                    Value::Null => None,
                    _ => return Err(invalid("expected a string or null".into())),
                };
                if key == "logo" {
                    self.logo = parsed;
                } else {
                    self.about = parsed;
                }
            }
            "entries" => {
                self.entries = serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
            }
            "install_progress" => {
                self.install_progress =
                    serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
            }
            "files_installed" => {
                self.files_installed =
                    serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
            }
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
        Ok(())
    }

    pub fn remove_field(&mut self, key: &str) -> Option<Value> {
        self.extra.shift_remove(key)
    }

    /// First entry still waiting in the install queue.
    pub fn next_pending(&self) -> Option<(&String, &Entry)> {
        self.install_progress.as_ref().and_then(|p| p.first())
    }
}
