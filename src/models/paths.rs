use camino::{Utf8Path, Utf8PathBuf};

/// Plain JSON manifest extension.
pub const MANIFEST_EXT: &str = "geode_modlist";
/// Zip archive extension.
pub const ARCHIVE_EXT: &str = "geode_modpack";
/// Extension of a single mod's package file inside the host mods directory.
pub const PACKAGE_EXT: &str = "geode";

macro_rules! define_paths {
    ($name:ident { $($field:ident : $default:expr),* $(,)? }) => {
        #[derive(Clone, Debug)]
        pub struct $name {
            $(pub $field: Utf8PathBuf,)*
        }

        impl $name {
            pub fn to_absolute(mut self, base: &Utf8Path) -> Self {
                $(self.$field = base.join(self.$field);)*
                self
            }

            pub fn new(base: &Utf8Path) -> Self {
                Self::default().to_absolute(base)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default.into(),)*
                }
            }
        }
    };
}

// Directories owned by the host application.
define_paths!(HostPathRules {
    mods: "mods",
    config: "config",
    saves: "saves",
    packs: "packs",
    temp: "temp",
});

// Fixed member names inside a `.geode_modpack` archive.
define_paths!(ArchiveLayout {
    manifest: "this.geode_modlist",
    about: "about.md",
    readme: "README.md",
    logo: "logo.png",
    pack_logo: "pack.png",
    mods: "mods",
    config: "config",
    saves: "saves",
});

impl HostPathRules {
    /// Where a mod's package file lives once installed.
    pub fn package_file(&self, mod_id: &str) -> Utf8PathBuf {
        self.mods.join(format!("{mod_id}.{PACKAGE_EXT}"))
    }

    pub fn mod_config_dir(&self, mod_id: &str) -> Utf8PathBuf {
        self.config.join(mod_id)
    }

    pub fn mod_save_dir(&self, mod_id: &str) -> Utf8PathBuf {
        self.saves.join(mod_id)
    }

    pub fn settings_file(&self, mod_id: &str) -> Utf8PathBuf {
        self.mod_save_dir(mod_id).join("settings.json")
    }

    pub fn saved_file(&self, mod_id: &str) -> Utf8PathBuf {
        self.mod_save_dir(mod_id).join("saved.json")
    }

    pub fn create_all(&self) -> std::io::Result<()> {
        for dir in [&self.mods, &self.config, &self.saves, &self.packs, &self.temp] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

impl ArchiveLayout {
    /// Zip member names always use forward slashes.
    pub fn member(&self, path: &Utf8Path) -> String {
        path.as_str().replace('\\', "/")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageKind {
    Manifest,
    Archive,
}

impl PackageKind {
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        match path.extension()? {
            MANIFEST_EXT => Some(Self::Manifest),
            ARCHIVE_EXT => Some(Self::Archive),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Manifest => MANIFEST_EXT,
            Self::Archive => ARCHIVE_EXT,
        }
    }
}
