use crate::models::modpack::Modpack;
use crate::models::paths::PackageKind;
use camino::{Utf8Path, Utf8PathBuf};

/// A logo reference after resolution.
#[derive(Clone, Debug, PartialEq)]
pub enum Logo {
    /// Nothing set; the host shows its base logo.
    Placeholder,
    Url(String),
    File(Utf8PathBuf),
    /// A resource the host already knows by name.
    Named(String),
    /// PNG bytes read from `logo.png`/`pack.png` inside an archive.
    Embedded(Vec<u8>),
}

/// The on-disk artifact produced by the builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Package {
    pub path: Utf8PathBuf,
    pub kind: PackageKind,
}

/// A package read from disk together with everything resolved at load time.
#[derive(Clone, Debug)]
pub struct LoadedPackage {
    pub path: Utf8PathBuf,
    pub kind: PackageKind,
    pub modpack: Modpack,
    pub about: String,
    pub logo: Logo,
    pub fingerprint: u32,
}

impl LoadedPackage {
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or_default()
    }

    pub fn package(&self) -> Package {
        Package {
            path: self.path.clone(),
            kind: self.kind,
        }
    }
}
