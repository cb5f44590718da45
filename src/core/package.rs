use crate::core::archive::{read_member, rewrite_manifest, ArchiveWriter, PendingFiles};
use crate::core::cache::PackCache;
use crate::core::fingerprint::fingerprint_file;
use crate::core::logo;
use crate::models::error::SError;
use crate::models::modpack::Modpack;
use crate::models::package::{LoadedPackage, Logo, Package};
use crate::models::paths::{ArchiveLayout, PackageKind};
use crate::utils::file::FileUtils;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

/// Loads packages from disk, keeping parsed archives around so reopening an
/// unchanged archive skips the unzip.
#[derive(Default, Debug)]
pub struct PackageReader {
    cache: PackCache,
}

impl PackageReader {
    pub fn new(cache_capacity: Option<usize>) -> Self {
        Self {
            cache: PackCache::with_capacity(cache_capacity),
        }
    }

    pub fn cache(&self) -> &PackCache {
        &self.cache
    }

    pub fn forget(&mut self, path: &Utf8Path) -> bool {
        let key = path.canonicalize_utf8().unwrap_or_else(|_| path.to_owned());
        self.cache.evict(&key)
    }

    #[instrument(skip(self))]
    pub fn load(&mut self, path: &Utf8Path) -> Result<LoadedPackage, SError> {
        let path = path
            .canonicalize_utf8()
            .map_err(|e| SError::PackageNotFound(format!("{path}: {e}")))?;
        let fingerprint =
            fingerprint_file(&path).map_err(|e| SError::PackageNotFound(format!("{path}: {e}")))?;

        match PackageKind::from_path(&path).unwrap_or(PackageKind::Manifest) {
            PackageKind::Manifest => load_manifest(&path, fingerprint),
            PackageKind::Archive => {
                if let Some(hit) = self.cache.get(&path, fingerprint).cloned() {
                    debug!("reusing parsed archive {path}");
                    return Ok(hit);
                }
                let pack = load_archive(&path, fingerprint)?;
                self.cache.insert(pack.clone());
                Ok(pack)
            }
        }
    }
}

fn finish_load(
    path: Utf8PathBuf,
    kind: PackageKind,
    modpack: Modpack,
    about: Option<String>,
    embedded_logo: Option<Vec<u8>>,
    fingerprint: u32,
) -> LoadedPackage {
    let about = about
        .or_else(|| modpack.about.clone())
        .unwrap_or_else(|| modpack.default_about());
    let logo = match embedded_logo {
        Some(bytes) => Logo::Embedded(bytes),
        None => logo::resolve(modpack.logo.as_deref(), path.parent()),
    };
    LoadedPackage {
        path,
        kind,
        modpack,
        about,
        logo,
        fingerprint,
    }
}

fn load_manifest(path: &Utf8Path, fingerprint: u32) -> Result<LoadedPackage, SError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| SError::PackageNotFound(format!("{path}: {e}")))?;
    let modpack = Modpack::from_json(&raw)
        .map_err(|e| SError::PackageNotFound(format!("{path}: {e}")))?;
    info!("loaded manifest {path} ({} entries)", modpack.entries.len());
    Ok(finish_load(
        path.to_owned(),
        PackageKind::Manifest,
        modpack,
        None,
        None,
        fingerprint,
    ))
}

fn load_archive(path: &Utf8Path, fingerprint: u32) -> Result<LoadedPackage, SError> {
    let layout = ArchiveLayout::default();
    let file = File::open(path).map_err(|e| SError::PackageNotFound(format!("{path}: {e}")))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| SError::PackageNotFound(format!("{path}: {e}")))?;

    let manifest_name = layout.member(&layout.manifest);
    let raw = read_member(&mut archive, &manifest_name)?
        .ok_or_else(|| SError::ManifestMissing(format!("{path} has no {manifest_name}")))?;
    let modpack = Modpack::from_json(&String::from_utf8_lossy(&raw))?;

    // Later names win: README.md over about.md, pack.png over logo.png.
    let mut about = None;
    for (member, required_warning) in [(&layout.about, true), (&layout.readme, false)] {
        let name = layout.member(member);
        match read_member(&mut archive, &name) {
            Ok(Some(bytes)) => about = Some(String::from_utf8_lossy(&bytes).into_owned()),
            Ok(None) if required_warning && about.is_none() => {
                warn!("{path}: no {name}, using defaults")
            }
            Ok(None) => debug!("{path}: no {name}"),
            Err(e) => warn!("{path}: failed to read {name}: {e}"),
        }
    }

    let mut logo_bytes = None;
    for (member, required_warning) in [(&layout.logo, true), (&layout.pack_logo, false)] {
        let name = layout.member(member);
        match read_member(&mut archive, &name) {
            Ok(Some(bytes)) => logo_bytes = Some(bytes),
            Ok(None) if required_warning => warn!("{path}: no {name}, using defaults"),
            Ok(None) => debug!("{path}: no {name}"),
            Err(e) => warn!("{path}: failed to read {name}: {e}"),
        }
    }

    info!("loaded archive {path} ({} entries)", modpack.entries.len());
    Ok(finish_load(
        path.to_owned(),
        PackageKind::Archive,
        modpack,
        about,
        logo_bytes,
        fingerprint,
    ))
}

/// Writes the in-memory manifest back into the package it came from and
/// refreshes the recorded fingerprint.
pub fn persist(pack: &mut LoadedPackage) -> Result<(), SError> {
    match pack.kind {
        PackageKind::Manifest => {
            FileUtils::write_atomic(&pack.path, pack.modpack.to_json()?.as_bytes())?
        }
        PackageKind::Archive => rewrite_manifest(&pack.path, &pack.modpack)?,
    }
    pack.fingerprint = fingerprint_file(&pack.path)?;
    debug!("persisted {} ({:08x})", pack.path, pack.fingerprint);
    Ok(())
}

/// One selected entry whose files should travel inside the archive.
#[derive(Clone, Debug, PartialEq)]
pub struct BundleRequest {
    pub mod_id: String,
    pub package_path: Utf8PathBuf,
    /// `<host config>/<mod_id>` when config bundling is on.
    pub config_dir: Option<Utf8PathBuf>,
    /// `<host saves>/<mod_id>` when save bundling is on.
    pub save_dir: Option<Utf8PathBuf>,
}

#[derive(Debug)]
pub struct WriteReport {
    pub package: Package,
    /// Ids whose package file made it into `mods/`.
    pub bundled: Vec<String>,
    /// Per-entry bundling failures; those entries stay as id references.
    pub skipped: Vec<(String, SError)>,
}

struct PreparedBundle {
    member: String,
    package: File,
    trees: PendingFiles,
}

pub struct PackageWriter;

impl PackageWriter {
    pub fn target_path(out_dir: &Utf8Path, stem: &str, kind: PackageKind) -> Utf8PathBuf {
        out_dir.join(format!("{stem}.{}", kind.extension()))
    }

    /// Writes `pack` as `<out_dir>/<stem>.geode_modpack` when at least one
    /// bundle lands in the archive, and as `<stem>.geode_modlist` otherwise.
    ///
    /// `progress` receives one line per step; if it fails the write stops
    /// and any partial archive is removed.
    pub fn write(
        out_dir: &Utf8Path,
        stem: &str,
        pack: &Modpack,
        bundles: &[BundleRequest],
        progress: &mut dyn FnMut(String) -> Result<(), SError>,
    ) -> Result<WriteReport, SError> {
        std::fs::create_dir_all(out_dir)?;
        let archive_path = Self::target_path(out_dir, stem, PackageKind::Archive);
        let manifest_path = Self::target_path(out_dir, stem, PackageKind::Manifest);

        let mut bundled = Vec::new();
        let mut skipped = Vec::new();

        if !bundles.is_empty() {
            let mut archive = ArchiveWriter::create(&archive_path)?;
            let layout = ArchiveLayout::default();

            for bundle in bundles {
                let prepared = match Self::prepare(&archive, &layout, bundle, progress) {
                    Ok(prepared) => prepared,
                    Err(e @ (SError::UpdateStatusError(_) | SError::ContextUnprovided)) => {
                        archive.discard()?;
                        return Err(e);
                    }
                    Err(e) => {
                        warn!("skipping files of {}: {e}", bundle.mod_id);
                        let line = format!("failed to add files of {}: {e}", bundle.mod_id);
                        skipped.push((bundle.mod_id.clone(), e));
                        if let Err(e) = progress(line) {
                            archive.discard()?;
                            return Err(e);
                        }
                        continue;
                    }
                };
                // A failed write means the archive itself is unusable.
                if let Err(e) = Self::commit(&mut archive, prepared, progress) {
                    archive.discard()?;
                    return Err(e);
                }
                bundled.push(bundle.mod_id.clone());
            }

            if !bundled.is_empty() {
                let listed = progress("creating list...".to_string())
                    .and_then(|_| archive.add_manifest(pack));
                if let Err(e) = listed {
                    archive.discard()?;
                    return Err(e);
                }
                let path = archive.finish()?;
                return Ok(WriteReport {
                    package: Package {
                        path,
                        kind: PackageKind::Archive,
                    },
                    bundled,
                    skipped,
                });
            }

            info!("nothing bundled, dropping {archive_path}");
            archive.discard()?;
        }

        progress("creating list...".to_string())?;
        FileUtils::write_atomic(&manifest_path, pack.to_json()?.as_bytes())?;
        // The manifest now stands for this stem; an older archive would shadow it.
        if FileUtils::remove_any(&archive_path)? {
            info!("removed stale {archive_path}");
        }
        Ok(WriteReport {
            package: Package {
                path: manifest_path,
                kind: PackageKind::Manifest,
            },
            bundled,
            skipped,
        })
    }

    /// Opens one entry's package and mirrored trees without writing
    /// anything, so a failure here leaves no trace of the entry.
    fn prepare(
        archive: &ArchiveWriter,
        layout: &ArchiveLayout,
        bundle: &BundleRequest,
        progress: &mut dyn FnMut(String) -> Result<(), SError>,
    ) -> Result<PreparedBundle, SError> {
        progress(format!("adding files of {}", bundle.mod_id))?;
        let member = archive.package_member(&bundle.package_path)?;
        let package = File::open(&bundle.package_path)?;

        let mut trees = Vec::new();
        for (top, dir) in [
            (&layout.config, &bundle.config_dir),
            (&layout.saves, &bundle.save_dir),
        ] {
            let Some(dir) = dir else { continue };
            progress(format!("adding files from {dir}"))?;
            let files = archive.collect_tree(top, dir, &bundle.mod_id)?;
            debug!("{} files from {dir}", files.len());
            trees.extend(files);
        }

        Ok(PreparedBundle {
            member,
            package,
            trees,
        })
    }

    fn commit(
        archive: &mut ArchiveWriter,
        mut prepared: PreparedBundle,
        progress: &mut dyn FnMut(String) -> Result<(), SError>,
    ) -> Result<(), SError> {
        archive.add_reader(&prepared.member, &mut prepared.package)?;
        progress(format!("package added, {}", prepared.member))?;
        archive.add_pending(prepared.trees)?;
        Ok(())
    }
}
