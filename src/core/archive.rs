use crate::models::error::SError;
use crate::models::modpack::Modpack;
use crate::models::paths::ArchiveLayout;
use crate::utils::file::{FileUtils, PREALLOC_LIMIT};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io::{self, Read, Seek};
use tracing::debug;
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Streams members into a new `.geode_modpack`. Everything goes to a hidden
/// sibling file; the target path is only touched by [`ArchiveWriter::finish`].
pub struct ArchiveWriter {
    path: Utf8PathBuf,
    tmp: Utf8PathBuf,
    zip: ZipWriter<File>,
    layout: ArchiveLayout,
    members: usize,
}

/// Files of one mirrored tree, opened and named but not yet written.
pub type PendingFiles = Vec<(File, String)>;

impl ArchiveWriter {
    pub fn create(path: &Utf8Path) -> Result<Self, SError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = FileUtils::sibling_tmp(path);
        Ok(Self {
            path: path.to_owned(),
            zip: ZipWriter::new(File::create(&tmp)?),
            tmp,
            layout: ArchiveLayout::default(),
            members: 0,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn members(&self) -> usize {
        self.members
    }

    fn options() -> SimpleFileOptions {
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated)
    }

    pub fn add_bytes(&mut self, member: &str, bytes: &[u8]) -> Result<(), SError> {
        self.zip.start_file(member, Self::options())?;
        io::Write::write_all(&mut self.zip, bytes)?;
        self.members += 1;
        Ok(())
    }

    pub fn add_reader(&mut self, member: &str, input: &mut impl Read) -> Result<(), SError> {
        self.zip.start_file(member, Self::options())?;
        io::copy(input, &mut self.zip)?;
        self.members += 1;
        Ok(())
    }

    /// Name a mod package gets under `mods/`.
    pub fn package_member(&self, package: &Utf8Path) -> Result<String, SError> {
        let name = package
            .file_name()
            .ok_or_else(|| SError::ParseError(format!("Unable to get file name for {package}")))?;
        Ok(self.layout.member(&self.layout.mods.join(name)))
    }

    /// Walks every file below `dir` (the host's `<root>/<mod_id>` folder) and
    /// opens it as `<top>/<mod_id>/...`. Nothing is written, so a broken tree
    /// leaves the archive untouched. A missing directory yields nothing.
    pub fn collect_tree(
        &self,
        top: &Utf8Path,
        dir: &Utf8Path,
        mod_id: &str,
    ) -> Result<PendingFiles, SError> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        WalkDir::new(dir)
            .into_iter()
            .filter(|e| e.as_ref().map_or(true, |e| e.file_type().is_file()))
            .map(|e| -> Result<(File, String), SError> {
                let path = Utf8PathBuf::try_from(e?.into_path())?;
                let rel = path.strip_prefix(dir)?;
                let member = self.layout.member(&top.join(mod_id).join(rel));
                debug!("queued {path} as {member}");
                Ok((File::open(&path)?, member))
            })
            .collect()
    }

    pub fn add_pending(&mut self, files: PendingFiles) -> Result<usize, SError> {
        let count = files.len();
        for (mut file, member) in files {
            self.add_reader(&member, &mut file)?;
        }
        Ok(count)
    }

    pub fn add_manifest(&mut self, pack: &Modpack) -> Result<(), SError> {
        let member = self.layout.member(&self.layout.manifest);
        self.add_bytes(&member, pack.to_json()?.as_bytes())
    }

    /// Completes the zip and moves it over the target path.
    pub fn finish(self) -> Result<Utf8PathBuf, SError> {
        let result = self
            .zip
            .finish()
            .map_err(SError::from)
            .and_then(|_| fs::rename(&self.tmp, &self.path).map_err(SError::from));
        if result.is_err() {
            let _ = fs::remove_file(&self.tmp);
        }
        result.map(|_| self.path)
    }

    /// Drops the half-written archive. Whatever was at the target path stays.
    pub fn discard(self) -> Result<(), SError> {
        drop(self.zip);
        FileUtils::remove_any(&self.tmp).map(|_| ())
    }
}

/// Reads a member fully; `None` when it is not in the archive.
pub fn read_member<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, SError> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut buf = Vec::with_capacity(file.size().min(PREALLOC_LIMIT) as usize);
            file.read_to_end(&mut buf)?;
            Ok(Some(buf))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Replaces the manifest member of an existing archive, copying every other
/// member raw. Written to a sibling file first and renamed over the original.
pub fn rewrite_manifest(path: &Utf8Path, pack: &Modpack) -> Result<(), SError> {
    let layout = ArchiveLayout::default();
    let manifest = layout.member(&layout.manifest);
    let tmp = FileUtils::sibling_tmp(path);

    let result = (|| -> Result<(), SError> {
        let mut source = ZipArchive::new(File::open(path)?)?;
        let mut out = ZipWriter::new(File::create(&tmp)?);
        for i in 0..source.len() {
            let member = source.by_index_raw(i)?;
            if member.name() == manifest {
                continue;
            }
            out.raw_copy_file(member)?;
        }
        out.start_file(manifest.as_str(), ArchiveWriter::options())?;
        io::Write::write_all(&mut out, pack.to_json()?.as_bytes())?;
        out.finish()?;
        Ok(())
    })();

    match result {
        Ok(()) => fs::rename(&tmp, path).map_err(Into::into),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}
