use crate::models::error::SError;
use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

/// Upper bound on buffers sized from a length someone else declared
/// (HTTP `Content-Length`, zip headers).
pub const PREALLOC_LIMIT: u64 = 8 << 20;

pub struct FileUtils;

impl FileUtils {
    /// Recursively copies a directory tree from source to destination.
    /// Creates all necessary directories and overwrites existing files,
    /// so running it twice leaves the same state as running it once.
    pub fn copy_recursive(src: &Utf8Path, dst: &Utf8Path) -> Result<usize, SError> {
        std::fs::create_dir_all(dst)?;
        let mut copied = 0;

        for entry in WalkDir::new(src) {
            let entry = entry?;
            let src_path = Utf8Path::from_path(entry.path()).ok_or_else(|| {
                SError::ParseError(format!("Invalid UTF-8 path: {:?}", entry.path()))
            })?;

            let dst_path = dst.join(src_path.strip_prefix(src)?);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dst_path)?;
            } else {
                if let Some(parent) = dst_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(src_path, &dst_path)?;
                copied += 1;
            }
        }

        Ok(copied)
    }

    /// Writes `contents` to `path`, creating parent directories on the way.
    pub fn write_creating_dirs(path: &Utf8Path, contents: &[u8]) -> Result<(), SError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents).map_err(Into::into)
    }

    /// Hidden, unique sibling of `path` for write-then-rename.
    pub fn sibling_tmp(path: &Utf8Path) -> Utf8PathBuf {
        let name = path.file_name().unwrap_or("file");
        path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4()))
    }

    /// Replaces `path` only once `contents` are fully on disk.
    pub fn write_atomic(path: &Utf8Path, contents: &[u8]) -> Result<(), SError> {
        let tmp = Self::sibling_tmp(path);
        let result = std::fs::write(&tmp, contents).and_then(|_| std::fs::rename(&tmp, path));
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        result.map_err(Into::into)
    }

    /// Removes a file or directory; a missing target is not an error.
    pub fn remove_any(path: &Utf8Path) -> Result<bool, SError> {
        let result = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
