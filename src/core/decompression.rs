use crate::models::error::SError;
use camino::Utf8Path;
use std::fs::{self, File};
use std::io;
use tracing::warn;

pub struct Decompression;

impl Decompression {
    /// Extracts every member of `archive_path` below `destination` and
    /// returns the number of files written. Existing files are overwritten.
    pub fn extract(archive_path: &Utf8Path, destination: &Utf8Path) -> Result<usize, SError> {
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut written = 0;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;

            // enclosed_name() rejects absolute paths and `..` escapes
            let Some(safe_path) = file.enclosed_name() else {
                warn!("skipping unsafe archive member {}", file.name());
                continue;
            };

            let output_path = destination.as_std_path().join(&safe_path);

            if file.is_dir() {
                fs::create_dir_all(&output_path)?;
                continue;
            }

            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&output_path)?;
            io::copy(&mut file, &mut outfile)?;
            written += 1;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = file.unix_mode() {
                    let _ = fs::set_permissions(&output_path, fs::Permissions::from_mode(mode));
                }
            }
        }

        Ok(written)
    }
}
