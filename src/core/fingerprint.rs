use blake3::Hash;
use camino::Utf8Path;
use std::fs::File;

/// Blake3 truncated to its first 4 bytes. Used as a freshness signal only.
fn truncate(hash: Hash) -> u32 {
    let bytes = hash.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

pub fn fingerprint_bytes(bytes: &[u8]) -> u32 {
    truncate(blake3::hash(bytes))
}

/// Streams the file through the hasher without loading it whole.
pub fn fingerprint_file(path: &Utf8Path) -> std::io::Result<u32> {
    let mut hasher = blake3::Hasher::new();
    hasher.update_reader(File::open(path)?)?;
    Ok(truncate(hasher.finalize()))
}
