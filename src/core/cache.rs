use crate::models::package::LoadedPackage;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use tracing::debug;

/// Loaded archives keyed by path, each stamped with the fingerprint it was
/// parsed from. A lookup only hits when the caller's fresh fingerprint matches.
#[derive(Default, Clone, Debug)]
pub struct PackCache {
    packs: IndexMap<Utf8PathBuf, (u32, LoadedPackage)>,
    capacity: Option<usize>,
    hits: u64,
    misses: u64,
}

impl PackCache {
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            capacity: capacity.filter(|c| *c > 0),
            ..Self::default()
        }
    }

    pub fn get(&mut self, path: &Utf8Path, fingerprint: u32) -> Option<&LoadedPackage> {
        match self.packs.get(path) {
            Some((stamp, pack)) if *stamp == fingerprint => {
                self.hits += 1;
                Some(pack)
            }
            Some(_) => {
                debug!("cache stale for {path}");
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Lookups answered without reparsing.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn insert(&mut self, pack: LoadedPackage) {
        let path = pack.path.clone();
        self.packs.shift_remove(&path);
        self.packs.insert(path, (pack.fingerprint, pack));

        if let Some(capacity) = self.capacity {
            while self.packs.len() > capacity {
                if let Some((evicted, _)) = self.packs.shift_remove_index(0) {
                    debug!("cache evicted {evicted}");
                }
            }
        }
    }

    pub fn evict(&mut self, path: &Utf8Path) -> bool {
        self.packs.shift_remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }
}
