#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use mod_packer_lib::core::fetcher::{FetchResponse, PackageFetcher};
use mod_packer_lib::models::error::SError;
use mod_packer_lib::models::paths::HostPathRules;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A temp dir with a host layout under `<tmp>/host` and an output dir under `<tmp>/out`.
pub fn setup_test_env() -> (TempDir, HostPathRules, Utf8PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(tmp.path().canonicalize().unwrap()).unwrap();

    let paths = HostPathRules::new(&root.join("host"));
    paths.create_all().unwrap();
    let out = root.join("out");
    fs::create_dir_all(&out).unwrap();

    (tmp, paths, out)
}

/// Installs a fake mod: `<mods>/<id>.geode` plus optional data files.
pub fn create_test_mod(
    paths: &HostPathRules,
    id: &str,
    settings: Option<&Value>,
    saved: Option<&Value>,
) {
    fs::write(paths.package_file(id), format!("package of {id}")).unwrap();
    if let Some(settings) = settings {
        write_json(&paths.settings_file(id), settings);
    }
    if let Some(saved) = saved {
        write_json(&paths.saved_file(id), saved);
    }
}

pub fn write_json(path: &Utf8Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_vec(value).unwrap()).unwrap();
}

pub fn write_file(path: &Utf8Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Writes a zip with the given `(member, bytes)` pairs.
pub fn create_test_archive(path: &Utf8Path, members: &[(&str, &str)]) {
    let mut zip = ZipWriter::new(fs::File::create(path).unwrap());
    for (name, contents) in members {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

pub fn archive_members(path: &Utf8Path) -> Vec<String> {
    let zip = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    names
}

/// Answers requests from a script, in order. Once the script is empty every
/// request gets a 404.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    script: Arc<Mutex<VecDeque<Result<FetchResponse, SError>>>>,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<FetchResponse, SError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            requests: Arc::default(),
        }
    }

    pub fn ok(body: &str) -> Result<FetchResponse, SError> {
        Ok(FetchResponse {
            status: 200,
            body: body.as_bytes().to_vec(),
        })
    }

    pub fn status(status: u16) -> Result<FetchResponse, SError> {
        Ok(FetchResponse {
            status,
            body: Vec::new(),
        })
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl PackageFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        url: &str,
        on_progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<FetchResponse, SError> {
        self.requests.lock().push(url.to_string());
        let next = self.script.lock().pop_front();
        on_progress(1.0);
        next.unwrap_or_else(|| Self::status(404))
    }
}
