use crate::core::fingerprint::fingerprint_bytes;
use crate::models::error::SError;
use crate::models::package::Logo;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Resource name the host uses when a pack has no logo of its own.
pub const PLACEHOLDER_LOGO: &str = "logo-base.png";

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(https?|ftp)://[^\s/$.?#].[^\s]*$").expect("static logo regex")
});

pub fn is_link(value: &str) -> bool {
    LINK.is_match(value)
}

/// Classifies a manifest `logo` value. Relative file paths are looked up
/// next to the package first.
pub fn resolve(value: Option<&str>, search_root: Option<&Utf8Path>) -> Logo {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Logo::Placeholder;
    };

    if is_link(value) {
        return Logo::Url(value.to_string());
    }

    let direct = Utf8PathBuf::from(value);
    let candidates = search_root
        .map(|root| root.join(value))
        .into_iter()
        .chain(std::iter::once(direct));
    for candidate in candidates {
        if candidate.is_file() {
            return Logo::File(candidate);
        }
    }

    Logo::Named(value.to_string())
}

/// Where a downloaded logo for `url` is cached.
pub fn cached_logo_path(cache_dir: &Utf8Path, url: &str) -> Utf8PathBuf {
    cache_dir.join(format!("logo-{:08x}.png", fingerprint_bytes(url.as_bytes())))
}

/// Downloads a URL logo once and keeps the bytes on disk. Later calls with
/// the same URL are served from the cache directory.
pub async fn fetch_logo(
    client: &reqwest::Client,
    url: &str,
    cache_dir: &Utf8Path,
) -> Result<Utf8PathBuf, SError> {
    let target = cached_logo_path(cache_dir, url);
    if target.is_file() {
        debug!("logo cache hit for {url}");
        return Ok(target);
    }

    let response = client.get(url).send().await?;
    let status = response.status();
    if status.as_u16() >= 400 {
        warn!("logo download failed with HTTP {status} for {url}");
        return Err(SError::NetworkError(format!("HTTP {status}: {url}")));
    }

    let bytes = response.bytes().await?;
    tokio::fs::create_dir_all(cache_dir).await?;
    tokio::fs::write(&target, &bytes).await?;
    Ok(target)
}
