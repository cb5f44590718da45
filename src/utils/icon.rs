use crate::models::package::Logo;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use camino::Utf8Path;
use std::fs;

fn mime_for(path: &Utf8Path) -> Option<&'static str> {
    match path.extension()?.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "svg" => Some("image/svg+xml"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Encodes a logo the presentation layer can draw directly.
/// URL and named logos return None: the host resolves those itself.
pub fn logo_data_uri(logo: &Logo) -> Option<String> {
    let (mime, bytes) = match logo {
        Logo::Embedded(bytes) => ("image/png", bytes.clone()),
        Logo::File(path) => (mime_for(path)?, fs::read(path).ok()?),
        Logo::Placeholder | Logo::Url(_) | Logo::Named(_) => return None,
    };
    Some(format!("data:{};base64,{}", mime, BASE64.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_logo_becomes_png_uri() {
        let uri = logo_data_uri(&Logo::Embedded(vec![1, 2, 3])).unwrap();
        assert_eq!(uri, "data:image/png;base64,AQID");
    }

    #[test]
    fn remote_logos_are_left_to_the_host() {
        assert!(logo_data_uri(&Logo::Url("https://x.y/z.png".into())).is_none());
        assert!(logo_data_uri(&Logo::Placeholder).is_none());
    }
}
