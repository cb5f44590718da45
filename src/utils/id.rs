use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Turns a pack name into a file stem: every character that is not ASCII
/// alphanumeric becomes `_`.
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "modpack".to_string()
    } else {
        stem
    }
}

/// Stable, filesystem-safe directory name for unpacking a pack.
pub fn unpack_dir_name(pack_name: &str) -> String {
    URL_SAFE_NO_PAD.encode(pack_name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_replaces_everything_but_alphanumerics() {
        assert_eq!(file_stem("Bob's modpack"), "Bob_s_modpack");
        assert_eq!(file_stem("a.b-c_d"), "a_b_c_d");
        assert_eq!(file_stem("мод"), "___");
        assert_eq!(file_stem(""), "modpack");
    }

    #[test]
    fn unpack_dir_has_no_separators() {
        let name = unpack_dir_name("../../etc/passwd?");
        assert!(!name.contains('/'));
        assert!(!name.contains('.'));
        assert_eq!(name, unpack_dir_name("../../etc/passwd?"));
    }
}
