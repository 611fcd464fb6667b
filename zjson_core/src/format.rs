use std::path::Path;

// ── Extensions ─────────────────────────────────────────────────────────────

pub const EXT_ZST: &str = ".zst";
pub const EXT_BZ2: &str = ".bz2";
pub const EXT_XZ: &str = ".xz";
pub const EXT_GZ: &str = ".gz";
pub const EXT_LZ4: &str = ".lz4";
pub const EXT_JSONL: &str = ".jsonl";

/// Bytes of an offending line kept in a record error.
pub const RAW_PREFIX_LEN: usize = 64;

/// The extension of `path` including its leading dot, e.g. `".zst"` for
/// `"RC_2019-04.json.zst"`.
///
/// Only the final component counts. A dotfile such as `".zst"` has no
/// extension, and neither does a name without a dot.
pub fn extension_of(path: impl AsRef<Path>) -> Option<String> {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
}

/// Canonical registry key: `"zst"` and `".zst"` both become `".zst"`.
pub fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}
