//! Helpers for turning display names into file stems and for keeping full
//! paths out of log fields.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Used for log fields so full paths stay out of the logs.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Turns a user-supplied document name into a file stem that stays inside
/// the catalog directory.
///
/// Separators and characters that common filesystems reject become `-`.
/// A trailing `.pdf` is dropped and leading dots and surrounding whitespace
/// are trimmed. Returns `None` when nothing usable remains.
pub fn sanitize_file_stem(name: &str) -> Option<String> {
    let trimmed = name.trim();
    let without_ext = match trimmed.len().checked_sub(4) {
        Some(cut)
            if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(".pdf") =>
        {
            &trimmed[..cut]
        }
        _ => trimmed,
    };

    let replaced: String = without_ext
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();

    let stem = replaced.trim().trim_start_matches('.').trim();
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}
