use std::path::{Component, Path};

pub const MAX_FILENAME_LENGTH: usize = 255;

const FALLBACK_FILENAME: &str = "report.xlsx";

/// Reduces a client supplied file name to a safe final path component.
///
/// Directory parts are dropped, control characters removed and anything
/// outside `[A-Za-z0-9._ -]` replaced with `_`. Non-ASCII letters are kept
/// so Polish names survive. Names that end up empty fall back to a fixed
/// placeholder.
pub fn sanitize_filename(filename: &str) -> String {
    let path = Path::new(filename);
    let last = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .last()
        .unwrap_or_default();

    let cleaned: String = last
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    truncate_preserving_extension(trimmed, MAX_FILENAME_LENGTH)
}

/// Lowercase extension without the dot, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_lowercase())
}

fn truncate_preserving_extension(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }

    let ext = file_extension(name)
        .map(|e| format!(".{}", e))
        .filter(|e| e.len() < max_chars / 2)
        .unwrap_or_default();
    let stem_len = max_chars - ext.chars().count();
    let stem: String = name.chars().take(stem_len).collect();
    format!("{}{}", stem, ext)
}
