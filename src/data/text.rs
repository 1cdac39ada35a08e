//! Display helpers for string characteristics.

/// Width used when printing manufacturer and model strings.
pub const DISPLAY_WIDTH: usize = 26;

/// Trim trailing NULs and cut `value` to at most `width` characters.
pub fn truncate_for_display(value: &str, width: usize) -> &str {
    let value = value.trim_end_matches('\0');
    match value.char_indices().nth(width) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}
