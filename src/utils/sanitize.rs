//! Filename sanitization for artwork files

/// Longest name part kept, in bytes. Leaves room for the other part, the
/// separator and the extension under common 255-byte limits.
const MAX_PART_BYTES: usize = 120;

/// Used when a name is empty after cleaning
const PLACEHOLDER: &str = "Unknown";

/// Lookalike for characters that are unsafe in filenames on some platform
fn replacement(c: char) -> Option<char> {
    Some(match c {
        '/' => '⧸',
        '\\' => '⧹',
        ':' => '꞉',
        '*' => '⁎',
        '?' => '？',
        '"' => '″',
        '<' => '‹',
        '>' => '›',
        '|' => '｜',
        c if c.is_control() => '_',
        _ => return None,
    })
}

/// Make an artist or album name usable as part of a filename
///
/// Unsafe characters become visually similar Unicode characters, so
/// "AC/DC" stays readable as "AC⧸DC". Leading dots are dropped to avoid
/// hidden files and overlong names are cut on a character boundary.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| replacement(c).unwrap_or(c))
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim_start();

    if cleaned.is_empty() {
        return PLACEHOLDER.to_string();
    }

    let mut end = cleaned.len().min(MAX_PART_BYTES);
    while !cleaned.is_char_boundary(end) {
        end -= 1;
    }
    cleaned[..end].trim_end().to_string()
}
