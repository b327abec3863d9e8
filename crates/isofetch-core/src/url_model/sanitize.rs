//! Filename sanitization for the publish directory.

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Makes a candidate name safe to place in a served directory.
///
/// - NUL, `/`, `\`, control characters and whitespace become `_`
/// - runs of `_` collapse to one
/// - leading/trailing dots, spaces and underscores are trimmed (no hidden
///   files, no `..`)
/// - truncated to 255 bytes on a char boundary
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_and_controls() {
        assert_eq!(sanitize_filename("a/b\\c.iso"), "a_b_c.iso");
        assert_eq!(sanitize_filename("disk\0image\t.img"), "disk_image_.img");
    }

    #[test]
    fn hidden_and_traversal_names_are_trimmed() {
        assert_eq!(sanitize_filename(".hidden.iso"), "hidden.iso");
        assert_eq!(sanitize_filename(".."), "");
        assert_eq!(sanitize_filename("  ..  raw.img  ..  "), "raw.img");
    }

    #[test]
    fn collapses_underscores() {
        assert_eq!(sanitize_filename("ubuntu___24.04.iso"), "ubuntu_24.04.iso");
    }

    #[test]
    fn truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize_filename(&long);
        assert!(out.len() <= NAME_MAX);
        assert!(out.chars().all(|c| c == 'é'));
    }
}
