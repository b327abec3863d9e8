//! Checksum-file parsing (`SHA256SUMS`, `*.sha512`, BSD `CHECKSUM` files).
//!
//! Two line grammars are recognized and may be mixed within one file:
//!
//! - standard (coreutils): `<hex>  <filename>` or `<hex> *<filename>`
//! - bracketed (BSD): `<ALGO> (<filename>) = <hex>`
//!
//! A line whose first token is all hex digits is treated as standard, anything
//! else as bracketed. No algorithm name is made only of hex digits, so the two
//! never compete for the same line.

use super::ChecksumError;

const COMMENT_MARKER: char = '#';

/// One parsed checksum line.
#[derive(Debug, PartialEq, Eq)]
struct Entry<'a> {
    hex: &'a str,
    filename: &'a str,
}

/// Finds the checksum for `filename` in `text` and returns it lowercased.
///
/// Filenames are compared exactly (no path normalization), so the caller must
/// pass the name the publisher used, normally the last segment of the source
/// URL. The first matching line wins.
pub fn find_checksum(text: &str, filename: &str) -> Result<String, ChecksumError> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
        .filter_map(parse_line)
        .find(|entry| entry.filename == filename)
        .map(|entry| entry.hex.to_ascii_lowercase())
        .ok_or_else(|| ChecksumError::NotFound {
            file: filename.to_string(),
        })
}

fn parse_line(line: &str) -> Option<Entry<'_>> {
    let first = line.split_whitespace().next()?;
    if is_hex(first) {
        parse_standard(line, first)
    } else {
        parse_bsd(line)
    }
}

/// `<hex>  <filename>` / `<hex> *<filename>`; the filename is the rest of the
/// line and may contain spaces.
fn parse_standard<'a>(line: &'a str, hex: &'a str) -> Option<Entry<'a>> {
    let rest = line[hex.len()..].trim_start();
    let filename = rest.strip_prefix('*').unwrap_or(rest);
    if filename.is_empty() {
        return None;
    }
    Some(Entry { hex, filename })
}

/// `<ALGO> (<filename>) = <hex>` with free whitespace around `=` and inside
/// the parentheses.
fn parse_bsd(line: &str) -> Option<Entry<'_>> {
    let (left, right) = line.rsplit_once('=')?;
    let hex = right.trim();
    if !is_hex(hex) {
        return None;
    }
    let left = left.trim_end();
    let inner_end = left.strip_suffix(')')?;
    let (algo, filename) = inner_end.split_once('(')?;
    let algo = algo.trim();
    if algo.is_empty() || algo.contains(char::is_whitespace) {
        return None;
    }
    let filename = filename.trim();
    if filename.is_empty() {
        return None;
    }
    Some(Entry { hex, filename })
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA_A: &str = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";
    const SHA_B: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn standard_grammar_with_noise() {
        let text = format!(
            "# SHA256 checksums for release 12.5\n\
             \n\
             {SHA_B}  debian-12.5.0-arm64-netinst.iso\n\
             \n\
             # the one we want\n\
             {SHA_A}  debian-12.5.0-amd64-netinst.iso\n\
             {SHA_B}  debian-12.5.0-i386-netinst.iso\n"
        );
        assert_eq!(
            find_checksum(&text, "debian-12.5.0-amd64-netinst.iso").unwrap(),
            SHA_A
        );
    }

    #[test]
    fn standard_binary_marker_is_stripped() {
        let text = format!("{SHA_A} *image.qcow2\n");
        assert_eq!(find_checksum(&text, "image.qcow2").unwrap(), SHA_A);
        assert!(find_checksum(&text, "*image.qcow2").is_err());
    }

    #[test]
    fn standard_filename_may_contain_spaces() {
        let text = format!("{SHA_A}  My Disk Image.img\n");
        assert_eq!(find_checksum(&text, "My Disk Image.img").unwrap(), SHA_A);
    }

    #[test]
    fn bsd_grammar_with_noise() {
        let text = format!(
            "# generated by sha256 -r\n\
             SHA256 (other.img) = {SHA_B}\n\
             \n\
             SHA256 (Fedora-Server-40.iso) = {SHA_A}\n"
        );
        assert_eq!(find_checksum(&text, "Fedora-Server-40.iso").unwrap(), SHA_A);
    }

    #[test]
    fn bsd_grammar_tolerates_extra_whitespace() {
        let text = format!("SHA256 (  spaced.iso  )   =   {SHA_A}  \n");
        assert_eq!(find_checksum(&text, "spaced.iso").unwrap(), SHA_A);
        let tight = format!("MD5(tight.iso)={}\n", &SHA_A[..32]);
        assert_eq!(find_checksum(&tight, "tight.iso").unwrap(), &SHA_A[..32]);
    }

    #[test]
    fn mixed_grammars_and_first_match_wins() {
        let text = format!(
            "SHA256 (a.iso) = {SHA_A}\n\
             # comment between\n\
             {SHA_B}  b.iso\n\
             {SHA_B}  a.iso\n"
        );
        assert_eq!(find_checksum(&text, "a.iso").unwrap(), SHA_A);
        assert_eq!(find_checksum(&text, "b.iso").unwrap(), SHA_B);
    }

    #[test]
    fn uppercase_hash_is_lowercased() {
        let upper = SHA_A.to_ascii_uppercase();
        let std_text = format!("{upper}  x.iso\n");
        assert_eq!(find_checksum(&std_text, "x.iso").unwrap(), SHA_A);
        let bsd_text = format!("SHA256 (x.iso) = {upper}\n");
        assert_eq!(find_checksum(&bsd_text, "x.iso").unwrap(), SHA_A);
    }

    #[test]
    fn missing_filename_is_an_error() {
        let text = format!("{SHA_A}  present.iso\n");
        let err = find_checksum(&text, "absent.iso").unwrap_err();
        assert_eq!(err.to_string(), "checksum not found for file: absent.iso");
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            find_checksum("", "x.iso"),
            Err(ChecksumError::NotFound { .. })
        ));
        assert!(find_checksum("\n# only a comment\n\n", "x.iso").is_err());
    }

    #[test]
    fn no_path_normalization() {
        let text = format!("{SHA_A}  ./images/x.iso\n");
        assert!(find_checksum(&text, "x.iso").is_err());
        assert_eq!(find_checksum(&text, "./images/x.iso").unwrap(), SHA_A);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let text = format!(
            "not a checksum line\n\
             SHA256 (broken.iso = {SHA_B}\n\
             SHA256 (x.iso) = not-hex\n\
             {SHA_A}  x.iso\n"
        );
        assert_eq!(find_checksum(&text, "x.iso").unwrap(), SHA_A);
    }

    #[test]
    fn crlf_line_endings() {
        let text = format!("{SHA_B}  a.iso\r\nSHA256 (b.iso) = {SHA_A}\r\n");
        assert_eq!(find_checksum(&text, "b.iso").unwrap(), SHA_A);
        assert_eq!(find_checksum(&text, "a.iso").unwrap(), SHA_B);
    }
}
