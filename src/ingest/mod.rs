/// Flat-file readers. Each input format gets its own file here.
pub mod catalog;
pub mod positions;
pub mod tenv;

#[cfg(test)]
pub(crate) mod fixtures;

/// Splits raw file contents into 1-based numbered lines.
///
/// Decoding is per line, so a stray non-UTF-8 byte only costs its own line.
/// A trailing `\r` is dropped.
pub(crate) fn numbered_lines(bytes: &[u8]) -> impl Iterator<Item = (usize, Result<&str, String>)> {
    bytes.split(|&b| b == b'\n').enumerate().map(|(idx, raw)| {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = std::str::from_utf8(raw).map_err(|e| format!("line is not valid UTF-8 ({})", e));
        (idx + 1, line)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_lines_isolates_bad_bytes() {
        let lines: Vec<_> = numbered_lines(b"first\r\nsec\xffond\nthird\n").collect();

        assert_eq!(lines.len(), 4, "trailing newline yields an empty last line");
        assert_eq!(lines[0], (1, Ok("first")));
        assert_eq!(lines[1].0, 2);
        assert!(lines[1].1.as_ref().unwrap_err().contains("UTF-8"));
        assert_eq!(lines[2], (3, Ok("third")));
        assert_eq!(lines[3], (4, Ok("")));
    }
}
