//! On-disk text format of ULS data files
//!
//! Data files are delimiter-separated lines in a single-byte legacy encoding
//! (`windows-1252` for combined exports) or UTF-8. Record-type codes are
//! ASCII, so the first field of a line can be inspected on raw bytes without
//! decoding; only header reconciliation and loading need decoded text.

use encoding_rs::Encoding;
use std::borrow::Cow;
use std::io;
use std::path::Path;

use crate::error::{UlsError, UlsResult};

/// Default field delimiter of ULS exports
pub const DEFAULT_DELIMITER: u8 = b'|';

/// Delimiter and character encoding of a data file
#[derive(Debug, Clone, Copy)]
pub struct TextFormat {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            encoding: encoding_rs::UTF_8,
        }
    }
}

impl TextFormat {
    /// Build a format from a delimiter and an encoding label such as
    /// `"utf-8"` or `"windows-1252"`
    pub fn new(delimiter: u8, encoding_label: &str) -> UlsResult<Self> {
        Ok(Self {
            delimiter,
            encoding: resolve_encoding(encoding_label)?,
        })
    }

    /// Decode file bytes to text
    ///
    /// Malformed input is an error, never replaced: a lossy decode would
    /// load or rewrite different bytes than the file holds.
    pub fn decode<'a>(&self, bytes: &'a [u8], path: &Path) -> UlsResult<Cow<'a, str>> {
        decode_strict(self.encoding, bytes, path)
    }

    /// Encode text for writing in this format's encoding
    pub fn encode<'a>(&self, text: &'a str, path: &Path) -> UlsResult<Cow<'a, [u8]>> {
        let (bytes, _, had_errors) = self.encoding.encode(text);
        if had_errors {
            return Err(UlsError::io(
                path,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("text is not representable in {}", self.encoding.name()),
                ),
            ));
        }
        Ok(bytes)
    }

    /// First delimited field of a raw line
    ///
    /// The whole line is trimmed of ASCII whitespace (terminator included)
    /// before splitting, so `" HD|x"` yields `HD` but `"HD |x"` yields `HD `.
    pub fn first_field<'a>(&self, line: &'a [u8]) -> &'a [u8] {
        let line = line.trim_ascii();
        let end = line
            .iter()
            .position(|&b| b == self.delimiter)
            .unwrap_or(line.len());
        &line[..end]
    }
}

/// Decode `bytes` in `encoding`, failing on malformed sequences
///
/// A leading byte order mark of the same encoding is dropped.
pub fn decode_strict<'a>(
    encoding: &'static Encoding,
    bytes: &'a [u8],
    path: &Path,
) -> UlsResult<Cow<'a, str>> {
    let bytes = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) if bom_encoding == encoding => &bytes[bom_len..],
        _ => bytes,
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| {
            UlsError::io(
                path,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("stream did not contain valid {}", encoding.name()),
                ),
            )
        })
}

/// Resolve an encoding label through the WHATWG label table
pub fn resolve_encoding(label: &str) -> UlsResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| UlsError::UnknownEncoding(label.to_string()))
}

/// Parse a delimiter given as text into a single ASCII byte
pub fn parse_delimiter(value: &str) -> UlsResult<u8> {
    match value.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(UlsError::InvalidDelimiter(value.to_string())),
    }
}

/// Whether a field has the shape of a record-type code: exactly two
/// alphabetic characters
pub fn is_record_code(field: &[u8]) -> bool {
    field.len() == 2 && field.iter().all(u8::is_ascii_alphabetic)
}

/// Strip the trailing `\n` / `\r\n` of a line
pub fn strip_line_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_field() {
        let format = TextFormat::default();
        assert_eq!(format.first_field(b"HD|foo|bar\n"), b"HD");
        assert_eq!(format.first_field(b"  AC|x"), b"AC");
        assert_eq!(format.first_field(b"EN\r\n"), b"EN");
        assert_eq!(format.first_field(b"|x"), b"");
        assert_eq!(format.first_field(b"HD |x"), b"HD ");
        assert_eq!(format.first_field(b"HD  \n"), b"HD");
    }

    #[test]
    fn test_strip_line_terminator() {
        assert_eq!(strip_line_terminator(b"HD|x\r\n"), b"HD|x");
        assert_eq!(strip_line_terminator(b"HD|x\n"), b"HD|x");
        assert_eq!(strip_line_terminator(b"HD|x "), b"HD|x ");
        assert_eq!(strip_line_terminator(b"\n"), b"");
    }

    #[test]
    fn test_malformed_utf8_is_an_error() {
        let err = TextFormat::default()
            .decode(b"EN|Caf\xe9", Path::new("EN.dat"))
            .unwrap_err();
        match err {
            UlsError::Io { path, source } => {
                assert_eq!(path, Path::new("EN.dat"));
                assert_eq!(source.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_utf8_bom_is_dropped() {
        let text = TextFormat::default()
            .decode(b"\xef\xbb\xbfrecord_type|val", Path::new("x"))
            .unwrap();
        assert_eq!(text, "record_type|val");
    }

    #[test]
    fn test_unrepresentable_text_is_an_error() {
        let format = TextFormat::new(b'|', "windows-1252").unwrap();
        assert!(format.encode("EN|\u{4e2d}", Path::new("x")).is_err());
    }

    #[test]
    fn test_is_record_code() {
        assert!(is_record_code(b"HD"));
        assert!(is_record_code(b"hd"));
        assert!(!is_record_code(b"H1"));
        assert!(!is_record_code(b"HDR"));
        assert!(!is_record_code(b""));
    }

    #[test]
    fn test_resolve_encoding() {
        assert_eq!(resolve_encoding("windows-1252").unwrap(), encoding_rs::WINDOWS_1252);
        assert_eq!(resolve_encoding("UTF-8").unwrap(), encoding_rs::UTF_8);
        assert!(matches!(
            resolve_encoding("klingon"),
            Err(UlsError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter("|").unwrap(), b'|');
        assert!(parse_delimiter("||").is_err());
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("¦").is_err());
    }

    #[test]
    fn test_windows_1252_round_trip() {
        let format = TextFormat::new(b'|', "windows-1252").unwrap();
        let bytes = b"EN|Caf\xe9";
        let text = format.decode(bytes, Path::new("x")).unwrap();
        assert_eq!(text, "EN|Café");
        assert_eq!(format.encode(&text, Path::new("x")).unwrap().as_ref(), bytes);
    }
}
