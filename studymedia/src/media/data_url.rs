//! Parsing and building `data:<mime>;base64,<payload>` strings.

use base64::{Engine, engine::general_purpose::STANDARD};

use super::{MediaError, Result};

pub const DATA_URL_PREFIX: &str = "data:";

const BASE64_MARKER: &str = ";base64";
const DEFAULT_MIME: &str = "application/octet-stream";

/// True if the value is an inline data URL rather than a resolvable link.
pub fn is_data_url(url: &str) -> bool {
    url.starts_with(DATA_URL_PREFIX)
}

/// A decoded data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl DataUrl {
    /// Parse and decode a base64 data URL.
    pub fn parse(url: &str) -> Result<Self> {
        let (header, payload) = split(url)?;
        let mime_type = header.strip_suffix(BASE64_MARKER).ok_or_else(|| {
            MediaError::InvalidDataUrl("only base64-encoded data URLs are supported".to_string())
        })?;
        // Parameters such as `;charset=utf-8` may precede the base64 marker
        let mime_type = mime_type.split(';').next().unwrap_or_default().trim();

        let data = STANDARD.decode(payload.trim())?;

        Ok(Self {
            mime_type: if mime_type.is_empty() {
                DEFAULT_MIME.to_string()
            } else {
                mime_type.to_ascii_lowercase()
            },
            data,
        })
    }

    /// Build a base64 data URL from raw bytes.
    pub fn encode(mime_type: &str, data: &[u8]) -> String {
        format!("{DATA_URL_PREFIX}{mime_type}{BASE64_MARKER},{}", STANDARD.encode(data))
    }
}

/// Return the base64 text after the comma without decoding it.
pub fn payload_base64(url: &str) -> Result<&str> {
    let (header, payload) = split(url)?;
    if !header.ends_with(BASE64_MARKER) {
        return Err(MediaError::InvalidDataUrl("only base64-encoded data URLs are supported".to_string()));
    }
    Ok(payload.trim())
}

/// Return the declared MIME type of a data URL, if it has one.
pub fn declared_mime(url: &str) -> Option<&str> {
    let (header, _) = split(url).ok()?;
    let mime = header.split(';').next()?.trim();
    (!mime.is_empty()).then_some(mime)
}

fn split(url: &str) -> Result<(&str, &str)> {
    let rest = url
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or_else(|| MediaError::InvalidDataUrl("missing 'data:' prefix".to_string()))?;
    rest.split_once(',')
        .ok_or_else(|| MediaError::InvalidDataUrl("missing ',' separator".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_png_data_url() {
        let parsed = DataUrl::parse("data:image/png;base64,AAAA").unwrap();
        assert_eq!(parsed.mime_type, "image/png");
        assert_eq!(parsed.data, vec![0, 0, 0]);
    }

    #[test]
    fn test_parse_keeps_bytes_through_encode() {
        let bytes = b"\x89PNG\r\n\x1a\nnot really a png".to_vec();
        let url = DataUrl::encode("image/png", &bytes);
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(DataUrl::parse(&url).unwrap().data, bytes);
    }

    #[test]
    fn test_parse_with_charset_parameter() {
        let parsed = DataUrl::parse("data:text/plain;charset=utf-8;base64,aGk=").unwrap();
        assert_eq!(parsed.mime_type, "text/plain");
        assert_eq!(parsed.data, b"hi");
    }

    #[test]
    fn test_parse_empty_mime_defaults_to_octet_stream() {
        let parsed = DataUrl::parse("data:;base64,aGk=").unwrap();
        assert_eq!(parsed.mime_type, "application/octet-stream");
    }

    #[test]
    fn test_parse_rejects_non_base64_urls() {
        assert!(matches!(DataUrl::parse("data:text/plain,hello"), Err(MediaError::InvalidDataUrl(_))));
        assert!(matches!(DataUrl::parse("https://cdn.example/x.png"), Err(MediaError::InvalidDataUrl(_))));
        assert!(matches!(DataUrl::parse("data:image/png;base64"), Err(MediaError::InvalidDataUrl(_))));
        assert!(matches!(DataUrl::parse("data:image/png;base64,!!!"), Err(MediaError::Decode(_))));
    }

    #[test]
    fn test_payload_and_declared_mime() {
        let url = "data:image/jpeg;base64,/9j/4AAQ";
        assert_eq!(payload_base64(url).unwrap(), "/9j/4AAQ");
        assert_eq!(declared_mime(url), Some("image/jpeg"));
        assert_eq!(declared_mime("/uploads/abc.jpg"), None);
    }

    #[test]
    fn test_is_data_url() {
        assert!(is_data_url("data:image/png;base64,AAAA"));
        assert!(!is_data_url("/uploads/0011223344556677.png"));
        assert!(!is_data_url("https://cdn.example/x.png"));
    }
}
