//! Helpers for `data:` URL payloads.

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Split a `data:<mime>;base64,<payload>` URL into its mime type and decoded
/// bytes.
pub fn decode(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("not a data URL"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("data URL has no payload"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("data URL is not base64-encoded"))?;
    let bytes = BASE64.decode(payload.trim())?;
    Ok((mime.to_string(), bytes))
}

/// Inline JPEG bytes as a `data:image/jpeg;base64,...` URL.
pub fn encode_jpeg(bytes: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_jpeg_bytes() {
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x12];
        let url = encode_jpeg(&bytes);
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let (mime, decoded) = decode(&url).unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn rejects_plain_urls_and_unencoded_payloads() {
        assert!(decode("https://example.com/a.jpg").is_err());
        assert!(decode("data:text/plain,hello").is_err());
        assert!(decode("data:image/png;base64").is_err());
        assert!(decode("data:image/png;base64,!!!").is_err());
    }
}
