use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD, URL_SAFE};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;

/// Decoder that accepts both padded and unpadded input and tolerates
/// non-canonical trailing bits, which many subscription providers emit.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encodes a string to Base64 format.
pub fn base64_encode(input: &str) -> String {
    STANDARD.encode(input)
}

/// Encodes a string to padded URL-safe Base64.
pub fn url_safe_base64_encode(input: &str) -> String {
    URL_SAFE.encode(input)
}

/// Encodes a string to URL-safe Base64 without padding, as used inside SSR links.
pub fn url_safe_base64_encode_no_pad(input: &str) -> String {
    url_safe_base64_apply(&base64_encode(input))
}

/// Reverses a URL-safe Base64 string to standard Base64 format.
pub fn url_safe_base64_reverse(input: &str) -> String {
    input.replace('-', "+").replace('_', "/")
}

/// Converts a Base64 string to URL-safe Base64 format by replacing specific characters.
pub fn url_safe_base64_apply(input: &str) -> String {
    input.replace('+', "-").replace('/', "_").replace('=', "")
}

/// Decodes Base64 in either alphabet to raw bytes.
///
/// Whitespace is ignored and padding is normalized, so a blob that was
/// wrapped over several lines or had its `=` stripped still decodes.
pub fn base64_decode_bytes(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let cleaned = url_safe_base64_reverse(cleaned.trim_end_matches('='));
    LENIENT.decode(cleaned)
}

/// Decodes Base64 in either alphabet to a UTF-8 string.
///
/// Returns `None` when the input is not Base64 or does not decode to UTF-8.
pub fn base64_decode(input: &str) -> Option<String> {
    base64_decode_bytes(input)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_restores_stripped_padding() {
        assert_eq!(
            base64_decode("YWVzLTI1Ni1nY206cGFzcw").as_deref(),
            Some("aes-256-gcm:pass")
        );
        assert_eq!(
            base64_decode("YWVzLTI1Ni1nY206cGFzcw==").as_deref(),
            Some("aes-256-gcm:pass")
        );
    }

    #[test]
    fn test_decode_accepts_url_safe_alphabet() {
        let encoded = url_safe_base64_encode_no_pad("??>>");
        assert!(encoded.contains('_') || encoded.contains('-'));
        assert_eq!(base64_decode(&encoded).as_deref(), Some("??>>"));
    }

    #[test]
    fn test_decode_ignores_line_wrapping() {
        assert_eq!(
            base64_decode("aGVsbG8g\nd29ybGQ=\n").as_deref(),
            Some("hello world")
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(base64_decode("not base64 at all!").is_none());
    }

    #[test]
    fn test_url_safe_encode_keeps_padding() {
        assert_eq!(
            url_safe_base64_encode("aes-256-gcm:pass"),
            "YWVzLTI1Ni1nY206cGFzcw=="
        );
    }
}
