//! Plain text extractor: no headings; paragraph boundaries at blank-line
//! runs; sentence boundaries deferred to Structure (spec §4.3).

use crate::error::{PipelineError, Result};

/// Decodes bytes to text, falling back through common encodings when the
/// input is not valid UTF-8 (grounded on the teacher's `PlainTextExtractor`).
pub fn extract(bytes: &[u8]) -> Result<String> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        Err(_) => {
            let (decoded, _encoding, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
            if had_errors {
                Err(PipelineError::ParseFailed(
                    "could not decode plain text in any supported encoding".to_string(),
                ))
            } else {
                Ok(decoded.into_owned())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_valid_utf8() {
        let text = extract(b"Hello, world.").unwrap();
        assert_eq!(text, "Hello, world.");
    }

    #[test]
    fn falls_back_to_windows_1252() {
        let bytes = vec![0x93, b'h', b'i', 0x94];
        let text = extract(&bytes).unwrap();
        assert!(text.contains("hi"));
    }
}
