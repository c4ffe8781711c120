//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, RFC 2047 header encoding and
//! character set conversion. Header values are only ever encoded.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use encoding_rs::{Encoding, UTF_8};
use std::fmt::Write as _;

/// Maximum line length for encoded bodies (RFC 2045).
const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 wrapped into CRLF-terminated lines.
#[must_use]
pub fn encode_base64_lines(data: &[u8]) -> String {
    let encoded = encode_base64(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);

    // Base64 output is pure ASCII, so byte chunks are char boundaries
    for chunk in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        result.push_str(&String::from_utf8_lossy(chunk));
        result.push_str("\r\n");
    }

    result
}

/// Decodes Base64 data, ignoring embedded whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Encodes bytes using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks (CRLF or bare LF) in the input become CRLF hard breaks.
/// Whitespace directly before a hard break is escaped.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut result = String::new();
    let mut line_length = 0;
    let mut bytes = data.iter().copied().peekable();

    while let Some(byte) = bytes.next() {
        if byte == b'\n' || (byte == b'\r' && bytes.peek() == Some(&b'\n')) {
            if byte == b'\r' {
                bytes.next();
            }
            result.push_str("\r\n");
            line_length = 0;
            continue;
        }

        // Check if we need soft line break
        if line_length >= MAX_LINE_LENGTH - 3 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        match byte {
            b'!'..=b'<' | b'>'..=b'~' => {
                result.push(char::from(byte));
                line_length += 1;
            }
            b' ' | b'\t' if !matches!(bytes.peek(), None | Some(b'\r' | b'\n')) => {
                result.push(char::from(byte));
                line_length += 1;
            }
            _ => {
                let _ = write!(result, "={byte:02X}");
                line_length += 3;
            }
        }
    }

    result
}

/// Decodes Quoted-Printable text (RFC 2045) back into raw bytes.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let input = text.as_bytes();
    let mut result = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if input[i] != b'=' {
            result.push(input[i]);
            i += 1;
            continue;
        }

        // Soft line break
        match input.get(i + 1..) {
            Some([b'\r', b'\n', ..]) => {
                i += 3;
                continue;
            }
            Some([b'\n', ..]) => {
                i += 2;
                continue;
            }
            _ => {}
        }

        let hex = input
            .get(i + 1..i + 3)
            .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".to_string()))?;
        let hex = std::str::from_utf8(hex)
            .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
        let byte = u8::from_str_radix(hex, 16)
            .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
        result.push(byte);
        i += 3;
    }

    Ok(result)
}

/// Looks up a character set by its label (e.g. "utf-8", "iso-8859-1").
///
/// Labels that `encoding_rs` can only decode (UTF-16 and "replacement")
/// are rejected.
///
/// # Errors
///
/// Returns an error if the label is unknown or cannot be encoded to.
pub fn charset(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .filter(|encoding| encoding.output_encoding() == *encoding)
        .ok_or_else(|| Error::UnsupportedCharset(label.to_string()))
}

/// Converts text into the bytes of the given character set.
///
/// Characters the target set cannot represent become numeric character
/// references, which is what `encoding_rs` does for legacy encodings.
///
/// # Errors
///
/// Returns an error if the character set is unknown.
pub fn encode_text(text: &str, charset_label: &str) -> Result<Vec<u8>> {
    let encoding = charset(charset_label)?;
    if encoding == UTF_8 {
        return Ok(text.as_bytes().to_vec());
    }
    let (bytes, _, _) = encoding.encode(text);
    Ok(bytes.into_owned())
}

/// Converts bytes of the given character set back into text.
///
/// # Errors
///
/// Returns an error if the character set is unknown.
pub fn decode_text(bytes: &[u8], charset_label: &str) -> Result<String> {
    let encoding = charset(charset_label)?;
    let (text, _, _) = encoding.decode(bytes);
    Ok(text.into_owned())
}

/// Maximum length of one RFC 2047 encoded-word.
const MAX_ENCODED_WORD: usize = 75;

/// Encodes a header value using RFC 2047 encoding.
///
/// Format: `=?charset?B?encoded-text?=`. Values too long for one
/// encoded-word are split on character boundaries into several words,
/// folded onto continuation lines.
///
/// # Arguments
///
/// * `text` - Text to encode
/// * `charset` - Character set (e.g., "utf-8")
///
/// # Errors
///
/// Returns an error if the character set is unknown.
pub fn encode_rfc2047(text: &str, charset: &str) -> Result<String> {
    // Only encode if necessary (contains non-ASCII)
    if text
        .chars()
        .all(|c| c.is_ascii() && !c.is_ascii_control() && c != '=' && c != '?')
    {
        return Ok(text.to_string());
    }

    // "=?" charset "?B?" ... "?="
    let overhead = charset.len() + 7;
    let max_bytes = (MAX_ENCODED_WORD.saturating_sub(overhead) / 4 * 3).max(3);

    let mut words = Vec::new();
    let mut chunk = String::new();
    let mut chunk_bytes = 0;
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let char_bytes = encode_text(c.encode_utf8(&mut buf), charset)?.len();
        if !chunk.is_empty() && chunk_bytes + char_bytes > max_bytes {
            words.push(encoded_word(&chunk, charset)?);
            chunk.clear();
            chunk_bytes = 0;
        }
        chunk.push(c);
        chunk_bytes += char_bytes;
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk, charset)?);
    }

    Ok(words.join("\r\n "))
}

fn encoded_word(text: &str, charset: &str) -> Result<String> {
    let encoded = encode_base64(&encode_text(text, charset)?);
    Ok(format!("=?{charset}?B?{encoded}?="))
}
