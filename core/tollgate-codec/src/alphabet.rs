//! Base-32 text encoding over a hand-typable alphabet.
//!
//! The alphabet drops `0`, `1`, `I` and `O` so keys survive being read aloud
//! or retyped. Decoding is case-insensitive and ignores `-` and whitespace,
//! which lets grouped display forms decode unchanged.

use crate::error::{CodecError, CodecResult};

/// The 32 symbols, in value order.
pub const KEY_ALPHABET: &[u8; 32] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Encodes bytes as key text, most significant bit first, without padding.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for &byte in bytes {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(KEY_ALPHABET[((buffer >> bits) & 0x1F) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(KEY_ALPHABET[((buffer << (5 - bits)) & 0x1F) as usize] as char);
    }
    out
}

/// Decodes key text back into bytes. Leftover bits shorter than a byte are dropped.
///
/// # Errors
///
/// Returns [`CodecError::InvalidAlphabet`] for characters outside the alphabet.
pub fn decode(text: &str) -> CodecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for c in text.chars() {
        if c == '-' || c.is_whitespace() {
            continue;
        }
        let value = symbol_value(c).ok_or(CodecError::InvalidAlphabet(c))?;
        buffer = (buffer << 5) | u32::from(value);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }
    Ok(out)
}

fn symbol_value(c: char) -> Option<u8> {
    let upper = c.to_ascii_uppercase();
    if !upper.is_ascii() {
        return None;
    }
    KEY_ALPHABET
        .iter()
        .position(|&symbol| symbol == upper as u8)
        .map(|position| position as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_has_no_confusables() {
        for c in [b'0', b'1', b'I', b'O'] {
            assert!(!KEY_ALPHABET.contains(&c));
        }
    }

    #[test]
    fn roundtrip_various_lengths() {
        for len in 0..40usize {
            let bytes: Vec<u8> = (0..len).map(|i| (i * 37 + 11) as u8).collect();
            assert_eq!(decode(&encode(&bytes)).unwrap(), bytes, "len {len}");
        }
    }

    #[test]
    fn decode_is_case_insensitive_and_ignores_separators() {
        let text = encode(b"tollgate");
        let grouped = format!(" {}-{} ", &text[..4], &text[4..]).to_lowercase();
        assert_eq!(decode(&grouped).unwrap(), b"tollgate");
    }

    #[test]
    fn decode_rejects_confusable_characters() {
        assert_eq!(decode("AB0C"), Err(CodecError::InvalidAlphabet('0')));
        assert_eq!(decode("ABOC"), Err(CodecError::InvalidAlphabet('O')));
    }
}
