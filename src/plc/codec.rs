// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the recipe-signage project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Recipe byte layouts
//!
//! Conversions between the raw PLC memory region and the recipe token.
//!
//! An S7 `STRING[n]` occupies `n + 2` bytes:
//!
//! ```text
//! +-----+--------+---------------------------+
//! | max | actual | characters (Latin-1) ...  |
//! +-----+--------+---------------------------+
//! ```
//!
//! Modbus gateways expose that region as holding registers, high byte first.

use super::PlcError;
use crate::config::RecipeEncoding;

/// Largest character count an S7 string header can declare.
pub const S7_STRING_MAX_CHARS: usize = 254;

/// Flatten holding registers into bytes, high byte first.
pub fn registers_to_bytes(registers: &[u16]) -> Vec<u8> {
    registers.iter().flat_map(|r| r.to_be_bytes()).collect()
}

/// Pack bytes into holding registers, high byte first. An odd trailing byte
/// is padded with zero.
pub fn bytes_to_registers(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
        .collect()
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Decode an S7 `STRING` located at the start of `bytes`.
///
/// Fails when the header is missing, when the actual length is larger than
/// the declared maximum, or when the region is too short to hold it.
pub fn decode_s7_string(bytes: &[u8]) -> Result<String, PlcError> {
    if bytes.len() < 2 {
        return Err(PlcError::Decode(format!(
            "S7 string needs a 2 byte header, got {} bytes",
            bytes.len()
        )));
    }
    let max = bytes[0] as usize;
    let actual = bytes[1] as usize;
    if actual > max {
        return Err(PlcError::Decode(format!(
            "S7 string actual length {} exceeds declared maximum {}",
            actual, max
        )));
    }
    let available = bytes.len() - 2;
    if actual > available {
        return Err(PlcError::Decode(format!(
            "S7 string of {} chars truncated to {} bytes, increase the configured length",
            actual, available
        )));
    }
    Ok(latin1(&bytes[2..2 + actual]))
}

/// Decode characters up to the first NUL byte.
pub fn decode_raw_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    latin1(&bytes[..end])
}

/// Encode `value` as an S7 `STRING` filling a region of `length` bytes.
///
/// Characters outside Latin-1 are replaced by `?`; the value is cut to the
/// region capacity.
pub fn encode_s7_string(value: &str, length: usize) -> Vec<u8> {
    let mut buffer = vec![0u8; length.max(2)];
    let capacity = (buffer.len() - 2).min(S7_STRING_MAX_CHARS);
    let chars: Vec<u8> = value
        .chars()
        .take(capacity)
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();
    buffer[0] = capacity as u8;
    buffer[1] = chars.len() as u8;
    buffer[2..2 + chars.len()].copy_from_slice(&chars);
    buffer
}

/// Encode `value` as NUL padded characters filling `length` bytes.
pub fn encode_raw_string(value: &str, length: usize) -> Vec<u8> {
    let mut buffer = vec![0u8; length];
    for (slot, c) in buffer.iter_mut().zip(value.chars()) {
        *slot = u8::try_from(u32::from(c)).unwrap_or(b'?');
    }
    buffer
}

pub fn decode(bytes: &[u8], encoding: RecipeEncoding) -> Result<String, PlcError> {
    match encoding {
        RecipeEncoding::S7String => decode_s7_string(bytes),
        RecipeEncoding::Raw => Ok(decode_raw_string(bytes)),
    }
}

pub fn encode(value: &str, encoding: RecipeEncoding, length: usize) -> Vec<u8> {
    match encoding {
        RecipeEncoding::S7String => encode_s7_string(value, length),
        RecipeEncoding::Raw => encode_raw_string(value, length),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_are_big_endian() {
        assert_eq!(registers_to_bytes(&[0x0A05, 0x5231]), vec![0x0A, 0x05, 0x52, 0x31]);
        assert_eq!(bytes_to_registers(&[0x0A, 0x05, 0x52]), vec![0x0A05, 0x5200]);
    }

    #[test]
    fn decodes_s7_string_and_ignores_padding() {
        let bytes = [10, 4, b'R', b'C', b'P', b'1', 0, 0, 0, 0, 0, 0];
        assert_eq!(decode_s7_string(&bytes).unwrap(), "RCP1");
    }

    #[test]
    fn zeroed_region_decodes_to_empty() {
        assert_eq!(decode_s7_string(&[0u8; 8]).unwrap(), "");
    }

    #[test]
    fn s7_string_errors() {
        assert!(matches!(decode_s7_string(&[4]), Err(PlcError::Decode(_))));
        // actual length above maximum
        assert!(matches!(
            decode_s7_string(&[2, 3, b'a', b'b', b'c']),
            Err(PlcError::Decode(_))
        ));
        // region shorter than the string
        assert!(matches!(
            decode_s7_string(&[10, 6, b'a', b'b']),
            Err(PlcError::Decode(_))
        ));
    }

    #[test]
    fn latin1_characters_survive() {
        let bytes = encode_s7_string("Jalapeño", 12);
        assert_eq!(bytes[0], 10);
        assert_eq!(bytes[1], 8);
        assert_eq!(decode_s7_string(&bytes).unwrap(), "Jalapeño");
    }

    #[test]
    fn s7_encoding_truncates_to_capacity() {
        let bytes = encode_s7_string("ABCDEFGH", 6);
        assert_eq!(bytes.len(), 6);
        assert_eq!(decode_s7_string(&bytes).unwrap(), "ABCD");
    }

    #[test]
    fn raw_string_stops_at_nul() {
        assert_eq!(decode_raw_string(b"R-12\0garbage"), "R-12");
        assert_eq!(decode_raw_string(b"FULL"), "FULL");
        assert_eq!(encode_raw_string("AB", 4), vec![b'A', b'B', 0, 0]);
    }
}
