//! PDF text string encoding and decoding

use lopdf::{Object, StringFormat};

const UTF16_BOM: [u8; 2] = [0xFE, 0xFF];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Encode a string as a PDF text string object.
///
/// Plain ASCII stays a literal string. Anything else is written as UTF-16BE
/// with a byte order mark, as a hex string.
pub fn encode_text_string(value: &str) -> Object {
    let plain = value
        .chars()
        .all(|c| c.is_ascii() && (!c.is_ascii_control() || matches!(c, '\n' | '\r' | '\t')));

    if plain {
        Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = UTF16_BOM.to_vec();
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// Decode the bytes of a PDF text string.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&UTF16_BOM) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(rest) = bytes.strip_prefix(&UTF8_BOM) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        // PDFDocEncoding matches Latin-1 over the printable range
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Bytes for showing `value` with a WinAnsi-encoded standard font.
///
/// Characters outside Latin-1 cannot be drawn by the standard 14 fonts and
/// are replaced with `?`.
pub fn to_win_ansi(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|c| {
            let code = c as u32;
            if code <= 0xFF {
                code as u8
            } else {
                b'?'
            }
        })
        .collect()
}
