//! Codepage decoding for legacy workbook strings
//!
//! BIFF8 stores text either as UTF-16LE or as "compressed" 8-bit strings whose
//! bytes are the low halves of UTF-16 code units (ISO-8859-1). Older BIFF5/7
//! workbooks store byte strings in the Windows codepage announced by the
//! CODEPAGE record, which is decoded here with `encoding_rs`.

use encoding_rs::Encoding;

/// Codepage assumed when a BIFF5 workbook carries no CODEPAGE record.
pub const DEFAULT_CODEPAGE: u16 = 1252;

/// Decode bytes using the specified Windows codepage
///
/// Unknown codepages fall back to Windows-1252, which is what Excel itself
/// assumes for BIFF5 files written without a CODEPAGE record. Decoding is
/// lossy: malformed sequences become U+FFFD.
///
/// # Examples
///
/// ```
/// use xlscompact::ole::codepage::decode_bytes;
///
/// assert_eq!(decode_bytes(b"caf\xE9", 1252), "café");
/// assert_eq!(decode_bytes(b"\xC0\xC1", 1251), "АБ");
/// ```
pub fn decode_bytes(bytes: &[u8], codepage: u16) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    // 1200 is announced by BIFF8 writers; byte strings inside such files
    // are compressed UTF-16, not UTF-16 proper.
    if codepage == 1200 {
        return decode_latin1(bytes);
    }

    let encoding = codepage_to_encoding(codepage).unwrap_or(encoding_rs::WINDOWS_1252);
    encoding.decode_without_bom_handling(bytes).0.into_owned()
}

/// Decode a BIFF8 compressed string (one byte per UTF-16 code unit).
#[inline]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Decode UTF-16LE bytes; a trailing odd byte is ignored.
#[inline]
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Map Windows codepage identifier to encoding_rs Encoding
///
/// The returned encoding references are static, so no allocation occurs.
#[inline]
pub fn codepage_to_encoding(codepage: u16) -> Option<&'static Encoding> {
    match codepage {
        // DOS codepages
        437 => Some(encoding_rs::IBM866), // close approximation to CP437
        866 => Some(encoding_rs::IBM866),

        // Windows codepages (Western scripts)
        874 => Some(encoding_rs::WINDOWS_874),   // Thai
        1250 => Some(encoding_rs::WINDOWS_1250), // Central European
        1251 => Some(encoding_rs::WINDOWS_1251), // Cyrillic
        1252 => Some(encoding_rs::WINDOWS_1252), // Western European
        1253 => Some(encoding_rs::WINDOWS_1253), // Greek
        1254 => Some(encoding_rs::WINDOWS_1254), // Turkish
        1255 => Some(encoding_rs::WINDOWS_1255), // Hebrew
        1256 => Some(encoding_rs::WINDOWS_1256), // Arabic
        1257 => Some(encoding_rs::WINDOWS_1257), // Baltic
        1258 => Some(encoding_rs::WINDOWS_1258), // Vietnamese

        // East Asian codepages
        932 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GBK),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),

        // Macintosh Roman; 32768 is how Excel for Mac tags it
        10000 | 32768 => Some(encoding_rs::MACINTOSH),

        65001 => Some(encoding_rs::UTF_8),

        _ => None,
    }
}
