//! Font and XF tables for written workbooks
//!
//! Every workbook gets the same table: four default fonts, the fifteen
//! style XFs Excel expects, the default cell XF, the built-in style XFs and
//! one date cell XF.
//!
//! | XF index | Use |
//! |----------|-----|
//! | 0..=14   | style XFs |
//! | 15       | default cell XF (`General`) |
//! | 16..=20  | comma, currency and percent style XFs |
//! | 21       | date cell XF (format 22, `m/d/yy h:mm`) |

use super::super::XlsResult;
use std::io::Write;

/// Font weight constants
pub const FONT_WEIGHT_NORMAL: u16 = 400;
pub const FONT_WEIGHT_BOLD: u16 = 700;

/// Palette index meaning "automatic" colour
pub const COLOR_AUTOMATIC: u16 = 0x7FFF;

/// XF index used by numbers, strings, booleans and errors
pub const DEFAULT_CELL_XF: u16 = 15;
/// XF index used by date cells
pub const DATE_CELL_XF: u16 = 21;
/// Built-in number format `m/d/yy h:mm`
pub const DATE_FORMAT_INDEX: u16 = 22;

const STYLE_XF_COUNT: u16 = 15;

/// Number formats of the built-in style XFs 16..=20
const BUILTIN_STYLE_FORMATS: [u16; 5] = [0x002B, 0x0029, 0x002C, 0x002A, 0x0009];

/// Built-in number formats written as FORMAT records, as Excel itself does
const BUILTIN_NUMBER_FORMATS: [&str; 8] = [
    "General",
    "0",
    "0.00",
    "#,##0",
    "#,##0.00",
    "\"$\"#,##0_);(\"$\"#,##0)",
    "\"$\"#,##0_);[Red](\"$\"#,##0)",
    "\"$\"#,##0.00_);(\"$\"#,##0.00)",
];

/// Font definition
#[derive(Debug, Clone)]
pub struct Font {
    /// Font height in twips (1/20 of a point)
    pub height: u16,
    /// Font weight (400 = normal, 700 = bold)
    pub weight: u16,
    pub italic: bool,
    pub color_index: u16,
    /// Font name, ASCII
    pub name: String,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            height: 200, // 10pt
            weight: FONT_WEIGHT_NORMAL,
            italic: false,
            color_index: COLOR_AUTOMATIC,
            name: "Arial".to_string(),
        }
    }
}

/// Extended Format (XF) record contents
#[derive(Debug, Clone, Default)]
pub struct ExtendedFormat {
    pub font_index: u16,
    /// Number format index
    pub format_index: u16,
}

/// Write FONT record (0x0031)
pub fn write_font<W: Write>(writer: &mut W, font: &Font) -> XlsResult<()> {
    let name_bytes = font.name.as_bytes();
    let name_len = name_bytes.len().min(255);

    // 14 bytes of properties, then name length, option byte and name
    let data_len = 14 + 1 + 1 + name_len;
    super::biff::write_record_header(writer, 0x0031, data_len as u16)?;

    writer.write_all(&font.height.to_le_bytes())?;
    let flags: u16 = if font.italic { 0x0002 } else { 0 };
    writer.write_all(&flags.to_le_bytes())?;
    writer.write_all(&font.color_index.to_le_bytes())?;
    writer.write_all(&font.weight.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?; // escapement
    // underline, family, charset, reserved
    writer.write_all(&[0, 0, 0, 0])?;

    writer.write_all(&[name_len as u8, 0x00])?;
    writer.write_all(&name_bytes[..name_len])?;

    Ok(())
}

/// Write XF (Extended Format) record (0x00E0)
///
/// Style XFs carry the 0xFFF5 type word (locked, style, no parent); cell
/// XFs are locked and inherit from style XF 0.
pub fn write_xf<W: Write>(writer: &mut W, xf: &ExtendedFormat, is_style_xf: bool) -> XlsResult<()> {
    super::biff::write_record_header(writer, 0x00E0, 20)?;

    writer.write_all(&xf.font_index.to_le_bytes())?;
    writer.write_all(&xf.format_index.to_le_bytes())?;

    let xf_type: u16 = if is_style_xf { 0xFFF5 } else { 0x0001 };
    writer.write_all(&xf_type.to_le_bytes())?;

    // General horizontal, bottom vertical alignment
    writer.write_all(&[0x20])?;
    // Rotation, indent, used-attribute flags
    writer.write_all(&[0, 0, 0])?;
    // No borders, no fill
    writer.write_all(&[0u8; 10])?;

    Ok(())
}

/// Formatting manager for the fixed font and XF tables
#[derive(Debug)]
pub struct FormattingManager {
    fonts: Vec<Font>,
}

impl FormattingManager {
    /// Create a new formatting manager with default entries
    pub fn new() -> Self {
        // 0: normal, 1: bold, 2: italic, 3: bold italic
        let fonts = vec![
            Font::default(),
            Font {
                weight: FONT_WEIGHT_BOLD,
                ..Font::default()
            },
            Font {
                italic: true,
                ..Font::default()
            },
            Font {
                weight: FONT_WEIGHT_BOLD,
                italic: true,
                ..Font::default()
            },
        ];

        Self { fonts }
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    /// Write all FONT records
    pub fn write_fonts<W: Write>(&self, writer: &mut W) -> XlsResult<()> {
        for font in &self.fonts {
            write_font(writer, font)?;
        }
        Ok(())
    }

    /// Write FORMAT records for built-in indices 0..7
    pub fn write_number_formats<W: Write>(&self, writer: &mut W) -> XlsResult<()> {
        for (index, format_str) in BUILTIN_NUMBER_FORMATS.iter().enumerate() {
            super::biff::write_format_record(writer, index as u16, format_str)?;
        }
        Ok(())
    }

    /// Write all XF records in table order
    pub fn write_formats<W: Write>(&self, writer: &mut W) -> XlsResult<()> {
        // Style XFs 1,2 use the bold font and 3,4 the italic one
        for i in 0..STYLE_XF_COUNT {
            let xf = ExtendedFormat {
                font_index: match i {
                    1 | 2 => 1,
                    3 | 4 => 2,
                    _ => 0,
                },
                format_index: 0,
            };
            write_xf(writer, &xf, true)?;
        }

        write_xf(writer, &ExtendedFormat::default(), false)?;

        for &format_index in &BUILTIN_STYLE_FORMATS {
            let xf = ExtendedFormat {
                font_index: 0,
                format_index,
            };
            write_xf(writer, &xf, true)?;
        }

        let date = ExtendedFormat {
            font_index: 0,
            format_index: DATE_FORMAT_INDEX,
        };
        write_xf(writer, &date, false)?;

        Ok(())
    }
}

impl Default for FormattingManager {
    fn default() -> Self {
        Self::new()
    }
}
