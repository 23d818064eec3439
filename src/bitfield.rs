//! Splits a packed-fields byte into named sub-fields.

use crate::error::Result;

use bitreader::BitReader;

/// Ordered `(name, bit width)` pairs, consumed from the most significant bit down.
pub type Layout = &'static [(&'static str, u8)];

/// Logical Screen Descriptor packed fields.
pub const SCREEN_LAYOUT: Layout = &[
    ("global_color_table", 1),
    ("color_resolution", 3),
    ("sort", 1),
    ("color_table_size", 3),
];

/// Image Descriptor packed fields.
pub const IMAGE_LAYOUT: Layout = &[
    ("local_color_table", 1),
    ("interlace", 1),
    ("sort", 1),
    ("reserved", 2),
    ("color_table_size", 3),
];

/// Graphic Control Extension packed fields.
pub const GRAPHIC_CONTROL_LAYOUT: Layout = &[
    ("reserved", 3),
    ("disposal_method", 3),
    ("user_input", 1),
    ("transparent_color", 1),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFields {
    raw: u8,
    values: Vec<(&'static str, u8)>,
}

impl PackedFields {
    pub fn raw(&self) -> u8 {
        self.raw
    }

    pub fn get(&self, name: &str) -> Option<u8> {
        self.values
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| *value)
    }

    /// Missing names read as zero; layouts are static so that only happens on a typo.
    pub fn value(&self, name: &str) -> u8 {
        self.get(name).unwrap_or_default()
    }

    pub fn flag(&self, name: &str) -> bool {
        self.value(name) != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u8)> + '_ {
        self.values.iter().copied()
    }
}

pub fn decode(byte: u8, layout: Layout) -> Result<PackedFields> {
    let bytes = [byte];
    let mut reader = BitReader::new(&bytes);

    let values = layout
        .iter()
        .map(|&(name, width)| -> Result<(&'static str, u8)> { Ok((name, reader.read_u8(width)?)) })
        .collect::<Result<Vec<_>>>()?;

    Ok(PackedFields { raw: byte, values })
}

/// Number of entries a color table holds for a 3-bit size exponent.
pub fn color_table_len(exponent: u8) -> usize {
    1 << ((exponent & 0b111) + 1)
}
