mod decoder;
mod records;
mod sub_block;

pub use decoder::Decoder;
pub use records::*;
pub use sub_block::{read_chain, SubBlock};

pub(crate) const EXTENSION_INTRODUCER: u8 = 0x21;
pub(crate) const IMAGE_SEPARATOR: u8 = 0x2c;
pub(crate) const TRAILER: u8 = 0x3b;

// Extension labels
pub(crate) const APPLICATION_EXTENSION: u8 = 0xff;
pub(crate) const COMMENT_EXTENSION: u8 = 0xfe;
pub(crate) const GRAPHIC_CONTROL_EXTENSION: u8 = 0xf9;
pub(crate) const PLAIN_TEXT_EXTENSION: u8 = 0x01;

pub(crate) const SIGNATURE: &[u8; 3] = b"GIF";

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalMethod {
    Unspecified = 0,
    DoNotDispose = 1,
    RestoreToBackgroundColor = 2,
    RestoreToPrevious = 3,
}

impl DisposalMethod {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DisposalMethod::Unspecified),
            1 => Some(DisposalMethod::DoNotDispose),
            2 => Some(DisposalMethod::RestoreToBackgroundColor),
            3 => Some(DisposalMethod::RestoreToPrevious),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V87a,
    V89a,
}

impl TryFrom<&[u8]> for Version {
    type Error = ();

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value {
            b"87a" => Ok(Version::V87a),
            b"89a" => Ok(Version::V89a),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    Infinite,
    Count(u16),
}
