use thiserror::Error;

use std::fmt;

/// Half-open `[begin, end)` byte range, 0-based from the start of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub begin: u64,
    pub end: u64,
}

impl Span {
    pub fn new(begin: u64, end: u64) -> Self {
        debug_assert!(begin <= end);
        Self { begin, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("truncated input at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        offset: u64,
        needed: u64,
        available: u64,
    },

    #[error("lookahead of {wanted} bytes at offset {offset} runs past the end of input")]
    EndOfInput { offset: u64, wanted: u64 },

    #[error("structural error at offset {offset}: {reason}")]
    Structural { offset: u64, reason: String },

    #[error("signature {found:02x?} is not a GIF signature")]
    BadSignature { found: [u8; 3] },

    #[error("sub-block chain starting at offset {start} has no zero-length terminator before offset {offset}")]
    UnterminatedSubBlockChain { start: u64, offset: u64 },

    #[error("packed field layout does not fit in one byte: {0}")]
    Bitfield(#[from] bitreader::BitReaderError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub(crate) fn structural(offset: u64, reason: impl Into<String>) -> Self {
        DecodeError::Structural {
            offset,
            reason: reason.into(),
        }
    }
}

/// Conditions that end decoding early without invalidating what was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// The byte where the trailer belongs is something else, or the stream ended.
    MissingTrailer { offset: u64, found: Option<u8> },
    /// An extension label outside the grammar stopped the block loop.
    UnknownExtension { offset: u64, label: u8 },
    /// A graphic control extension whose rendering block failed to decode.
    DroppedGraphicControl { span: Span },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::MissingTrailer { offset, found: Some(byte) } => {
                write!(f, "expected trailer 0x3b at offset {offset}, found 0x{byte:02x}")
            }
            DecodeWarning::MissingTrailer { offset, found: None } => {
                write!(f, "stream ended at offset {offset} without a trailer")
            }
            DecodeWarning::UnknownExtension { offset, label } => {
                write!(f, "stopped at unknown extension label 0x{label:02x} at offset {offset}")
            }
            DecodeWarning::DroppedGraphicControl { span } => {
                write!(f, "graphic control extension at {span} dropped, its rendering block is incomplete")
            }
        }
    }
}

/// What a top-level decoder hands back: the tree built so far and, when
/// decoding stopped early, the reason.
#[derive(Debug)]
pub struct Outcome<T> {
    pub tree: T,
    pub error: Option<DecodeError>,
}

impl<T> Outcome<T> {
    pub fn complete(tree: T) -> Self {
        Self { tree, error: None }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// A failed record decode carrying whatever part of the record was already built.
#[derive(Debug)]
pub struct Partial<T> {
    pub partial: Option<T>,
    pub error: DecodeError,
}

impl<T> From<DecodeError> for Partial<T> {
    fn from(error: DecodeError) -> Self {
        Partial {
            partial: None,
            error,
        }
    }
}

pub type Result<T, E = DecodeError> = std::result::Result<T, E>;
