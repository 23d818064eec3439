//! Structural inspectors for GIF streams and ISO base media ("box tree") files.
//!
//! Both decoders read a seekable stream through a [`cursor::Cursor`] and build
//! an immutable record tree with a byte span on every record. Nothing is
//! decompressed: LZW image data and box payloads stay opaque. Rendering is a
//! separate step over the generic [`tree::Node`] form of a record.

pub mod bitfield;
pub mod cursor;
pub mod error;
pub mod gif;
pub mod mp4;
pub mod render;
pub mod tree;

pub use error::{DecodeError, DecodeWarning, Outcome, Span};
