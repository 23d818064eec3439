//! ISO base media file ("box tree") records.
//!
//! mp4 files are a sequence of possibly-nested boxes. Each box begins with a
//! big-endian 32-bit size and a four-character type tag; container types hold
//! a sequence of child boxes, every other type is an opaque payload.

mod decoder;

pub use decoder::BoxDecoder;

use crate::error::Span;
use crate::tree::{Inspect, Node};

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Parent tag given to top-level boxes.
    pub const ROOT: FourCC = FourCC(*b"root");

    /// Box types whose payload is a sequence of child boxes.
    pub const CONTAINERS: [FourCC; 7] = [
        FourCC(*b"moov"),
        FourCC(*b"trak"),
        FourCC(*b"mdia"),
        FourCC(*b"minf"),
        FourCC(*b"stbl"),
        FourCC(*b"udta"),
        FourCC(*b"edts"),
    ];

    pub fn is_container(&self) -> bool {
        Self::CONTAINERS.contains(self)
    }
}

impl From<[u8; 4]> for FourCC {
    fn from(value: [u8; 4]) -> Self {
        FourCC(value)
    }
}

impl PartialEq<&[u8; 4]> for FourCC {
    fn eq(&self, other: &&[u8; 4]) -> bool {
        self.0 == **other
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            let c = if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{self}'")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    /// Declared size of the whole box, header included.
    pub size: u32,
    pub box_type: FourCC,
    /// Diagnostic only.
    pub parent: FourCC,
}

impl BoxHeader {
    /// 4-byte size + 4-byte type
    pub const SIZE: u64 = 8;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxContent {
    Children(Vec<BmffBox>),
    Opaque(Span),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BmffBox {
    pub header: BoxHeader,
    /// `end` is `begin + declared size`, whether or not the box was read to the end.
    pub span: Span,
    pub content: BoxContent,
}

impl BmffBox {
    pub fn box_type(&self) -> FourCC {
        self.header.box_type
    }

    pub fn children(&self) -> &[BmffBox] {
        match &self.content {
            BoxContent::Children(children) => children,
            BoxContent::Opaque(_) => &[],
        }
    }

    /// This box plus all of its descendants.
    pub fn count(&self) -> usize {
        1 + self.children().iter().map(BmffBox::count).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoxTree {
    pub boxes: Vec<BmffBox>,
}

impl BoxTree {
    pub fn count(&self) -> usize {
        self.boxes.iter().map(BmffBox::count).sum()
    }

    /// First box found by a depth-first walk along `path`, e.g. `[b"moov", b"trak"]`.
    pub fn find(&self, path: &[&[u8; 4]]) -> Option<&BmffBox> {
        let (first, rest) = path.split_first()?;
        let mut current = self.boxes.iter().find(|b| b.box_type() == *first)?;
        for tag in rest {
            current = current.children().iter().find(|b| b.box_type() == *tag)?;
        }
        Some(current)
    }
}

impl Inspect for BmffBox {
    fn inspect(&self) -> Node {
        let node = Node::new("Box", self.span)
            .field("type", self.header.box_type.to_string())
            .field("size", self.header.size)
            .field("parent", self.header.parent.to_string());

        match &self.content {
            BoxContent::Children(children) => node
                .field("children", children.len())
                .children(children.iter().map(Inspect::inspect)),
            BoxContent::Opaque(payload) => node.field("payload", payload.len()),
        }
    }
}

impl Inspect for BoxTree {
    fn inspect(&self) -> Node {
        let end = self.boxes.last().map_or(0, |last| last.span.end);
        Node::new("BoxTree", Span::new(0, end))
            .field("boxes", self.count())
            .children(self.boxes.iter().map(Inspect::inspect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_tags() {
        assert!(FourCC(*b"moov").is_container());
        assert!(FourCC(*b"edts").is_container());
        assert!(!FourCC(*b"mdat").is_container());
        assert!(!FourCC(*b"meta").is_container());
    }

    #[test]
    fn fourcc_display_masks_binary() {
        assert_eq!(FourCC(*b"ftyp").to_string(), "ftyp");
        assert_eq!(FourCC([0x00, b'a', 0xff, b'b']).to_string(), ".a.b");
        assert_eq!(format!("{:?}", FourCC::ROOT), "'root'");
    }
}
