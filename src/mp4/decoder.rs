use super::{BmffBox, BoxContent, BoxHeader, BoxTree, FourCC};
use crate::cursor::Cursor;
use crate::error::{DecodeError, Outcome, Partial, Span};

use log::{debug, warn};

use std::io::{Read, Seek};

const DEFAULT_MAX_DEPTH: usize = 32;

/// Reads a stream as a tree of boxes.
///
/// Container boxes are decoded child by child until their declared size is
/// used up; any other box has its payload skipped. The first malformed box
/// ends decoding, and everything decoded before it (including the enclosing
/// containers, cut short) is returned alongside the error.
#[derive(Debug, Clone)]
pub struct BoxDecoder {
    max_depth: usize,
}

impl Default for BoxDecoder {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl BoxDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deepest nesting level accepted; top-level boxes are level 0.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn decode<R: Read + Seek>(&self, cursor: &mut Cursor<R>) -> Outcome<BoxTree> {
        let mut tree = BoxTree::default();

        while !cursor.at_end() {
            match self.decode_box(cursor, FourCC::ROOT, 0, None) {
                Ok(b) => tree.boxes.push(b),
                Err(Partial { partial, error }) => {
                    warn!("box decoding stopped after {} top-level boxes: {error}", tree.boxes.len());
                    tree.boxes.extend(partial);
                    return Outcome {
                        tree,
                        error: Some(error),
                    };
                }
            }
        }

        Outcome::complete(tree)
    }

    /// `limit` is what is left of the parent's declared size, `None` at top level.
    fn decode_box<R: Read + Seek>(
        &self,
        cursor: &mut Cursor<R>,
        parent: FourCC,
        depth: usize,
        limit: Option<u64>,
    ) -> Result<BmffBox, Partial<BmffBox>> {
        let begin = cursor.position();

        if depth > self.max_depth {
            return Err(DecodeError::structural(
                begin,
                format!("boxes nested deeper than {} levels inside '{parent}'", self.max_depth),
            )
            .into());
        }
        if let Some(limit) = limit.filter(|&limit| limit < BoxHeader::SIZE) {
            return Err(DecodeError::structural(
                begin,
                format!("{limit} bytes left in '{parent}', too few for a box header"),
            )
            .into());
        }

        let size = cursor.read_u32_be()?;
        let box_type = FourCC(cursor.read_array::<4>()?);
        let header = BoxHeader {
            size,
            box_type,
            parent,
        };
        let size = u64::from(size);

        if size < BoxHeader::SIZE {
            return Err(DecodeError::structural(
                begin,
                format!("box '{box_type}' declares size {size}, smaller than its header"),
            )
            .into());
        }
        if let Some(limit) = limit.filter(|&limit| size > limit) {
            return Err(DecodeError::structural(
                begin,
                format!("box '{box_type}' declares {size} bytes but '{parent}' has only {limit} left"),
            )
            .into());
        }

        let span = Span::new(begin, begin + size);

        if !box_type.is_container() {
            let payload = size - BoxHeader::SIZE;
            let remaining = cursor.remaining();
            if payload > remaining {
                return Err(DecodeError::structural(
                    begin,
                    format!("box '{box_type}' payload of {payload} bytes runs past the end of the stream ({remaining} left)"),
                )
                .into());
            }
            cursor.skip(payload)?;
            debug!("{:?} at {span} (skipped)", box_type);

            return Ok(BmffBox {
                header,
                span,
                content: BoxContent::Opaque(Span::new(begin + BoxHeader::SIZE, span.end)),
            });
        }

        // children that are there still get decoded, the overrun is reported after them
        let remaining = cursor.remaining();
        let overrun = size - BoxHeader::SIZE > remaining;

        let mut children = Vec::new();
        while cursor.position() < span.end {
            if overrun && cursor.remaining() < BoxHeader::SIZE {
                break;
            }
            let left = span.end - cursor.position();
            match self.decode_box(cursor, box_type, depth + 1, Some(left)) {
                Ok(child) => children.push(child),
                Err(Partial { partial, error }) => {
                    children.extend(partial);
                    return Err(Partial {
                        partial: Some(BmffBox {
                            header,
                            span,
                            content: BoxContent::Children(children),
                        }),
                        error,
                    });
                }
            }
        }
        debug!("{:?} at {span} with {} children", box_type, children.len());

        if overrun {
            return Err(Partial {
                partial: Some(BmffBox {
                    header,
                    span,
                    content: BoxContent::Children(children),
                }),
                error: DecodeError::structural(
                    begin,
                    format!("box '{box_type}' declares {size} bytes, runs past the end of the stream ({remaining} left after its header)"),
                ),
            });
        }

        Ok(BmffBox {
            header,
            span,
            content: BoxContent::Children(children),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let size = (payload.len() + 8) as u32;
        [size.to_be_bytes().as_slice(), tag.as_slice(), payload].concat()
    }

    fn decode(bytes: &[u8]) -> Outcome<BoxTree> {
        let mut cursor = Cursor::from_slice(bytes);
        BoxDecoder::new().decode(&mut cursor)
    }

    fn assert_children_fit(b: &BmffBox) {
        let declared: u64 = b.children().iter().map(|child| u64::from(child.header.size)).sum();
        assert!(declared <= u64::from(b.header.size) - BoxHeader::SIZE);
        b.children().iter().for_each(assert_children_fit);
    }

    #[test]
    fn single_ftyp_leaf() {
        let outcome = decode(&[0x00, 0x00, 0x00, 0x08, b'f', b't', b'y', b'p']);

        assert!(outcome.is_complete());
        let boxes = &outcome.tree.boxes;
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].box_type(), FourCC(*b"ftyp"));
        assert_eq!(boxes[0].header.size, 8);
        assert_eq!(boxes[0].header.parent, FourCC::ROOT);
        assert!(boxes[0].children().is_empty());
        assert_eq!(boxes[0].span, Span::new(0, 8));
    }

    #[test]
    fn nested_containers() {
        let stbl = boxed(b"stbl", &boxed(b"stsd", &[0; 4]));
        let minf = boxed(b"minf", &stbl);
        let mdia = boxed(b"mdia", &[boxed(b"mdhd", &[1, 2]), minf].concat());
        let trak = boxed(b"trak", &[boxed(b"tkhd", &[]), mdia].concat());
        let moov = boxed(b"moov", &[boxed(b"mvhd", &[0; 6]), trak].concat());
        let bytes = [boxed(b"ftyp", b"isom"), moov.clone(), boxed(b"mdat", &[0xaa; 10])].concat();

        let outcome = decode(&bytes);
        assert!(outcome.is_complete());
        let tree = &outcome.tree;

        assert_eq!(tree.boxes.len(), 3);
        assert_eq!(tree.count(), 11);

        let moov_box = &tree.boxes[1];
        assert_eq!(moov_box.span, Span::new(12, 12 + moov.len() as u64));
        assert_eq!(moov_box.children().len(), 2);
        assert_children_fit(moov_box);

        let stsd = tree.find(&[b"moov", b"trak", b"mdia", b"minf", b"stbl", b"stsd"]).unwrap();
        assert_eq!(stsd.header.parent, FourCC(*b"stbl"));
        assert_eq!(stsd.content, BoxContent::Opaque(Span::new(stsd.span.begin + 8, stsd.span.end)));

        let mdat = &tree.boxes[2];
        assert_eq!(mdat.span.end, bytes.len() as u64);
    }

    #[test]
    fn undersized_box_is_structural() {
        let outcome = decode(&[0x00, 0x00, 0x00, 0x04, b'f', b'r', b'e', b'e']);

        assert!(outcome.tree.boxes.is_empty());
        assert!(matches!(outcome.error, Some(DecodeError::Structural { offset: 0, .. })));
    }

    #[test]
    fn zero_size_does_not_loop() {
        let bytes = [boxed(b"ftyp", &[]), vec![0; 16]].concat();
        let outcome = decode(&bytes);

        assert_eq!(outcome.tree.boxes.len(), 1);
        assert!(matches!(outcome.error, Some(DecodeError::Structural { offset: 8, .. })));
    }

    #[test]
    fn leaf_past_end_of_stream() {
        let mut bytes = boxed(b"mdat", &[0; 4]);
        bytes[3] = 100;
        let outcome = decode(&bytes);

        assert!(outcome.tree.boxes.is_empty());
        assert!(matches!(outcome.error, Some(DecodeError::Structural { offset: 0, .. })));
    }

    #[test]
    fn child_overrunning_parent_keeps_partial_tree() {
        let mut trak = boxed(b"trak", &[0; 8]);
        trak[3] = 40; // claims more than moov holds
        let moov = boxed(b"moov", &[boxed(b"mvhd", &[]), trak].concat());
        let bytes = [boxed(b"ftyp", &[]), moov, vec![0; 32]].concat();

        let outcome = decode(&bytes);
        assert!(matches!(outcome.error, Some(DecodeError::Structural { offset: 24, .. })));

        let tree = outcome.tree;
        assert_eq!(tree.boxes.len(), 2);
        let moov = &tree.boxes[1];
        assert_eq!(moov.box_type(), FourCC(*b"moov"));
        assert_eq!(moov.children().len(), 1);
        assert_eq!(moov.children()[0].box_type(), FourCC(*b"mvhd"));
    }

    #[test]
    fn trailing_bytes_too_short_for_a_header() {
        let moov = boxed(b"moov", &[boxed(b"mvhd", &[]), vec![0; 3]].concat());
        let outcome = decode(&moov);

        assert!(matches!(outcome.error, Some(DecodeError::Structural { offset: 16, .. })));
        assert_eq!(outcome.tree.count(), 2);
    }

    #[test]
    fn truncated_top_level_header() {
        let bytes = [boxed(b"ftyp", &[]), vec![0, 0, 0]].concat();
        let outcome = decode(&bytes);

        assert_eq!(outcome.tree.boxes.len(), 1);
        assert!(matches!(outcome.error, Some(DecodeError::TruncatedInput { offset: 8, .. })));
    }

    #[test]
    fn container_cut_short_by_end_of_stream() {
        let mut moov = boxed(b"moov", &boxed(b"mvhd", &[]));
        moov[3] = 64;
        let outcome = decode(&moov);

        assert!(matches!(outcome.error, Some(DecodeError::Structural { offset: 0, .. })));
        let moov = &outcome.tree.boxes[0];
        assert_eq!(moov.span, Span::new(0, 64));
        assert_eq!(moov.children().len(), 1);
        assert_eq!(moov.children()[0].box_type(), FourCC(*b"mvhd"));
    }

    #[test]
    fn container_overrun_with_trailing_partial_header() {
        let mut moov = boxed(b"moov", &[boxed(b"mvhd", &[]), vec![0; 3]].concat());
        moov[3] = 64;
        let outcome = decode(&moov);

        assert!(matches!(outcome.error, Some(DecodeError::Structural { offset: 0, .. })));
        assert_eq!(outcome.tree.count(), 2);
    }

    #[test]
    fn nested_container_overrun_keeps_ancestors() {
        let mut trak = boxed(b"trak", &boxed(b"tkhd", &[]));
        trak[3] = 48;
        let mut moov = boxed(b"moov", &trak);
        moov[3] = 56;
        let outcome = decode(&moov);

        assert!(matches!(outcome.error, Some(DecodeError::Structural { offset: 8, .. })));
        let trak = outcome.tree.find(&[b"moov", b"trak"]).unwrap();
        assert_eq!(trak.children().len(), 1);
    }

    #[test]
    fn depth_guard() {
        let mut nested = boxed(b"stbl", &[]);
        for tag in [b"minf", b"mdia", b"trak", b"moov"] {
            nested = boxed(tag, &nested);
        }

        let mut cursor = Cursor::from_slice(&nested);
        let outcome = BoxDecoder::new().with_max_depth(2).decode(&mut cursor);
        assert!(matches!(outcome.error, Some(DecodeError::Structural { offset: 24, .. })));
        assert_eq!(outcome.tree.count(), 3);

        let mut cursor = Cursor::from_slice(&nested);
        assert!(BoxDecoder::new().decode(&mut cursor).is_complete());
    }

    #[test]
    fn independent_decodes_match() {
        let bytes = [boxed(b"ftyp", b"mp42"), boxed(b"moov", &boxed(b"udta", &boxed(b"meta", &[7])))].concat();

        assert_eq!(decode(&bytes).tree, decode(&bytes).tree);
    }
}
