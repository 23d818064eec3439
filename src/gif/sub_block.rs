use crate::cursor::Cursor;
use crate::error::{DecodeError, Result, Span};
use crate::tree::{Inspect, Node};

use log::trace;

use std::io::{Read, Seek};

/// One length-prefixed data run. A zero-length block ends its chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubBlock {
    pub span: Span,
    pub data: Vec<u8>,
}

impl SubBlock {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_terminator(&self) -> bool {
        self.data.is_empty()
    }
}

/// Read sub-blocks up to and including the zero-length terminator.
pub fn read_chain<R: Read + Seek>(cursor: &mut Cursor<R>) -> Result<Vec<SubBlock>> {
    let start = cursor.position();
    let mut blocks = Vec::new();

    loop {
        let begin = cursor.position();
        if cursor.at_end() {
            return Err(DecodeError::UnterminatedSubBlockChain {
                start,
                offset: begin,
            });
        }

        let size = cursor.read_u8()?;
        let data = cursor.read_exact(size.into())?;
        blocks.push(SubBlock {
            span: Span::new(begin, cursor.position()),
            data,
        });

        if size == 0 {
            break;
        }
    }

    trace!("read {} sub-blocks in [{start}, {})", blocks.len(), cursor.position());
    Ok(blocks)
}

/// Concatenated payload of a chain, terminator excluded.
pub(crate) fn payload(blocks: &[SubBlock]) -> Vec<u8> {
    blocks.iter().flat_map(|block| block.data.iter().copied()).collect()
}

impl Inspect for SubBlock {
    fn inspect(&self) -> Node {
        Node::new("SubBlock", self.span)
            .field("size", self.len())
            .bytes("data", &self.data)
    }
}

/// Summary node for a chain; individual blocks are children.
pub(crate) fn inspect_chain(kind: &'static str, blocks: &[SubBlock]) -> Node {
    let span = match (blocks.first(), blocks.last()) {
        (Some(first), Some(last)) => Span::new(first.span.begin, last.span.end),
        _ => Span::default(),
    };

    Node::new(kind, span)
        .field("blocks", blocks.len())
        .field("bytes", blocks.iter().map(SubBlock::len).sum::<usize>())
        .children(blocks.iter().map(Inspect::inspect))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_stops_at_zero_length_block() {
        let bytes = [0x03, b'a', b'b', b'c', 0x01, b'd', 0x00, 0xff];
        let mut cursor = Cursor::from_slice(&bytes);
        let blocks = read_chain(&mut cursor).unwrap();

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].data, b"abc");
        assert_eq!(blocks[0].span, Span::new(0, 4));
        assert!(blocks[2].is_terminator());
        assert_eq!(payload(&blocks), b"abcd");

        // consumed = 1 + sum(1 + len) over non-terminal blocks
        let expected: usize = 1 + blocks[..2].iter().map(|block| 1 + block.len()).sum::<usize>();
        assert_eq!(cursor.position(), expected as u64);
    }

    #[test]
    fn lone_terminator_is_a_chain() {
        let mut cursor = Cursor::from_slice(&[0x00]);
        let blocks = read_chain(&mut cursor).unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].len(), 0);
        assert!(blocks[0].is_empty());
        assert!(cursor.at_end());
    }

    #[test]
    fn missing_terminator() {
        let mut cursor = Cursor::from_slice(&[0x02, 1, 2]);

        assert!(matches!(
            read_chain(&mut cursor),
            Err(DecodeError::UnterminatedSubBlockChain { start: 0, offset: 3 })
        ));
    }

    #[test]
    fn block_longer_than_input() {
        let mut cursor = Cursor::from_slice(&[0x05, 1, 2]);

        assert!(matches!(
            read_chain(&mut cursor),
            Err(DecodeError::TruncatedInput { offset: 1, needed: 5, available: 2 })
        ));
    }
}
