use crate::error::{DecodeError, Result};

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use std::io::{Read, Seek, SeekFrom};

/// Seekable byte reader that knows its offset and how much is left.
///
/// Every read is checked against the remaining length before touching the
/// underlying reader, so short input is reported as [`DecodeError::TruncatedInput`]
/// with the offset where it happened instead of a bare `UnexpectedEof`.
///
/// Peeked bytes are held until consumed rather than seeked back over, so a
/// `BufReader` underneath keeps its buffer across lookahead.
#[derive(Debug)]
pub struct Cursor<R> {
    inner: R,
    // absolute stream position that offset 0 maps to
    base: u64,
    position: u64,
    len: u64,
    // read from `inner` by `peek`, not yet consumed
    pending: Vec<u8>,
}

impl<R: Read + Seek> Cursor<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let base = inner.stream_position()?;
        let end = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(base))?;

        Ok(Self {
            inner,
            base,
            position: 0,
            len: end.saturating_sub(base),
            pending: Vec::new(),
        })
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn remaining(&self) -> u64 {
        self.len - self.position
    }

    pub fn at_end(&self) -> bool {
        self.position >= self.len
    }

    pub fn read_exact(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0; count];
        self.fill(&mut buffer)?;
        Ok(buffer)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buffer = [0; N];
        self.fill(&mut buffer)?;
        Ok(buffer)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    // GIF: multi-byte numeric fields are least significant byte first.
    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(&self.read_array::<2>()?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(&self.read_array::<4>()?))
    }

    pub fn peek_byte(&mut self) -> Result<u8> {
        let bytes = self.peek(1)?;
        Ok(bytes[0])
    }

    /// Look at the next `count` bytes without consuming them.
    pub fn peek(&mut self, count: usize) -> Result<Vec<u8>> {
        if count as u64 > self.remaining() {
            return Err(DecodeError::EndOfInput {
                offset: self.position,
                wanted: count as u64,
            });
        }

        let buffered = self.pending.len();
        if count > buffered {
            self.pending.resize(count, 0);
            if let Err(error) = self.inner.read_exact(&mut self.pending[buffered..]) {
                self.pending.truncate(buffered);
                return Err(error.into());
            }
        }

        Ok(self.pending[..count].to_vec())
    }

    pub fn skip(&mut self, count: u64) -> Result<()> {
        self.ensure(count)?;

        let buffered = self.pending.len() as u64;
        if count <= buffered {
            self.pending.drain(..count as usize);
        } else {
            self.pending.clear();
            self.inner
                .seek(SeekFrom::Start(self.base + self.position + count))?;
        }
        self.position += count;
        Ok(())
    }

    /// Fill `buffer` from peeked bytes first, then from the reader.
    fn fill(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.ensure(buffer.len() as u64)?;

        let from_pending = buffer.len().min(self.pending.len());
        buffer[..from_pending].copy_from_slice(&self.pending[..from_pending]);
        self.inner.read_exact(&mut buffer[from_pending..])?;
        self.pending.drain(..from_pending);

        self.position += buffer.len() as u64;
        Ok(())
    }

    fn ensure(&self, count: u64) -> Result<()> {
        let available = self.remaining();
        if count > available {
            return Err(DecodeError::TruncatedInput {
                offset: self.position,
                needed: count,
                available,
            });
        }
        Ok(())
    }
}

impl<'a> Cursor<std::io::Cursor<&'a [u8]>> {
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self {
            inner: std::io::Cursor::new(bytes),
            base: 0,
            position: 0,
            len: bytes.len() as u64,
            pending: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cursor;
    use crate::error::DecodeError;

    #[test]
    fn reads_track_position() {
        let mut cursor = Cursor::from_slice(&[0x01, 0x34, 0x12, 0x00, 0x00, 0x00, 0x08]);

        assert_eq!(cursor.read_u8().unwrap(), 0x01);
        assert_eq!(cursor.read_u16_le().unwrap(), 0x1234);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.read_u32_be().unwrap(), 8);
        assert!(cursor.at_end());
    }

    #[test]
    fn peek_does_not_advance() {
        let mut cursor = Cursor::from_slice(b"GIF89a");
        cursor.skip(1).unwrap();

        assert_eq!(cursor.peek(2).unwrap(), b"IF");
        assert_eq!(cursor.peek_byte().unwrap(), b'I');
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.read_exact(5).unwrap(), b"IF89a");
    }

    #[test]
    fn peek_past_end_is_end_of_input() {
        let mut cursor = Cursor::from_slice(&[0x21]);

        assert!(matches!(
            cursor.peek(2),
            Err(DecodeError::EndOfInput { offset: 0, wanted: 2 })
        ));
        assert_eq!(cursor.position(), 0);

        cursor.skip(1).unwrap();
        assert!(matches!(cursor.peek_byte(), Err(DecodeError::EndOfInput { .. })));
    }

    #[test]
    fn short_reads_are_truncated_input() {
        let mut cursor = Cursor::from_slice(&[1, 2, 3]);

        assert!(matches!(
            cursor.read_exact(4),
            Err(DecodeError::TruncatedInput { offset: 0, needed: 4, available: 3 })
        ));
        assert!(matches!(cursor.skip(4), Err(DecodeError::TruncatedInput { .. })));
        // failed reads leave the cursor where it was
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_array::<3>().unwrap(), [1, 2, 3]);
    }

    #[test]
    fn new_starts_at_current_position() {
        let mut inner = std::io::Cursor::new(vec![9, 8, 7, 6]);
        inner.set_position(2);
        let mut cursor = Cursor::new(inner).unwrap();

        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.read_u8().unwrap(), 7);
        assert_eq!(cursor.peek_byte().unwrap(), 6);
    }

    /// Counts seeks so lookahead can be checked not to disturb the reader.
    struct SeekCounter {
        inner: std::io::Cursor<Vec<u8>>,
        seeks: usize,
    }

    impl std::io::Read for SeekCounter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl std::io::Seek for SeekCounter {
        fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
            self.seeks += 1;
            self.inner.seek(pos)
        }
    }

    #[test]
    fn lookahead_never_seeks() {
        let inner = SeekCounter {
            inner: std::io::Cursor::new(vec![0x21, 0xf9, 0x04, 0x00, 0x0a, 0x00]),
            seeks: 0,
        };
        let mut cursor = Cursor::new(inner).unwrap();
        let seeks_after_open = cursor.inner.seeks;

        assert_eq!(cursor.peek_byte().unwrap(), 0x21);
        assert_eq!(cursor.peek(2).unwrap(), [0x21, 0xf9]);
        assert_eq!(cursor.peek(3).unwrap(), [0x21, 0xf9, 0x04]);
        assert_eq!(cursor.read_u8().unwrap(), 0x21);
        assert_eq!(cursor.peek(1).unwrap(), [0xf9]);
        cursor.skip(2).unwrap();
        assert_eq!(cursor.read_u8().unwrap(), 0x00);
        assert_eq!(cursor.read_u16_le().unwrap(), 10);

        assert_eq!(cursor.inner.seeks, seeks_after_open);
        assert!(cursor.at_end());
    }

    #[test]
    fn skip_past_peeked_bytes() {
        let mut cursor = Cursor::from_slice(&[1, 2, 3, 4, 5, 6]);

        assert_eq!(cursor.peek(2).unwrap(), [1, 2]);
        cursor.skip(4).unwrap();
        assert_eq!(cursor.position(), 4);
        assert_eq!(cursor.read_exact(2).unwrap(), [5, 6]);
    }
}
