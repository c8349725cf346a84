use thiserror::Error;

/// Why a decode stage stopped early.
///
/// None of these escape the tag extractor; they are collected as issues next to the
/// best-effort record.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unreadable: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("declared size {declared} exceeds {available} available bytes")]
    Truncated { declared: usize, available: usize },

    #[error("read of {requested} bytes at offset {offset} runs past {len}-byte buffer")]
    OutOfRange {
        offset: usize,
        requested: usize,
        len: usize,
    },

    #[error("malformed {0}")]
    Malformed(&'static str),
}

/// Sequential reader over a borrowed byte buffer. Every read is bounds checked.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let bytes = self.peek_at(self.pos, n)?;
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u24_be(&mut self) -> Result<u32, DecodeError> {
        let [a, b, c] = self.read_array::<3>()?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array::<4>()?))
    }

    pub fn read_syncsafe_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(syncsafe_u32(self.read_array::<4>()?))
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.read_bytes(n).map(|_| ())
    }

    /// Non-consuming read at an absolute offset.
    pub fn peek_at(&self, offset: usize, n: usize) -> Result<&'a [u8], DecodeError> {
        offset
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .map(|end| &self.buf[offset..end])
            .ok_or(DecodeError::OutOfRange {
                offset,
                requested: n,
                len: self.buf.len(),
            })
    }

    /// Consumes and returns everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let tail = &self.buf[self.pos..];
        self.pos = self.buf.len();
        tail
    }
}

/// Decodes a 28-bit syncsafe integer: only the low 7 bits of each byte count,
/// most significant byte first.
pub fn syncsafe_u32(bytes: [u8; 4]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, byte| (acc << 7) | u32::from(byte & 0x7f))
}
