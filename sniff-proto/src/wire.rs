/// Fixed-width integer decoders and a bounds-checked cursor over borrowed bytes.
///
/// The decoders are total given enough input; callers check the length first.
/// The cursor is what the parser actually uses: every read is checked against
/// the bytes left and fails with [`ParseError::Truncated`] instead of reading
/// past the end.
use crate::error::ParseError;

// ── Decoders ─────────────────────────────────────────────────────────

/// Decode a 2-byte network-order integer from the start of `p`.
#[inline]
pub fn u16_be(p: &[u8]) -> u16 {
    u16::from_be_bytes([p[0], p[1]])
}

/// Decode a 3-byte network-order integer from the start of `p`.
#[inline]
pub fn u24_be(p: &[u8]) -> u32 {
    ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | (p[2] as u32)
}

// ── Cursor ───────────────────────────────────────────────────────────

/// Read position over a borrowed buffer.
///
/// `pos <= buf.len()` always holds, so `remaining()` never underflows.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Look at the unread bytes without consuming them.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Consume exactly `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(ParseError::Truncated {
                needed: n,
                remaining,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), ParseError> {
        self.take(n).map(|_| ())
    }

    /// Split off the next `n` bytes as an independent cursor.
    pub fn sub(&mut self, n: usize) -> Result<Cursor<'a>, ParseError> {
        self.take(n).map(Cursor::new)
    }

    pub fn u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, ParseError> {
        self.take(2).map(u16_be)
    }

    pub fn u24(&mut self) -> Result<u32, ParseError> {
        self.take(3).map(u24_be)
    }

    /// Skip a vector with a 1-byte length prefix, returning its body length.
    pub fn skip_vec_u8(&mut self) -> Result<usize, ParseError> {
        let len = self.u8()? as usize;
        self.skip(len)?;
        Ok(len)
    }

    /// Skip a vector with a 2-byte length prefix, returning its body length.
    pub fn skip_vec_u16(&mut self) -> Result<usize, ParseError> {
        let len = self.u16()? as usize;
        self.skip(len)?;
        Ok(len)
    }
}
