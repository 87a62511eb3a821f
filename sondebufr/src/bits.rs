use crate::errors::{Error, Result};

/// MSB-first cursor over the packed bits of section 4.
#[derive(Debug, Clone, Copy)]
pub struct BitInput<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitInput<'a> {
    pub fn new(data: &'a [u8]) -> BitInput<'a> {
        BitInput { data, pos: 0 }
    }

    /// Absolute bit offset of the cursor.
    pub fn pointer(&self) -> usize {
        self.pos
    }

    pub fn remaining_bits(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    #[inline]
    fn ensure(&self, nbits: usize) -> Result<()> {
        if nbits > self.remaining_bits() {
            return Err(Error::Truncated);
        }
        Ok(())
    }

    /// Up to 64 bits starting at `pos`, right-aligned. Caller checks bounds.
    #[inline]
    fn peek_at(&self, pos: usize, nbits: usize) -> u64 {
        if nbits == 0 {
            return 0;
        }
        let first = pos / 8;
        let total_bits = pos % 8 + nbits;
        let nbytes = total_bits.div_ceil(8);

        // Nine bytes at most, so a u128 holds the whole window
        let buffer = self.data[first..first + nbytes]
            .iter()
            .fold(0u128, |acc, &b| (acc << 8) | b as u128);
        let shift = nbytes * 8 - total_bits;
        let mask = if nbits == 64 {
            u64::MAX as u128
        } else {
            (1u128 << nbits) - 1
        };
        ((buffer >> shift) & mask) as u64
    }

    /// Read `nbits` as left-justified bytes: `ceil(nbits / 8)` of them, the
    /// first bit read in the MSB of the first byte, pad bits zero.
    pub fn read_bits(&mut self, nbits: usize) -> Result<Vec<u8>> {
        self.ensure(nbits)?;
        let mut out = Vec::with_capacity(nbits.div_ceil(8));

        // Fast path: byte-aligned reads copy straight out of the buffer
        if self.pos % 8 == 0 {
            let start = self.pos / 8;
            out.extend_from_slice(&self.data[start..start + nbits.div_ceil(8)]);
            let tail = nbits % 8;
            if tail != 0 {
                if let Some(last) = out.last_mut() {
                    *last &= 0xFFu8 << (8 - tail);
                }
            }
        } else {
            let mut pos = self.pos;
            let mut left = nbits;
            while left > 0 {
                let take = left.min(8);
                out.push((self.peek_at(pos, take) as u8) << (8 - take));
                pos += take;
                left -= take;
            }
        }

        self.pos += nbits;
        Ok(out)
    }

    /// Fused numeric read of up to 64 bits.
    #[inline]
    pub fn get_arbitary_bits(&mut self, nbits: usize) -> Result<u64> {
        if nbits > 64 {
            return Err(Error::ParseError(format!(
                "Cannot read {} bits into an integer",
                nbits
            )));
        }
        self.ensure(nbits)?;
        let value = self.peek_at(self.pos, nbits);
        self.pos += nbits;
        Ok(value)
    }

    pub fn take_string(&mut self, nbytes: usize) -> Result<String> {
        let bytes = self.read_bits(nbytes * 8)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Interpret a left-justified `nbits`-bit byte run as a big-endian unsigned
/// integer. `nbits` is at most 64.
pub fn bytes_to_value(bytes: &[u8], nbits: usize) -> u64 {
    let nbytes = nbits.div_ceil(8).min(bytes.len());
    let buffer = bytes[..nbytes]
        .iter()
        .fold(0u128, |acc, &b| (acc << 8) | b as u128);
    (buffer >> (nbytes * 8).saturating_sub(nbits)) as u64
}
