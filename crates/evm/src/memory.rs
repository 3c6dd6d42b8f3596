use crate::error::EvmResult;
use crate::execution::HaltReason;
use ethereum_types::U256;

/// Byte-addressed frame memory. Grows in whole 32-byte words; bytes past the
/// materialized end read as zero.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    data: Vec<u8>,
}

/// Round up to a multiple of 32.
fn to_word_boundary(size: usize) -> usize {
    size.div_ceil(32) * 32
}

/// Byte size memory must reach to cover `[offset, offset + len)`.
///
/// A zero length never requires growth, whatever the offset. Ranges whose
/// end does not fit a `usize` can never be paid for and halt with
/// out-of-gas.
pub fn required_size(offset: U256, len: U256) -> EvmResult<usize> {
    if len.is_zero() {
        return Ok(0);
    }
    let end = offset
        .checked_add(len)
        .filter(|end| end.bits() <= 63)
        .ok_or(HaltReason::OutOfGas)?;
    Ok(end.low_u64() as usize)
}

impl Memory {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn words(&self) -> usize {
        self.data.len() / 32
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Grows to cover `size` bytes, rounded up to a word boundary. Never
    /// shrinks. The caller bills the growth first.
    pub fn expand(&mut self, size: usize) {
        let new_size = to_word_boundary(size);
        if new_size > self.data.len() {
            self.data.resize(new_size, 0);
        }
    }

    /// Copy of `[offset, offset + len)`, zero-padded past the end.
    pub fn read(&self, offset: usize, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        if offset < self.data.len() {
            let end = offset.saturating_add(len).min(self.data.len());
            out[..end - offset].copy_from_slice(&self.data[offset..end]);
        }
        out
    }

    pub fn read_word(&self, offset: usize) -> U256 {
        U256::from_big_endian(&self.read(offset, 32))
    }

    pub fn write(&mut self, offset: usize, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let end = offset + bytes.len();
        self.expand(end);
        self.data[offset..end].copy_from_slice(bytes);
    }

    pub fn write_byte(&mut self, offset: usize, byte: u8) {
        self.expand(offset + 1);
        self.data[offset] = byte;
    }

    pub fn write_word(&mut self, offset: usize, value: U256) {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        self.write(offset, &bytes);
    }

    /// Writes `len` bytes of `source` starting at `source_offset`, padding
    /// with zeros where the source runs out. Backs the *COPY instructions.
    pub fn copy_padded(&mut self, offset: usize, source: &[u8], source_offset: U256, len: usize) {
        if len == 0 {
            return;
        }
        let mut chunk = vec![0u8; len];
        if source_offset < U256::from(source.len()) {
            let start = source_offset.low_u64() as usize;
            let available = (source.len() - start).min(len);
            chunk[..available].copy_from_slice(&source[start..start + available]);
        }
        self.write(offset, &chunk);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}
