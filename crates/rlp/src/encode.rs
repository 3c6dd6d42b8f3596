use crate::traits::Encode;
use bytes::{BufMut, BytesMut};

const STRING_OFFSET: u8 = 0x80;
const LIST_OFFSET: u8 = 0xc0;

#[derive(Debug, Default)]
pub struct Encoder {
    buffer: BytesMut,
}

impl Encoder {
    pub fn new() -> Self {
        Encoder {
            buffer: BytesMut::new(),
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    pub fn encode_bytes(&mut self, bytes: &[u8]) {
        if bytes.len() == 1 && bytes[0] < STRING_OFFSET {
            self.buffer.put_u8(bytes[0]);
        } else {
            self.put_header(STRING_OFFSET, bytes.len());
            self.buffer.extend_from_slice(bytes);
        }
    }

    /// Big-endian integer with leading zeros stripped; zero is the empty string.
    pub fn encode_u64(&mut self, value: u64) {
        let bytes = value.to_be_bytes();
        let first_non_zero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        self.encode_bytes(&bytes[first_non_zero..]);
    }

    pub fn encode_list<T: Encode>(&mut self, items: &[T]) {
        self.encode_list_with(|list| {
            for item in items {
                item.encode(list);
            }
        });
    }

    /// Writes a list whose payload is produced by `f`.
    pub fn encode_list_with<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Encoder),
    {
        let mut payload = Encoder::new();
        f(&mut payload);
        self.put_header(LIST_OFFSET, payload.buffer.len());
        self.buffer.extend_from_slice(&payload.buffer);
    }

    /// Appends an already encoded item verbatim.
    pub fn append_raw(&mut self, encoded: &[u8]) {
        self.buffer.extend_from_slice(encoded);
    }

    fn put_header(&mut self, offset: u8, len: usize) {
        if len < 56 {
            self.buffer.put_u8(offset + len as u8);
        } else {
            let len_bytes = (len as u64).to_be_bytes();
            let first_non_zero = len_bytes.iter().position(|&b| b != 0).unwrap_or(7);
            let len_bytes = &len_bytes[first_non_zero..];
            self.buffer.put_u8(offset + 55 + len_bytes.len() as u8);
            self.buffer.extend_from_slice(len_bytes);
        }
    }
}
