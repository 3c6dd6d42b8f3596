use crate::traits::Decode;
use crate::RlpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    List,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::List => "list",
        }
    }
}

/// Cursor over a byte slice holding a sequence of RLP items.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Decoder { data, position: 0 }
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Errors if input remains.
    pub fn finish(&self) -> Result<(), RlpError> {
        if self.is_finished() {
            Ok(())
        } else {
            Err(RlpError::TrailingBytes(self.data.len() - self.position))
        }
    }

    pub fn decode_bytes(&mut self) -> Result<&'a [u8], RlpError> {
        self.take(Kind::String)
    }

    pub fn decode_u64(&mut self) -> Result<u64, RlpError> {
        let bytes = self.decode_bytes()?;
        if bytes.len() > 8 {
            return Err(RlpError::IntegerOverflow);
        }
        if bytes.first() == Some(&0) {
            return Err(RlpError::LeadingZeros);
        }
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    pub fn decode_list<T: Decode>(&mut self) -> Result<Vec<T>, RlpError> {
        self.decode_list_with(|list| {
            let mut items = Vec::new();
            while !list.is_finished() {
                items.push(T::decode(list)?);
            }
            Ok(items)
        })
    }

    /// Runs `f` over the payload of the next list item, which `f` must
    /// consume exactly.
    pub fn decode_list_with<T, F>(&mut self, f: F) -> Result<T, RlpError>
    where
        F: FnOnce(&mut Decoder<'a>) -> Result<T, RlpError>,
    {
        let payload = self.take(Kind::List)?;
        let mut inner = Decoder::new(payload);
        let value = f(&mut inner)?;
        inner.finish()?;
        Ok(value)
    }

    /// Returns the raw encoding of the next item without interpreting it.
    pub fn raw_item(&mut self) -> Result<&'a [u8], RlpError> {
        let start = self.position;
        let (header, len, _) = self.header()?;
        self.skip(header + len)?;
        Ok(&self.data[start..self.position])
    }

    fn take(&mut self, expected: Kind) -> Result<&'a [u8], RlpError> {
        let (header, len, kind) = self.header()?;
        if kind != expected {
            return Err(RlpError::UnexpectedKind {
                expected: expected.name(),
                found: kind.name(),
            });
        }
        let start = self.position + header;
        self.skip(header + len)?;
        Ok(&self.data[start..start + len])
    }

    fn skip(&mut self, n: usize) -> Result<(), RlpError> {
        let end = self.position.checked_add(n).ok_or(RlpError::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(RlpError::UnexpectedEof);
        }
        self.position = end;
        Ok(())
    }

    /// (header length, payload length, kind)
    fn header(&self) -> Result<(usize, usize, Kind), RlpError> {
        let prefix = *self.data.get(self.position).ok_or(RlpError::UnexpectedEof)?;
        match prefix {
            0x00..=0x7f => Ok((0, 1, Kind::String)),
            0x80..=0xb7 => {
                let len = (prefix - 0x80) as usize;
                if len == 1 {
                    match self.data.get(self.position + 1) {
                        Some(&b) if b < 0x80 => return Err(RlpError::NonCanonicalSize),
                        _ => {}
                    }
                }
                Ok((1, len, Kind::String))
            }
            0xb8..=0xbf => {
                let len_of_len = (prefix - 0xb7) as usize;
                Ok((1 + len_of_len, self.long_length(len_of_len)?, Kind::String))
            }
            0xc0..=0xf7 => Ok((1, (prefix - 0xc0) as usize, Kind::List)),
            0xf8..=0xff => {
                let len_of_len = (prefix - 0xf7) as usize;
                Ok((1 + len_of_len, self.long_length(len_of_len)?, Kind::List))
            }
        }
    }

    fn long_length(&self, len_of_len: usize) -> Result<usize, RlpError> {
        let start = self.position + 1;
        let bytes = self
            .data
            .get(start..start + len_of_len)
            .ok_or(RlpError::UnexpectedEof)?;
        if bytes[0] == 0 {
            return Err(RlpError::LeadingZeros);
        }
        if len_of_len > 8 {
            return Err(RlpError::IntegerOverflow);
        }
        let len = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
        if len < 56 {
            return Err(RlpError::NonCanonicalSize);
        }
        usize::try_from(len).map_err(|_| RlpError::IntegerOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::Bytes;

    #[test]
    fn test_decode_single_byte() {
        let mut decoder = Decoder::new(&[0x00, 0x7f]);
        assert_eq!(decoder.decode_bytes().unwrap(), &[0x00]);
        assert_eq!(decoder.decode_bytes().unwrap(), &[0x7f]);
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_decode_string() {
        let mut decoder = Decoder::new(&[0x83, b'd', b'o', b'g']);
        assert_eq!(decoder.decode_bytes().unwrap(), b"dog");
    }

    #[test]
    fn test_decode_list() {
        let data = [0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g'];
        let mut decoder = Decoder::new(&data);
        let items: Vec<Bytes> = decoder.decode_list().unwrap();
        assert_eq!(items, vec![Bytes::from_slice(b"cat"), Bytes::from_slice(b"dog")]);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            Decoder::new(&[0x83, b'd']).decode_bytes(),
            Err(RlpError::UnexpectedEof)
        );
        assert_eq!(
            Decoder::new(&[0x81, 0x05]).decode_bytes(),
            Err(RlpError::NonCanonicalSize)
        );
        assert!(matches!(
            Decoder::new(&[0xc0]).decode_bytes(),
            Err(RlpError::UnexpectedKind { .. })
        ));
        assert_eq!(
            Decoder::new(&[0x82, 0x00, 0x01]).decode_u64(),
            Err(RlpError::LeadingZeros)
        );
    }

    #[test]
    fn test_list_must_be_consumed() {
        let data = [0xc2, 0x01, 0x02];
        let mut decoder = Decoder::new(&data);
        let result = decoder.decode_list_with(|list| list.decode_u64());
        assert_eq!(result, Err(RlpError::TrailingBytes(1)));
    }

    #[test]
    fn test_raw_item() {
        let data = [0xc2, 0x01, 0x02, 0x83, b'a', b'b', b'c'];
        let mut decoder = Decoder::new(&data);
        assert_eq!(decoder.raw_item().unwrap(), &[0xc2, 0x01, 0x02]);
        assert_eq!(decoder.raw_item().unwrap(), &[0x83, b'a', b'b', b'c']);
    }
}
