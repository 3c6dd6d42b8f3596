use crate::{Decoder, Encoder, RlpError};
use ethereum_types::{Address, Bloom, Bytes, UintExt, H256, U256};

pub trait Encode {
    fn encode(&self, encoder: &mut Encoder);
}

pub trait Decode: Sized {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError>;
}

impl Encode for u64 {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_u64(*self);
    }
}

impl Decode for u64 {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        decoder.decode_u64()
    }
}

impl Encode for [u8] {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bytes(self);
    }
}

impl Encode for Bytes {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bytes(self.as_slice());
    }
}

impl Decode for Bytes {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        Ok(Bytes::from_slice(decoder.decode_bytes()?))
    }
}

/// Byte strings are `Bytes` or `[u8]`; a `Vec<T>` is always a list.
impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_list(self);
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        decoder.decode_list()
    }
}

/// Absent values (a contract-creation recipient) encode as the empty string.
impl Encode for Option<Address> {
    fn encode(&self, encoder: &mut Encoder) {
        match self {
            Some(address) => address.encode(encoder),
            None => encoder.encode_bytes(&[]),
        }
    }
}

impl Decode for Option<Address> {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        let bytes = decoder.decode_bytes()?;
        if bytes.is_empty() {
            Ok(None)
        } else {
            Address::from_slice(bytes)
                .map(Some)
                .map_err(|_| RlpError::InvalidLength {
                    what: "address",
                    actual: bytes.len(),
                })
        }
    }
}

impl Encode for Address {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bytes(self.as_bytes());
    }
}

impl Decode for Address {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        let bytes = decoder.decode_bytes()?;
        Address::from_slice(bytes).map_err(|_| RlpError::InvalidLength {
            what: "address",
            actual: bytes.len(),
        })
    }
}

impl Encode for H256 {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bytes(self.as_bytes());
    }
}

impl Decode for H256 {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        let bytes = decoder.decode_bytes()?;
        if bytes.len() != 32 {
            return Err(RlpError::InvalidLength {
                what: "hash",
                actual: bytes.len(),
            });
        }
        Ok(H256::from_slice(bytes))
    }
}

impl Encode for U256 {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bytes(&self.to_be_bytes_trimmed());
    }
}

impl Decode for U256 {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        let bytes = decoder.decode_bytes()?;
        if bytes.len() > 32 {
            return Err(RlpError::IntegerOverflow);
        }
        if bytes.first() == Some(&0) {
            return Err(RlpError::LeadingZeros);
        }
        Ok(U256::from_be_slice(bytes))
    }
}

impl Encode for Bloom {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bytes(self.as_bytes());
    }
}

impl Decode for Bloom {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        let bytes = decoder.decode_bytes()?;
        Bloom::from_slice(bytes).map_err(|_| RlpError::InvalidLength {
            what: "bloom",
            actual: bytes.len(),
        })
    }
}
