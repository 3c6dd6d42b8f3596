//! Recursive length prefix codec.
//!
//! Scalars go through [`Encode`]/[`Decode`]; structures write their fields
//! inside [`Encoder::encode_list_with`] and read them back inside
//! [`Decoder::decode_list_with`].

pub mod decode;
pub mod encode;
pub mod error;
pub mod traits;

pub use decode::Decoder;
pub use encode::Encoder;
pub use error::RlpError;
pub use traits::{Decode, Encode};

pub fn encode<T: Encode + ?Sized>(value: &T) -> Vec<u8> {
    let mut encoder = Encoder::new();
    value.encode(&mut encoder);
    encoder.finish()
}

/// Decodes exactly one item; trailing input is an error.
pub fn decode<T: Decode>(data: &[u8]) -> Result<T, RlpError> {
    let mut decoder = Decoder::new(data);
    let value = T::decode(&mut decoder)?;
    decoder.finish()?;
    Ok(value)
}
