//! DAG-CBOR message codec.
//!
//! CBOR values are self-delimiting, so messages go on the wire back to back
//! with no length prefix. The decoder scans the buffered bytes for one complete
//! data item before handing it to the deserializer.

use std::marker::PhantomData;

use bytes::BytesMut;
use serde::{Serialize, de::DeserializeOwned};

mod frame;
pub use frame::{FrameError, item_len};

/// Errors produced by [`CborCodec`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("cbor encode failed: {0}")]
    Encode(String),
    #[error("cbor decode failed: {0}")]
    Decode(String),
    #[error("malformed cbor frame: {0}")]
    Frame(#[from] FrameError),
    #[error("message of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: usize, max: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<std::convert::Infallible> for CodecError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// Codec translating `Protocol` values through their CBOR wire form `Wire`.
pub struct CborCodec<Wire, Protocol, E> {
    max_message_size: usize,
    _marker: PhantomData<(Wire, Protocol, E)>,
}

impl<Wire, Protocol, E> CborCodec<Wire, Protocol, E> {
    pub fn new(max_message_size: usize) -> Self {
        Self { max_message_size, _marker: PhantomData }
    }
}

impl<Wire, Protocol, E> asynchronous_codec::Encoder for CborCodec<Wire, Protocol, E>
where
    Wire: Serialize,
    Protocol: Into<Wire>,
    E: From<CodecError> + From<std::io::Error>,
{
    type Item<'a> = Protocol;
    type Error = E;

    fn encode(&mut self, item: Self::Item<'_>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = fvm_ipld_encoding::to_vec(&item.into())
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        if bytes.len() > self.max_message_size {
            return Err(
                CodecError::TooLarge { size: bytes.len(), max: self.max_message_size }.into()
            );
        }
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

impl<Wire, Protocol, PE, E> asynchronous_codec::Decoder for CborCodec<Wire, Protocol, E>
where
    Wire: DeserializeOwned,
    Protocol: TryFrom<Wire, Error = PE>,
    PE: Into<E>,
    E: From<CodecError> + From<std::io::Error>,
{
    type Item = Protocol;
    type Error = E;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(len) = item_len(src, self.max_message_size).map_err(CodecError::from)? else {
            return Ok(None);
        };

        let frame = src.split_to(len);
        let wire: Wire = fvm_ipld_encoding::from_slice(&frame)
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        Protocol::try_from(wire).map(Some).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asynchronous_codec::{Decoder, Encoder, Framed};
    use assert_matches::assert_matches;
    use futures::{SinkExt, TryStreamExt, io::Cursor};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ping {
        #[serde(rename = "Seq")]
        seq: u64,
        #[serde(rename = "Note")]
        note: String,
    }

    type PingCodec = CborCodec<Ping, Ping, CodecError>;

    #[test]
    fn test_decode_waits_for_complete_item() {
        let mut codec = PingCodec::new(1024);
        let mut encoded = BytesMut::new();
        codec.encode(Ping { seq: 7, note: "hello".into() }, &mut encoded).unwrap();

        let mut partial = BytesMut::from(&encoded[..encoded.len() - 1]);
        assert_matches!(codec.decode(&mut partial), Ok(None));

        let mut full = encoded.clone();
        full.extend_from_slice(&[0x01]);
        let ping = codec.decode(&mut full).unwrap().unwrap();
        assert_eq!(ping, Ping { seq: 7, note: "hello".into() });
        // trailing bytes stay buffered for the next frame
        assert_eq!(&full[..], &[0x01]);
    }

    #[test]
    fn test_encode_rejects_oversized() {
        let mut codec = PingCodec::new(8);
        let mut dst = BytesMut::new();
        assert_matches!(
            codec.encode(Ping { seq: 1, note: "far too long".into() }, &mut dst),
            Err(CodecError::TooLarge { max: 8, .. })
        );
        assert!(dst.is_empty());
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let mut codec = PingCodec::new(1024);
        let mut src = BytesMut::from(&[0x83, 0x01, 0x02, 0x03][..]);
        assert_matches!(codec.decode(&mut src), Err(CodecError::Decode(_)));
    }

    #[tokio::test]
    async fn test_framed_back_to_back() {
        let mut framed = Framed::new(Cursor::new(Vec::new()), PingCodec::new(1024));
        framed.send(Ping { seq: 1, note: "a".into() }).await.unwrap();
        framed.send(Ping { seq: 2, note: "b".into() }).await.unwrap();

        let mut io = framed.into_inner();
        io.set_position(0);
        let mut framed = Framed::new(io, PingCodec::new(1024));
        assert_eq!(framed.try_next().await.unwrap().unwrap().seq, 1);
        assert_eq!(framed.try_next().await.unwrap().unwrap().seq, 2);
    }
}
