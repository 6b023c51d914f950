// Copyright © 2026 msgpack-rpc-core Contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the “Software”), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

//! # CODEC
//!
//! The default [DecodeStream]/[EncodeStream] pair, turning a byte stream
//! into a stream of decoded [Value]s and back.
//!
//! `semi_e37::primitive::Client` frames each [Message] with an explicit
//! four-byte length prefix before the body, since SECS-II messages are not
//! otherwise self-delimiting on the wire. MessagePack values are
//! self-delimiting by construction, so [MessagePackCodec] needs no length
//! prefix of its own; it instead attempts to decode one [Value] from
//! whatever has accumulated in the buffer and reports
//! [InsufficientBufferData] the same way `primitive::Client::receive`'s
//! loop kept reading until a full frame was available.
//!
//! [Value]:          rmpv::Value
//! [Message]:        crate::message::Message
//! [DecodeStream]:    MessagePackCodec
//! [EncodeStream]:    MessagePackCodec

use crate::error::RpcError;
use bytes::{Buf, BytesMut};
use rmpv::decode::read_value;
use rmpv::Value;
use tokio_util::codec::{Decoder, Encoder};

/// ## MESSAGEPACK CODEC
///
/// A `tokio_util` [Decoder]/[Encoder] pair reading and writing raw
/// MessagePack [Value]s. Message-shape validation (telling a [Request]
/// apart from noise) happens one layer up, in [Classify Procedure]; this
/// codec only concerns itself with the MessagePack binary format.
///
/// [Decoder]:             tokio_util::codec::Decoder
/// [Encoder]:             tokio_util::codec::Encoder
/// [Value]:                rmpv::Value
/// [Request]:              crate::message::Message::Request
/// [Classify Procedure]:  crate::message::Message::classify
#[derive(Debug, Default, Clone, Copy)]
pub struct MessagePackCodec;

impl MessagePackCodec {
    /// Creates a [MessagePackCodec].
    ///
    /// [MessagePackCodec]: MessagePackCodec
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for MessagePackCodec {
    type Item = Value;
    type Error = RpcError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Value>, RpcError> {
        if src.is_empty() {
            return Ok(None);
        }
        // `rmpv` reads directly from the buffer's byte slice; on a short
        // read it reports an I/O error of kind UnexpectedEof, which we
        // read as "wait for more bytes", mirroring how
        // `primitive::Client::receive` treated a short length-prefixed
        // read as "keep reading" rather than a hard failure.
        let mut cursor = &src[..];
        let before = cursor.len();
        match read_value(&mut cursor) {
            Ok(value) => {
                let consumed = before - cursor.len();
                src.advance(consumed);
                Ok(Some(value))
            }
            Err(rmpv::decode::Error::InvalidMarkerRead(e))
            | Err(rmpv::decode::Error::InvalidDataRead(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                Ok(None)
            }
            Err(e) => Err(RpcError::Decode(e.to_string())),
        }
    }
}

impl Encoder<Value> for MessagePackCodec {
    type Error = RpcError;

    fn encode(&mut self, item: Value, dst: &mut BytesMut) -> Result<(), RpcError> {
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &item)
            .map_err(|e| RpcError::Decode(e.to_string()))?;
        dst.extend_from_slice(&buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    #[tokio::test]
    async fn round_trips_a_value_through_the_codec() {
        let (client, server) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(client);
        let (server_read, server_write) = tokio::io::split(server);

        let mut writer = FramedWrite::new(write_half, MessagePackCodec::new());
        let mut reader = FramedRead::new(server_read, MessagePackCodec::new());
        drop(read_half);
        drop(server_write);

        let value = Value::Array(vec![Value::from(0), Value::from(1u32), Value::from("sum")]);
        writer.send(value.clone()).await.unwrap();
        let decoded = reader.next().await.unwrap().unwrap();
        assert_eq!(decoded, value);
    }

    #[tokio::test]
    async fn decodes_two_back_to_back_values_from_one_buffer() {
        let (client, server) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(client);
        let (server_read, server_write) = tokio::io::split(server);

        let mut writer = FramedWrite::new(write_half, MessagePackCodec::new());
        let mut reader = FramedRead::new(server_read, MessagePackCodec::new());
        drop(read_half);
        drop(server_write);

        writer.send(Value::from(1)).await.unwrap();
        writer.send(Value::from(2)).await.unwrap();

        assert_eq!(reader.next().await.unwrap().unwrap(), Value::from(1));
        assert_eq!(reader.next().await.unwrap().unwrap(), Value::from(2));
    }
}
