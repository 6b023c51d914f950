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

//! # MESSAGE
//!
//! Defines the three tagged tuple shapes of MessagePack-RPC: [Request],
//! [Response], and [Notification], along with the [Classify Procedure]
//! that tells a decoded [Value] apart from noise on the wire.
//!
//! [Request]:            Message::Request
//! [Response]:           Message::Response
//! [Notification]:       Message::Notification
//! [Classify Procedure]: Message::classify

use rmpv::Value;

/// ### REQUEST TAG
const TAG_REQUEST: u8 = 0;
/// ### RESPONSE TAG
const TAG_RESPONSE: u8 = 1;
/// ### NOTIFICATION TAG
const TAG_NOTIFICATION: u8 = 2;

/// ## MESSAGE
///
/// A single MessagePack-RPC message, in one of the three wire shapes:
///
/// | Variant        | Tag | Shape                                               |
/// |----------------|-----|------------------------------------------------------|
/// | [Request]      | 0   | `[0, msgid, method, params]`                          |
/// | [Response]     | 1   | `[1, msgid, error, result]`                           |
/// | [Notification] | 2   | `[2, method, params]`                                 |
///
/// [Request]:      Message::Request
/// [Response]:     Message::Response
/// [Notification]: Message::Notification
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// ### REQUEST
    ///
    /// A call awaiting a [Response], correlated by `id`.
    ///
    /// [Response]: Message::Response
    Request {
        id: u32,
        method: String,
        params: Vec<Value>,
    },

    /// ### RESPONSE
    ///
    /// The reply to a [Request], carrying either a non-null `error` or a
    /// non-null `result`, by convention — this is not enforced on decode
    /// (see [Classify Procedure]).
    ///
    /// [Request]:            Message::Request
    /// [Classify Procedure]: Message::classify
    Response {
        id: u32,
        error: Option<Value>,
        result: Option<Value>,
    },

    /// ### NOTIFICATION
    ///
    /// A fire-and-forget call with no [Response].
    ///
    /// [Response]: Message::Response
    Notification { method: String, params: Vec<Value> },
}

impl Message {
    /// ### CLASSIFY PROCEDURE
    ///
    /// Implements the [Message Validator] (`isMessage`) and decoding in one
    /// step: accepts any decoded [Value] and returns the [Message] it
    /// represents, or hands the original [Value] back unchanged if it does
    /// not match any of the three wire shapes. Handing the value back
    /// avoids a reallocation when the caller routes it to
    /// [onInvalidMessage].
    ///
    /// [Message Validator]: crate
    /// [Value]:              rmpv::Value
    /// [onInvalidMessage]:   crate::session::SessionOptions
    pub fn classify(value: Value) -> Result<Message, Value> {
        if !Self::shape_matches(&value) {
            return Err(value);
        }
        let Value::Array(mut items) = value else {
            unreachable!("shape_matches only accepts arrays")
        };
        let tag = items.remove(0).as_u64().unwrap() as u8;
        match tag {
            TAG_REQUEST => {
                let params = items.remove(2).as_array().unwrap().to_owned();
                let method = items.remove(1).as_str().unwrap().to_owned();
                let id = items.remove(0).as_u64().unwrap() as u32;
                Ok(Message::Request { id, method, params })
            }
            TAG_RESPONSE => {
                let result = Some(items.remove(2)).filter(|v| !matches!(v, Value::Nil));
                let error = Some(items.remove(1)).filter(|v| !matches!(v, Value::Nil));
                let id = items.remove(0).as_u64().unwrap() as u32;
                Ok(Message::Response { id, error, result })
            }
            TAG_NOTIFICATION => {
                let params = items.remove(1).as_array().unwrap().to_owned();
                let method = items.remove(0).as_str().unwrap().to_owned();
                Ok(Message::Notification { method, params })
            }
            _ => unreachable!("shape_matches only accepts known tags"),
        }
    }

    /// Validates the wire shape by reference, so [Classify Procedure] can
    /// move `value` afterwards knowing every `unwrap()` along the way is
    /// infallible.
    ///
    /// [Classify Procedure]: Message::classify
    fn shape_matches(value: &Value) -> bool {
        let Value::Array(items) = value else {
            return false;
        };
        let Some(tag) = items.first().and_then(Value::as_u64) else {
            return false;
        };
        if tag > 2 {
            return false;
        }
        match tag as u8 {
            TAG_REQUEST => {
                items.len() == 4
                    && matches!(items[1], Value::Integer(_))
                    && items[1].as_u64().is_some()
                    && items[2].is_str()
                    && items[3].is_array()
            }
            TAG_RESPONSE => {
                items.len() == 4 && matches!(items[1], Value::Integer(_)) && items[1].as_u64().is_some()
            }
            TAG_NOTIFICATION => items.len() == 3 && items[1].is_str() && items[2].is_array(),
            _ => false,
        }
    }
}

impl From<Message> for Value {
    /// ### ENCODE PROCEDURE
    ///
    /// Converts a [Message] into the [Value] tuple shape ready for the
    /// [EncodeStream].
    ///
    /// [Message]:      Message
    /// [Value]:         rmpv::Value
    /// [EncodeStream]: crate::codec
    fn from(message: Message) -> Self {
        match message {
            Message::Request { id, method, params } => Value::Array(vec![
                Value::from(TAG_REQUEST),
                Value::from(id),
                Value::from(method),
                Value::Array(params),
            ]),
            Message::Response { id, error, result } => Value::Array(vec![
                Value::from(TAG_RESPONSE),
                Value::from(id),
                error.unwrap_or(Value::Nil),
                result.unwrap_or(Value::Nil),
            ]),
            Message::Notification { method, params } => Value::Array(vec![
                Value::from(TAG_NOTIFICATION),
                Value::from(method),
                Value::Array(params),
            ]),
        }
    }
}

impl Message {
    /// The message ID correlating a [Request]/[Response] pair, if this
    /// [Message] carries one.
    ///
    /// [Request]:  Message::Request
    /// [Response]: Message::Response
    pub fn id(&self) -> Option<u32> {
        match self {
            Message::Request { id, .. } => Some(*id),
            Message::Response { id, .. } => Some(*id),
            Message::Notification { .. } => None,
        }
    }
}
