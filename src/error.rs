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

//! # ERRORS
//!
//! Unifies the string-identified failures of the [RPC Contract] with I/O
//! and codec failures so callers can match on a variant rather than parse
//! a message.
//!
//! [RPC Contract]: crate

use rmpv::Value;
use std::fmt;

/// ## RPC ERROR
///
/// The single error type returned by every fallible [Session] and [Client]
/// operation.
///
/// The `Display` output of [NOT RUNNING], [ALREADY RUNNING],
/// [NO METHOD FOUND], [ALREADY RESERVED], and [NOT RESERVED] is pinned to
/// exact wording, since it is part of the wire/API contract tests are
/// written against.
///
/// [Session]:          crate::session::Session
/// [Client]:           crate::client::Client
/// [NOT RUNNING]:      RpcError::NotRunning
/// [ALREADY RUNNING]:  RpcError::AlreadyRunning
/// [NO METHOD FOUND]:  RpcError::NoMethodFound
/// [ALREADY RESERVED]: RpcError::AlreadyReserved
/// [NOT RESERVED]:     RpcError::NotReserved
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// ### NOT RUNNING
    ///
    /// Raised when a [Session] operation other than [Start Procedure] is
    /// attempted while the [Session] is not in the Running state.
    ///
    /// [Session]:            crate::session::Session
    /// [Start Procedure]:    crate::session::Session::start
    #[error("Session is not running")]
    NotRunning,

    /// ### ALREADY RUNNING
    ///
    /// Raised when the [Start Procedure] is attempted on a [Session] which
    /// has already left the Idle state.
    ///
    /// [Session]:         crate::session::Session
    /// [Start Procedure]: crate::session::Session::start
    #[error("Session is already running")]
    AlreadyRunning,

    /// ### NO METHOD FOUND
    ///
    /// Raised by the [Dispatcher] when a [Request] or [Notification] names a
    /// method with no registered handler.
    ///
    /// [Dispatcher]:   crate::dispatcher::Dispatcher
    /// [Request]:      crate::message::Message::Request
    /// [Notification]: crate::message::Message::Notification
    #[error("No MessagePack-RPC method '{0}' exists")]
    NoMethodFound(String),

    /// ### ALREADY RESERVED
    ///
    /// Raised by the [Reservator] when [Reserve Procedure] is called twice
    /// for the same message ID without an intervening [Resolve Procedure].
    ///
    /// [Reservator]:        crate::reservator::Reservator
    /// [Reserve Procedure]: crate::reservator::Reservator::reserve
    /// [Resolve Procedure]: crate::reservator::Reservator::resolve
    #[error("AlreadyReserved")]
    AlreadyReserved,

    /// ### NOT RESERVED
    ///
    /// Raised by the [Reservator] when [Resolve Procedure] is called for a
    /// message ID with no open reservation.
    ///
    /// [Reservator]:        crate::reservator::Reservator
    /// [Resolve Procedure]: crate::reservator::Reservator::resolve
    #[error("NotReserved")]
    NotReserved,

    /// ### HANDLER
    ///
    /// Carries a [Dispatcher] handler failure, already passed through the
    /// [Error Serializer], as returned to [Client::call] callers.
    ///
    /// [Dispatcher]:      crate::dispatcher::Dispatcher
    /// [Error Serializer]: crate::session::SessionOptions::error_serializer
    /// [Client::call]:     crate::client::Client::call
    #[error("handler error: {0:?}")]
    Handler(Value),

    /// ### SEND
    ///
    /// Wraps a [Session::send] failure encountered by [Client::call], naming
    /// the method and parameters that could not be transmitted.
    ///
    /// [Session::send]: crate::session::Session::send
    /// [Client::call]:  crate::client::Client::call
    #[error("failed to send call to method '{method}' with params {params:?}: {source}")]
    Send {
        method: String,
        params: Vec<Value>,
        #[source]
        source: Box<RpcError>,
    },

    /// ### DECODE
    ///
    /// Raised when the [DecodeStream] cannot parse a MessagePack item from
    /// the inbound byte stream.
    ///
    /// [DecodeStream]: crate::codec
    #[error("failed to decode MessagePack value: {0}")]
    Decode(String),

    /// ### IO
    ///
    /// Raised when the underlying reader or writer fails.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ### ORPHAN RESPONSE
    ///
    /// A [Response] arrived whose message ID was never (or is no longer)
    /// reserved. Surfaced only through [onMessageError]; never returned
    /// directly from a public operation, but kept as a variant so hooks can
    /// match on it.
    ///
    /// [Response]:        crate::message::Message::Response
    /// [onMessageError]:  crate::session::SessionOptions
    #[error("orphan response for msgid {0}")]
    OrphanResponse(u32),
}

impl Clone for RpcError {
    fn clone(&self) -> Self {
        match self {
            RpcError::NotRunning => RpcError::NotRunning,
            RpcError::AlreadyRunning => RpcError::AlreadyRunning,
            RpcError::NoMethodFound(m) => RpcError::NoMethodFound(m.clone()),
            RpcError::AlreadyReserved => RpcError::AlreadyReserved,
            RpcError::NotReserved => RpcError::NotReserved,
            RpcError::Handler(v) => RpcError::Handler(v.clone()),
            RpcError::Send {
                method,
                params,
                source,
            } => RpcError::Send {
                method: method.clone(),
                params: params.clone(),
                source: source.clone(),
            },
            RpcError::Decode(s) => RpcError::Decode(s.clone()),
            RpcError::Io(e) => RpcError::Io(std::io::Error::new(e.kind(), e.to_string())),
            RpcError::OrphanResponse(id) => RpcError::OrphanResponse(*id),
        }
    }
}

/// ### DISPATCH ERROR
///
/// The failure type returned by a [Handler] to indicate that the requested
/// method could not be carried out. Distinct from [RpcError] because
/// handler authors should not need to know about transport-level failure
/// modes; the [Session] converts this into a [Response] error slot via the
/// [Error Serializer].
///
/// [Handler]:           crate::dispatcher::Handler
/// [RpcError]:          RpcError
/// [Session]:            crate::session::Session
/// [Response]:            crate::message::Message::Response
/// [Error Serializer]:  crate::session::SessionOptions::error_serializer
#[derive(Debug, Clone)]
pub struct DispatchError(pub Value);

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl std::error::Error for DispatchError {}

impl DispatchError {
    /// Builds a [DISPATCH ERROR] from any string-like message, the most
    /// common case for handler authors.
    ///
    /// [DISPATCH ERROR]: DispatchError
    pub fn msg(message: impl Into<String>) -> Self {
        DispatchError(Value::String(message.into().into()))
    }
}

impl From<String> for DispatchError {
    fn from(value: String) -> Self {
        DispatchError::msg(value)
    }
}

impl From<&str> for DispatchError {
    fn from(value: &str) -> Self {
        DispatchError::msg(value)
    }
}
