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

//! # MESSAGEPACK-RPC CORE
//!
//! A bidirectional [MessagePack-RPC] session engine: a full-duplex session
//! that multiplexes [Request]s, [Response]s, and [Notification]s over a pair
//! of async byte streams, correlates responses to in-flight requests by
//! message ID, dispatches inbound requests to user-supplied handlers, and
//! provides deterministic graceful/forced shutdown.
//!
//! ---------------------------------------------------------------------------
//!
//! The moving pieces, leaves first:
//!
//! - [`message`] — the three tagged tuple shapes on the wire and the
//!   classifier that tells them apart from noise.
//! - [`dispatcher`] — the method table a running [Session] consults to
//!   answer inbound [Request]s and [Notification]s.
//! - [`reservator`] — the keyed one-shot handoff table pairing a generated
//!   message ID with its eventual [Response].
//! - [`indexer`] — the monotonic, wrapping message ID sequence a [Client]
//!   draws from.
//! - [`codec`] — the default MessagePack [Value] wire transform.
//! - [`session`] — the engine: owns the reader/writer pair, runs the
//!   consumer and producer pipelines, and exposes `send`/`recv`/`shutdown`.
//! - [`client`] — a thin issuer built on a [Session]: `call`/`notify`.
//! - [`error`] — the crate-wide error type returned by every fallible
//!   operation.
//!
//! [MessagePack-RPC]: https://github.com/msgpack-rpc/msgpack-rpc/blob/master/spec.md
//! [Request]:         message::Message::Request
//! [Response]:         message::Message::Response
//! [Notification]:    message::Message::Notification
//! [Session]:          session::Session
//! [Client]:           client::Client
//! [Value]:             rmpv::Value

pub mod client;
pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod indexer;
pub mod message;
pub mod reservator;
pub mod session;

pub use client::{Client, ClientOptions};
pub use dispatcher::{Dispatcher, Handler, HandlerFuture};
pub use error::{DispatchError, RpcError};
pub use indexer::Indexer;
pub use message::Message;
pub use reservator::Reservator;
pub use session::{Session, SessionOptions};
