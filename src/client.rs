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

//! # CLIENT
//!
//! A thin issuer built on a [Session]: allocates message IDs via an
//! [Indexer], builds [Request]/[Notification] messages, and sends them
//! through the Session. Mirrors the `single::Client` wrapper pattern in
//! `semi_e37::single`, which holds an `Arc<generic::Client>` rather than
//! owning the connection itself.
//!
//! [Session]:       crate::session::Session
//! [Indexer]:        crate::indexer::Indexer
//! [Request]:        crate::message::Message::Request
//! [Notification]:   crate::message::Message::Notification

use crate::error::RpcError;
use crate::indexer::Indexer;
use crate::message::Message;
use crate::session::Session;
use rmpv::Value;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

/// ## CLIENT OPTIONS
///
/// Construction-time configuration for a [Client].
///
/// [Client]: Client
#[derive(Clone)]
pub struct ClientOptions {
    /// Shared across every [Client] that issues calls on the same
    /// [Session], so their msgid spaces never collide. Defaults to a
    /// fresh, unshared [Indexer] when omitted.
    ///
    /// [Client]:  Client
    /// [Session]: crate::session::Session
    /// [Indexer]: Indexer
    pub indexer: Option<Arc<Indexer>>,

    /// Converts a [Response]'s error slot into the failure surfaced from
    /// [Call Procedure]. Default: identity.
    ///
    /// [Response]:       crate::message::Message::Response
    /// [Call Procedure]: Client::call
    pub error_deserializer: Arc<dyn Fn(Value) -> Value + Send + Sync>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            indexer: None,
            error_deserializer: Arc::new(|error| error),
        }
    }
}

/// ## CLIENT
///
/// Issues calls and notifications against a borrowed [Session]. Does not
/// own the Session's lifecycle — starting, stopping, and sharing it among
/// several Clients is the caller's responsibility.
///
/// [Session]: crate::session::Session
pub struct Client<R, W> {
    session: Session<R, W>,
    indexer: Arc<Indexer>,
    error_deserializer: Arc<dyn Fn(Value) -> Value + Send + Sync>,
}

impl<R, W> Clone for Client<R, W> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            indexer: Arc::clone(&self.indexer),
            error_deserializer: Arc::clone(&self.error_deserializer),
        }
    }
}

impl<R, W> Client<R, W>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    /// Builds a [Client] over `session`. Pass a shared [Indexer] in
    /// `options` when more than one [Client] issues calls on the same
    /// Session.
    ///
    /// [Client]:  Client
    /// [Indexer]: Indexer
    pub fn new(session: Session<R, W>, options: ClientOptions) -> Self {
        Self {
            session,
            indexer: options.indexer.unwrap_or_else(|| Arc::new(Indexer::new())),
            error_deserializer: options.error_deserializer,
        }
    }

    /// ### CALL PROCEDURE
    ///
    /// Allocates a msgid, builds a [Request], and concurrently issues
    /// `session.send` and `session.recv` — never sequentially, since a
    /// fast peer may answer before `send` itself resolves on a slow
    /// writer. Resolves to the [Response]'s `result` slot, or fails with
    /// [error_deserializer]\(error\) if the `error` slot is non-null.
    ///
    /// A `send` failure is propagated wrapped, naming the method and
    /// params; a `recv` failure (for example the Session tearing down) is
    /// propagated unwrapped.
    ///
    /// [Request]:            crate::message::Message::Request
    /// [Response]:            crate::message::Message::Response
    /// [error_deserializer]: ClientOptions::error_deserializer
    pub async fn call(&self, method: impl Into<String>, params: Vec<Value>) -> Result<Value, RpcError> {
        let method = method.into();
        let id = self.indexer.next();
        let request = Message::Request {
            id,
            method: method.clone(),
            params: params.clone(),
        };

        let (send_result, recv_result) =
            tokio::join!(self.session.send(request), self.session.recv(id));

        if let Err(source) = send_result {
            return Err(RpcError::Send {
                method,
                params,
                source: Box::new(source),
            });
        }

        match recv_result? {
            Message::Response {
                error: Some(error), ..
            } => Err(RpcError::Handler((self.error_deserializer)(error))),
            Message::Response { result, .. } => Ok(result.unwrap_or(Value::Nil)),
            other => unreachable!("Reservator only ever resolves recv() with a Response: {other:?}"),
        }
    }

    /// ### NOTIFY PROCEDURE
    ///
    /// Builds a [Notification] and sends it; no response is awaited.
    ///
    /// [Notification]: crate::message::Message::Notification
    pub async fn notify(&self, method: impl Into<String>, params: Vec<Value>) -> Result<(), RpcError> {
        self.session
            .send(Message::Notification {
                method: method.into(),
                params,
            })
            .await
    }
}
