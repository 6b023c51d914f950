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

//! # RESERVATOR
//!
//! A keyed one-shot handoff table pairing a generated message ID with the
//! eventual [Response] that answers it. Modeled directly on the
//! `outbox: Mutex<HashMap<MessageID, SendOnce<Option<Message>>>>` table
//! kept by `semi_e37::generic::Client`, generalized from a blocking
//! `oneshot` channel to `tokio::sync::oneshot`.
//!
//! [Response]: crate::message::Message::Response

use crate::error::RpcError;
use crate::message::Message;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Table plus teardown gate, behind one lock so [Reserve Procedure] and
/// [Cancel All Procedure] can never interleave: either a `reserve` call is
/// fully ordered before the teardown that clears the table, or it observes
/// `closed` already set and fails instead of inserting an entry nobody will
/// ever resolve.
///
/// [Reserve Procedure]:    Reservator::reserve
/// [Cancel All Procedure]: Reservator::cancel_all
#[derive(Default)]
struct ReservatorState {
    table: HashMap<u32, oneshot::Sender<Message>>,
    closed: bool,
}

/// ## RESERVATOR
///
/// Tracks open transactions initiated locally which have not yet received
/// a reply.
///
/// Each entry's lifecycle:
/// - [Reserve Procedure] creates an entry in the Pending state and returns
///   a handle awaitable by exactly one caller.
/// - [Resolve Procedure] transitions Pending to Resolved, delivers the
///   [Response] to the waiter, and removes the entry.
///
/// There is no timeout at this layer; cancellation is external (see
/// [Cancel All Procedure]).
///
/// [Reserve Procedure]:    Reservator::reserve
/// [Resolve Procedure]:    Reservator::resolve
/// [Cancel All Procedure]: Reservator::cancel_all
/// [Response]:              crate::message::Message::Response
#[derive(Default)]
pub struct Reservator {
    state: Mutex<ReservatorState>,
}

impl Reservator {
    /// Creates an empty [Reservator].
    ///
    /// [Reservator]: Reservator
    pub fn new() -> Self {
        Self::default()
    }

    /// ### RESERVE PROCEDURE
    ///
    /// Reserves `msgid`, returning a [Receiver] that resolves once a
    /// matching [Response] is handed to [Resolve Procedure].
    ///
    /// Fails with [ALREADY RESERVED] if an entry already exists for
    /// `msgid` — this includes the case where the wrapping message ID
    /// sequence has looped back onto a still-outstanding call. Fails with
    /// `NotRunning` if [Cancel All Procedure] has already run — reserving
    /// and tearing down share the same lock, so this check can never be
    /// stale by the time the entry would otherwise be inserted.
    ///
    /// [Receiver]:          tokio::sync::oneshot::Receiver
    /// [Resolve Procedure]: Reservator::resolve
    /// [Cancel All Procedure]: Reservator::cancel_all
    /// [ALREADY RESERVED]:  crate::error::RpcError::AlreadyReserved
    pub fn reserve(&self, msgid: u32) -> Result<oneshot::Receiver<Message>, RpcError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(RpcError::NotRunning);
        }
        if state.table.contains_key(&msgid) {
            return Err(RpcError::AlreadyReserved);
        }
        let (tx, rx) = oneshot::channel();
        state.table.insert(msgid, tx);
        Ok(rx)
    }

    /// ### RESOLVE PROCEDURE
    ///
    /// Delivers `message` to the waiter reserved under `message`'s message
    /// ID and removes the entry. Fails with [NOT RESERVED] if no such
    /// entry exists — an orphan [Response], handled by the [Session] via
    /// [onMessageError].
    ///
    /// [NOT RESERVED]:    crate::error::RpcError::NotReserved
    /// [Session]:          crate::session::Session
    /// [onMessageError]:  crate::session::SessionOptions
    /// [Response]:         crate::message::Message::Response
    pub fn resolve(&self, msgid: u32, message: Message) -> Result<(), RpcError> {
        let sender = {
            let mut state = self.state.lock().unwrap();
            state.table.remove(&msgid).ok_or(RpcError::NotReserved)?
        };
        // The receiver may have been dropped if the caller abandoned the
        // `recv` future; there is nobody left to deliver to, which is not
        // an error at this layer.
        let _ = sender.send(message);
        Ok(())
    }

    /// ### CANCEL ALL PROCEDURE
    ///
    /// Closes the [Reservator] and drops every outstanding reservation,
    /// causing every pending [Receiver] to resolve with a `RecvError`.
    /// Closing is permanent: every [Reserve Procedure] call from this point
    /// on fails with `NotRunning` instead of inserting an entry that would
    /// never be resolved. Called by [Session] shutdown so in-flight `recv`
    /// callers are not left waiting forever on a connection that is going
    /// away.
    ///
    /// [Receiver]:          tokio::sync::oneshot::Receiver
    /// [Session]:           crate::session::Session
    /// [Reserve Procedure]: Reservator::reserve
    pub fn cancel_all(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        state.table.clear();
    }
}
