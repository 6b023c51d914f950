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

//! # INDEXER
//!
//! Produces the monotonic, wrapping sequence of message IDs a [Client]
//! assigns to its [Request]s.
//!
//! [Client]:  crate::client::Client
//! [Request]: crate::message::Message::Request

use std::sync::atomic::{AtomicU32, Ordering};

/// ## INDEXER
///
/// A thread-safe counter producing `0, 1, 2, …, 2³²−1, 0, 1, …`.
///
/// Multiple [Client]s sharing one [Session] must share one [Indexer] (see
/// [New Client]) so their message ID spaces do not collide.
///
/// [Client]:     crate::client::Client
/// [Session]:    crate::session::Session
/// [New Client]: crate::client::Client::new
/// [Indexer]:    Indexer
#[derive(Debug, Default)]
pub struct Indexer {
    next: AtomicU32,
}

impl Indexer {
    /// Creates an [Indexer] starting at zero.
    ///
    /// [Indexer]: Indexer
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(0),
        }
    }

    /// ### NEXT PROCEDURE
    ///
    /// Atomically returns the next value in the sequence, wrapping modulo
    /// 2³² rather than panicking on overflow.
    pub fn next(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
