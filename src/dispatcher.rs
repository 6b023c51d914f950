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

//! # DISPATCHER
//!
//! Maps a method name to a [Handler] producing a value or failing.
//! Handlers are stored behind a lock so a [Session] always observes the
//! table as it stands at the moment of dispatch, matching
//! `semi_e37::generic::ProcedureCallbacks`'s
//! `Arc<dyn Fn(...) -> T + Sync + Send>` shape, generalized to an
//! async-returning closure keyed by method name instead of fixed per
//! procedure.

use crate::error::{DispatchError, RpcError};
use rmpv::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

/// A boxed, pinned future returned by a [Handler].
///
/// [Handler]: Handler
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, DispatchError>> + Send>>;

/// ## HANDLER
///
/// A method implementation: takes the [Request]/[Notification] params and
/// produces a [Value] or a [DispatchError].
///
/// [Request]:      crate::message::Message::Request
/// [Notification]: crate::message::Message::Notification
/// [Value]:         rmpv::Value
/// [DispatchError]: crate::error::DispatchError
pub type Handler = Arc<dyn Fn(Vec<Value>) -> HandlerFuture + Send + Sync>;

/// ## DISPATCHER
///
/// The method table a [Session] consults to answer inbound [Request]s and
/// [Notification]s. Mutable after construction via [Register Procedure]
/// and [Unregister Procedure]; a running [Session] observes the current
/// table at the moment of each dispatch.
///
/// [Session]:                crate::session::Session
/// [Request]:                crate::message::Message::Request
/// [Notification]:           crate::message::Message::Notification
/// [Register Procedure]:    Dispatcher::register
/// [Unregister Procedure]:  Dispatcher::unregister
#[derive(Clone, Default)]
pub struct Dispatcher {
    methods: Arc<RwLock<HashMap<String, Handler>>>,
}

impl Dispatcher {
    /// Creates an empty [Dispatcher].
    ///
    /// [Dispatcher]: Dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// ### REGISTER PROCEDURE
    ///
    /// Installs `handler` under `method`, replacing any previous handler
    /// for that name.
    pub fn register(&self, method: impl Into<String>, handler: Handler) {
        self.methods.write().unwrap().insert(method.into(), handler);
    }

    /// ### UNREGISTER PROCEDURE
    ///
    /// Removes the handler for `method`, if any.
    pub fn unregister(&self, method: &str) {
        self.methods.write().unwrap().remove(method);
    }

    /// ### DISPATCH PROCEDURE
    ///
    /// Looks `method` up, invokes its [Handler] with `params`, and awaits
    /// the result. Fails with [NO METHOD FOUND] if `method` has no
    /// registered [Handler] — checked explicitly with a lookup rather than
    /// inferred from the invocation's own failure, so a handler failure
    /// that happens to look like "missing" is never confused with an
    /// actually-missing method.
    ///
    /// [Handler]:          Handler
    /// [NO METHOD FOUND]: crate::error::RpcError::NoMethodFound
    pub async fn dispatch(&self, method: &str, params: Vec<Value>) -> Result<Value, DispatchError> {
        let handler = {
            let methods = self.methods.read().unwrap();
            methods.get(method).cloned()
        };
        match handler {
            Some(handler) => handler(params).await,
            None => Err(DispatchError(Value::String(
                RpcError::NoMethodFound(method.to_string()).to_string().into(),
            ))),
        }
    }

    /// True if a handler is currently registered for `method`.
    pub fn has(&self, method: &str) -> bool {
        self.methods.read().unwrap().contains_key(method)
    }
}
