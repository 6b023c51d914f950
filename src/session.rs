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

//! # SESSION
//!
//! The full-duplex engine: owns the inbound reader and outbound writer,
//! runs a *consumer* pipeline (bytes → decode → classify → dispatch) and a
//! *producer* pipeline (internal queue → encode → bytes) as two
//! `tokio::spawn` tasks, the async analogue of the
//! `thread::spawn(move || clone.rx_handle(...))` /
//! `thread::spawn(move || clone.tx_handle(...))` pair in
//! `semi_e37::primitive::Client::connect`.
//!
//! [Session] moves `Idle → Running → Terminated`; once Terminated it is not
//! restartable, mirroring `semi_e37::generic::Client`'s `ConnectionState`.

use crate::codec::MessagePackCodec;
use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, RpcError};
use crate::message::Message;
use crate::reservator::Reservator;
use futures_util::{SinkExt, StreamExt};
use rmpv::Value;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

/// ## SESSION OPTIONS
///
/// Construction-time configuration for a [Session], following the shape of
/// `semi_e37::generic::ParameterSettings`.
#[derive(Clone)]
pub struct SessionOptions {
    /// Converts a [Handler] failure into the MessagePack-encodable error
    /// payload carried in a [Response]'s error slot. Default: identity.
    ///
    /// [Handler]:  crate::dispatcher::Handler
    /// [Response]: crate::message::Message::Response
    pub error_serializer: Arc<dyn Fn(DispatchError) -> Value + Send + Sync>,

    /// Called with any decoded value that does not match one of the three
    /// wire shapes. Default: ignored.
    pub on_invalid_message: Option<Arc<dyn Fn(Value) + Send + Sync>>,

    /// Called when handling an otherwise-valid message fails: an outbound
    /// send failing after dispatch, a Response for an unreserved msgid, or
    /// a Notification handler failing. Default: ignored.
    pub on_message_error: Option<Arc<dyn Fn(RpcError, Option<Message>) + Send + Sync>>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            error_serializer: Arc::new(|err: DispatchError| err.0),
            on_invalid_message: None,
            on_message_error: None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum LifecycleState {
    Idle,
    Running,
    Terminated,
}

struct RunningHandles {
    outbound_tx: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    consumer_cancel: CancellationToken,
    producer_cancel: CancellationToken,
}

struct SessionInner<R, W> {
    dispatcher: Dispatcher,
    options: SessionOptions,
    reservator: Arc<Reservator>,
    streams: Mutex<Option<(R, W)>>,
    state: Mutex<LifecycleState>,
    running: Mutex<Option<RunningHandles>>,
    result: Mutex<Option<Result<(), RpcError>>>,
    done_tx: broadcast::Sender<()>,
}

/// ## SESSION
///
/// See the module documentation for the pipeline shape. Cheaply `Clone`
/// (an `Arc` handle), so a `Client` can hold its own copy alongside any
/// detached dispatch task that calls back into it.
pub struct Session<R, W> {
    inner: Arc<SessionInner<R, W>>,
}

impl<R, W> Clone for Session<R, W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    /// Builds a [Session] over `reader`/`writer` in the Idle state. Call
    /// [Start Procedure] to begin the pipelines.
    ///
    /// [Session]:         Session
    /// [Start Procedure]: Session::start
    pub fn new(reader: R, writer: W, dispatcher: Dispatcher, options: SessionOptions) -> Self {
        let (done_tx, _) = broadcast::channel(1);
        Self {
            inner: Arc::new(SessionInner {
                dispatcher,
                options,
                reservator: Arc::new(Reservator::new()),
                streams: Mutex::new(Some((reader, writer))),
                state: Mutex::new(LifecycleState::Idle),
                running: Mutex::new(None),
                result: Mutex::new(None),
                done_tx,
            }),
        }
    }

    /// The [Dispatcher] consulted by inbound [Request]s and [Notification]s.
    /// Mutable after construction through its own interior locking, per
    /// [Dispatcher]'s contract.
    ///
    /// [Dispatcher]:   crate::dispatcher::Dispatcher
    /// [Request]:      crate::message::Message::Request
    /// [Notification]: crate::message::Message::Notification
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// ### START PROCEDURE
    ///
    /// Idle → Running. Launches the consumer and producer pipelines. Fails
    /// with [ALREADY RUNNING] if called more than once.
    ///
    /// [ALREADY RUNNING]: crate::error::RpcError::AlreadyRunning
    pub fn start(&self) -> Result<(), RpcError> {
        {
            let mut state = self.inner.state.lock().unwrap();
            match *state {
                LifecycleState::Idle => *state = LifecycleState::Running,
                LifecycleState::Running | LifecycleState::Terminated => {
                    return Err(RpcError::AlreadyRunning)
                }
            }
        }

        let (reader, writer) = self
            .inner
            .streams
            .lock()
            .unwrap()
            .take()
            .expect("an Idle session always still holds its streams");

        let framed_reader = FramedRead::new(reader, MessagePackCodec::new());
        let framed_writer = FramedWrite::new(writer, MessagePackCodec::new());

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let consumer_cancel = CancellationToken::new();
        let producer_cancel = CancellationToken::new();

        let consumer_handle = tokio::spawn(run_consumer(
            framed_reader,
            self.inner.dispatcher.clone(),
            Arc::clone(&self.inner.reservator),
            outbound_tx.clone(),
            consumer_cancel.clone(),
            self.inner.options.clone(),
        ));
        let producer_handle = tokio::spawn(run_producer(
            framed_writer,
            outbound_rx,
            producer_cancel.clone(),
        ));

        *self.inner.running.lock().unwrap() = Some(RunningHandles {
            outbound_tx: Mutex::new(Some(outbound_tx)),
            consumer_cancel,
            producer_cancel,
        });

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let consumer_result = consumer_handle.await.unwrap_or_else(|e| {
                Err(RpcError::Io(std::io::Error::other(e.to_string())))
            });

            // Dropping the master outbound sender here begins the
            // drain-then-close of the producer even when the consumer
            // ended on its own (reader EOF or decode error) rather than
            // through an explicit `shutdown` call. Detached dispatch
            // tasks hold their own clone and keep the channel open until
            // they finish replying.
            if let Some(running) = inner.running.lock().unwrap().as_ref() {
                running.outbound_tx.lock().unwrap().take();
            }

            let producer_result = producer_handle.await.unwrap_or_else(|e| {
                Err(RpcError::Io(std::io::Error::other(e.to_string())))
            });

            inner.reservator.cancel_all();
            let final_result = consumer_result.and(producer_result);
            tracing::debug!(ok = final_result.is_ok(), "session terminated");
            *inner.result.lock().unwrap() = Some(final_result);
            *inner.state.lock().unwrap() = LifecycleState::Terminated;
            let _ = inner.done_tx.send(());
        });

        Ok(())
    }

    /// ### SEND PROCEDURE
    ///
    /// Enqueues `message` onto the internal outbound queue; does not await
    /// wire transmission. Fails with [NOT RUNNING] once the Session has
    /// begun shutting down or has terminated.
    ///
    /// [NOT RUNNING]: crate::error::RpcError::NotRunning
    pub async fn send(&self, message: Message) -> Result<(), RpcError> {
        let tx = {
            let running = self.inner.running.lock().unwrap();
            let running = running.as_ref().ok_or(RpcError::NotRunning)?;
            running
                .outbound_tx
                .lock()
                .unwrap()
                .clone()
                .ok_or(RpcError::NotRunning)?
        };
        tx.send(message).map_err(|_| RpcError::NotRunning)
    }

    /// ### RECV PROCEDURE
    ///
    /// Reserves `msgid` in the [Reservator] and returns the eventually
    /// received [Response]. Fails with [NOT RUNNING] or [ALREADY RESERVED].
    ///
    /// The lifecycle check below is only a fast path for calls made before
    /// [Start Procedure] or long after termination — it is not what makes
    /// this safe against a `recv` racing the teardown finalizer's
    /// [Cancel All Procedure]. That race is closed inside the [Reservator]
    /// itself: [Reserve Procedure] and [Cancel All Procedure] share one
    /// lock, so a reservation can never be inserted after teardown has
    /// already run and left unresolved forever; it either lands before
    /// teardown (and is then cleared, failing the `await` below) or
    /// observes teardown already closed and fails immediately.
    ///
    /// [Reservator]:           crate::reservator::Reservator
    /// [Reserve Procedure]:    crate::reservator::Reservator::reserve
    /// [Cancel All Procedure]: crate::reservator::Reservator::cancel_all
    /// [Start Procedure]:      Session::start
    /// [Response]:              crate::message::Message::Response
    /// [NOT RUNNING]:          crate::error::RpcError::NotRunning
    /// [ALREADY RESERVED]:     crate::error::RpcError::AlreadyReserved
    pub async fn recv(&self, msgid: u32) -> Result<Message, RpcError> {
        if *self.inner.state.lock().unwrap() != LifecycleState::Running {
            return Err(RpcError::NotRunning);
        }
        let receiver = self.inner.reservator.reserve(msgid)?;
        receiver.await.map_err(|_| RpcError::NotRunning)
    }

    /// ### WAIT PROCEDURE
    ///
    /// Resolves once both pipelines have terminated, returning the
    /// Session's final result. Callable any number of times, including
    /// after termination.
    pub async fn wait(&self) -> Result<(), RpcError> {
        let mut done_rx = self.inner.done_tx.subscribe();
        if *self.inner.state.lock().unwrap() == LifecycleState::Terminated {
            return self.inner.result.lock().unwrap().clone().unwrap_or(Ok(()));
        }
        let _ = done_rx.recv().await;
        self.inner.result.lock().unwrap().clone().unwrap_or(Ok(()))
    }

    /// ### SHUTDOWN PROCEDURE
    ///
    /// *Graceful*: cancels the consumer so no new inbound messages are
    /// accepted, then waits for the producer to drain the outbound queue
    /// and the writer to flush. Every Response enqueued before this call
    /// returns is guaranteed to reach the writer (modulo writer errors).
    pub async fn shutdown(&self) -> Result<(), RpcError> {
        {
            let running = self.inner.running.lock().unwrap();
            let running = running.as_ref().ok_or(RpcError::NotRunning)?;
            running.consumer_cancel.cancel();
        }
        self.wait().await
    }

    /// ### FORCE SHUTDOWN PROCEDURE
    ///
    /// *Abrupt*: cancels both pipelines immediately. In-flight outbound
    /// messages may be lost.
    pub async fn force_shutdown(&self) -> Result<(), RpcError> {
        {
            let running = self.inner.running.lock().unwrap();
            let running = running.as_ref().ok_or(RpcError::NotRunning)?;
            running.consumer_cancel.cancel();
            running.producer_cancel.cancel();
        }
        self.wait().await
    }
}

async fn run_consumer<R>(
    mut framed: FramedRead<R, MessagePackCodec>,
    dispatcher: Dispatcher,
    reservator: Arc<Reservator>,
    outbound_tx: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
    options: SessionOptions,
) -> Result<(), RpcError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            item = framed.next() => item,
        };
        match item {
            None => {
                tracing::trace!("reader closed, consumer pipeline ending");
                return Ok(());
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "decode stream failed, consumer pipeline ending");
                return Err(e);
            }
            Some(Ok(value)) => match Message::classify(value) {
                Err(invalid) => {
                    tracing::trace!("discarding value that is not a MessagePack-RPC message");
                    if let Some(hook) = &options.on_invalid_message {
                        hook(invalid);
                    }
                }
                Ok(Message::Request { id, method, params }) => {
                    let dispatcher = dispatcher.clone();
                    let tx = outbound_tx.clone();
                    let serializer = Arc::clone(&options.error_serializer);
                    let on_message_error = options.on_message_error.clone();
                    tokio::spawn(async move {
                        let response = match dispatcher.dispatch(&method, params).await {
                            Ok(result) => Message::Response {
                                id,
                                error: None,
                                result: Some(result),
                            },
                            Err(err) => Message::Response {
                                id,
                                error: Some(serializer(err)),
                                result: None,
                            },
                        };
                        let reported = response.clone();
                        if tx.send(response).is_err() {
                            if let Some(hook) = &on_message_error {
                                hook(RpcError::NotRunning, Some(reported));
                            }
                        }
                    });
                }
                Ok(Message::Notification { method, params }) => {
                    let dispatcher = dispatcher.clone();
                    let on_message_error = options.on_message_error.clone();
                    tokio::spawn(async move {
                        if let Err(err) = dispatcher.dispatch(&method, params).await {
                            if let Some(hook) = &on_message_error {
                                hook(RpcError::Handler(err.0), None);
                            }
                        }
                    });
                }
                Ok(response @ Message::Response { .. }) => {
                    let id = response.id().expect("Response always carries a msgid");
                    if let Err(err) = reservator.resolve(id, response.clone()) {
                        tracing::debug!(msgid = id, "orphan response");
                        if let Some(hook) = &options.on_message_error {
                            hook(err, Some(response));
                        }
                    }
                }
            },
        }
    }
}

async fn run_producer<W>(
    mut framed: FramedWrite<W, MessagePackCodec>,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            next = outbound_rx.recv() => next,
        };
        match next {
            None => return Ok(()),
            Some(message) => {
                let value: Value = message.into();
                framed.send(value).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::HandlerFuture;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn echo_dispatcher() -> Dispatcher {
        let dispatcher = Dispatcher::new();
        dispatcher.register(
            "sum",
            Arc::new(|params: Vec<Value>| -> HandlerFuture {
                Box::pin(async move {
                    let a = params[0].as_i64().unwrap();
                    let b = params[1].as_i64().unwrap();
                    Ok(Value::from(a + b))
                })
            }),
        );
        dispatcher
    }

    #[tokio::test]
    async fn starting_twice_fails() {
        let (a, b) = tokio::io::duplex(4096);
        let (reader, writer) = tokio::io::split(a);
        drop(b);
        let session = Session::new(reader, writer, Dispatcher::new(), SessionOptions::default());
        session.start().unwrap();
        assert!(matches!(session.start(), Err(RpcError::AlreadyRunning)));
    }

    #[tokio::test]
    async fn send_before_start_fails() {
        let (a, b) = tokio::io::duplex(4096);
        let (reader, writer) = tokio::io::split(a);
        drop(b);
        let session = Session::new(reader, writer, Dispatcher::new(), SessionOptions::default());
        let result = session
            .send(Message::Notification {
                method: "sum".into(),
                params: vec![],
            })
            .await;
        assert!(matches!(result, Err(RpcError::NotRunning)));
    }

    #[tokio::test]
    async fn request_roundtrips_to_a_response() {
        let (client_io, server_io) = tokio::io::duplex(8192);
        let (client_reader, client_writer) = tokio::io::split(client_io);
        let (server_reader, server_writer) = tokio::io::split(server_io);

        let server = Session::new(
            server_reader,
            server_writer,
            echo_dispatcher(),
            SessionOptions::default(),
        );
        let client = Session::new(
            client_reader,
            client_writer,
            Dispatcher::new(),
            SessionOptions::default(),
        );
        server.start().unwrap();
        client.start().unwrap();

        let recv = client.recv(0);
        client
            .send(Message::Request {
                id: 0,
                method: "sum".into(),
                params: vec![Value::from(1), Value::from(2)],
            })
            .await
            .unwrap();
        let response = recv.await.unwrap();
        assert_eq!(
            response,
            Message::Response {
                id: 0,
                error: None,
                result: Some(Value::from(3)),
            }
        );
    }

    #[tokio::test]
    async fn invalid_message_is_reported_and_does_not_halt_the_consumer() {
        let seen = Arc::new(AtomicBool::new(false));
        let seen_clone = Arc::clone(&seen);

        let mut options = SessionOptions::default();
        options.on_invalid_message = Some(Arc::new(move |_value| {
            seen_clone.store(true, Ordering::SeqCst);
        }));

        let (wire, mut peer) = tokio::io::duplex(8192);
        let (wire_reader, _wire_writer) = tokio::io::split(wire);
        let framed_reader = FramedRead::new(wire_reader, MessagePackCodec::new());
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        // Scenario: garbage, then a valid Request, then more garbage.
        // `onInvalidMessage` fires for the two garbage values, and the
        // Request in between is still dispatched and answered.
        use tokio::io::AsyncWriteExt;
        let garbage_before = rmpv::Value::from("invalid");
        let request = rmpv::Value::Array(vec![
            Value::from(0),
            Value::from(1u32),
            Value::from("sum"),
            Value::Array(vec![Value::from(1), Value::from(2)]),
        ]);
        let garbage_after = rmpv::Value::Array(vec![Value::from(3), Value::from("bad")]);
        for value in [garbage_before, request, garbage_after] {
            let mut buf = Vec::new();
            rmpv::encode::write_value(&mut buf, &value).unwrap();
            peer.write_all(&buf).await.unwrap();
        }
        drop(peer);

        let consumer = tokio::spawn(run_consumer(
            framed_reader,
            echo_dispatcher(),
            Arc::new(Reservator::new()),
            outbound_tx,
            cancel,
            options,
        ));

        let response = outbound_rx.recv().await.unwrap();
        assert_eq!(
            response,
            Message::Response {
                id: 1,
                error: None,
                result: Some(Value::from(3)),
            }
        );
        consumer.await.unwrap().unwrap();
        assert!(seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_drains_enqueued_responses_before_completing() {
        let (client_io, server_io) = tokio::io::duplex(8192);
        let (client_reader, client_writer) = tokio::io::split(client_io);
        let (server_reader, server_writer) = tokio::io::split(server_io);

        let server = Session::new(
            server_reader,
            server_writer,
            echo_dispatcher(),
            SessionOptions::default(),
        );
        let client = Session::new(
            client_reader,
            client_writer,
            Dispatcher::new(),
            SessionOptions::default(),
        );
        server.start().unwrap();
        client.start().unwrap();

        let recv = client.recv(0);
        client
            .send(Message::Request {
                id: 0,
                method: "sum".into(),
                params: vec![Value::from(1), Value::from(1)],
            })
            .await
            .unwrap();
        let response = recv.await.unwrap();
        assert_eq!(
            response,
            Message::Response {
                id: 0,
                error: None,
                result: Some(Value::from(2)),
            }
        );

        server.shutdown().await.unwrap();
    }
}
