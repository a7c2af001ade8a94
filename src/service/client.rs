//! # Manager Client
//!
//! The public connection facade: owns the socket halves, the correlation
//! engine, the event dispatcher, the diagnostic hooks, and teardown. Clones
//! share all of it, so one connection can serve many tasks.
//!
//! ## Pipeline
//! `start` spawns two tasks. The reader drives the line codec over the read
//! half and forwards each decoded line, or one terminal error, through an
//! unbounded channel. The assembler rebuilds blocks from those lines, parses
//! them, routes them through the correlation engine, and offers every parsed
//! message to the dispatcher. Any failure while processing a block is fatal
//! to the connection.

use crate::config::ConnectionConfig;
use crate::core::codec::LineCodec;
use crate::core::message::Message;
use crate::error::{AmiError, Result};
use crate::protocol::auth;
use crate::protocol::correlation::{ActionId, CorrelationEngine};
use crate::protocol::dispatcher::{EventDispatcher, EventFilter};
use crate::service::pipeline::BlockAssembler;
use crate::transport;
use crate::utils::lock_ignore_poison;
use futures::StreamExt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, instrument, warn};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type DataHook = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Asynchronous manager-protocol client.
///
/// Cheap to clone; clones share the connection, the correlation tables, the
/// subscriptions, and the hooks. The background pipeline holds only a weak
/// reference, so dropping the last clone winds the tasks down.
///
/// # Example
/// ```ignore
/// let client = ManagerClient::connect(&config.connection).await?;
/// client.start()?;
/// if client.login("admin", "secret", true).await? {
///     let pong = client.publish(Message::new().field("Action", "Ping")).await?;
///     assert!(pong.is_success());
/// }
/// client.stop().await;
/// ```
#[derive(Clone)]
pub struct ManagerClient {
    inner: Arc<Shared>,
}

struct Shared {
    writer: tokio::sync::Mutex<Option<BoxedWriter>>,
    reader_source: Mutex<Option<BoxedReader>>,
    engine: CorrelationEngine,
    dispatcher: EventDispatcher,
    data_sent: Mutex<Option<DataHook>>,
    data_received: Mutex<Option<DataHook>>,
    stopped: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ManagerClient {
    /// Open a TCP connection to the configured address.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let stream = transport::tcp::connect(config).await?;
        let (read, write) = stream.into_split();
        Ok(Self::from_halves(Box::new(read), Box::new(write)))
    }

    /// Build a client over an already-established stream.
    ///
    /// Used for embedding and for tests, where the remote end is an
    /// in-memory duplex stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read, write) = tokio::io::split(stream);
        Self::from_halves(Box::new(read), Box::new(write))
    }

    fn from_halves(read: BoxedReader, write: BoxedWriter) -> Self {
        Self {
            inner: Arc::new(Shared {
                writer: tokio::sync::Mutex::new(Some(write)),
                reader_source: Mutex::new(Some(read)),
                engine: CorrelationEngine::new(),
                dispatcher: EventDispatcher::new(),
                data_sent: Mutex::new(None),
                data_received: Mutex::new(None),
                stopped: AtomicBool::new(false),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Spawn the reader and assembler tasks.
    ///
    /// # Errors
    /// [`AmiError::AlreadyStarted`] on every call after the first.
    pub fn start(&self) -> Result<()> {
        let read = {
            let mut source = lock_ignore_poison(&self.inner.reader_source);
            source.take().ok_or(AmiError::AlreadyStarted)?
        };

        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<Result<String>>();

        let reader = tokio::spawn(async move {
            let mut lines = FramedRead::new(read, LineCodec::new());
            while let Some(decoded) = lines.next().await {
                match decoded {
                    Ok(line) => {
                        if line_tx.send(Ok(line)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        let _ = line_tx.send(Err(e));
                        return;
                    }
                }
            }
            // EOF: dropping the sender signals end-of-stream
        });

        let weak = Arc::downgrade(&self.inner);
        let assembler = tokio::spawn(async move {
            let mut assembler = BlockAssembler::new();
            loop {
                let item = line_rx.recv().await;
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                match item {
                    None => {
                        shared.teardown(None).await;
                        return;
                    }
                    Some(Err(e)) => {
                        shared.teardown(Some(e.to_string())).await;
                        return;
                    }
                    Some(Ok(line)) => {
                        if let Some(block) = assembler.push_line(&line) {
                            if let Err(e) = shared.process_block(block.as_bytes()).await {
                                warn!(error = %e, "failed to process inbound block");
                                shared.teardown(Some(e.to_string())).await;
                                return;
                            }
                        }
                    }
                }
            }
        });

        let mut tasks = lock_ignore_poison(&self.inner.tasks);
        tasks.push(reader);
        tasks.push(assembler);
        debug!("pipeline tasks started");
        Ok(())
    }

    /// Send a request and wait for its correlated response.
    ///
    /// The returned message is the response head; for multi-part responses
    /// its [`responses`](Message::responses) hold the interim parts. The wait
    /// is unbounded; wrap the call in
    /// [`with_timeout_error`](crate::utils::timeout::with_timeout_error) to
    /// bound it.
    ///
    /// # Errors
    /// [`AmiError::MissingActionId`] if the request carries no correlation
    /// token, [`AmiError::DuplicateActionId`] if the token is already in
    /// flight, [`AmiError::NotConnected`] on a dead connection, and any write
    /// failure (which also tears the connection down).
    pub async fn publish(&self, request: Message) -> Result<Message> {
        let token = match request.get("ActionID") {
            Some(token) => ActionId::new(token),
            None => return Err(AmiError::MissingActionId),
        };

        if self.inner.stopped.load(Ordering::SeqCst) {
            return Err(AmiError::NotConnected);
        }

        let rx = self.inner.engine.register(&token)?;

        // teardown may have begun between the liveness check and the
        // registration; entries added after its drain would never resolve
        if self.inner.stopped.load(Ordering::SeqCst) {
            self.inner.engine.discard(&token);
            return Err(AmiError::NotConnected);
        }

        let bytes = request.to_bytes();
        let write_result = {
            let mut writer = self.inner.writer.lock().await;
            match writer.as_mut() {
                Some(stream) => write_message(stream, &bytes).await,
                None => Err(AmiError::NotConnected),
            }
        };

        if let Err(e) = write_result {
            self.inner.engine.discard(&token);
            if !matches!(e, AmiError::NotConnected) {
                warn!(error = %e, "request write failed, tearing down");
                self.inner.teardown(Some(e.to_string())).await;
            }
            return Err(e);
        }

        self.inner.fire_data_sent(&bytes);

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(AmiError::ConnectionClosed),
        }
    }

    /// Authenticate, by MD5 challenge or in clear text.
    ///
    /// Returns `Ok(false)` when the remote side rejects the credentials (or
    /// the challenge request); errors are reserved for infrastructure
    /// failures.
    #[instrument(skip(self, secret))]
    pub async fn login(&self, username: &str, secret: &str, use_challenge: bool) -> Result<bool> {
        if use_challenge {
            let challenge = self.publish(auth::challenge_request()).await?;
            if !challenge.is_success() {
                debug!("challenge request rejected");
                return Ok(false);
            }
            let key = auth::challenge_key(challenge.get("Challenge").unwrap_or(""), secret);
            let response = self.publish(auth::login_request(username, &key)).await?;
            Ok(response.is_success())
        } else {
            let response = self.publish(auth::plain_login_request(username, secret)).await?;
            Ok(response.is_success())
        }
    }

    /// Announce the logoff; true iff the remote side said goodbye.
    pub async fn logoff(&self) -> Result<bool> {
        let response = self.publish(auth::logoff_request()).await?;
        Ok(response
            .get("Response")
            .is_some_and(|value| value.eq_ignore_ascii_case("Goodbye")))
    }

    /// Subscribe `handler` to events matching `filter`.
    pub fn subscribe<F, Fut>(&self, filter: EventFilter, handler: F) -> Result<()>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.inner.dispatcher.subscribe(filter, handler)
    }

    /// Drop every event subscription.
    pub fn clear_subscriptions(&self) -> Result<()> {
        self.inner.dispatcher.clear()
    }

    /// Observe the raw bytes of every outgoing block.
    pub fn on_data_sent<F>(&self, hook: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        let mut slot = lock_ignore_poison(&self.inner.data_sent);
        *slot = Some(Arc::new(hook));
    }

    /// Observe the re-encoded bytes of every parsed incoming block.
    pub fn on_data_received<F>(&self, hook: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        let mut slot = lock_ignore_poison(&self.inner.data_received);
        *slot = Some(Arc::new(hook));
    }

    /// False once the connection has been torn down.
    pub fn is_connected(&self) -> bool {
        !self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Tear the connection down. Idempotent.
    pub async fn stop(&self) {
        self.inner.teardown(None).await;
    }
}

impl Shared {
    async fn process_block(&self, bytes: &[u8]) -> Result<()> {
        let message = Message::from_bytes(bytes)?;
        self.fire_data_received(&message.to_bytes());
        self.engine.route(&message)?;
        self.dispatcher.dispatch(&message).await
    }

    /// Exactly-once teardown: resolve waiters, drop subscriptions, shut the
    /// write half, stop the tasks.
    async fn teardown(&self, reason: Option<String>) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(reason = ?reason, "tearing down connection");

        self.engine.abort_all(reason.as_deref());
        let _ = self.dispatcher.clear();

        let writer = {
            let mut writer = self.writer.lock().await;
            writer.take()
        };
        if let Some(mut writer) = writer {
            let _ = writer.shutdown().await;
        }

        // last, and with no awaits after: one of these handles may be the
        // task running this very teardown
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = lock_ignore_poison(&self.tasks);
            tasks.drain(..).collect()
        };
        for handle in handles {
            handle.abort();
        }
    }

    fn fire_data_sent(&self, bytes: &[u8]) {
        let hook = lock_ignore_poison(&self.data_sent).clone();
        if let Some(hook) = hook {
            hook(bytes);
        }
    }

    fn fire_data_received(&self, bytes: &[u8]) {
        let hook = lock_ignore_poison(&self.data_received).clone();
        if let Some(hook) = hook {
            hook(bytes);
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let tasks = match self.tasks.get_mut() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        for handle in tasks.drain(..) {
            handle.abort();
        }
    }
}

async fn write_message(writer: &mut BoxedWriter, bytes: &[u8]) -> Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}
