use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::{SinkExt, StreamExt};
use talos_core::stream::InboundFrame;
use talos_core::{Document, Error, Result};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::ClientConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle of one watcher connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Created; `connect` not called yet.
    Idle,
    /// Stream open, receiving frames.
    Connected,
    /// Terminal `done` frame received.
    Done,
    /// Terminal `error` frame received, or the connection failed.
    Failed,
    /// Closed by the caller before a terminal frame.
    Closed,
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatcherState::Idle => "idle",
            WatcherState::Connected => "connected",
            WatcherState::Done => "done",
            WatcherState::Failed => "failed",
            WatcherState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

type DocumentListener = Box<dyn Fn(&Document) + Send + Sync>;
type DoneListener = Box<dyn Fn(&[Document]) + Send + Sync>;
type ErrorListener = Box<dyn Fn(&str) + Send + Sync>;

/// Ordered listeners per event kind. Registration order is dispatch order.
#[derive(Default)]
struct ListenerRegistry {
    document: Vec<DocumentListener>,
    done: Vec<DoneListener>,
    error: Vec<ErrorListener>,
}

/// State shared between the watcher handle and its receive task.
#[derive(Clone)]
struct Shared {
    job_id: String,
    listeners: Arc<Mutex<ListenerRegistry>>,
    documents: Arc<Mutex<Vec<Document>>>,
    state: Arc<Mutex<WatcherState>>,
}

/// Watches one job over a persistent stream connection, decoding inbound
/// frames and dispatching them to registered listeners.
///
/// Listeners may be registered before or after
/// [`connect`](Self::connect); events dispatched while no listener was
/// registered are not replayed. Callbacks run synchronously on the
/// receive task, so a slow listener delays subsequent frames for this
/// connection — hand heavy work off to a channel or task instead of
/// blocking the delivery path.
///
/// Each watcher owns exactly one connection and one document
/// accumulator; watchers for different jobs never interfere.
pub struct CrawlWatcher {
    config: ClientConfig,
    shared: Shared,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CrawlWatcher {
    pub fn new(job_id: impl Into<String>, config: ClientConfig) -> Self {
        Self {
            config,
            shared: Shared {
                job_id: job_id.into(),
                listeners: Arc::new(Mutex::new(ListenerRegistry::default())),
                documents: Arc::new(Mutex::new(Vec::new())),
                state: Arc::new(Mutex::new(WatcherState::Idle)),
            },
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.shared.job_id
    }

    /// Register a listener for each incoming document.
    pub fn on_document(&self, listener: impl Fn(&Document) + Send + Sync + 'static) {
        lock(&self.shared.listeners).document.push(Box::new(listener));
    }

    /// Register a listener for the terminal `done` event. Receives every
    /// document accumulated over the connection, in arrival order.
    pub fn on_done(&self, listener: impl Fn(&[Document]) + Send + Sync + 'static) {
        lock(&self.shared.listeners).done.push(Box::new(listener));
    }

    /// Register a listener for the terminal `error` event and for
    /// connection failures.
    pub fn on_error(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        lock(&self.shared.listeners).error.push(Box::new(listener));
    }

    /// Open the stream connection and spawn the receive loop.
    ///
    /// The stream endpoint is the API base URL with its scheme
    /// substituted (`http`→`ws`, `https`→`wss`) and path
    /// `/v1/crawl/{job_id}`, authenticated with the same bearer key.
    ///
    /// After a failure or close, calling `connect` again opens a fresh
    /// connection; there is no automatic reconnect.
    pub async fn connect(&mut self) -> Result<()> {
        const ACTION: &str = "open crawl stream";

        if self.state() == WatcherState::Connected {
            return Err(Error::InvalidRequest("watcher is already connected".into()));
        }

        let url = stream_url(&self.config.api_url, &self.shared.job_id)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::transport(ACTION, 1, e.to_string()))?;
        request.headers_mut().insert(
            "Authorization",
            format!("Bearer {}", self.config.api_key)
                .parse()
                .map_err(|_| {
                    Error::transport(ACTION, 1, "API key is not a valid header value")
                })?,
        );

        let (stream, _) = connect_async(request)
            .await
            .map_err(|e| Error::transport(ACTION, 1, e.to_string()))?;

        tracing::debug!(job_id = %self.shared.job_id, url = %url, "Stream connected");

        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        *lock(&self.shared.state) = WatcherState::Connected;
        self.task = Some(tokio::spawn(receive_loop(
            stream,
            self.shared.clone(),
            self.cancel.clone(),
        )));
        Ok(())
    }

    /// Close the connection early, cancelling observation of the job.
    ///
    /// Idempotent: closing an already-closed or already-terminal watcher
    /// is a no-op. The server-side job keeps running either way.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Cheap handle for closing this watcher from another task.
    ///
    /// Bound to the current connection; a handle taken before a
    /// reconnect does not affect the new connection.
    pub fn close_handle(&self) -> WatcherCloseHandle {
        WatcherCloseHandle(self.cancel.clone())
    }

    /// Wait until the receive loop has finished (terminal frame,
    /// connection failure, or close), then report the final state.
    pub async fn wait(&mut self) -> WatcherState {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(job_id = %self.shared.job_id, error = %e, "Receive task failed");
            }
        }
        self.state()
    }

    pub fn state(&self) -> WatcherState {
        *lock(&self.shared.state)
    }

    /// Snapshot of every document received so far, in arrival order.
    pub fn documents(&self) -> Vec<Document> {
        lock(&self.shared.documents).clone()
    }
}

/// See [`CrawlWatcher::close_handle`].
#[derive(Clone)]
pub struct WatcherCloseHandle(CancellationToken);

impl WatcherCloseHandle {
    /// Same as [`CrawlWatcher::close`]; idempotent.
    pub fn close(&self) {
        self.0.cancel();
    }
}

impl Shared {
    /// Dispatch one decoded frame. Returns true when the frame was
    /// terminal and the connection should close.
    fn handle_frame(&self, text: &str) -> bool {
        match InboundFrame::parse(text) {
            Ok(InboundFrame::Document(doc)) => {
                let doc = *doc;
                lock(&self.documents).push(doc.clone());
                let listeners = lock(&self.listeners);
                for listener in &listeners.document {
                    listener(&doc);
                }
                false
            }
            Ok(InboundFrame::Done) => {
                *lock(&self.state) = WatcherState::Done;
                let documents = lock(&self.documents).clone();
                let listeners = lock(&self.listeners);
                for listener in &listeners.done {
                    listener(&documents);
                }
                tracing::debug!(
                    job_id = %self.job_id,
                    documents = documents.len(),
                    "Stream reported done"
                );
                true
            }
            Ok(InboundFrame::Error(message)) => {
                *lock(&self.state) = WatcherState::Failed;
                let listeners = lock(&self.listeners);
                for listener in &listeners.error {
                    listener(&message);
                }
                tracing::warn!(job_id = %self.job_id, error = %message, "Stream reported error");
                true
            }
            Ok(InboundFrame::Unknown(kind)) => {
                tracing::warn!(job_id = %self.job_id, %kind, "Ignoring unknown stream frame kind");
                false
            }
            Err(e) => {
                tracing::warn!(job_id = %self.job_id, error = %e, "Ignoring malformed stream frame");
                false
            }
        }
    }

    /// The connection ended without a terminal frame.
    fn connection_lost(&self, cause: &str) {
        *lock(&self.state) = WatcherState::Failed;
        let listeners = lock(&self.listeners);
        for listener in &listeners.error {
            listener(cause);
        }
        tracing::warn!(job_id = %self.job_id, error = %cause, "Stream connection lost");
    }
}

async fn receive_loop(mut stream: WsStream, shared: Shared, cancel: CancellationToken) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                *lock(&shared.state) = WatcherState::Closed;
                let _ = stream.close(None).await;
                tracing::debug!(job_id = %shared.job_id, "Stream closed by caller");
                break;
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if shared.handle_frame(text.as_str()) {
                        let _ = stream.close(None).await;
                        break;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = stream.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    shared.connection_lost("connection closed before the job finished");
                    break;
                }
                Some(Ok(_)) => {
                    // Binary and pong frames are not part of the protocol.
                }
                Some(Err(e)) => {
                    shared.connection_lost(&e.to_string());
                    break;
                }
            }
        }
    }
}

/// Acquire a watcher mutex, recovering from poison if necessary.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Recovered from poisoned watcher mutex");
        poisoned.into_inner()
    })
}

/// Derive the per-job stream endpoint from the API base URL.
fn stream_url(api_url: &str, job_id: &str) -> Result<Url> {
    let mut url = Url::parse(api_url)
        .map_err(|e| Error::InvalidRequest(format!("invalid API url '{api_url}': {e}")))?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(Error::InvalidRequest(format!(
                "API url scheme '{other}' cannot carry a stream"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::InvalidRequest(format!("invalid API url '{api_url}'")))?;
    url.set_path(&format!("/v1/crawl/{job_id}"));
    Ok(url)
}
