use super::api::{Function, Object};
use async_trait::async_trait;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};

/// One message pulled from the protocol client.
///
/// `request_id == 0` marks a push notification; any other value ties the
/// object back to a previously issued query.
#[derive(Debug, Clone)]
pub struct Response {
    pub client_id: i32,
    pub request_id: u64,
    pub object: Object,
}

/// The four primitives the client needs from the external protocol
/// library: create a client handle, send a tagged request, pull the next
/// message with a bounded wait, and run a synchronous command.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Allocates a fresh client handle id.
    fn create_client(&self) -> i32;

    /// Hands a request to the library for asynchronous delivery. The
    /// response, if any, comes back through [`Transport::receive`] tagged
    /// with `query_id`.
    fn send(&self, client_id: i32, query_id: u64, function: Function);

    /// Waits up to `timeout` for the next message. `None` means the wait
    /// elapsed without anything arriving.
    async fn receive(&self, timeout: Duration) -> Option<Response>;

    /// Runs a simple synchronous command (e.g. setting log verbosity).
    fn execute(&self, function: Function) -> Option<Object>;
}

/// A query recorded by [`ChannelTransport`].
#[derive(Debug, Clone)]
pub struct SentQuery {
    pub client_id: i32,
    pub query_id: u64,
    pub function: Function,
}

/// In-process transport backed by a channel.
///
/// Records every outgoing query and replays whatever [`Response`]s are
/// injected into it, which makes it the workhorse of the test suite and a
/// usable stand-in anywhere a real protocol backend is unavailable.
/// Client handle ids start at 1.
pub struct ChannelTransport {
    incoming: Mutex<mpsc::UnboundedReceiver<Response>>,
    injector: mpsc::UnboundedSender<Response>,
    sent: StdMutex<Vec<SentQuery>>,
    executed: StdMutex<Vec<Function>>,
    next_client_id: AtomicI32,
}

impl ChannelTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            incoming: Mutex::new(rx),
            injector: tx,
            sent: StdMutex::new(Vec::new()),
            executed: StdMutex::new(Vec::new()),
            next_client_id: AtomicI32::new(0),
        }
    }

    /// Queues a response for the receive loop to pick up.
    pub fn inject(&self, response: Response) {
        // The receiver only goes away when the transport itself does.
        let _ = self.injector.send(response);
    }

    /// Snapshot of every query sent so far, in send order.
    pub fn sent_queries(&self) -> Vec<SentQuery> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Snapshot of every synchronously executed command.
    pub fn executed_commands(&self) -> Vec<Function> {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn create_client(&self) -> i32 {
        self.next_client_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn send(&self, client_id: i32, query_id: u64, function: Function) {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentQuery {
                client_id,
                query_id,
                function,
            });
    }

    async fn receive(&self, timeout: Duration) -> Option<Response> {
        let mut incoming = self.incoming.lock().await;
        tokio::time::timeout(timeout, incoming.recv())
            .await
            .ok()
            .flatten()
    }

    fn execute(&self, function: Function) -> Option<Object> {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(function);
        Some(Object::Ok)
    }
}
