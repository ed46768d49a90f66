//! The client session: one handle to the protocol library, a monotonic
//! query id counter, the response-waiter map and the background receive
//! loop that feeds the event dispatcher.

use crate::auth::CredentialPrompt;
use crate::config::ClientConfig;
use crate::store::StatusStore;
use crate::td::{AuthorizationState, Function, Object, Response, Transport, User};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use tokio::sync::{Mutex, Notify, oneshot};
use tokio::task::JoinHandle;

pub struct Client {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) client_id: AtomicI32,
    query_id_counter: AtomicU64,
    // Registered by callers, resolved by the receive loop; two writers,
    // hence the lock.
    pub(crate) response_waiters: Mutex<HashMap<u64, oneshot::Sender<Object>>>,
    pub(crate) users: Mutex<HashMap<i64, User>>,
    pub(crate) authorization_state: Mutex<Option<AuthorizationState>>,
    pub(crate) are_authorized: AtomicBool,
    pub(crate) need_restart: AtomicBool,
    pub(crate) auth_generation: AtomicU64,
    is_running: AtomicBool,
    shutdown_notifier: Notify,
    recv_task: Mutex<Option<JoinHandle<()>>>,
    pub(crate) store: StatusStore,
    pub(crate) prompt: Arc<dyn CredentialPrompt>,
    pub(crate) config: ClientConfig,
}

impl Client {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: StatusStore,
        prompt: Arc<dyn CredentialPrompt>,
        config: ClientConfig,
    ) -> Arc<Self> {
        let client_id = transport.create_client();
        Arc::new(Self {
            transport,
            client_id: AtomicI32::new(client_id),
            query_id_counter: AtomicU64::new(0),
            response_waiters: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            authorization_state: Mutex::new(None),
            are_authorized: AtomicBool::new(false),
            need_restart: AtomicBool::new(false),
            auth_generation: AtomicU64::new(0),
            is_running: AtomicBool::new(false),
            shutdown_notifier: Notify::new(),
            recv_task: Mutex::new(None),
            store,
            prompt,
            config,
        })
    }

    pub fn is_authorized(&self) -> bool {
        self.are_authorized.load(Ordering::SeqCst)
    }

    // Issued ids start at 1; id 0 is reserved for push notifications.
    fn next_query_id(&self) -> u64 {
        self.query_id_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Sends a request and returns the receiver its response will be
    /// delivered on. Callers that do not care about the response drop the
    /// receiver; the resolved send is then silently ignored.
    pub async fn send_query(&self, function: Function) -> oneshot::Receiver<Object> {
        let query_id = self.next_query_id();
        let (tx, rx) = oneshot::channel();
        self.response_waiters.lock().await.insert(query_id, tx);
        self.transport
            .send(self.client_id.load(Ordering::SeqCst), query_id, function);
        rx
    }

    /// Spawns the background receive loop and kicks the library into
    /// reporting its initial authorization state.
    pub async fn run(self: &Arc<Self>) {
        self.is_running.store(true, Ordering::SeqCst);
        let loop_client = self.clone();
        let handle = tokio::spawn(async move { loop_client.receive_loop().await });
        *self.recv_task.lock().await = Some(handle);
        let _ = self
            .send_query(Function::GetOption {
                name: "version".to_string(),
            })
            .await;
    }

    async fn receive_loop(self: Arc<Self>) {
        debug!(target: "Client/Recv", "receive loop started");
        while self.is_running.load(Ordering::SeqCst) {
            tokio::select! {
                biased;
                _ = self.shutdown_notifier.notified() => break,
                response = self.transport.receive(self.config.receive_timeout) => {
                    if let Some(response) = response {
                        self.process_response(response).await;
                    }
                }
            }
            if self.need_restart.swap(false, Ordering::SeqCst) {
                self.restart().await;
            }
        }
        debug!(target: "Client/Recv", "receive loop stopped");
    }

    /// Routes one message: request id 0 is always a push notification;
    /// anything else resolves (and removes) the matching waiter, or is
    /// dropped if no waiter is registered.
    pub(crate) async fn process_response(self: &Arc<Self>, response: Response) {
        if response.client_id != self.client_id.load(Ordering::SeqCst) {
            debug!(
                target: "Client/Recv",
                "dropping message for stale client handle {}", response.client_id
            );
            return;
        }
        if response.request_id == 0 {
            return self.process_update(response.object).await;
        }
        let waiter = self
            .response_waiters
            .lock()
            .await
            .remove(&response.request_id);
        match waiter {
            Some(tx) => {
                let _ = tx.send(response.object);
            }
            None => debug!(
                target: "Client/Recv",
                "no waiter for request id {}, dropping", response.request_id
            ),
        }
    }

    /// Discards all in-flight session state and starts over with a fresh
    /// client handle, as if freshly constructed. The receive loop keeps
    /// running throughout; state is never torn down under a live worker.
    pub async fn restart(self: &Arc<Self>) {
        warn!(target: "Client", "restarting session");
        self.response_waiters.lock().await.clear();
        self.users.lock().await.clear();
        *self.authorization_state.lock().await = None;
        self.are_authorized.store(false, Ordering::SeqCst);
        self.need_restart.store(false, Ordering::SeqCst);
        // Stales every outstanding authentication completion.
        self.auth_generation.fetch_add(1, Ordering::SeqCst);
        let fresh = self.transport.create_client();
        self.client_id.store(fresh, Ordering::SeqCst);
        let _ = self
            .send_query(Function::GetOption {
                name: "version".to_string(),
            })
            .await;
    }

    /// Cooperatively stops the receive loop and waits for it to finish.
    pub async fn shutdown(&self) {
        self.is_running.store(false, Ordering::SeqCst);
        // notify_one stores a permit, so the wakeup is not lost even if
        // the loop is mid-iteration rather than parked in select.
        self.shutdown_notifier.notify_one();
        if let Some(handle) = self.recv_task.lock().await.take() {
            let _ = handle.await;
        }
    }
}
