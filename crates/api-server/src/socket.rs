//! Socket.IO event handlers for the live dashboard
//!
//! A client subscribes with its bearer token and then receives the full
//! dashboard on every change to its tasks. One subscription per socket;
//! subscribing again replaces the previous one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use socketioxide::extract::{Data, SocketRef, State};
use socketioxide::{SocketIo, TransportType};
use tracing::{debug, info, warn};

use tarefas_core::store::SubscriptionHandle;
use tarefas_core::view::{DashboardEntry, Views};

use crate::auth::identity_from_token;

/// Receiving end of a dashboard
pub trait DashboardClient: Clone + Send + Sync + 'static {
    fn client_id(&self) -> String;
    fn is_connected(&self) -> bool;
    fn sync(&self, entries: &[DashboardEntry]);
    fn fail(&self, message: &str);
}

impl DashboardClient for SocketRef {
    fn client_id(&self) -> String {
        self.id.to_string()
    }

    fn is_connected(&self) -> bool {
        self.connected()
    }

    fn sync(&self, entries: &[DashboardEntry]) {
        if let Err(e) = self.emit("dashboard:sync", &entries) {
            warn!("Failed to emit sync: {}", e);
        }
    }

    fn fail(&self, message: &str) {
        let payload = ErrorPayload {
            message: message.to_string(),
        };
        if let Err(e) = self.emit("dashboard:error", &payload) {
            warn!("Failed to emit error: {}", e);
        }
    }
}

/// Open dashboards keyed by client id.
///
/// A slot is reserved before the subscription is opened and only the
/// reservation still in place when it completes may take the handle.
#[derive(Default)]
struct Registry {
    next_generation: u64,
    slots: HashMap<String, (u64, Option<SubscriptionHandle>)>,
}

/// Shared state for Socket.IO handlers
#[derive(Clone)]
pub struct SocketState {
    views: Views,
    jwt_secret: Arc<str>,
    registry: Arc<Mutex<Registry>>,
}

impl SocketState {
    pub fn new(views: Views, jwt_secret: &str) -> Self {
        Self {
            views,
            jwt_secret: Arc::from(jwt_secret),
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of clients with an open dashboard
    pub fn active_subscriptions(&self) -> usize {
        self.lock_registry()
            .slots
            .values()
            .filter(|(_, handle)| handle.is_some())
            .count()
    }

    /// Claim the slot of `client_id`, closing any dashboard it held
    fn reserve(&self, client_id: &str) -> u64 {
        let mut registry = self.lock_registry();
        registry.next_generation += 1;
        let generation = registry.next_generation;
        // The replaced handle cancels itself on drop
        registry
            .slots
            .insert(client_id.to_string(), (generation, None));
        generation
    }

    /// Store `handle` if the reservation is still current; cancel it otherwise
    fn attach(&self, client_id: &str, generation: u64, handle: SubscriptionHandle) -> bool {
        let mut registry = self.lock_registry();
        match registry.slots.get_mut(client_id) {
            Some((current, slot)) if *current == generation => {
                *slot = Some(handle);
                true
            }
            _ => {
                handle.cancel();
                false
            }
        }
    }

    /// Drop a reservation whose subscription could not be opened
    fn abandon(&self, client_id: &str, generation: u64) {
        let mut registry = self.lock_registry();
        if matches!(registry.slots.get(client_id), Some((current, None)) if *current == generation) {
            registry.slots.remove(client_id);
        }
    }

    fn release(&self, client_id: &str) -> bool {
        let removed = self.lock_registry().slots.remove(client_id);
        match removed {
            Some((_, Some(handle))) => {
                handle.cancel();
                true
            }
            _ => false,
        }
    }
}

// ============ Event Payloads ============

#[derive(Debug, Deserialize)]
pub struct SubscribePayload {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

// ============ Event Handlers ============

/// Handle new socket connection
pub async fn on_connect(socket: SocketRef) {
    info!("Client connected: {}", socket.id);

    socket.on(
        "dashboard:subscribe",
        |socket: SocketRef, State(state): State<SocketState>, Data(data): Data<SubscribePayload>| async move {
            handle_subscribe(socket, &state, &data.token).await;
        },
    );

    socket.on(
        "dashboard:unsubscribe",
        |socket: SocketRef, State(state): State<SocketState>| async move {
            if state.release(&socket.id.to_string()) {
                info!("Client {} closed its dashboard", socket.id);
            }
        },
    );

    socket.on_disconnect(|socket: SocketRef, State(state): State<SocketState>| async move {
        state.release(&socket.id.to_string());
        info!(
            "Client disconnected: {} ({} dashboards open)",
            socket.id,
            state.active_subscriptions()
        );
    });
}

async fn handle_subscribe<C: DashboardClient>(client: C, state: &SocketState, token: &str) {
    let client_id = client.client_id();
    let identity = match identity_from_token(&state.jwt_secret, token) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Rejected dashboard subscription from {}: {}", client_id, e);
            client.fail(&e.to_string());
            return;
        }
    };
    info!("Client {} opened dashboard of {}", client_id, identity.email);

    let generation = state.reserve(&client_id);
    let sender = client.clone();
    let result = state
        .views
        .build_dashboard_view(Some(&identity), move |entries: Vec<DashboardEntry>| {
            debug!("Syncing {} dashboard entries to {}", entries.len(), sender.client_id());
            sender.sync(&entries);
        })
        .await;

    match result {
        Ok(handle) => {
            if !state.attach(&client_id, generation, handle) {
                debug!("Dashboard of {} superseded while opening", client_id);
            } else if !client.is_connected() {
                // Disconnected while the subscription was opening
                state.release(&client_id);
            }
        }
        Err(e) => {
            warn!("Failed to open dashboard: {}", e);
            state.abandon(&client_id, generation);
            client.fail("Unable to load tasks");
        }
    }
}

/// Create and configure Socket.IO layer
pub fn create_socket_layer(state: SocketState) -> (socketioxide::layer::SocketIoLayer, SocketIo) {
    let (layer, io) = SocketIo::builder()
        .with_state(state)
        // Only allow WebSocket transport to avoid CORS issues with polling
        .transports([TransportType::Websocket])
        .build_layer();

    io.ns("/", on_connect);

    (layer, io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tarefas_core::comment::CommentRepository;
    use tarefas_core::policy::Identity;
    use tarefas_core::store::{DocumentStore, FileDocumentStore};
    use tarefas_core::task::TaskRepository;
    use tarefas_core::view::ShareLinks;

    use crate::auth::issue_identity_jwt;
    use crate::routes::testing::SECRET;

    #[derive(Clone)]
    struct RecordingClient {
        id: String,
        connected: Arc<AtomicBool>,
        synced: Arc<Mutex<Vec<Vec<DashboardEntry>>>>,
        errors: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingClient {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                connected: Arc::new(AtomicBool::new(true)),
                synced: Arc::new(Mutex::new(Vec::new())),
                errors: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn last_sync_len(&self) -> Option<usize> {
            self.synced.lock().unwrap().last().map(Vec::len)
        }

        async fn wait_for_sync_len(&self, len: usize) -> bool {
            for _ in 0..100 {
                if self.last_sync_len() == Some(len) {
                    return true;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            false
        }
    }

    impl DashboardClient for RecordingClient {
        fn client_id(&self) -> String {
            self.id.clone()
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        fn sync(&self, entries: &[DashboardEntry]) {
            self.synced.lock().unwrap().push(entries.to_vec());
        }

        fn fail(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    fn socket_state() -> (SocketState, Arc<FileDocumentStore>) {
        let store = Arc::new(FileDocumentStore::in_memory());
        let shared: Arc<dyn DocumentStore> = store.clone();
        let views = Views::new(
            TaskRepository::new(Arc::clone(&shared)),
            CommentRepository::new(shared),
            ShareLinks::new("http://localhost:8081"),
        );
        (SocketState::new(views, SECRET), store)
    }

    fn token(email: &str) -> String {
        issue_identity_jwt(SECRET, email, Some("Alice"), 1).unwrap().0
    }

    #[tokio::test]
    async fn subscribe_syncs_dashboard_on_every_change() {
        let (state, _store) = socket_state();
        let client = RecordingClient::new("socket-1");

        handle_subscribe(client.clone(), &state, &token("a@x.com")).await;
        assert_eq!(state.active_subscriptions(), 1);
        assert!(client.wait_for_sync_len(0).await);

        state
            .views
            .tasks()
            .create_task("a@x.com", "buy milk", true)
            .await
            .unwrap();
        assert!(client.wait_for_sync_len(1).await);

        let synced = client.synced.lock().unwrap().last().cloned().unwrap();
        assert_eq!(synced[0].task.text, "buy milk");
        assert!(client.errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_token_reports_error() {
        let (state, store) = socket_state();
        let client = RecordingClient::new("socket-1");

        handle_subscribe(client.clone(), &state, "not-a-token").await;

        assert_eq!(client.errors.lock().unwrap().len(), 1);
        assert!(client.synced.lock().unwrap().is_empty());
        assert_eq!(state.active_subscriptions(), 0);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn disconnect_while_opening_releases_subscription() {
        let (state, store) = socket_state();
        let client = RecordingClient::new("socket-1");
        client.connected.store(false, Ordering::SeqCst);

        handle_subscribe(client, &state, &token("a@x.com")).await;

        assert_eq!(state.active_subscriptions(), 0);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn release_before_attach_cancels_late_handle() {
        let (state, store) = socket_state();
        let alice = Identity::new("a@x.com", "Alice");

        let generation = state.reserve("socket-1");
        let handle = state
            .views
            .build_dashboard_view(Some(&alice), |_| {})
            .await
            .unwrap();
        assert!(!state.release("socket-1"));

        assert!(!state.attach("socket-1", generation, handle));
        assert_eq!(state.active_subscriptions(), 0);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn resubscribing_keeps_one_subscription() {
        let (state, store) = socket_state();
        let client = RecordingClient::new("socket-1");

        for _ in 0..2 {
            handle_subscribe(client.clone(), &state, &token("a@x.com")).await;
        }
        assert_eq!(state.active_subscriptions(), 1);
        assert_eq!(store.listener_count(), 1);

        assert!(state.release("socket-1"));
        assert_eq!(store.listener_count(), 0);
    }
}
