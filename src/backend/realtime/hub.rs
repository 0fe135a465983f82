/**
 * Real-time Hub
 *
 * The hub is the single owner of "who is connected". It runs as one task and
 * consumes a queue of `HubCommand`s; registration, unregistration, broadcast
 * and presence bookkeeping all happen inside that loop, so no lock guards the
 * registry.
 *
 * # Delivery
 *
 * Each event is serialized once and offered to every connection's bounded
 * outbound queue without waiting. A connection whose queue is full or closed
 * is dropped on the spot: its queue sender is released (which ends the
 * connection's writer), its presence count is decremented, and the remaining
 * connections receive an updated `online_users` event.
 *
 * # Presence
 *
 * A user is online while at least one connection authenticated as that user
 * is registered. Presence is recomputed and broadcast after every change.
 */
use std::collections::{BTreeMap, HashMap};

use axum::extract::ws::Utf8Bytes;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::shared::event::ServerEvent;
use crate::shared::messaging::UserId;

/// Capacity of the hub's command queue
const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Identifier of one live connection
pub type ConnectionId = Uuid;

/// The hub's view of a connection: who it is and where to push frames
#[derive(Debug)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub user_id: UserId,
    outbound: mpsc::Sender<Utf8Bytes>,
}

impl ConnectionHandle {
    pub fn new(user_id: UserId, outbound: mpsc::Sender<Utf8Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            outbound,
        }
    }
}

/// Presence and registry counts at one point of the hub loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubSnapshot {
    /// Registered connections
    pub connections: usize,
    /// Active connection count per online user
    pub users: BTreeMap<UserId, usize>,
}

impl HubSnapshot {
    /// Online users in ascending order
    pub fn online_users(&self) -> Vec<UserId> {
        self.users.keys().copied().collect()
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.users.contains_key(&user_id)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HubError {
    #[error("hub is not running")]
    Stopped,
}

enum HubCommand {
    Register(ConnectionHandle),
    Unregister(ConnectionId),
    Broadcast(ServerEvent),
    SendTo(ConnectionId, ServerEvent),
    Snapshot(oneshot::Sender<HubSnapshot>),
}

/// Cloneable handle for submitting requests to the hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
}

impl std::fmt::Debug for HubCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubCommand::Register(handle) => write!(f, "Register({})", handle.id),
            HubCommand::Unregister(id) => write!(f, "Unregister({})", id),
            HubCommand::Broadcast(event) => write!(f, "Broadcast({})", event.kind()),
            HubCommand::SendTo(id, event) => write!(f, "SendTo({}, {})", id, event.kind()),
            HubCommand::Snapshot(_) => write!(f, "Snapshot"),
        }
    }
}

impl HubHandle {
    async fn submit(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HubError::Stopped)
    }

    /// Add a connection to the registry
    pub async fn register(&self, handle: ConnectionHandle) -> Result<(), HubError> {
        self.submit(HubCommand::Register(handle)).await
    }

    /// Remove a connection; a no-op if it is already gone
    pub async fn unregister(&self, id: ConnectionId) -> Result<(), HubError> {
        self.submit(HubCommand::Unregister(id)).await
    }

    /// Deliver an event to every registered connection
    pub async fn broadcast(&self, event: ServerEvent) -> Result<(), HubError> {
        self.submit(HubCommand::Broadcast(event)).await
    }

    /// Deliver an event to one connection
    pub async fn send_to(&self, id: ConnectionId, event: ServerEvent) -> Result<(), HubError> {
        self.submit(HubCommand::SendTo(id, event)).await
    }

    /// Current registry counts, answered from inside the hub loop
    pub async fn snapshot(&self) -> Result<HubSnapshot, HubError> {
        let (reply, response) = oneshot::channel();
        self.submit(HubCommand::Snapshot(reply)).await?;
        response.await.map_err(|_| HubError::Stopped)
    }
}

/// Registry and broadcaster state, owned by the hub task
pub struct Hub {
    connections: HashMap<ConnectionId, ConnectionHandle>,
    presence: BTreeMap<UserId, usize>,
    commands: mpsc::Receiver<HubCommand>,
}

impl Hub {
    /// Start the hub loop and return a handle to it
    ///
    /// The loop stops once every `HubHandle` has been dropped.
    pub fn spawn() -> HubHandle {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let hub = Hub {
            connections: HashMap::new(),
            presence: BTreeMap::new(),
            commands: rx,
        };
        tokio::spawn(hub.run());
        HubHandle { commands: tx }
    }

    async fn run(mut self) {
        tracing::info!("Real-time hub started");
        while let Some(command) = self.commands.recv().await {
            tracing::trace!("Hub command: {:?}", command);
            self.handle(command);
        }
        tracing::info!(
            "Real-time hub stopped with {} connections registered",
            self.connections.len()
        );
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register(handle) => {
                tracing::info!(
                    "Connection {} registered for user {}",
                    handle.id,
                    handle.user_id
                );
                *self.presence.entry(handle.user_id).or_insert(0) += 1;
                self.connections.insert(handle.id, handle);
                self.broadcast(self.presence_event());
            }
            HubCommand::Unregister(id) => {
                if self.remove(id) {
                    tracing::info!("Connection {} unregistered", id);
                    self.broadcast(self.presence_event());
                }
            }
            HubCommand::Broadcast(event) => self.broadcast(event),
            HubCommand::SendTo(id, event) => self.send_to(id, event),
            HubCommand::Snapshot(reply) => {
                let _ = reply.send(HubSnapshot {
                    connections: self.connections.len(),
                    users: self.presence.clone(),
                });
            }
        }
    }

    fn presence_event(&self) -> ServerEvent {
        ServerEvent::OnlineUsers(self.presence.keys().copied().collect())
    }

    /// Drop a connection and decrement its user's presence
    fn remove(&mut self, id: ConnectionId) -> bool {
        let Some(handle) = self.connections.remove(&id) else {
            return false;
        };
        if let Some(count) = self.presence.get_mut(&handle.user_id) {
            *count -= 1;
            if *count == 0 {
                self.presence.remove(&handle.user_id);
            }
        }
        true
    }

    fn broadcast(&mut self, event: ServerEvent) {
        let mut pending = Some(event);

        // Dropping slow consumers changes presence, which is itself broadcast.
        // Every extra round removes at least one connection, so this ends.
        while let Some(event) = pending.take() {
            let Some(payload) = encode(&event) else {
                return;
            };

            let dropped: Vec<ConnectionId> = self
                .connections
                .values()
                .filter(|handle| !offer(handle, &payload))
                .map(|handle| handle.id)
                .collect();

            if !dropped.is_empty() {
                for id in dropped {
                    self.remove(id);
                }
                pending = Some(self.presence_event());
            }
        }
    }

    fn send_to(&mut self, id: ConnectionId, event: ServerEvent) {
        let Some(handle) = self.connections.get(&id) else {
            tracing::debug!("Dropping {} event for departed connection {}", event.kind(), id);
            return;
        };
        let Some(payload) = encode(&event) else {
            return;
        };

        if !offer(handle, &payload) {
            self.remove(id);
            self.broadcast(self.presence_event());
        }
    }
}

fn encode(event: &ServerEvent) -> Option<Utf8Bytes> {
    match event.to_json() {
        Ok(json) => Some(Utf8Bytes::from(json)),
        Err(e) => {
            tracing::error!("Failed to serialize {} event: {:?}", event.kind(), e);
            None
        }
    }
}

/// Non-blocking push; false means the connection must be dropped
fn offer(handle: &ConnectionHandle, payload: &Utf8Bytes) -> bool {
    match handle.outbound.try_send(payload.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(
                "Outbound queue of connection {} (user {}) is full, dropping it",
                handle.id,
                handle.user_id
            );
            false
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!("Outbound queue of connection {} is closed", handle.id);
            false
        }
    }
}
