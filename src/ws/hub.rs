//! Room-scoped connection registry.
//!
//! A single task owns the registry and applies register, unregister and
//! broadcast requests strictly in arrival order. Everything else holds a
//! cloneable [`Hub`] handle and only submits requests.

use crate::db::models::RoomSnapshot;
use crate::ws::protocol::ServerMessage;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Registry entry for one socket. The Hub keeps the only sender of the
/// outbound buffer, so removing the entry is what closes the buffer.
#[derive(Debug)]
pub struct Client {
    pub id: ConnectionId,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub outbound: mpsc::Sender<ServerMessage>,
}

enum HubCommand {
    Register(Client),
    Unregister(ConnectionId),
    Broadcast {
        room_id: Uuid,
        snapshot: Arc<RoomSnapshot>,
    },
    SendTo {
        id: ConnectionId,
        message: ServerMessage,
    },
    RoomSize {
        room_id: Uuid,
        reply: oneshot::Sender<usize>,
    },
}

#[derive(Default)]
struct Registry {
    clients: HashMap<ConnectionId, Client>,
}

impl Registry {
    fn register(&mut self, client: Client) {
        if self.clients.contains_key(&client.id) {
            debug!(connection_id = %client.id, "Connection already registered");
            return;
        }
        debug!(
            connection_id = %client.id,
            room_id = %client.room_id,
            user_id = %client.user_id,
            "Connection registered"
        );
        self.clients.insert(client.id, client);
    }

    fn unregister(&mut self, id: ConnectionId) -> bool {
        match self.clients.remove(&id) {
            Some(client) => {
                debug!(
                    connection_id = %id,
                    room_id = %client.room_id,
                    "Connection unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Non-blocking delivery to every member of the room. Members whose
    /// buffer is full or already closed are evicted in the same pass.
    fn broadcast(&mut self, room_id: Uuid, snapshot: Arc<RoomSnapshot>) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        for client in self.clients.values().filter(|c| c.room_id == room_id) {
            match client
                .outbound
                .try_send(ServerMessage::Snapshot(snapshot.clone()))
            {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        connection_id = %client.id,
                        room_id = %room_id,
                        "Outbound buffer full, evicting connection"
                    );
                    dead.push(client.id);
                }
                Err(TrySendError::Closed(_)) => dead.push(client.id),
            }
        }

        for id in dead {
            self.clients.remove(&id);
        }
        delivered
    }

    fn send_to(&mut self, id: ConnectionId, message: ServerMessage) -> bool {
        let Some(client) = self.clients.get(&id) else {
            return false;
        };
        match client.outbound.try_send(message) {
            Ok(()) => true,
            Err(err) => {
                if matches!(err, TrySendError::Full(_)) {
                    warn!(connection_id = %id, "Outbound buffer full, evicting connection");
                }
                self.clients.remove(&id);
                false
            }
        }
    }

    fn room_size(&self, room_id: Uuid) -> usize {
        self.clients
            .values()
            .filter(|c| c.room_id == room_id)
            .count()
    }

    fn apply(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register(client) => self.register(client),
            HubCommand::Unregister(id) => {
                self.unregister(id);
            }
            HubCommand::Broadcast { room_id, snapshot } => {
                let delivered = self.broadcast(room_id, snapshot);
                debug!(room_id = %room_id, delivered, "Room snapshot broadcast");
            }
            HubCommand::SendTo { id, message } => {
                self.send_to(id, message);
            }
            HubCommand::RoomSize { room_id, reply } => {
                let _ = reply.send(self.room_size(room_id));
            }
        }
    }
}

/// Handle for submitting requests to the registry task.
///
/// Submissions never fail from the caller's side; once the task is gone
/// they are dropped.
#[derive(Clone)]
pub struct Hub {
    commands: mpsc::UnboundedSender<HubCommand>,
}

impl Hub {
    /// Spawns the registry task. It stops once every handle is dropped.
    pub fn spawn() -> Self {
        let (commands, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut registry = Registry::default();
            while let Some(command) = rx.recv().await {
                registry.apply(command);
            }
            debug!("Hub loop stopped");
        });
        Self { commands }
    }

    fn submit(&self, command: HubCommand) {
        if self.commands.send(command).is_err() {
            debug!("Hub loop is gone, dropping request");
        }
    }

    pub fn register(&self, client: Client) {
        self.submit(HubCommand::Register(client));
    }

    pub fn unregister(&self, id: ConnectionId) {
        self.submit(HubCommand::Unregister(id));
    }

    pub fn broadcast(&self, room_id: Uuid, snapshot: RoomSnapshot) {
        self.submit(HubCommand::Broadcast {
            room_id,
            snapshot: Arc::new(snapshot),
        });
    }

    /// Delivers to one connection only, with the same eviction rule as broadcasts.
    pub fn send_to(&self, id: ConnectionId, message: ServerMessage) {
        self.submit(HubCommand::SendTo { id, message });
    }

    /// Number of registered connections in the room, as seen after every
    /// request submitted before this call.
    pub async fn connection_count(&self, room_id: Uuid) -> usize {
        let (reply, rx) = oneshot::channel();
        self.submit(HubCommand::RoomSize { room_id, reply });
        rx.await.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(room_id: Uuid, capacity: usize) -> (Client, mpsc::Receiver<ServerMessage>) {
        let (outbound, rx) = mpsc::channel(capacity);
        let client = Client {
            id: ConnectionId::new(),
            room_id,
            user_id: Uuid::new_v4(),
            outbound,
        };
        (client, rx)
    }

    fn snapshot(name: &str) -> Arc<RoomSnapshot> {
        Arc::new(RoomSnapshot {
            room_name: name.to_string(),
            users: vec![],
            options: vec![],
            votes: vec![],
            reveal_votes: false,
        })
    }

    #[test]
    fn full_buffer_is_evicted_and_others_still_receive() {
        let room = Uuid::new_v4();
        let mut registry = Registry::default();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (c, rx) = client(room, 4);
            registry.register(c);
            receivers.push(rx);
        }
        let (slow, mut slow_rx) = client(room, 1);
        let slow_id = slow.id;
        slow.outbound
            .try_send(ServerMessage::error("filler"))
            .unwrap();
        registry.register(slow);

        assert_eq!(registry.broadcast(room, snapshot("first")), 3);
        assert!(!registry.clients.contains_key(&slow_id));
        assert_eq!(registry.room_size(room), 3);

        assert_eq!(registry.broadcast(room, snapshot("second")), 3);
        for rx in receivers.iter_mut() {
            assert!(matches!(rx.try_recv(), Ok(ServerMessage::Snapshot(s)) if s.room_name == "first"));
            assert!(matches!(rx.try_recv(), Ok(ServerMessage::Snapshot(s)) if s.room_name == "second"));
        }

        // evicted buffer is closed once the filler is drained
        assert!(matches!(slow_rx.try_recv(), Ok(ServerMessage::Error(_))));
        assert!(matches!(
            slow_rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn broadcast_only_reaches_matching_room() {
        let room = Uuid::new_v4();
        let mut registry = Registry::default();
        let (member, mut member_rx) = client(room, 2);
        let (outsider, mut outsider_rx) = client(Uuid::new_v4(), 2);
        registry.register(member);
        registry.register(outsider);

        assert_eq!(registry.broadcast(room, snapshot("r")), 1);
        assert!(member_rx.try_recv().is_ok());
        assert!(outsider_rx.try_recv().is_err());
    }

    #[test]
    fn double_unregister_is_a_no_op() {
        let room = Uuid::new_v4();
        let mut registry = Registry::default();
        let (a, mut a_rx) = client(room, 1);
        let (b, _b_rx) = client(room, 1);
        let a_id = a.id;
        registry.register(a);
        registry.register(b);

        assert!(registry.unregister(a_id));
        assert_eq!(registry.room_size(room), 1);
        assert!(!registry.unregister(a_id));
        assert_eq!(registry.room_size(room), 1);
        assert!(matches!(
            a_rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn registering_twice_keeps_first_entry() {
        let room = Uuid::new_v4();
        let mut registry = Registry::default();
        let (first, mut first_rx) = client(room, 1);
        let id = first.id;
        let (mut second, mut second_rx) = client(room, 1);
        second.id = id;

        registry.register(first);
        registry.register(second);
        assert_eq!(registry.room_size(room), 1);

        registry.broadcast(room, snapshot("r"));
        assert!(first_rx.try_recv().is_ok());
        assert!(matches!(
            second_rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn send_to_targets_a_single_connection() {
        let room = Uuid::new_v4();
        let mut registry = Registry::default();
        let (a, mut a_rx) = client(room, 1);
        let (b, mut b_rx) = client(room, 1);
        let a_id = a.id;
        registry.register(a);
        registry.register(b);

        assert!(registry.send_to(a_id, ServerMessage::error("nope")));
        assert!(matches!(a_rx.try_recv(), Ok(ServerMessage::Error(e)) if e.message == "nope"));
        assert!(b_rx.try_recv().is_err());
        assert!(!registry.send_to(ConnectionId::new(), ServerMessage::error("x")));
    }

    #[tokio::test]
    async fn hub_loop_applies_requests_in_order() {
        let hub = Hub::spawn();
        let room = Uuid::new_v4();
        let (a, mut a_rx) = client(room, 4);
        let (b, mut b_rx) = client(room, 4);
        let b_id = b.id;

        hub.register(a);
        hub.register(b);
        hub.broadcast(room, (*snapshot("one")).clone());
        hub.unregister(b_id);
        hub.unregister(b_id);
        hub.broadcast(room, (*snapshot("two")).clone());

        assert_eq!(hub.connection_count(room).await, 1);
        assert!(matches!(a_rx.recv().await, Some(ServerMessage::Snapshot(s)) if s.room_name == "one"));
        assert!(matches!(a_rx.recv().await, Some(ServerMessage::Snapshot(s)) if s.room_name == "two"));
        assert!(matches!(b_rx.recv().await, Some(ServerMessage::Snapshot(s)) if s.room_name == "one"));
        assert!(b_rx.recv().await.is_none());
    }
}
