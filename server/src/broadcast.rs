//! Outbound fan-out of server events
//!
//! Every state change in the game is paired with exactly one call on a
//! [`Gateway`]. The production gateway, [`ConnectionHub`], serialises the
//! event once and pushes the frame onto each connection's outbound queue
//! immediately, so clients observe events in the order the game produced them.

use log::{debug, warn};
use shared::{ConnectionId, ServerEvent};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Who receives an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    AllExcept(ConnectionId),
    Only(ConnectionId),
}

impl Audience {
    pub fn includes(&self, id: ConnectionId) -> bool {
        match self {
            Audience::All => true,
            Audience::AllExcept(excluded) => *excluded != id,
            Audience::Only(target) => *target == id,
        }
    }
}

pub trait Gateway {
    fn send(&mut self, audience: Audience, event: ServerEvent);

    fn broadcast(&mut self, event: ServerEvent) {
        self.send(Audience::All, event);
    }

    fn broadcast_except(&mut self, excluded: ConnectionId, event: ServerEvent) {
        self.send(Audience::AllExcept(excluded), event);
    }

    fn reply(&mut self, to: ConnectionId, event: ServerEvent) {
        self.send(Audience::Only(to), event);
    }
}

/// Open connections and their outbound frame queues
#[derive(Debug, Default)]
pub struct ConnectionHub {
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ConnectionId, outbound: mpsc::UnboundedSender<Message>) {
        self.connections.insert(id, outbound);
    }

    pub fn unregister(&mut self, id: ConnectionId) -> bool {
        self.connections.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Gateway for ConnectionHub {
    fn send(&mut self, audience: Audience, event: ServerEvent) {
        let frame = match serde_json::to_string(&event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to serialize {} event: {}", event.name(), e);
                return;
            }
        };

        let mut closed = Vec::new();
        for (id, outbound) in &self.connections {
            if !audience.includes(*id) {
                continue;
            }
            if outbound.send(Message::Text(frame.clone())).is_err() {
                closed.push(*id);
            }
        }

        // Writer task is gone; the reader will report the disconnect
        for id in closed {
            debug!("Dropping closed outbound queue for {}", id);
            self.connections.remove(&id);
        }
    }
}

/// Gateway that keeps every event it is handed, in order
#[derive(Debug, Default)]
pub struct RecordingGateway {
    pub sent: Vec<(Audience, ServerEvent)>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire names of all recorded events
    pub fn names(&self) -> Vec<&'static str> {
        self.sent.iter().map(|(_, event)| event.name()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.sent.iter().filter(|(_, e)| e.name() == name).count()
    }

    pub fn last(&self) -> Option<&ServerEvent> {
        self.sent.last().map(|(_, event)| event)
    }

    /// Most recent event with the given wire name
    pub fn last_named(&self, name: &str) -> Option<&ServerEvent> {
        self.sent
            .iter()
            .rev()
            .map(|(_, event)| event)
            .find(|event| event.name() == name)
    }

    /// Events delivered to one connection
    pub fn received_by(&self, id: ConnectionId) -> Vec<&ServerEvent> {
        self.sent
            .iter()
            .filter(|(audience, _)| audience.includes(id))
            .map(|(_, event)| event)
            .collect()
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl Gateway for RecordingGateway {
    fn send(&mut self, audience: Audience, event: ServerEvent) {
        self.sent.push((audience, event));
    }
}
