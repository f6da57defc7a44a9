use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument};

use crate::error::DispatchError;
use crate::projection::BookingView;

/// Per-connection push buffer. A slow consumer that falls this far behind
/// starts losing pushes, which the at-most-once contract allows.
const CONNECTION_BUFFER: usize = 16;

pub type ConnectionId = u64;

/// Address of a live-connection room.
///
/// Identity rooms are unique to one participant; category rooms are shared
/// by every technician in one service category and carry the `bids:` wire
/// namespace of the open-call broadcast flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomKey {
    Identity(String),
    Category(String),
}

impl RoomKey {
    pub fn identity(participant_id: impl Into<String>) -> Self {
        RoomKey::Identity(participant_id.into())
    }

    pub fn category(category_name: &str) -> Self {
        RoomKey::Category(category_room_key(category_name))
    }
}

/// Category rooms keep the `bids:` prefix of the original wire namespace.
fn category_room_key(category_name: &str) -> String {
    format!("bids:{category_name}")
}

/// Wire names of pushed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventName {
    #[serde(rename = "newBookingRequest")]
    NewBookingRequest,
    #[serde(rename = "bookingPriceUpdated")]
    PriceUpdated,
    #[serde(rename = "bookingAccepted")]
    Accepted,
    #[serde(rename = "bookingCompleted")]
    Completed,
    #[serde(rename = "bookingCancelled")]
    Cancelled,
    #[serde(rename = "userAgreement")]
    CustomerAgreed,
    #[serde(rename = "newBid")]
    NewBid,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::NewBookingRequest => "newBookingRequest",
            EventName::PriceUpdated => "bookingPriceUpdated",
            EventName::Accepted => "bookingAccepted",
            EventName::Completed => "bookingCompleted",
            EventName::Cancelled => "bookingCancelled",
            EventName::CustomerAgreed => "userAgreement",
            EventName::NewBid => "newBid",
        }
    }
}

/// The `{ message, booking }` payload delivered with every event.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingView>,
}

impl EventEnvelope {
    pub fn for_booking(message: impl Into<String>, booking: BookingView) -> Self {
        Self {
            message: message.into(),
            booking: Some(booking),
        }
    }

    /// Category broadcasts carry no booking record.
    pub fn announcement(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            booking: None,
        }
    }
}

/// One push as delivered to a live connection.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub event: EventName,
    pub envelope: EventEnvelope,
}

/// Port through which the negotiation engine emits events.
///
/// Fire-and-forget: delivery failures are invisible to callers, the
/// mutation has already succeeded by the time an emit happens.
pub trait DispatchPort: Send + Sync {
    fn emit(&self, room: RoomKey, message: PushMessage);
}

#[derive(Debug)]
pub enum DispatchRequest {
    Register {
        respond_to: oneshot::Sender<(ConnectionId, mpsc::Receiver<PushMessage>)>,
    },
    JoinIdentity {
        connection: ConnectionId,
        participant_id: String,
        respond_to: oneshot::Sender<Result<(), DispatchError>>,
    },
    JoinCategory {
        connection: ConnectionId,
        category_name: String,
        respond_to: oneshot::Sender<Result<(), DispatchError>>,
    },
    Disconnect {
        connection: ConnectionId,
    },
    Emit {
        room: RoomKey,
        message: PushMessage,
    },
}

// =============================================================================
// DISPATCH FABRIC
// =============================================================================

/// Owns the subscription registry: live connections plus the identity and
/// category room maps. No persistence, no replay; a recipient that is not
/// connected simply misses the push and reconciles through a pull query.
pub struct DispatchFabric {
    receiver: mpsc::Receiver<DispatchRequest>,
    next_connection_id: ConnectionId,
    connections: HashMap<ConnectionId, mpsc::Sender<PushMessage>>,
    identity_rooms: HashMap<String, HashSet<ConnectionId>>,
    category_rooms: HashMap<String, HashSet<ConnectionId>>,
}

impl DispatchFabric {
    pub fn new(buffer_size: usize) -> (Self, DispatchClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let fabric = Self {
            receiver,
            next_connection_id: 1,
            connections: HashMap::new(),
            identity_rooms: HashMap::new(),
            category_rooms: HashMap::new(),
        };
        let client = DispatchClient { sender };
        (fabric, client)
    }

    #[instrument(name = "dispatch_fabric", skip(self))]
    pub async fn run(mut self) {
        info!("DispatchFabric starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                DispatchRequest::Register { respond_to } => {
                    let id = self.next_connection_id;
                    self.next_connection_id += 1;
                    let (sender, receiver) = mpsc::channel(CONNECTION_BUFFER);
                    self.connections.insert(id, sender);
                    info!(connection = id, "Connection registered");
                    let _ = respond_to.send((id, receiver));
                }
                DispatchRequest::JoinIdentity {
                    connection,
                    participant_id,
                    respond_to,
                } => {
                    let result = if self.connections.contains_key(&connection) {
                        self.identity_rooms
                            .entry(participant_id.clone())
                            .or_default()
                            .insert(connection);
                        debug!(connection, room = %participant_id, "Joined identity room");
                        Ok(())
                    } else {
                        Err(DispatchError::UnknownConnection(connection))
                    };
                    let _ = respond_to.send(result);
                }
                DispatchRequest::JoinCategory {
                    connection,
                    category_name,
                    respond_to,
                } => {
                    let result = if self.connections.contains_key(&connection) {
                        self.category_rooms
                            .entry(category_room_key(&category_name))
                            .or_default()
                            .insert(connection);
                        debug!(connection, room = %category_name, "Joined category room");
                        Ok(())
                    } else {
                        Err(DispatchError::UnknownConnection(connection))
                    };
                    let _ = respond_to.send(result);
                }
                DispatchRequest::Disconnect { connection } => {
                    self.connections.remove(&connection);
                    for members in self.identity_rooms.values_mut() {
                        members.remove(&connection);
                    }
                    for members in self.category_rooms.values_mut() {
                        members.remove(&connection);
                    }
                    info!(connection, "Connection closed");
                }
                DispatchRequest::Emit { room, message } => self.handle_emit(room, message),
            }
        }
        info!("DispatchFabric stopped");
    }

    #[instrument(fields(event = message.event.as_str()), skip(self, room, message))]
    fn handle_emit(&mut self, room: RoomKey, message: PushMessage) {
        let members = match &room {
            RoomKey::Identity(key) => self.identity_rooms.get(key),
            RoomKey::Category(key) => self.category_rooms.get(key),
        };
        let Some(members) = members else {
            debug!(?room, "No connections in room, push dropped");
            return;
        };
        for connection in members {
            match self.connections.get(connection) {
                Some(sender) => {
                    // At-most-once: a full or closed connection loses the push.
                    if sender.try_send(message.clone()).is_err() {
                        debug!(connection, "Connection not accepting pushes, dropped");
                    }
                }
                None => debug!(connection, "Room member has no live connection"),
            }
        }
    }
}

// =============================================================================
// DISPATCH CLIENT
// =============================================================================

/// A technician or customer's live session: the registered connection and
/// the inbox its pushes arrive on.
#[derive(Debug)]
pub struct LiveSession {
    pub connection: ConnectionId,
    pub inbox: mpsc::Receiver<PushMessage>,
}

#[derive(Clone)]
pub struct DispatchClient {
    sender: mpsc::Sender<DispatchRequest>,
}

impl DispatchClient {
    #[instrument(skip(self))]
    pub async fn register(&self) -> Result<(ConnectionId, mpsc::Receiver<PushMessage>), DispatchError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(DispatchRequest::Register { respond_to })
            .await
            .map_err(|_| DispatchError::ActorCommunication("Actor closed".to_string()))?;
        response
            .await
            .map_err(|_| DispatchError::ActorCommunication("Actor dropped".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn join_identity(
        &self,
        connection: ConnectionId,
        participant_id: String,
    ) -> Result<(), DispatchError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(DispatchRequest::JoinIdentity {
                connection,
                participant_id,
                respond_to,
            })
            .await
            .map_err(|_| DispatchError::ActorCommunication("Actor closed".to_string()))?;
        response
            .await
            .map_err(|_| DispatchError::ActorCommunication("Actor dropped".to_string()))?
    }

    #[instrument(skip(self))]
    pub async fn join_category(
        &self,
        connection: ConnectionId,
        category_name: String,
    ) -> Result<(), DispatchError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(DispatchRequest::JoinCategory {
                connection,
                category_name,
                respond_to,
            })
            .await
            .map_err(|_| DispatchError::ActorCommunication("Actor closed".to_string()))?;
        response
            .await
            .map_err(|_| DispatchError::ActorCommunication("Actor dropped".to_string()))?
    }

    #[instrument(skip(self))]
    pub async fn disconnect(&self, connection: ConnectionId) -> Result<(), DispatchError> {
        debug!("Sending request");
        self.sender
            .send(DispatchRequest::Disconnect { connection })
            .await
            .map_err(|_| DispatchError::ActorCommunication("Actor closed".to_string()))
    }

    /// Opens a technician session. Joins both the identity room and the
    /// category room; skipping either silently loses the corresponding
    /// class of pushes.
    pub async fn open_technician_session(
        &self,
        technician_id: &str,
        category_name: &str,
    ) -> Result<LiveSession, DispatchError> {
        let (connection, inbox) = self.register().await?;
        self.join_identity(connection, technician_id.to_string()).await?;
        self.join_category(connection, category_name.to_string()).await?;
        Ok(LiveSession { connection, inbox })
    }

    /// Opens a customer session. Customers are addressed solely by their
    /// identity room.
    pub async fn open_customer_session(
        &self,
        customer_id: &str,
    ) -> Result<LiveSession, DispatchError> {
        let (connection, inbox) = self.register().await?;
        self.join_identity(connection, customer_id.to_string()).await?;
        Ok(LiveSession { connection, inbox })
    }
}

impl DispatchPort for DispatchClient {
    fn emit(&self, room: RoomKey, message: PushMessage) {
        // Fire-and-forget: a full fabric queue drops the push.
        if self
            .sender
            .try_send(DispatchRequest::Emit { room, message })
            .is_err()
        {
            debug!("Dispatch fabric not accepting emits, push dropped");
        }
    }
}
