use std::sync::Arc;

use crate::common::types::{ClientId, SessionKey};
use crate::hub::ClientHandle;
use crate::media::MediaEvent;
use crate::protocol::ClientMessage;

/// Everything that can happen to the room, funneled into one serialized
/// stream: network frames, timer ticks, and player notifications all
/// become values here so state transitions are total-order observable.
pub enum RoomEvent {
    /// A connection passed the hub-side handshake read.
    Connected {
        client: Arc<ClientHandle>,
        session_key: Option<SessionKey>,
        display_name: Option<String>,
    },
    Message {
        client_id: ClientId,
        msg: ClientMessage,
    },
    Disconnected {
        client_id: ClientId,
        session_key: Option<SessionKey>,
    },
    Media(MediaEvent),
    /// The queue reported a mutation via its change callback.
    QueueChanged,
    /// One second of an active countdown elapsed. Carries the countdown
    /// generation so a cancelled countdown can never fire late.
    CountdownTick { generation: u64 },
    /// The initial-play delay elapsed.
    AutoStartDue { generation: u64 },
    /// The guard delay after a failed load elapsed.
    RetryPlayback { generation: u64 },
    Shutdown,
}
