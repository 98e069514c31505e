//! Peer actor message types.

use tokio::sync::oneshot;

use crate::game::{
    entities::{GameView, PeerId, SeatIndex},
    state_machine::{GameError, GameEvent},
};

/// Commands a [`PeerActor`](super::PeerActor) processes one at a time.
#[derive(Debug)]
pub enum PeerCommand {
    /// A payload from the transport.
    Deliver { from: PeerId, payload: Vec<u8> },

    /// Local play request
    PlayCard {
        hand_index: usize,
        target: Option<SeatIndex>,
        response: oneshot::Sender<Result<(), GameError>>,
    },

    /// Snapshot for the presentation layer
    GetView { response: oneshot::Sender<GameView> },

    /// Chat line to every other peer
    SendNotice { text: String },

    /// The session layer lost `peer`.
    PeerDisconnected { peer: PeerId },

    /// Leave the lobby and bootstrap again.
    Reset,

    /// Stop the actor loop.
    Shutdown,
}

/// A [`GameEvent`] tagged with the peer whose replica produced it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PeerNotification {
    pub peer: PeerId,
    pub event: GameEvent,
}
