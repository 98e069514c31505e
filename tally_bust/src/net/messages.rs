use serde::{Deserialize, Serialize};
use std::fmt;

use super::protocol_version::ProtocolVersion;
use crate::game::entities::{Card, JinxKind, PeerId, SeatIndex};

/// Why a deck list is being sent.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SyncReason {
    /// Host's freshly shuffled deck; replaces every peer's deck.
    Init,
    /// Discard cards moved back under the deck.
    Reshuffle,
}

impl fmt::Display for SyncReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Init => "initial deck",
            Self::Reshuffle => "reshuffled deck",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum AckKind {
    /// A non-host peer finished bootstrapping.
    Ready,
    ReceivedDeck,
    ReceivedReshuffle,
}

impl fmt::Display for AckKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Ready => "ready",
            Self::ReceivedDeck => "received deck",
            Self::ReceivedReshuffle => "received reshuffle",
        };
        write!(f, "{repr}")
    }
}

/// A replicated game event. Exactly one variant per event kind, so the
/// dispatch site has to handle every kind.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Message {
    /// `by` played `card`. `hand_index` is only meaningful on the sender's
    /// device; receivers locate the card by id.
    PlayedCard {
        by: SeatIndex,
        card: Card,
        hand_index: usize,
        target: Option<SeatIndex>,
    },
    /// Pop `count` cards off the front of the deck into `target`'s hand.
    DealCards { target: SeatIndex, count: usize },
    SyncDeck {
        cards: Vec<Card>,
        reason: SyncReason,
    },
    /// `of_step` names the deck sync being acknowledged, so stale or
    /// duplicated acks can't satisfy a later barrier.
    Ack { kind: AckKind, of_step: Option<u64> },
    StatusBroadcast { kind: JinxKind, target: SeatIndex },
    /// Concrete LimitChange delta, drawn once by the acting peer.
    AdjustLimit { delta: i32 },
    Eliminate { seat: SeatIndex },
    /// The acting peer hands the turn to the next active seat.
    TurnAdvanced { from: SeatIndex, to: SeatIndex },
    GameOver { winner: SeatIndex },
    PlainNotice { text: String },
}

impl Message {
    /// Whether the message mutates replicated state and therefore carries
    /// a step number.
    #[must_use]
    pub const fn is_sequenced(&self) -> bool {
        match self {
            Self::PlayedCard { .. }
            | Self::DealCards { .. }
            | Self::SyncDeck { .. }
            | Self::StatusBroadcast { .. }
            | Self::AdjustLimit { .. }
            | Self::Eliminate { .. }
            | Self::TurnAdvanced { .. }
            | Self::GameOver { .. } => true,
            Self::Ack { .. } | Self::PlainNotice { .. } => false,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::PlayedCard {
                by,
                card,
                target: Some(target),
                ..
            } => format!("seat {by} played {card} on seat {target}"),
            Self::PlayedCard { by, card, .. } => format!("seat {by} played {card}"),
            Self::DealCards { target, count } => format!("deal {count} to seat {target}"),
            Self::SyncDeck { cards, reason } => format!("{reason} of {} cards", cards.len()),
            Self::Ack { kind, .. } => format!("ack {kind}"),
            Self::StatusBroadcast { kind, target } => format!("jinx {kind} on seat {target}"),
            Self::AdjustLimit { delta } => format!("limit {delta:+}"),
            Self::Eliminate { seat } => format!("seat {seat} eliminated"),
            Self::TurnAdvanced { from, to } => format!("turn {from} -> {to}"),
            Self::GameOver { winner } => format!("seat {winner} wins"),
            Self::PlainNotice { text } => text.clone(),
        };
        write!(f, "{repr}")
    }
}

/// Wire wrapper around a [`Message`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Envelope {
    pub version: ProtocolVersion,
    /// Position in the match's event log for sequenced messages, `None`
    /// for acks and notices.
    pub step: Option<u64>,
    pub message: Message,
}

impl Envelope {
    #[must_use]
    pub fn sequenced(step: u64, message: Message) -> Self {
        Self {
            version: ProtocolVersion::current(),
            step: Some(step),
            message,
        }
    }

    #[must_use]
    pub fn unsequenced(message: Message) -> Self {
        Self {
            version: ProtocolVersion::current(),
            step: None,
            message,
        }
    }

    /// Sequenced messages need a step and acks/notices must not have one.
    #[must_use]
    pub const fn is_well_formed(&self) -> bool {
        self.message.is_sequenced() == self.step.is_some()
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.step {
            Some(step) => write!(f, "[{step}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Who a payload is addressed to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Destination {
    /// Every other peer in the match.
    All,
    Peer(PeerId),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Peer(peer) => write!(f, "{peer}"),
        }
    }
}
