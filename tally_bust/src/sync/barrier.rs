use std::{collections::BTreeSet, fmt, time::Instant};

use crate::{game::entities::PeerId, net::messages::AckKind};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BarrierKind {
    /// Every peer finished bootstrapping; the host may build the deck.
    PlayersReady,
    /// Every peer holds the initial deck; the host may deal.
    ReceivedDeck,
    /// Every peer appended the reshuffled cards; the actor may resume its deal.
    ReceivedReshuffle,
}

impl BarrierKind {
    /// The ack that counts towards this barrier.
    #[must_use]
    pub const fn ack(self) -> AckKind {
        match self {
            Self::PlayersReady => AckKind::Ready,
            Self::ReceivedDeck => AckKind::ReceivedDeck,
            Self::ReceivedReshuffle => AckKind::ReceivedReshuffle,
        }
    }

    #[must_use]
    pub const fn for_ack(ack: AckKind) -> Self {
        match ack {
            AckKind::Ready => Self::PlayersReady,
            AckKind::ReceivedDeck => Self::ReceivedDeck,
            AckKind::ReceivedReshuffle => Self::ReceivedReshuffle,
        }
    }
}

impl fmt::Display for BarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::PlayersReady => "players ready",
            Self::ReceivedDeck => "deck received",
            Self::ReceivedReshuffle => "reshuffle received",
        };
        write!(f, "{repr}")
    }
}

/// Waits for a set of peers to acknowledge something, then hands back a
/// continuation exactly once.
///
/// The owner counts as acknowledged from the start. Acks are tracked per
/// peer, so duplicates can't push the count past the expected set, and an
/// optional round tag filters out acks meant for an earlier arming.
#[derive(Debug)]
pub struct Barrier<C> {
    kind: BarrierKind,
    owner: PeerId,
    expected: BTreeSet<PeerId>,
    received: BTreeSet<PeerId>,
    continuation: Option<C>,
    round: Option<u64>,
    deadline: Option<Instant>,
}

impl<C> Barrier<C> {
    #[must_use]
    pub fn new(kind: BarrierKind, owner: PeerId) -> Self {
        let received = BTreeSet::from([owner.clone()]);
        Self {
            kind,
            owner,
            expected: BTreeSet::new(),
            received,
            continuation: None,
            round: None,
            deadline: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> BarrierKind {
        self.kind
    }

    /// Starts waiting on `expected` (the owner is implied). Re-arming a
    /// pending barrier discards the old continuation. Returns the new
    /// continuation straight away if nobody else needs to ack.
    pub fn arm<I>(
        &mut self,
        expected: I,
        continuation: C,
        round: Option<u64>,
        deadline: Option<Instant>,
    ) -> Option<C>
    where
        I: IntoIterator<Item = PeerId>,
    {
        self.expected = expected.into_iter().collect();
        self.expected.insert(self.owner.clone());
        self.received = BTreeSet::from([self.owner.clone()]);
        self.continuation = Some(continuation);
        self.round = round;
        self.deadline = deadline;
        self.try_fire()
    }

    /// Counts an ack from `peer`. Acks from outside the expected set, for a
    /// different round, or arriving while idle are ignored.
    pub fn record(&mut self, peer: &PeerId, round: Option<u64>) -> Option<C> {
        if !self.is_pending() || round != self.round || !self.expected.contains(peer) {
            return None;
        }
        if !self.received.insert(peer.clone()) {
            return None;
        }
        self.try_fire()
    }

    /// Stops waiting on `peer`. May satisfy the barrier.
    pub fn drop_peer(&mut self, peer: &PeerId) -> Option<C> {
        if *peer == self.owner {
            return None;
        }
        self.expected.remove(peer);
        self.received.remove(peer);
        self.try_fire()
    }

    fn try_fire(&mut self) -> Option<C> {
        if self.continuation.is_some() && self.expected.is_subset(&self.received) {
            self.deadline = None;
            self.continuation.take()
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.continuation.is_some()
    }

    #[must_use]
    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    #[must_use]
    pub fn expected_count(&self) -> usize {
        self.expected.len()
    }

    /// Peers still owing an ack.
    #[must_use]
    pub fn missing(&self) -> Vec<PeerId> {
        self.expected.difference(&self.received).cloned().collect()
    }

    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.is_pending() && self.deadline.is_some_and(|deadline| deadline <= now)
    }

    /// Back to the baseline: idle, with only the owner counted.
    pub fn reset(&mut self) {
        self.expected.clear();
        self.received = BTreeSet::from([self.owner.clone()]);
        self.continuation = None;
        self.round = None;
        self.deadline = None;
    }
}
