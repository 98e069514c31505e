//! Deterministic seat assignment.

use std::collections::HashSet;

use super::host::HostSelector;
use crate::game::{
    constants::{MAX_PLAYERS, MIN_PLAYERS},
    entities::{PeerId, SeatIndex},
    state_machine::GameError,
};

/// Seat order for one match. The host sits at seat 0 and everyone else
/// follows in identity order, so every peer derives the same seating from
/// the same roster.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Seating {
    seats: Vec<PeerId>,
}

impl Seating {
    /// # Errors
    ///
    /// Fails when the roster has fewer than 2 or more than 4 peers, lists a
    /// peer twice, or doesn't contain `host`.
    pub fn assign(host: &PeerId, peers: &[PeerId]) -> Result<Self, GameError> {
        if peers.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }
        if peers.len() > MAX_PLAYERS {
            return Err(GameError::TooManyPlayers);
        }
        let mut unique = HashSet::with_capacity(peers.len());
        if !peers.iter().all(|peer| unique.insert(peer)) {
            return Err(GameError::DuplicatePeer);
        }
        if !unique.contains(host) {
            return Err(GameError::UnknownPeer);
        }

        let mut others: Vec<PeerId> = peers.iter().filter(|p| *p != host).cloned().collect();
        others.sort();
        let mut seats = Vec::with_capacity(peers.len());
        seats.push(host.clone());
        seats.extend(others);
        Ok(Self { seats })
    }

    #[must_use]
    pub fn seat_of(&self, peer: &PeerId) -> Option<SeatIndex> {
        self.seats.iter().position(|p| p == peer)
    }

    #[must_use]
    pub fn peer_at(&self, seat: SeatIndex) -> Option<&PeerId> {
        self.seats.get(seat)
    }

    #[must_use]
    pub fn host(&self) -> &PeerId {
        &self.seats[0]
    }

    /// Peers in seat order.
    #[must_use]
    pub fn peers(&self) -> &[PeerId] {
        &self.seats
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

/// What the session layer hands a peer before the match: who we are and
/// where everyone sits.
#[derive(Clone, Debug)]
pub struct Roster {
    pub local: PeerId,
    pub seating: Seating,
}

impl Roster {
    /// # Errors
    ///
    /// Fails when `local` isn't among `peers`, no host can be selected, or
    /// the seating is invalid.
    pub fn new(
        local: PeerId,
        peers: &[PeerId],
        selector: &dyn HostSelector,
        suggested: Option<&PeerId>,
    ) -> Result<Self, GameError> {
        if !peers.contains(&local) {
            return Err(GameError::UnknownPeer);
        }
        let host = selector
            .select(peers, suggested)
            .ok_or(GameError::NotEnoughPlayers)?;
        let seating = Seating::assign(&host, peers)?;
        Ok(Self { local, seating })
    }

    #[must_use]
    pub fn is_host(&self) -> bool {
        self.local == *self.seating.host()
    }

    /// The local peer's seat.
    #[must_use]
    pub fn local_seat(&self) -> SeatIndex {
        self.seating.seat_of(&self.local).unwrap_or_default()
    }
}
