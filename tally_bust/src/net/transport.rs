//! The send half of the transport seam, plus a shared-queue loopback used
//! by tests and single-process simulations.

use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{errors::TransportError, messages::Destination};
use crate::game::entities::PeerId;

/// Reliable send primitive. Delivery is assumed at-least-once and in order
/// per sender; receiving is the caller's job (see
/// [`Peer::on_receive`](crate::peer::Peer::on_receive)).
pub trait Transport {
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the destination can't be reached.
    fn send(&mut self, payload: Vec<u8>, to: &Destination) -> Result<(), TransportError>;
}

/// A payload in flight between two peers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Delivery {
    pub from: PeerId,
    pub to: PeerId,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct HubInner {
    queue: VecDeque<Delivery>,
    down: HashSet<PeerId>,
}

/// In-flight queue shared by every [`LoopbackTransport`] of a match.
///
/// Nothing is delivered until the owner pops it, so tests can drop,
/// duplicate or reorder payloads before handing them to a peer.
#[derive(Clone, Debug, Default)]
pub struct LoopbackHub {
    inner: Arc<Mutex<HubInner>>,
}

impl LoopbackHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A transport for `local` that can reach every peer in `roster`.
    #[must_use]
    pub fn connect(&self, local: PeerId, roster: &[PeerId]) -> LoopbackTransport {
        LoopbackTransport {
            local,
            roster: roster.to_vec(),
            hub: self.clone(),
        }
    }

    pub fn push(&self, delivery: Delivery) {
        self.lock().queue.push_back(delivery);
    }

    #[must_use]
    pub fn pop(&self) -> Option<Delivery> {
        self.lock().queue.pop_front()
    }

    /// Removes everything in flight, oldest first.
    #[must_use]
    pub fn take_all(&self) -> Vec<Delivery> {
        self.lock().queue.drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Pops deliveries one at a time until the queue stays empty. The lock
    /// is released before `route` runs, so it may send more payloads.
    pub fn drain_with<F: FnMut(Delivery)>(&self, mut route: F) -> usize {
        let mut routed = 0;
        while let Some(delivery) = self.pop() {
            route(delivery);
            routed += 1;
        }
        routed
    }

    /// Cuts `peer` off. Queued payloads to it are discarded and later sends
    /// to it fail with [`TransportError::Closed`].
    pub fn disconnect(&self, peer: &PeerId) {
        let mut inner = self.lock();
        inner.down.insert(peer.clone());
        inner
            .queue
            .retain(|delivery| delivery.to != *peer && delivery.from != *peer);
    }

    #[must_use]
    pub fn is_connected(&self, peer: &PeerId) -> bool {
        !self.lock().down.contains(peer)
    }
}

/// One peer's handle onto a [`LoopbackHub`].
#[derive(Clone, Debug)]
pub struct LoopbackTransport {
    local: PeerId,
    roster: Vec<PeerId>,
    hub: LoopbackHub,
}

impl Transport for LoopbackTransport {
    fn send(&mut self, payload: Vec<u8>, to: &Destination) -> Result<(), TransportError> {
        let mut inner = self.hub.lock();
        if inner.down.contains(&self.local) {
            return Err(TransportError::Closed(self.local.clone()));
        }
        match to {
            Destination::All => {
                for peer in self.roster.iter().filter(|peer| **peer != self.local) {
                    if inner.down.contains(peer) {
                        continue;
                    }
                    inner.queue.push_back(Delivery {
                        from: self.local.clone(),
                        to: peer.clone(),
                        payload: payload.clone(),
                    });
                }
                Ok(())
            }
            Destination::Peer(peer) => {
                if !self.roster.contains(peer) {
                    return Err(TransportError::UnknownPeer(peer.clone()));
                }
                if inner.down.contains(peer) {
                    return Err(TransportError::Closed(peer.clone()));
                }
                inner.queue.push_back(Delivery {
                    from: self.local.clone(),
                    to: peer.clone(),
                    payload,
                });
                Ok(())
            }
        }
    }
}
