//! Transport over tokio channels, one inbox per peer.

use std::collections::BTreeMap;

use log::debug;
use tokio::sync::mpsc;

use super::messages::PeerCommand;
use crate::{
    game::entities::PeerId,
    net::{errors::TransportError, messages::Destination, transport::Transport},
};

/// Routes payloads straight into the other actors' inboxes. Unbounded
/// channels keep sends non-blocking, and each inbox is FIFO per sender.
#[derive(Clone, Debug)]
pub struct ChannelTransport {
    local: PeerId,
    routes: BTreeMap<PeerId, mpsc::UnboundedSender<PeerCommand>>,
}

impl ChannelTransport {
    #[must_use]
    pub fn new(local: PeerId, routes: BTreeMap<PeerId, mpsc::UnboundedSender<PeerCommand>>) -> Self {
        Self { local, routes }
    }

    /// Stops routing to `peer`. Later unicasts to it fail with
    /// [`TransportError::UnknownPeer`].
    pub fn forget(&mut self, peer: &PeerId) {
        if self.routes.remove(peer).is_some() {
            debug!("{}: no longer routing to {peer}", self.local);
        }
    }

    fn deliver(
        &self,
        peer: &PeerId,
        inbox: &mpsc::UnboundedSender<PeerCommand>,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        inbox
            .send(PeerCommand::Deliver {
                from: self.local.clone(),
                payload,
            })
            .map_err(|_| TransportError::Closed(peer.clone()))
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, payload: Vec<u8>, to: &Destination) -> Result<(), TransportError> {
        match to {
            Destination::All => {
                let mut result = Ok(());
                for (peer, inbox) in self.routes.iter().filter(|(peer, _)| **peer != self.local) {
                    if let Err(err) = self.deliver(peer, inbox, payload.clone()) {
                        result = Err(err);
                    }
                }
                result
            }
            Destination::Peer(peer) => {
                let inbox = self
                    .routes
                    .get(peer)
                    .ok_or_else(|| TransportError::UnknownPeer(peer.clone()))?;
                self.deliver(peer, inbox, payload)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routes(
        names: &[&str],
    ) -> (
        BTreeMap<PeerId, mpsc::UnboundedSender<PeerCommand>>,
        Vec<mpsc::UnboundedReceiver<PeerCommand>>,
    ) {
        let mut routes = BTreeMap::new();
        let mut inboxes = Vec::new();
        for name in names {
            let (sender, inbox) = mpsc::unbounded_channel();
            routes.insert(PeerId::new(name), sender);
            inboxes.push(inbox);
        }
        (routes, inboxes)
    }

    #[test]
    fn test_broadcast_reaches_everyone_else() {
        let (routes, mut inboxes) = routes(&["a", "b", "c"]);
        let mut transport = ChannelTransport::new(PeerId::new("a"), routes);
        transport.send(vec![4], &Destination::All).unwrap();

        assert!(inboxes[0].try_recv().is_err());
        for inbox in &mut inboxes[1..] {
            match inbox.try_recv().unwrap() {
                PeerCommand::Deliver { from, payload } => {
                    assert_eq!(from, PeerId::new("a"));
                    assert_eq!(payload, vec![4]);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_closed_inbox_reported() {
        let (routes, mut inboxes) = routes(&["a", "b"]);
        let mut transport = ChannelTransport::new(PeerId::new("a"), routes);
        drop(inboxes.pop());
        assert_eq!(
            transport.send(vec![], &Destination::Peer(PeerId::new("b"))),
            Err(TransportError::Closed(PeerId::new("b")))
        );
    }

    #[test]
    fn test_forgotten_peer_unknown() {
        let (routes, _inboxes) = routes(&["a", "b"]);
        let mut transport = ChannelTransport::new(PeerId::new("a"), routes);
        transport.forget(&PeerId::new("b"));
        assert_eq!(
            transport.send(vec![], &Destination::Peer(PeerId::new("b"))),
            Err(TransportError::UnknownPeer(PeerId::new("b")))
        );
        assert_eq!(transport.send(vec![], &Destination::All), Ok(()));
    }
}
