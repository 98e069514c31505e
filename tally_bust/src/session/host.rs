use crate::game::entities::PeerId;

/// Picks the authoritative host from a connected roster.
pub trait HostSelector {
    /// `suggested` is the transport's preference, if it has one.
    fn select(&self, peers: &[PeerId], suggested: Option<&PeerId>) -> Option<PeerId>;
}

/// Lowest identity wins. Every peer computes the same answer without
/// exchanging anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct LexicalHostSelector;

impl HostSelector for LexicalHostSelector {
    fn select(&self, peers: &[PeerId], _suggested: Option<&PeerId>) -> Option<PeerId> {
        peers.iter().min().cloned()
    }
}

/// Honors the transport's pick (e.g. best connectivity) when it's in the
/// roster, otherwise falls back to lexical order.
#[derive(Clone, Copy, Debug, Default)]
pub struct PreferredHostSelector;

impl HostSelector for PreferredHostSelector {
    fn select(&self, peers: &[PeerId], suggested: Option<&PeerId>) -> Option<PeerId> {
        suggested
            .filter(|peer| peers.contains(peer))
            .cloned()
            .or_else(|| LexicalHostSelector.select(peers, None))
    }
}
