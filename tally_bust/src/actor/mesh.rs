//! Spawns and tears down every actor of a single-process match.

use std::{collections::BTreeMap, time::Duration};

use log::{error, info, warn};
use rand::{SeedableRng, rngs::StdRng};
use tokio::{sync::mpsc, task::JoinHandle};

use super::{
    channel::ChannelTransport,
    messages::{PeerCommand, PeerNotification},
    task::{DEFAULT_TICK, PeerActor, PeerHandle},
};
use crate::{
    bot::Strategy,
    game::{entities::PeerId, settings::GameSettings, state_machine::GameError},
    peer::Peer,
    session::{HostSelector, LexicalHostSelector, Roster},
};

/// One seat to fill. Without a strategy the peer only moves when its
/// handle asks it to.
#[derive(Debug)]
pub struct PeerSpec {
    pub id: PeerId,
    pub strategy: Option<Strategy>,
}

impl PeerSpec {
    #[must_use]
    pub fn human(id: PeerId) -> Self {
        Self { id, strategy: None }
    }

    #[must_use]
    pub fn bot(id: PeerId, strategy: Strategy) -> Self {
        Self {
            id,
            strategy: Some(strategy),
        }
    }
}

/// Match-wide knobs for [`PeerMesh::spawn`].
#[derive(Clone, Debug)]
pub struct MeshConfig {
    pub settings: GameSettings,
    /// Seeds every peer's generator (offset by seat) when set.
    pub seed: Option<u64>,
    pub tick_every: Duration,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            settings: GameSettings::default(),
            seed: None,
            tick_every: DEFAULT_TICK,
        }
    }
}

/// A fully connected set of peer actors sharing one process.
pub struct PeerMesh {
    handles: BTreeMap<PeerId, PeerHandle>,
    tasks: BTreeMap<PeerId, JoinHandle<Peer<ChannelTransport>>>,
    host: PeerId,
}

impl PeerMesh {
    /// Spawns one actor per spec with the lexical host selector. Must be
    /// called from inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails on an invalid roster or invalid settings.
    pub fn spawn(
        specs: Vec<PeerSpec>,
        config: &MeshConfig,
        observer: Option<mpsc::UnboundedSender<PeerNotification>>,
    ) -> Result<Self, GameError> {
        Self::spawn_with(specs, config, observer, &LexicalHostSelector)
    }

    /// # Errors
    ///
    /// Fails on an invalid roster or invalid settings.
    pub fn spawn_with(
        specs: Vec<PeerSpec>,
        config: &MeshConfig,
        observer: Option<mpsc::UnboundedSender<PeerNotification>>,
        selector: &dyn HostSelector,
    ) -> Result<Self, GameError> {
        let ids: Vec<PeerId> = specs.iter().map(|spec| spec.id.clone()).collect();
        let mut routes = BTreeMap::new();
        let mut inboxes = BTreeMap::new();
        for id in &ids {
            let (sender, inbox) = mpsc::unbounded_channel();
            routes.insert(id.clone(), sender);
            inboxes.insert(id.clone(), inbox);
        }

        // Build every peer before spawning any task so a bad roster fails
        // the whole mesh. Bootstrap sends land in the inboxes meanwhile.
        let mut actors = Vec::with_capacity(specs.len());
        let mut host = None;
        for spec in specs {
            let roster = Roster::new(spec.id.clone(), &ids, selector, None)?;
            let rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(roster.local_seat() as u64)),
                None => StdRng::from_os_rng(),
            };
            let transport = ChannelTransport::new(spec.id.clone(), routes.clone());
            let peer = Peer::with_rng(roster, config.settings.clone(), transport, rng)?;
            if peer.is_host() {
                host = Some(spec.id.clone());
            }
            let inbox = inboxes.remove(&spec.id).ok_or(GameError::DuplicatePeer)?;
            let actor = PeerActor::new(peer, inbox, spec.strategy, observer.clone())
                .with_tick(config.tick_every);
            actors.push((spec.id, actor));
        }
        let host = host.ok_or(GameError::NotEnoughPlayers)?;

        let handles = routes
            .into_iter()
            .map(|(id, sender)| (id.clone(), PeerHandle::new(id, sender)))
            .collect();
        let tasks = actors
            .into_iter()
            .map(|(id, actor)| (id, tokio::spawn(actor.run())))
            .collect();
        info!("spawned {} peers, host {host}", ids.len());
        Ok(Self {
            handles,
            tasks,
            host,
        })
    }

    #[must_use]
    pub fn host(&self) -> &PeerId {
        &self.host
    }

    #[must_use]
    pub fn handle(&self, id: &PeerId) -> Option<&PeerHandle> {
        self.handles.get(id)
    }

    pub fn handles(&self) -> impl Iterator<Item = &PeerHandle> {
        self.handles.values()
    }

    /// Stops `id` and then tells everyone else it is gone. Waiting for the
    /// actor to stop first means nothing it sent can arrive after the
    /// disconnect notice.
    pub async fn disconnect(&mut self, id: &PeerId) -> Option<Peer<ChannelTransport>> {
        let handle = self.handles.remove(id)?;
        let _ = handle.send(PeerCommand::Shutdown);
        let peer = match self.tasks.remove(id)?.await {
            Ok(peer) => Some(peer),
            Err(err) => {
                error!("peer {id} task failed: {err}");
                None
            }
        };
        for other in self.handles.values() {
            if other
                .send(PeerCommand::PeerDisconnected { peer: id.clone() })
                .is_err()
            {
                warn!("{} already stopped", other.id());
            }
        }
        peer
    }

    /// Stops every actor and returns the final peers in identity order.
    pub async fn shutdown(self) -> Vec<Peer<ChannelTransport>> {
        for handle in self.handles.values() {
            let _ = handle.send(PeerCommand::Shutdown);
        }
        let mut peers = Vec::with_capacity(self.tasks.len());
        for (id, task) in self.tasks {
            match task.await {
                Ok(peer) => peers.push(peer),
                Err(err) => error!("peer {id} task failed: {err}"),
            }
        }
        peers
    }
}
