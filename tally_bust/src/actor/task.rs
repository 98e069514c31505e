//! Peer actor: one tokio task and one inbox per peer.

use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    time::{Instant, interval},
};

use super::{
    channel::ChannelTransport,
    messages::{PeerCommand, PeerNotification},
};
use crate::{
    bot::{CardChooser, Strategy},
    game::{
        entities::{GameView, PeerId, SeatIndex},
        state_machine::GameError,
    },
    peer::Peer,
};

/// How often an idle actor checks its barrier deadlines.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Eq, Error, PartialEq)]
pub enum ActorError {
    #[error("peer {0} is no longer running")]
    Closed(PeerId),
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Cheap, cloneable way to talk to a running [`PeerActor`].
#[derive(Clone, Debug)]
pub struct PeerHandle {
    id: PeerId,
    sender: mpsc::UnboundedSender<PeerCommand>,
}

impl PeerHandle {
    #[must_use]
    pub fn new(id: PeerId, sender: mpsc::UnboundedSender<PeerCommand>) -> Self {
        Self { id, sender }
    }

    #[must_use]
    pub fn id(&self) -> &PeerId {
        &self.id
    }

    /// # Errors
    ///
    /// Returns [`ActorError::Closed`] once the actor has stopped.
    pub fn send(&self, command: PeerCommand) -> Result<(), ActorError> {
        self.sender
            .send(command)
            .map_err(|_| ActorError::Closed(self.id.clone()))
    }

    /// # Errors
    ///
    /// Fails when the actor has stopped or the play is rejected.
    pub async fn play_card(
        &self,
        hand_index: usize,
        target: Option<SeatIndex>,
    ) -> Result<(), ActorError> {
        let (response, result) = oneshot::channel();
        self.send(PeerCommand::PlayCard {
            hand_index,
            target,
            response,
        })?;
        result
            .await
            .map_err(|_| ActorError::Closed(self.id.clone()))?
            .map_err(ActorError::from)
    }

    /// # Errors
    ///
    /// Returns [`ActorError::Closed`] once the actor has stopped.
    pub async fn view(&self) -> Result<GameView, ActorError> {
        let (response, result) = oneshot::channel();
        self.send(PeerCommand::GetView { response })?;
        result
            .await
            .map_err(|_| ActorError::Closed(self.id.clone()))
    }

    /// # Errors
    ///
    /// Returns [`ActorError::Closed`] once the actor has stopped.
    pub fn send_notice(&self, text: impl Into<String>) -> Result<(), ActorError> {
        self.send(PeerCommand::SendNotice { text: text.into() })
    }
}

/// Owns a [`Peer`] and serializes everything that touches it: transport
/// deliveries, local commands, the bot's plays and deadline checks.
pub struct PeerActor {
    peer: Peer<ChannelTransport>,
    inbox: mpsc::UnboundedReceiver<PeerCommand>,
    /// Plays automatically whenever the local turn opens.
    strategy: Option<Strategy>,
    observer: Option<mpsc::UnboundedSender<PeerNotification>>,
    tick_every: Duration,
    is_closed: bool,
}

impl PeerActor {
    #[must_use]
    pub fn new(
        peer: Peer<ChannelTransport>,
        inbox: mpsc::UnboundedReceiver<PeerCommand>,
        strategy: Option<Strategy>,
        observer: Option<mpsc::UnboundedSender<PeerNotification>>,
    ) -> Self {
        Self {
            peer,
            inbox,
            strategy,
            observer,
            tick_every: DEFAULT_TICK,
            is_closed: false,
        }
    }

    #[must_use]
    pub fn with_tick(mut self, tick_every: Duration) -> Self {
        self.tick_every = tick_every;
        self
    }

    /// Runs until [`PeerCommand::Shutdown`] or until every handle and
    /// route to this actor is gone, then hands the peer back.
    pub async fn run(mut self) -> Peer<ChannelTransport> {
        let id = self.peer.id().clone();
        info!("peer {id} (seat {}) starting", self.peer.local_seat());

        // Bootstrap may already have opened a turn or queued events.
        self.after_command();
        let mut tick_interval = interval(self.tick_every);

        loop {
            tokio::select! {
                command = self.inbox.recv() => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => self.is_closed = true,
                    }
                    if self.is_closed {
                        break;
                    }
                }

                _ = tick_interval.tick() => {
                    self.peer.poll_timeouts(Instant::now().into_std());
                }
            }
            self.after_command();
        }

        info!(
            "peer {id} stopped after {} events in phase {}",
            self.peer.state().applied(),
            self.peer.state().phase()
        );
        self.peer
    }

    fn handle_command(&mut self, command: PeerCommand) {
        match command {
            PeerCommand::Deliver { from, payload } => self.peer.on_receive(&payload, &from),
            PeerCommand::PlayCard {
                hand_index,
                target,
                response,
            } => {
                let result = self.peer.play_card(hand_index, target);
                let _ = response.send(result);
            }
            PeerCommand::GetView { response } => {
                let _ = response.send(self.peer.view());
            }
            PeerCommand::SendNotice { text } => self.peer.send_notice(&text),
            PeerCommand::PeerDisconnected { peer } => {
                self.peer.transport_mut().forget(&peer);
                self.peer.on_peer_disconnected(&peer);
            }
            PeerCommand::Reset => self.peer.reset(),
            PeerCommand::Shutdown => self.is_closed = true,
        }
    }

    fn after_command(&mut self) {
        self.autoplay();
        self.notify();
    }

    /// Lets the bot play for as long as the local turn stays open, which
    /// covers the extra play a Banana forces.
    fn autoplay(&mut self) {
        let Some(strategy) = self.strategy.as_mut() else {
            return;
        };
        loop {
            let view = self.peer.view();
            let Some(choice) = strategy.choose(&view) else {
                return;
            };
            let card = view.hand.get(choice.hand_index).copied();
            match self.peer.play_card(choice.hand_index, choice.target) {
                Ok(()) => {
                    if let Some(card) = card {
                        debug!("bot {} played {card}", self.peer.id());
                    }
                }
                Err(err) => {
                    warn!("bot {} failed to play {choice:?}: {err}", self.peer.id());
                    return;
                }
            }
        }
    }

    fn notify(&mut self) {
        let id = self.peer.id().clone();
        let events: Vec<_> = self.peer.drain_events().collect();
        let Some(observer) = &self.observer else {
            return;
        };
        for event in events {
            let notification = PeerNotification {
                peer: id.clone(),
                event,
            };
            if observer.send(notification).is_err() {
                debug!("observer of {id} went away");
                self.observer = None;
                return;
            }
        }
    }
}
