//! Per-peer controller.
//!
//! A [`Peer`] owns one replica of the match plus the bookkeeping that keeps
//! replicas in step: commit-and-broadcast for events it is authoritative for,
//! strict step ordering for events it receives, and the acknowledgement
//! barriers that gate bootstrap and reshuffles.
//!
//! Authority moves with the turn. The host commits the initial deck and
//! deal; after that the peer whose seat holds the turn commits everything
//! its turn produces, including the hand-off to the next seat. Receivers
//! never re-roll anything: random draws travel as concrete events.

use log::{debug, error, info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{
    collections::{BTreeMap, BTreeSet},
    time::Instant,
};

use crate::{
    game::{
        constants::{MAX_NOTICE_LENGTH, TURN_DRAW},
        entities::{CardValue, GameView, PeerId, SeatIndex, build_deck, shuffle},
        settings::GameSettings,
        state_machine::{Applied, GameError, GameEvent, GameState, Origin, Phase, PlayOutcome},
    },
    net::{
        messages::{AckKind, Destination, Envelope, Message, SyncReason},
        transport::Transport,
        utils,
    },
    session::Roster,
    sync::{Barrier, BarrierKind},
};

/// Authority-only work deferred until a barrier is satisfied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Continuation {
    CreateDeck,
    StartGame,
    ResumeDeal { seat: SeatIndex, count: usize },
}

pub struct Peer<T: Transport> {
    roster: Roster,
    local_seat: SeatIndex,
    state: GameState,
    transport: T,
    rng: StdRng,
    /// Single-shot guard against a second local play in the same turn.
    turn_open: bool,
    connected: BTreeSet<PeerId>,
    ready: Barrier<Continuation>,
    deck_received: Barrier<Continuation>,
    reshuffle_received: Barrier<Continuation>,
    /// Sequenced events that arrived ahead of a gap.
    held_back: BTreeMap<u64, (PeerId, Message)>,
    /// Author of the last applied sequenced event.
    last_author: Option<PeerId>,
    /// Every applied event in step order.
    journal: Vec<Message>,
}

impl<T: Transport> Peer<T> {
    /// Joins a match with an OS-seeded generator.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidSettings`] for inconsistent settings.
    pub fn join(roster: Roster, settings: GameSettings, transport: T) -> Result<Self, GameError> {
        Self::with_rng(roster, settings, transport, StdRng::from_os_rng())
    }

    /// Joins a match. The host starts waiting for everyone's `Ready`;
    /// everyone else announces it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidSettings`] for inconsistent settings.
    pub fn with_rng(
        roster: Roster,
        settings: GameSettings,
        transport: T,
        rng: StdRng,
    ) -> Result<Self, GameError> {
        settings.validate()?;
        let local = roster.local.clone();
        let local_seat = roster.local_seat();
        let state = GameState::new(roster.seating.peers(), settings);
        let connected = roster.seating.peers().iter().cloned().collect();
        let mut peer = Self {
            local_seat,
            state,
            transport,
            rng,
            turn_open: false,
            connected,
            ready: Barrier::new(BarrierKind::PlayersReady, local.clone()),
            deck_received: Barrier::new(BarrierKind::ReceivedDeck, local.clone()),
            reshuffle_received: Barrier::new(BarrierKind::ReceivedReshuffle, local),
            held_back: BTreeMap::new(),
            last_author: None,
            journal: Vec::new(),
            roster,
        };
        peer.bootstrap();
        Ok(peer)
    }

    fn bootstrap(&mut self) {
        if self.roster.is_host() {
            let others = self.connected_others();
            let deadline = self.deadline();
            if let Some(continuation) = self
                .ready
                .arm(others, Continuation::CreateDeck, None, deadline)
            {
                self.run_logged(continuation);
            }
        } else {
            let host = self.roster.seating.host().clone();
            self.send(
                Envelope::unsequenced(Message::Ack {
                    kind: AckKind::Ready,
                    of_step: None,
                }),
                &Destination::Peer(host),
            );
        }
    }

    /// Tears the match down to the lobby and runs the ready handshake
    /// again. The host has to reset before the others, since `Ready` acks
    /// that reach an idle host are ignored.
    pub fn reset(&mut self) {
        self.state.reset();
        self.ready.reset();
        self.deck_received.reset();
        self.reshuffle_received.reset();
        self.held_back.clear();
        self.journal.clear();
        self.last_author = None;
        self.turn_open = false;
        self.bootstrap();
    }

    // === Local actions ===

    /// Plays the card at `hand_index` of the local hand, then finishes the
    /// turn. `target` picks the seat a Jinx lands on; it defaults to the
    /// next seat in turn order and is ignored for other cards.
    ///
    /// # Errors
    ///
    /// Fails without side effects when it isn't the local turn, the turn's
    /// play was already made, the index is out of range, or the target is
    /// invalid.
    pub fn play_card(
        &mut self,
        hand_index: usize,
        target: Option<SeatIndex>,
    ) -> Result<(), GameError> {
        if self.state.phase() != Phase::InProgress {
            return Err(GameError::GameNotInProgress);
        }
        if !self.turn_open {
            return Err(
                if self.state.turn() == self.local_seat && self.state.plays_this_turn() > 0 {
                    GameError::AlreadyPlayed
                } else {
                    GameError::OutOfTurnAction
                },
            );
        }
        let card = self
            .state
            .player(self.local_seat)
            .and_then(|player| player.hand.get(hand_index))
            .copied()
            .ok_or(GameError::CardNotInHand)?;
        let target = match card.value {
            CardValue::Jinx(_) => Some(
                target
                    .or_else(|| self.state.next_active_seat(self.local_seat))
                    .ok_or(GameError::InvalidTarget)?,
            ),
            _ => None,
        };

        let outcome = self.commit(Message::PlayedCard {
            by: self.local_seat,
            card,
            hand_index,
            target,
        })?;
        self.turn_open = false;

        match outcome {
            Applied::Played(PlayOutcome::NeedsLimitDelta) => {
                let delta = self.draw_limit_delta();
                self.commit(Message::AdjustLimit { delta })?;
            }
            Applied::Played(PlayOutcome::NeedsJinxTarget(kind)) => {
                if let Some(target) = target {
                    self.commit(Message::StatusBroadcast { kind, target })?;
                }
            }
            _ => {}
        }
        self.finish_turn()
    }

    /// Broadcasts a chat line. Not part of the replicated state.
    pub fn send_notice(&mut self, text: &str) {
        let text: String = text.chars().take(MAX_NOTICE_LENGTH).collect();
        self.state.push_event(GameEvent::Notice {
            from: self.roster.local.clone(),
            text: text.clone(),
        });
        self.send(
            Envelope::unsequenced(Message::PlainNotice { text }),
            &Destination::All,
        );
    }

    fn draw_limit_delta(&mut self) -> i32 {
        let bound = self.state.settings().limit_delta_bound;
        let magnitude = self.rng.random_range(1..=bound);
        if self.rng.random_bool(0.5) {
            -magnitude
        } else {
            magnitude
        }
    }

    // === Authority ===

    fn finish_turn(&mut self) -> Result<(), GameError> {
        let seat = self.local_seat;
        if self.state.is_bust() {
            info!("seat {seat} busted at {}", self.state.tally());
            return self.eliminate_then_pass(seat);
        }
        if self.state.needs_extra_play() {
            return self.deal_to(seat, TURN_DRAW);
        }
        self.pass_turn(seat)
    }

    /// Eliminates `seat`, which holds the turn. The elimination itself moves
    /// the turn on, so what's left is dealing to whoever holds it now.
    fn eliminate_then_pass(&mut self, seat: SeatIndex) -> Result<(), GameError> {
        if self.eliminate(seat)? || self.eliminate_dropped()? {
            return Ok(());
        }
        let to = self.state.turn();
        self.deal_to(to, TURN_DRAW)
    }

    fn pass_turn(&mut self, from: SeatIndex) -> Result<(), GameError> {
        if self.eliminate_dropped()? {
            return Ok(());
        }
        let to = self
            .state
            .next_active_seat(from)
            .ok_or(GameError::NotEnoughPlayers)?;
        self.commit(Message::TurnAdvanced { from, to })?;
        self.deal_to(to, TURN_DRAW)
    }

    /// Commits the elimination, plus `GameOver` when one seat is left.
    /// Returns whether the match ended.
    fn eliminate(&mut self, seat: SeatIndex) -> Result<bool, GameError> {
        if let Applied::Eliminated {
            sole_survivor: Some(winner),
        } = self.commit(Message::Eliminate { seat })?
        {
            self.commit(Message::GameOver { winner })?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Dropped seats are eliminated by whoever holds authority.
    fn eliminate_dropped(&mut self) -> Result<bool, GameError> {
        for seat in self.dropped_seats() {
            if self.eliminate(seat)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Deals `count` cards, reshuffling first if the deck is short. A
    /// reshuffle defers the deal until every connected peer acks it.
    fn deal_to(&mut self, seat: SeatIndex, count: usize) -> Result<(), GameError> {
        if self.state.deck().len() < count {
            let cards = self.state.plan_reshuffle(&mut self.rng);
            if !cards.is_empty() {
                let step = self.state.applied();
                self.commit(Message::SyncDeck {
                    cards,
                    reason: SyncReason::Reshuffle,
                })?;
                let others = self.connected_others();
                let deadline = self.deadline();
                return match self.reshuffle_received.arm(
                    others,
                    Continuation::ResumeDeal { seat, count },
                    Some(step),
                    deadline,
                ) {
                    Some(continuation) => self.run(continuation),
                    None => {
                        debug!("waiting on reshuffle acks for step {step}");
                        Ok(())
                    }
                };
            }
        }
        self.deal_now(seat, count)
    }

    fn deal_now(&mut self, seat: SeatIndex, count: usize) -> Result<(), GameError> {
        let available = self.state.deck().len();
        if available < count {
            warn!("deck short after reshuffle: dealing {available} of {count} to seat {seat}");
        }
        self.commit(Message::DealCards {
            target: seat,
            count: count.min(available),
        })?;
        Ok(())
    }

    fn create_deck(&mut self) -> Result<(), GameError> {
        let mut cards = build_deck();
        shuffle(&mut cards, &mut self.rng);
        let step = self.state.applied();
        self.commit(Message::SyncDeck {
            cards,
            reason: SyncReason::Init,
        })?;
        info!("deck sent, waiting on {} peers", self.connected_others().len());

        let others = self.connected_others();
        let deadline = self.deadline();
        if let Some(continuation) =
            self.deck_received
                .arm(others, Continuation::StartGame, Some(step), deadline)
        {
            return self.run(continuation);
        }
        Ok(())
    }

    fn start_game(&mut self) -> Result<(), GameError> {
        if self.eliminate_dropped()? {
            return Ok(());
        }
        let hand = self.state.settings().initial_hand_size;
        let seats: Vec<SeatIndex> = self
            .state
            .players()
            .iter()
            .filter(|player| !player.eliminated)
            .map(|player| player.seat)
            .collect();
        for seat in seats {
            self.deal_now(seat, hand)?;
        }
        info!("match started with {} players", self.state.players().len());
        // The opening seat draws like every later turn does.
        let first = self.state.turn();
        self.deal_to(first, TURN_DRAW)
    }

    fn run(&mut self, continuation: Continuation) -> Result<(), GameError> {
        debug!("barrier satisfied, running {continuation:?}");
        match continuation {
            Continuation::CreateDeck => self.create_deck(),
            Continuation::StartGame => self.start_game(),
            Continuation::ResumeDeal { seat, count } => self.deal_now(seat, count),
        }
    }

    fn run_logged(&mut self, continuation: Continuation) {
        if let Err(err) = self.run(continuation) {
            error!("{continuation:?} failed: {err}");
        }
    }

    /// Applies locally, journals and broadcasts with the next step.
    fn commit(&mut self, message: Message) -> Result<Applied, GameError> {
        let step = self.state.applied();
        let applied = self.state.apply(&Origin::Local, &message)?;
        self.last_author = Some(self.roster.local.clone());
        self.journal.push(message.clone());
        self.after_apply(&message);
        self.send(Envelope::sequenced(step, message), &Destination::All);
        Ok(applied)
    }

    // === Receiving ===

    /// Handles a payload from the transport. Undecodable payloads are
    /// dropped with a warning.
    pub fn on_receive(&mut self, bytes: &[u8], from: &PeerId) {
        let envelope = match utils::decode(bytes) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!("dropping payload from {from}: {err}");
                return;
            }
        };
        match envelope.step {
            Some(step) => self.on_sequenced(step, from, envelope.message),
            None => self.on_unsequenced(from, envelope.message),
        }
    }

    fn on_sequenced(&mut self, step: u64, from: &PeerId, message: Message) {
        let next = self.state.applied();
        if step < next {
            debug!("ignoring duplicate step {step} from {from}");
            return;
        }
        if step > next {
            debug!("holding back step {step} from {from}, expecting {next}");
            self.held_back
                .entry(step)
                .or_insert_with(|| (from.clone(), message));
            return;
        }

        self.apply_remote(step, from.clone(), message);
        while let Some((author, message)) = self.held_back.remove(&self.state.applied()) {
            let step = self.state.applied();
            self.apply_remote(step, author, message);
        }
        self.held_back = self.held_back.split_off(&self.state.applied());
        self.maybe_take_over();
    }

    fn apply_remote(&mut self, step: u64, from: PeerId, message: Message) {
        let origin = Origin::Remote(from.clone());
        if let Err(err) = self.state.apply(&origin, &message) {
            warn!("rejected step {step} '{message}' from {from}: {err}");
            self.state.skip_step();
            return;
        }
        let ack = match &message {
            Message::SyncDeck {
                reason: SyncReason::Init,
                ..
            } => Some(AckKind::ReceivedDeck),
            Message::SyncDeck {
                reason: SyncReason::Reshuffle,
                ..
            } => Some(AckKind::ReceivedReshuffle),
            _ => None,
        };
        if let Some(kind) = ack {
            self.send(
                Envelope::unsequenced(Message::Ack {
                    kind,
                    of_step: Some(step),
                }),
                &Destination::Peer(from.clone()),
            );
        }
        self.last_author = Some(from);
        self.journal.push(message.clone());
        self.after_apply(&message);
    }

    /// Turn bookkeeping shared by local commits and remote applies.
    fn after_apply(&mut self, message: &Message) {
        match message {
            Message::DealCards { target, .. }
                if *target == self.local_seat
                    && !self.turn_open
                    && self.state.can_play(self.local_seat) =>
            {
                self.turn_open = true;
                self.state.push_event(GameEvent::YourTurn);
            }
            Message::Eliminate { seat } if *seat == self.local_seat => self.turn_open = false,
            Message::GameOver { .. } => self.turn_open = false,
            _ => {}
        }
    }

    fn on_unsequenced(&mut self, from: &PeerId, message: Message) {
        match message {
            Message::Ack { kind, of_step } => {
                let barrier = match BarrierKind::for_ack(kind) {
                    BarrierKind::PlayersReady => &mut self.ready,
                    BarrierKind::ReceivedDeck => &mut self.deck_received,
                    BarrierKind::ReceivedReshuffle => &mut self.reshuffle_received,
                };
                let fired = barrier.record(from, of_step);
                let (received, expected) = (barrier.received_count(), barrier.expected_count());
                match fired {
                    Some(continuation) => self.run_logged(continuation),
                    None => debug!("ack {kind} from {from}: {received}/{expected}"),
                }
            }
            Message::PlainNotice { text } => {
                let text = text.chars().take(MAX_NOTICE_LENGTH).collect();
                self.state.push_event(GameEvent::Notice {
                    from: from.clone(),
                    text,
                });
            }
            other => warn!("dropping unsequenced '{other}' from {from}"),
        }
    }

    // === Failure handling ===

    /// Forgets `peer`. Barriers stop waiting on it, and the host picks up
    /// the turn if the peer was holding it.
    pub fn on_peer_disconnected(&mut self, peer: &PeerId) {
        if !self.connected.remove(peer) {
            return;
        }
        info!("{peer} disconnected");
        self.state.push_event(GameEvent::PeerDropped(peer.clone()));
        if peer == self.roster.seating.host() {
            error!("host {peer} dropped; its bootstrap and turns can't be recovered");
        }

        let fired: Vec<Continuation> = [
            &mut self.ready,
            &mut self.deck_received,
            &mut self.reshuffle_received,
        ]
        .into_iter()
        .filter_map(|barrier| barrier.drop_peer(peer))
        .collect();
        for continuation in fired {
            self.run_logged(continuation);
        }
        self.maybe_take_over();
    }

    /// Treats peers missing from an expired barrier as disconnected.
    pub fn poll_timeouts(&mut self, now: Instant) {
        let missing: BTreeSet<PeerId> = [&self.ready, &self.deck_received, &self.reshuffle_received]
            .into_iter()
            .filter(|barrier| barrier.is_expired(now))
            .flat_map(Barrier::missing)
            .collect();
        if missing.is_empty() {
            return;
        }
        let waiting_on: Vec<PeerId> = missing.into_iter().collect();
        warn!("barrier timed out waiting on {waiting_on:?}");
        self.state.push_event(GameEvent::Stalled {
            waiting_on: waiting_on.clone(),
        });
        for peer in &waiting_on {
            self.on_peer_disconnected(peer);
        }
    }

    /// The host commits on behalf of a dropped seat that holds the turn,
    /// once nobody else can still be committing for it: either the dropped
    /// peer authored the last event, or the hand-off deal to it has landed.
    fn maybe_take_over(&mut self) {
        if !self.roster.is_host()
            || self.state.phase() != Phase::InProgress
            || !self.held_back.is_empty()
            || self.reshuffle_received.is_pending()
        {
            return;
        }
        let seat = self.state.turn();
        let Some(peer) = self.roster.seating.peer_at(seat).cloned() else {
            return;
        };
        if self.connected.contains(&peer)
            || self.state.player(seat).is_none_or(|player| player.eliminated)
        {
            return;
        }
        let authored_last = self.last_author.as_ref() == Some(&peer);
        let handed_over = matches!(
            self.journal.last(),
            Some(Message::DealCards { target, .. }) if *target == seat
        );
        if !authored_last && !handed_over {
            return;
        }

        warn!("taking over the turn of dropped seat {seat}");
        if let Err(err) = self.eliminate_then_pass(seat) {
            error!("takeover of seat {seat} failed: {err}");
        }
    }

    fn dropped_seats(&self) -> Vec<SeatIndex> {
        self.state
            .players()
            .iter()
            .filter(|player| !player.eliminated && !self.connected.contains(&player.peer))
            .map(|player| player.seat)
            .collect()
    }

    fn connected_others(&self) -> Vec<PeerId> {
        self.connected
            .iter()
            .filter(|peer| **peer != self.roster.local)
            .cloned()
            .collect()
    }

    fn deadline(&self) -> Option<Instant> {
        self.state
            .settings()
            .barrier_timeout()
            .map(|timeout| Instant::now() + timeout)
    }

    fn send(&mut self, envelope: Envelope, to: &Destination) {
        match utils::encode(&envelope) {
            Ok(bytes) => {
                if let Err(err) = self.transport.send(bytes, to) {
                    error!("failed to send '{envelope}' to {to}: {err}");
                }
            }
            Err(err) => error!("failed to encode '{envelope}': {err}"),
        }
    }

    // === Queries ===

    /// Snapshot for the presentation layer.
    #[must_use]
    pub fn view(&self) -> GameView {
        let mut view = self.state.view(self.local_seat);
        view.can_play &= self.turn_open;
        view
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.state.drain_events()
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn journal(&self) -> &[Message] {
        &self.journal
    }

    #[must_use]
    pub fn id(&self) -> &PeerId {
        &self.roster.local
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn local_seat(&self) -> SeatIndex {
        self.local_seat
    }

    #[must_use]
    pub fn is_host(&self) -> bool {
        self.roster.is_host()
    }

    #[must_use]
    pub fn is_turn_open(&self) -> bool {
        self.turn_open
    }

    #[must_use]
    pub fn held_back(&self) -> usize {
        self.held_back.len()
    }

    #[must_use]
    pub fn is_waiting_on(&self, kind: BarrierKind) -> bool {
        match kind {
            BarrierKind::PlayersReady => self.ready.is_pending(),
            BarrierKind::ReceivedDeck => self.deck_received.is_pending(),
            BarrierKind::ReceivedReshuffle => self.reshuffle_received.is_pending(),
        }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        net::transport::{LoopbackHub, LoopbackTransport},
        session::LexicalHostSelector,
    };

    fn pair() -> (LoopbackHub, Peer<LoopbackTransport>, Peer<LoopbackTransport>) {
        let hub = LoopbackHub::new();
        let ids = vec![PeerId::new("alice"), PeerId::new("bob")];
        let mut peers = ids.iter().enumerate().map(|(i, id)| {
            let roster = Roster::new(id.clone(), &ids, &LexicalHostSelector, None).unwrap();
            Peer::with_rng(
                roster,
                GameSettings::default(),
                hub.connect(id.clone(), &ids),
                StdRng::seed_from_u64(i as u64),
            )
            .unwrap()
        });
        let alice = peers.next().unwrap();
        let bob = peers.next().unwrap();
        (hub, alice, bob)
    }

    fn pump(
        hub: &LoopbackHub,
        alice: &mut Peer<LoopbackTransport>,
        bob: &mut Peer<LoopbackTransport>,
    ) {
        hub.drain_with(|delivery| match delivery.to.as_str() {
            "alice" => alice.on_receive(&delivery.payload, &delivery.from),
            _ => bob.on_receive(&delivery.payload, &delivery.from),
        });
    }

    #[test]
    fn test_bootstrap_deals_initial_hands() {
        let (hub, mut alice, mut bob) = pair();
        assert!(alice.is_host());
        assert!(alice.is_waiting_on(BarrierKind::PlayersReady));
        pump(&hub, &mut alice, &mut bob);

        assert!(!alice.is_waiting_on(BarrierKind::ReceivedDeck));
        for peer in [&alice, &bob] {
            assert_eq!(peer.state().phase(), Phase::InProgress);
            let hands: Vec<usize> = peer.state().players().iter().map(|p| p.hand.len()).collect();
            assert_eq!(hands, vec![5, 4]);
            assert_eq!(peer.state().deck().len(), 41);
        }
        assert!(alice.is_turn_open());
        assert!(!bob.is_turn_open());
        assert_eq!(alice.journal(), bob.journal());
    }

    #[test]
    fn test_play_hands_turn_over() {
        let (hub, mut alice, mut bob) = pair();
        pump(&hub, &mut alice, &mut bob);

        alice.play_card(0, None).unwrap();
        assert!(!alice.is_turn_open());
        assert_eq!(alice.play_card(0, None), Err(GameError::OutOfTurnAction));
        pump(&hub, &mut alice, &mut bob);

        assert_eq!(bob.state().turn(), 1);
        assert!(bob.is_turn_open());
        assert_eq!(bob.state().players()[1].hand.len(), 5);
        assert_eq!(alice.state().tally(), bob.state().tally());
        assert!(bob.drain_events().any(|event| event == GameEvent::YourTurn));
    }

    #[test]
    fn test_out_of_turn_play_rejected() {
        let (hub, mut alice, mut bob) = pair();
        pump(&hub, &mut alice, &mut bob);
        assert_eq!(bob.play_card(0, None), Err(GameError::OutOfTurnAction));
        assert!(hub.is_empty());
    }

    #[test]
    fn test_bad_hand_index_has_no_side_effects() {
        let (hub, mut alice, mut bob) = pair();
        pump(&hub, &mut alice, &mut bob);
        let applied = alice.state().applied();
        assert_eq!(alice.play_card(99, None), Err(GameError::CardNotInHand));
        assert!(alice.is_turn_open());
        assert_eq!(alice.state().applied(), applied);
    }

    #[test]
    fn test_garbage_payload_dropped() {
        let (_hub, mut alice, _bob) = pair();
        alice.on_receive(&[0xde, 0xad, 0xbe, 0xef], &PeerId::new("bob"));
        assert_eq!(alice.state().applied(), 0);
    }

    #[test]
    fn test_notice_delivered() {
        let (hub, mut alice, mut bob) = pair();
        pump(&hub, &mut alice, &mut bob);
        let _ = bob.drain_events().count();
        bob.send_notice("good luck");
        pump(&hub, &mut alice, &mut bob);
        assert!(alice.drain_events().any(|event| event
            == GameEvent::Notice {
                from: PeerId::new("bob"),
                text: "good luck".to_string()
            }));
    }

    #[test]
    fn test_stray_ack_ignored() {
        let (hub, mut alice, mut bob) = pair();
        pump(&hub, &mut alice, &mut bob);
        let applied = alice.state().applied();
        bob.send(
            Envelope::unsequenced(Message::Ack {
                kind: AckKind::ReceivedReshuffle,
                of_step: Some(0),
            }),
            &Destination::All,
        );
        pump(&hub, &mut alice, &mut bob);
        assert_eq!(alice.state().applied(), applied);
    }

    #[test]
    fn test_reset_rebootstraps() {
        let (hub, mut alice, mut bob) = pair();
        pump(&hub, &mut alice, &mut bob);
        alice.reset();
        bob.reset();
        assert_eq!(alice.state().phase(), Phase::Lobby);
        assert!(alice.journal().is_empty());
        pump(&hub, &mut alice, &mut bob);
        assert_eq!(bob.state().phase(), Phase::InProgress);
        assert_eq!(alice.journal(), bob.journal());
    }
}
