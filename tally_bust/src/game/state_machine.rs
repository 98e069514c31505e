//! Replicated match state and its transition function.
//!
//! Every mutation goes through [`GameState::apply`], whether the event was
//! produced on this device or decoded off the wire. Each peer holds its own
//! copy; copies converge because they apply the same events in the same
//! order to the same starting state.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashSet, VecDeque},
    fmt,
};
use thiserror::Error;

use super::{
    constants::BANANA_PLAYS,
    entities::{
        Card, CardValue, GameView, JinxKind, PeerId, Player, PlayerStatus, PlayerView, SeatIndex,
        TrumpKind, shuffle,
    },
    settings::{GameSettings, JinxPolicy},
};
use crate::net::messages::{Message, SyncReason};

/// Errors raised by a transition. A failed transition leaves the state
/// untouched.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("card not in hand")]
    CardNotInHand,
    #[error("seat {0} does not exist")]
    InvalidSeat(SeatIndex),
    #[error("seat {0} is eliminated")]
    SeatEliminated(SeatIndex),
    #[error("seat already eliminated")]
    AlreadyEliminated,
    #[error("not your turn")]
    OutOfTurnAction,
    #[error("already played this turn")]
    AlreadyPlayed,
    #[error("deck has {available} cards, {requested} requested")]
    DeckExhausted { requested: usize, available: usize },
    #[error("need 2+ players")]
    NotEnoughPlayers,
    #[error("at most 4 players")]
    TooManyPlayers,
    #[error("peer appears twice in the roster")]
    DuplicatePeer,
    #[error("peer is not in the roster")]
    UnknownPeer,
    #[error("game not in progress")]
    GameNotInProgress,
    #[error("game already in progress")]
    GameAlreadyInProgress,
    #[error("expected seat {expected}, got seat {got}")]
    UnexpectedTurn {
        expected: SeatIndex,
        got: SeatIndex,
    },
    #[error("invalid jinx target")]
    InvalidTarget,
    #[error("card is neither in the discard pile nor a replacement")]
    UnknownCard,
    #[error("limit delta {0} out of range")]
    InvalidDelta(i32),
    #[error("invalid deck: {0}")]
    InvalidDeck(String),
    #[error("message is not a replicated event")]
    NotReplicated,
    #[error("winner is not the sole survivor")]
    InvalidWinner,
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Where an event came from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Origin {
    /// Produced on this device; hand indices can be trusted as a hint.
    Local,
    /// Decoded from a peer's broadcast; cards are located by id only.
    Remote(PeerId),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote(peer) => write!(f, "{peer}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Phase {
    /// Waiting for the initial deck.
    Lobby,
    InProgress,
    Finished { winner: SeatIndex },
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "lobby"),
            Self::InProgress => write!(f, "in progress"),
            Self::Finished { winner } => write!(f, "won by seat {winner}"),
        }
    }
}

/// What the acting peer still owes after a card resolves.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayOutcome {
    Resolved,
    /// A LimitChange was played; the actor must draw and commit a delta.
    NeedsLimitDelta,
    /// A Jinx was played; the actor must commit its target.
    NeedsJinxTarget(JinxKind),
}

/// Result of a successful transition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Applied {
    Played(PlayOutcome),
    Eliminated { sole_survivor: Option<SeatIndex> },
    Done,
}

/// Notifications for the presentation layer.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum GameEvent {
    DeckSynced { reason: SyncReason, cards: usize },
    CardPlayed { seat: SeatIndex, card: Card },
    CardsDealt { seat: SeatIndex, count: usize },
    LimitChanged { from: i32, to: i32 },
    Jinxed { kind: JinxKind, seat: SeatIndex },
    Eliminated(SeatIndex),
    TurnPassed { from: SeatIndex, to: SeatIndex },
    GameOver { winner: SeatIndex },
    Notice { from: PeerId, text: String },
    YourTurn,
    /// A barrier is still waiting on these peers.
    Stalled { waiting_on: Vec<PeerId> },
    PeerDropped(PeerId),
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::DeckSynced { reason, cards } => format!("{reason} of {cards} cards"),
            Self::CardPlayed { seat, card } => format!("seat {seat} played {card}"),
            Self::CardsDealt { seat, count } => format!("seat {seat} drew {count}"),
            Self::LimitChanged { from, to } => format!("limit {from} -> {to}"),
            Self::Jinxed { kind, seat } => format!("seat {seat} jinxed with {kind}"),
            Self::Eliminated(seat) => format!("seat {seat} busted"),
            Self::TurnPassed { from, to } => format!("turn passed from seat {from} to {to}"),
            Self::GameOver { winner } => format!("seat {winner} wins"),
            Self::Notice { from, text } => format!("{from}: {text}"),
            Self::YourTurn => "your turn".to_string(),
            Self::Stalled { waiting_on } => {
                let names: Vec<&str> = waiting_on.iter().map(PeerId::as_str).collect();
                format!("waiting on {}", names.join(", "))
            }
            Self::PeerDropped(peer) => format!("{peer} dropped"),
        };
        write!(f, "{repr}")
    }
}

/// One peer's copy of the match.
#[derive(Clone, Debug)]
pub struct GameState {
    tally: i32,
    max_tally: i32,
    turn: SeatIndex,
    deck: VecDeque<Card>,
    /// Most recent card last.
    discard: Vec<Card>,
    players: Vec<Player>,
    phase: Phase,
    plays_this_turn: u8,
    /// Jinx cards taken out of circulation under [`JinxPolicy::Replenish`].
    consumed: Vec<JinxKind>,
    next_card_id: u32,
    applied: u64,
    total_cards: usize,
    settings: GameSettings,
    events: VecDeque<GameEvent>,
}

impl GameState {
    /// `seating` lists peers in seat order.
    #[must_use]
    pub fn new(seating: &[PeerId], settings: GameSettings) -> Self {
        let players = seating
            .iter()
            .enumerate()
            .map(|(seat, peer)| Player::new(peer.clone(), seat))
            .collect();
        Self {
            tally: 0,
            max_tally: settings.max_tally,
            turn: 0,
            deck: VecDeque::new(),
            discard: Vec::new(),
            players,
            phase: Phase::Lobby,
            plays_this_turn: 0,
            consumed: Vec::new(),
            next_card_id: 0,
            applied: 0,
            total_cards: 0,
            settings,
            events: VecDeque::new(),
        }
    }

    /// Re-applies a journal to a fresh state. Cards are re-located by id,
    /// so a journal recorded on any peer replays to the same state.
    ///
    /// # Errors
    ///
    /// Returns the first transition error in the journal.
    pub fn replay(
        seating: &[PeerId],
        settings: GameSettings,
        journal: &[Message],
    ) -> Result<Self, GameError> {
        let mut state = Self::new(seating, settings);
        for message in journal {
            state.apply(&Origin::Local, message)?;
        }
        Ok(state)
    }

    /// Back to the lobby with the same seating.
    pub fn reset(&mut self) {
        for player in &mut self.players {
            player.reset();
        }
        self.tally = 0;
        self.max_tally = self.settings.max_tally;
        self.turn = 0;
        self.deck.clear();
        self.discard.clear();
        self.phase = Phase::Lobby;
        self.plays_this_turn = 0;
        self.consumed.clear();
        self.next_card_id = 0;
        self.applied = 0;
        self.total_cards = 0;
        self.events.clear();
    }

    /// Applies one replicated event. On error nothing is mutated and the
    /// applied counter doesn't move.
    ///
    /// # Errors
    ///
    /// Returns a [`GameError`] when the event doesn't fit the current state.
    pub fn apply(&mut self, origin: &Origin, message: &Message) -> Result<Applied, GameError> {
        let applied = match message {
            Message::SyncDeck {
                cards,
                reason: SyncReason::Init,
            } => self.init_deck(cards).map(|()| Applied::Done),
            Message::SyncDeck {
                cards,
                reason: SyncReason::Reshuffle,
            } => self.reshuffle(cards).map(|()| Applied::Done),
            Message::PlayedCard {
                by,
                card,
                hand_index,
                target,
            } => {
                let hint = match origin {
                    Origin::Local => Some(*hand_index),
                    Origin::Remote(_) => None,
                };
                self.play_card(*by, card, hint, *target).map(Applied::Played)
            }
            Message::DealCards { target, count } => {
                self.deal(*target, *count).map(|()| Applied::Done)
            }
            Message::StatusBroadcast { kind, target } => {
                self.apply_status(*kind, *target).map(|()| Applied::Done)
            }
            Message::AdjustLimit { delta } => self.adjust_limit(*delta).map(|()| Applied::Done),
            Message::Eliminate { seat } => self
                .eliminate(*seat)
                .map(|sole_survivor| Applied::Eliminated { sole_survivor }),
            Message::TurnAdvanced { from, to } => {
                self.advance_turn(*from, *to).map(|()| Applied::Done)
            }
            Message::GameOver { winner } => self.finish(*winner).map(|()| Applied::Done),
            Message::Ack { .. } | Message::PlainNotice { .. } => Err(GameError::NotReplicated),
        }?;
        debug!("applied #{} from {origin}: {message}", self.applied);
        self.applied += 1;
        Ok(applied)
    }

    /// Consumes a step whose event was rejected so later steps still line up.
    pub fn skip_step(&mut self) {
        self.applied += 1;
    }

    fn init_deck(&mut self, cards: &[Card]) -> Result<(), GameError> {
        if self.phase != Phase::Lobby {
            return Err(GameError::GameAlreadyInProgress);
        }
        if cards.is_empty() {
            return Err(GameError::InvalidDeck("empty deck".to_string()));
        }
        let mut ids = HashSet::with_capacity(cards.len());
        if !cards.iter().all(|card| ids.insert(card.id)) {
            return Err(GameError::InvalidDeck("duplicate card id".to_string()));
        }

        self.deck = cards.iter().copied().collect();
        self.discard.clear();
        self.consumed.clear();
        self.total_cards = cards.len();
        self.next_card_id = cards.iter().map(|card| card.id.0 + 1).max().unwrap_or(0);
        self.tally = 0;
        self.max_tally = self.settings.max_tally;
        self.turn = 0;
        self.plays_this_turn = 0;
        self.phase = Phase::InProgress;
        self.events.push_back(GameEvent::DeckSynced {
            reason: SyncReason::Init,
            cards: cards.len(),
        });
        Ok(())
    }

    /// Appends `cards` to the deck. Each card must either come out of the
    /// discard pile or be a freshly minted replacement for a consumed Jinx.
    fn reshuffle(&mut self, cards: &[Card]) -> Result<(), GameError> {
        self.ensure_in_progress()?;

        // Validate against scratch copies so a bad list mutates nothing.
        let mut discard = self.discard.clone();
        let mut consumed = self.consumed.clone();
        let mut minted = HashSet::new();
        for card in cards {
            if let Some(pos) = discard.iter().position(|c| c == card) {
                discard.remove(pos);
                continue;
            }
            let kind = match card.value {
                CardValue::Jinx(kind) if card.id.0 >= self.next_card_id => kind,
                _ => return Err(GameError::UnknownCard),
            };
            let Some(pos) = consumed.iter().position(|k| *k == kind) else {
                return Err(GameError::UnknownCard);
            };
            if !minted.insert(card.id) {
                return Err(GameError::UnknownCard);
            }
            consumed.swap_remove(pos);
        }

        if let Some(highest) = minted.iter().map(|id| id.0).max() {
            self.next_card_id = highest + 1;
        }
        self.discard = discard;
        self.consumed = consumed;
        self.deck.extend(cards.iter().copied());
        self.events.push_back(GameEvent::DeckSynced {
            reason: SyncReason::Reshuffle,
            cards: cards.len(),
        });
        Ok(())
    }

    fn play_card(
        &mut self,
        by: SeatIndex,
        card: &Card,
        hint: Option<usize>,
        target: Option<SeatIndex>,
    ) -> Result<PlayOutcome, GameError> {
        self.ensure_in_progress()?;
        self.ensure_active(by)?;
        if by != self.turn {
            return Err(GameError::OutOfTurnAction);
        }
        if self.plays_this_turn >= self.plays_allowed() {
            return Err(GameError::AlreadyPlayed);
        }
        if let Some(target) = target {
            self.ensure_jinx_target(target)?;
        }
        let pos = self.players[by]
            .position_of(card.id, hint)
            .ok_or(GameError::CardNotInHand)?;
        if self.players[by].hand[pos] != *card {
            return Err(GameError::CardNotInHand);
        }

        let card = self.players[by].hand.remove(pos);
        self.plays_this_turn += 1;
        let outcome = match card.value {
            CardValue::Number(value) => {
                self.tally += value;
                PlayOutcome::Resolved
            }
            CardValue::Trump(TrumpKind::Wipeout) => {
                self.tally = 0;
                PlayOutcome::Resolved
            }
            CardValue::Trump(TrumpKind::Maxout) => {
                self.tally = self.max_tally;
                PlayOutcome::Resolved
            }
            CardValue::Trump(TrumpKind::LimitChange) => PlayOutcome::NeedsLimitDelta,
            CardValue::Jinx(kind) => PlayOutcome::NeedsJinxTarget(kind),
        };

        match (card.value, self.settings.jinx_policy) {
            (CardValue::Jinx(kind), JinxPolicy::Replenish) => self.consumed.push(kind),
            _ => self.discard.push(card),
        }
        self.events
            .push_back(GameEvent::CardPlayed { seat: by, card });
        Ok(outcome)
    }

    fn deal(&mut self, target: SeatIndex, count: usize) -> Result<(), GameError> {
        self.ensure_in_progress()?;
        self.ensure_active(target)?;
        if count > self.deck.len() {
            return Err(GameError::DeckExhausted {
                requested: count,
                available: self.deck.len(),
            });
        }
        let drawn = self.deck.drain(..count);
        self.players[target].hand.extend(drawn);
        self.events
            .push_back(GameEvent::CardsDealt { seat: target, count });
        Ok(())
    }

    fn apply_status(&mut self, kind: JinxKind, target: SeatIndex) -> Result<(), GameError> {
        self.ensure_in_progress()?;
        self.ensure_jinx_target(target)?;
        self.players[target].apply_effect(kind);
        self.events.push_back(GameEvent::Jinxed { kind, seat: target });
        Ok(())
    }

    fn adjust_limit(&mut self, delta: i32) -> Result<(), GameError> {
        self.ensure_in_progress()?;
        if delta == 0 || delta.abs() > self.settings.limit_delta_bound {
            return Err(GameError::InvalidDelta(delta));
        }
        let from = self.max_tally;
        self.max_tally =
            (self.max_tally + delta).clamp(self.settings.min_limit, self.settings.max_limit);
        // A lowered limit pulls the tally down with it instead of busting.
        self.tally = self.tally.min(self.max_tally);
        self.events.push_back(GameEvent::LimitChanged {
            from,
            to: self.max_tally,
        });
        Ok(())
    }

    fn eliminate(&mut self, seat: SeatIndex) -> Result<Option<SeatIndex>, GameError> {
        self.ensure_in_progress()?;
        let player = self.players.get_mut(seat).ok_or(GameError::InvalidSeat(seat))?;
        if player.eliminated {
            return Err(GameError::AlreadyEliminated);
        }
        player.eliminated = true;
        player.effects.clear();
        self.tally = self.tally.min(self.max_tally);
        self.events.push_back(GameEvent::Eliminated(seat));

        // The turn never rests on an eliminated seat, not even between steps.
        if seat == self.turn {
            if let Some(to) = self.next_active_seat(seat) {
                self.turn = to;
                self.plays_this_turn = 0;
                self.events.push_back(GameEvent::TurnPassed { from: seat, to });
            }
        }
        Ok(self.sole_survivor())
    }

    fn advance_turn(&mut self, from: SeatIndex, to: SeatIndex) -> Result<(), GameError> {
        self.ensure_in_progress()?;
        if from != self.turn {
            return Err(GameError::UnexpectedTurn {
                expected: self.turn,
                got: from,
            });
        }
        let expected = self.next_active_seat(from).ok_or(GameError::NotEnoughPlayers)?;
        if to != expected {
            return Err(GameError::UnexpectedTurn { expected, got: to });
        }
        self.players[from].tick_effects();
        self.turn = to;
        self.plays_this_turn = 0;
        self.events.push_back(GameEvent::TurnPassed { from, to });
        Ok(())
    }

    fn finish(&mut self, winner: SeatIndex) -> Result<(), GameError> {
        self.ensure_in_progress()?;
        if self.sole_survivor() != Some(winner) {
            return Err(GameError::InvalidWinner);
        }
        self.phase = Phase::Finished { winner };
        self.turn = winner;
        self.events.push_back(GameEvent::GameOver { winner });
        Ok(())
    }

    fn ensure_in_progress(&self) -> Result<(), GameError> {
        match self.phase {
            Phase::InProgress => Ok(()),
            _ => Err(GameError::GameNotInProgress),
        }
    }

    fn ensure_active(&self, seat: SeatIndex) -> Result<(), GameError> {
        match self.players.get(seat) {
            None => Err(GameError::InvalidSeat(seat)),
            Some(player) if player.eliminated => Err(GameError::SeatEliminated(seat)),
            Some(_) => Ok(()),
        }
    }

    /// Jinxes land on another seat that is still in the match.
    fn ensure_jinx_target(&self, target: SeatIndex) -> Result<(), GameError> {
        match self.players.get(target) {
            Some(player) if !player.eliminated && target != self.turn => Ok(()),
            _ => Err(GameError::InvalidTarget),
        }
    }

    fn plays_allowed(&self) -> u8 {
        if self.players[self.turn].has_effect(JinxKind::Banana) {
            BANANA_PLAYS
        } else {
            1
        }
    }

    /// Builds the card list for a reshuffle: every discard card except the
    /// most recent `retained_discard`, plus replacements for consumed Jinx
    /// cards, in a fresh random order. Nothing is mutated until the list is
    /// applied as a `SyncDeck`.
    pub fn plan_reshuffle<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Card> {
        let keep = self.settings.retained_discard.min(self.discard.len());
        let mut cards = self.discard[..self.discard.len() - keep].to_vec();
        cards.extend(
            self.consumed
                .iter()
                .zip(self.next_card_id..)
                .map(|(kind, id)| Card::jinx(id, *kind)),
        );
        shuffle(&mut cards, rng);
        cards
    }

    /// Next non-eliminated seat after `from`, wrapping around. Returns `from`
    /// itself when it's the only one left.
    #[must_use]
    pub fn next_active_seat(&self, from: SeatIndex) -> Option<SeatIndex> {
        let n = self.players.len();
        (1..=n)
            .map(|offset| (from + offset) % n)
            .find(|&seat| !self.players[seat].eliminated)
    }

    #[must_use]
    pub fn sole_survivor(&self) -> Option<SeatIndex> {
        let mut active = self.players.iter().filter(|player| !player.eliminated);
        match (active.next(), active.next()) {
            (Some(player), None) => Some(player.seat),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_bust(&self) -> bool {
        self.tally > self.max_tally
    }

    /// Whether a Banana'd seat still owes a play this turn.
    #[must_use]
    pub fn needs_extra_play(&self) -> bool {
        self.players
            .get(self.turn)
            .is_some_and(|player| player.has_effect(JinxKind::Banana))
            && self.plays_this_turn < BANANA_PLAYS
    }

    /// Whether `seat` may play right now.
    #[must_use]
    pub fn can_play(&self, seat: SeatIndex) -> bool {
        self.phase == Phase::InProgress
            && seat == self.turn
            && self.players.get(seat).is_some_and(|player| !player.eliminated)
            && self.plays_this_turn < self.plays_allowed()
    }

    /// Every card the match knows about, wherever it currently sits.
    #[must_use]
    pub fn card_count(&self) -> usize {
        self.deck.len()
            + self.discard.len()
            + self.players.iter().map(|player| player.hand.len()).sum::<usize>()
            + self.consumed.len()
    }

    #[must_use]
    pub fn view(&self, local_seat: SeatIndex) -> GameView {
        let players = self
            .players
            .iter()
            .map(|player| PlayerView {
                seat: player.seat,
                peer: player.peer.clone(),
                hand_size: player.hand.len(),
                status: if player.eliminated {
                    PlayerStatus::Eliminated
                } else if player.seat == self.turn && self.phase == Phase::InProgress {
                    PlayerStatus::MyTurn
                } else {
                    PlayerStatus::Waiting
                },
                effects: player.effects.clone(),
            })
            .collect();
        GameView {
            phase: self.phase,
            tally: self.tally,
            max_tally: self.max_tally,
            turn: self.turn,
            deck_size: self.deck.len(),
            discard_size: self.discard.len(),
            top_discard: self.discard.last().copied(),
            players,
            local_seat,
            hand: self
                .players
                .get(local_seat)
                .map(|player| player.hand.clone())
                .unwrap_or_default(),
            can_play: self.can_play(local_seat),
        }
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.events.drain(..)
    }

    #[must_use]
    pub fn tally(&self) -> i32 {
        self.tally
    }

    #[must_use]
    pub fn max_tally(&self) -> i32 {
        self.max_tally
    }

    #[must_use]
    pub fn turn(&self) -> SeatIndex {
        self.turn
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn deck(&self) -> &VecDeque<Card> {
        &self.deck
    }

    #[must_use]
    pub fn discard(&self) -> &[Card] {
        &self.discard
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn player(&self, seat: SeatIndex) -> Option<&Player> {
        self.players.get(seat)
    }

    #[must_use]
    pub fn consumed(&self) -> &[JinxKind] {
        &self.consumed
    }

    #[must_use]
    pub fn plays_this_turn(&self) -> u8 {
        self.plays_this_turn
    }

    /// Number of sequenced steps applied (or skipped) so far.
    #[must_use]
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Size of the initial deck.
    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.total_cards
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }
}
