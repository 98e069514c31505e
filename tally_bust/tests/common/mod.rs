//! Shared harness for multi-peer integration tests.

#![allow(dead_code)]

use rand::{SeedableRng, rngs::StdRng};
use tally_bust::{
    Applied, CardChooser, GameSettings, GameState, Message, Origin, PeerId, Phase, Strategy,
    peer::Peer,
    session::{LexicalHostSelector, Roster},
    transport::{Delivery, LoopbackHub, LoopbackTransport},
};

pub const NAMES: [&str; 4] = ["alice", "bob", "carol", "dave"];

pub fn ids(n: usize) -> Vec<PeerId> {
    NAMES.iter().take(n).map(|name| PeerId::new(name)).collect()
}

/// Replicas fed directly with events, bypassing the wire. The author
/// applies each event as local, everyone else as remote.
pub struct Replicas {
    pub states: Vec<GameState>,
    pub log: Vec<Message>,
}

impl Replicas {
    pub fn new(n: usize, settings: GameSettings) -> Self {
        let seating = ids(n);
        Self {
            states: (0..n)
                .map(|_| GameState::new(&seating, settings.clone()))
                .collect(),
            log: Vec::new(),
        }
    }

    /// Applies `message` everywhere and checks every replica agrees on the
    /// outcome.
    pub fn broadcast(&mut self, author: usize, message: Message) -> Applied {
        let author_id = PeerId::new(NAMES[author]);
        let outcomes: Vec<Applied> = self
            .states
            .iter_mut()
            .enumerate()
            .map(|(seat, state)| {
                let origin = if seat == author {
                    Origin::Local
                } else {
                    Origin::Remote(author_id.clone())
                };
                state.apply(&origin, &message).unwrap()
            })
            .collect();
        assert!(outcomes.windows(2).all(|pair| pair[0] == pair[1]));
        self.log.push(message);
        outcomes[0]
    }

    pub fn assert_identical(&self) {
        let first = &self.states[0];
        for state in &self.states[1..] {
            assert_same_state(first, state);
        }
    }
}

pub fn assert_same_state(a: &GameState, b: &GameState) {
    assert_eq!(a.tally(), b.tally());
    assert_eq!(a.max_tally(), b.max_tally());
    assert_eq!(a.turn(), b.turn());
    assert_eq!(a.phase(), b.phase());
    assert_eq!(a.deck(), b.deck());
    assert_eq!(a.discard(), b.discard());
    assert_eq!(a.consumed(), b.consumed());
    assert_eq!(a.players(), b.players());
    assert_eq!(a.applied(), b.applied());
}

/// How the harness hands queued payloads to their peers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeliveryMode {
    InOrder,
    /// Every batch in reverse, breaking per-sender order.
    Reversed,
    /// Every payload twice.
    Duplicated,
}

/// Peers wired together through a [`LoopbackHub`]. With lexical host
/// selection the peer index equals its seat.
pub struct Table {
    pub hub: LoopbackHub,
    pub ids: Vec<PeerId>,
    pub peers: Vec<Peer<LoopbackTransport>>,
    pub mode: DeliveryMode,
}

impl Table {
    pub fn new(n: usize, settings: GameSettings, seed: u64) -> Self {
        let hub = LoopbackHub::new();
        let ids = ids(n);
        let peers = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let roster = Roster::new(id.clone(), &ids, &LexicalHostSelector, None).unwrap();
                Peer::with_rng(
                    roster,
                    settings.clone(),
                    hub.connect(id.clone(), &ids),
                    StdRng::seed_from_u64(seed.wrapping_mul(31).wrapping_add(i as u64)),
                )
                .unwrap()
            })
            .collect();
        Self {
            hub,
            ids,
            peers,
            mode: DeliveryMode::InOrder,
        }
    }

    /// A table that has finished bootstrap.
    pub fn started(n: usize, settings: GameSettings, seed: u64) -> Self {
        let mut table = Self::new(n, settings, seed);
        table.pump();
        for peer in &table.peers {
            assert_eq!(peer.state().phase(), Phase::InProgress);
        }
        table
    }

    pub fn index_of(&self, id: &PeerId) -> usize {
        self.ids.iter().position(|p| p == id).unwrap()
    }

    pub fn route(&mut self, delivery: &Delivery) {
        let idx = self.index_of(&delivery.to);
        self.peers[idx].on_receive(&delivery.payload, &delivery.from);
    }

    /// Delivers until nothing is in flight. Returns how many payloads were
    /// handed over.
    pub fn pump(&mut self) -> usize {
        self.pump_each(|_| {})
    }

    /// Like [`Table::pump`], calling `check` after every single delivery so
    /// states between two steps of one turn are inspected too.
    pub fn pump_each(&mut self, mut check: impl FnMut(&Table)) -> usize {
        let mut routed = 0;
        loop {
            let mut batch = self.hub.take_all();
            if batch.is_empty() {
                return routed;
            }
            if self.mode == DeliveryMode::Reversed {
                batch.reverse();
            }
            let copies = if self.mode == DeliveryMode::Duplicated { 2 } else { 1 };
            for delivery in &batch {
                for _ in 0..copies {
                    self.route(delivery);
                    check(self);
                }
            }
            routed += batch.len();
        }
    }

    /// Seat whose local turn is open, if any.
    pub fn open_seat(&self) -> Option<usize> {
        self.peers.iter().position(Peer::is_turn_open)
    }

    /// Lets `bots` play until the match ends or `max_turns` hand-offs have
    /// happened, calling `check` after every play and every delivery.
    pub fn play_out(
        &mut self,
        bots: &mut [Strategy],
        max_turns: usize,
        mut check: impl FnMut(&Table),
    ) {
        while !self.is_finished() && self.turns() < max_turns {
            let Some(seat) = self.open_seat() else {
                panic!("no seat can play: {:?}", self.peers[0].state().view(0));
            };
            let view = self.peers[seat].view();
            let choice = bots[seat].choose(&view).unwrap();
            self.peers[seat]
                .play_card(choice.hand_index, choice.target)
                .unwrap();
            check(self);
            self.pump_each(&mut check);
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.peers[0].state().phase(), Phase::Finished { .. })
    }

    /// Explicit turn hand-offs so far, as seen by the host. Eliminations
    /// that pass the turn aren't counted.
    pub fn turns(&self) -> usize {
        self.peers[0]
            .journal()
            .iter()
            .filter(|m| matches!(m, Message::TurnAdvanced { .. }))
            .count()
    }

    pub fn assert_converged(&self) {
        let journal = self.peers[0].journal();
        for peer in &self.peers[1..] {
            assert_eq!(peer.journal(), journal, "journal of {}", peer.id());
            assert_same_state(self.peers[0].state(), peer.state());
        }
    }
}

pub fn bots(n: usize, seed: u64) -> Vec<Strategy> {
    (0..n)
        .map(|seat| {
            if seat % 2 == 0 {
                Strategy::reckless(seed.wrapping_add(seat as u64))
            } else {
                Strategy::cautious()
            }
        })
        .collect()
}
