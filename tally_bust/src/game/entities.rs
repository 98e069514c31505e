use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::{
    constants::{
        BANANA_TURNS, JINX_COPIES, JINX_TURNS, MAX_PEER_ID_LENGTH, NUMBER_RECIPE, TRUMP_COPIES,
    },
    state_machine::Phase,
};

/// Opaque card identity. Unique for the lifetime of one match.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CardId(pub u32);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Status-effect jokers that target a single seat.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum JinxKind {
    /// Target must play one extra card before their turn passes.
    Banana,
    Dog,
    /// Target's hand renders face-down.
    Confusion,
    /// One card in the target's hand renders as a random other card.
    Hallucination,
}

impl JinxKind {
    pub const ALL: [Self; 4] = [Self::Banana, Self::Dog, Self::Confusion, Self::Hallucination];

    /// Turns of the target's the effect survives.
    #[must_use]
    pub const fn duration(self) -> u8 {
        match self {
            Self::Banana => BANANA_TURNS,
            _ => JINX_TURNS,
        }
    }
}

impl fmt::Display for JinxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Banana => "banana",
            Self::Dog => "dog",
            Self::Confusion => "confusion",
            Self::Hallucination => "hallucination",
        };
        write!(f, "{repr}")
    }
}

/// Jokers that alter the shared tally or limit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum TrumpKind {
    Wipeout,
    Maxout,
    LimitChange,
}

impl TrumpKind {
    pub const ALL: [Self; 3] = [Self::Wipeout, Self::Maxout, Self::LimitChange];
}

impl fmt::Display for TrumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Wipeout => "wipeout",
            Self::Maxout => "maxout",
            Self::LimitChange => "limit change",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Category {
    Number,
    Action,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum CardValue {
    Number(i32),
    Jinx(JinxKind),
    Trump(TrumpKind),
}

impl CardValue {
    #[must_use]
    pub const fn category(&self) -> Category {
        match self {
            Self::Number(_) => Category::Number,
            Self::Jinx(_) | Self::Trump(_) => Category::Action,
        }
    }
}

impl fmt::Display for CardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value:+}"),
            Self::Jinx(kind) => write!(f, "jinx {kind}"),
            Self::Trump(kind) => write!(f, "trump {kind}"),
        }
    }
}

/// A card is an identity plus an immutable value. Presentation state
/// (sprite offsets, rotation) lives outside the core.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Card {
    pub id: CardId,
    pub value: CardValue,
}

impl Card {
    #[must_use]
    pub const fn new(id: u32, value: CardValue) -> Self {
        Self {
            id: CardId(id),
            value,
        }
    }

    #[must_use]
    pub const fn number(id: u32, value: i32) -> Self {
        Self::new(id, CardValue::Number(value))
    }

    #[must_use]
    pub const fn jinx(id: u32, kind: JinxKind) -> Self {
        Self::new(id, CardValue::Jinx(kind))
    }

    #[must_use]
    pub const fn trump(id: u32, kind: TrumpKind) -> Self {
        Self::new(id, CardValue::Trump(kind))
    }

    #[must_use]
    pub const fn category(&self) -> Category {
        self.value.category()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.value, self.id)
    }
}

/// Number of cards produced by [`build_deck`].
#[must_use]
pub fn recipe_size() -> usize {
    let numbers: usize = NUMBER_RECIPE.iter().map(|(_, copies)| 2 * copies).sum();
    numbers + JinxKind::ALL.len() * JINX_COPIES + TrumpKind::ALL.len() * TRUMP_COPIES
}

/// Builds the unshuffled deck from the fixed recipe. Ids run from zero in
/// recipe order, so the output only depends on the recipe constants.
#[must_use]
pub fn build_deck() -> Vec<Card> {
    let mut values = Vec::with_capacity(recipe_size());
    for (magnitude, copies) in NUMBER_RECIPE {
        for _ in 0..copies {
            values.push(CardValue::Number(magnitude));
            values.push(CardValue::Number(-magnitude));
        }
    }
    for kind in JinxKind::ALL {
        values.extend(std::iter::repeat_n(CardValue::Jinx(kind), JINX_COPIES));
    }
    for kind in TrumpKind::ALL {
        values.extend(std::iter::repeat_n(CardValue::Trump(kind), TRUMP_COPIES));
    }
    values
        .into_iter()
        .zip(0u32..)
        .map(|(value, id)| Card::new(id, value))
        .collect()
}

/// Uniform permutation of `cards` in place.
pub fn shuffle<R: Rng + ?Sized>(cards: &mut [Card], rng: &mut R) {
    cards.shuffle(rng);
}

/// Type alias for stable seat positions, `0..players`.
pub type SeatIndex = usize;

/// Stable identity of a peer. Ordering is lexical and drives host choice
/// and seating.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PeerId(String);

impl PeerId {
    /// Sanitises `s`: ASCII whitespace becomes `_` and the result is cut to
    /// [`MAX_PEER_ID_LENGTH`] bytes. Distinct inputs can therefore map to
    /// the same id (`"a b"` and `"a_b"`), and a roster holding both is
    /// rejected as [`DuplicatePeer`](crate::game::GameError::DuplicatePeer).
    #[must_use]
    pub fn new(s: &str) -> Self {
        let mut id: String = s
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .collect();
        if id.len() > MAX_PEER_ID_LENGTH {
            let mut end = MAX_PEER_ID_LENGTH;
            while !id.is_char_boundary(end) {
                end -= 1;
            }
            id.truncate(end);
        }
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PeerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StatusEffect {
    pub kind: JinxKind,
    pub turns_remaining: u8,
}

impl fmt::Display for StatusEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} turns)", self.kind, self.turns_remaining)
    }
}

/// One seat in the registry. The registry is the only owner of hands.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Player {
    pub seat: SeatIndex,
    pub peer: PeerId,
    pub hand: Vec<Card>,
    pub eliminated: bool,
    pub effects: Vec<StatusEffect>,
}

impl Player {
    #[must_use]
    pub fn new(peer: PeerId, seat: SeatIndex) -> Self {
        Self {
            seat,
            peer,
            hand: Vec::new(),
            eliminated: false,
            effects: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.hand.clear();
        self.eliminated = false;
        self.effects.clear();
    }

    #[must_use]
    pub fn has_effect(&self, kind: JinxKind) -> bool {
        self.effects.iter().any(|effect| effect.kind == kind)
    }

    /// Attaches `kind`, refreshing the duration if it's already active.
    pub fn apply_effect(&mut self, kind: JinxKind) {
        let turns_remaining = kind.duration();
        match self.effects.iter_mut().find(|effect| effect.kind == kind) {
            Some(effect) => effect.turns_remaining = turns_remaining,
            None => self.effects.push(StatusEffect {
                kind,
                turns_remaining,
            }),
        }
    }

    /// Counts down every effect by one turn and drops the expired ones.
    pub fn tick_effects(&mut self) {
        for effect in &mut self.effects {
            effect.turns_remaining = effect.turns_remaining.saturating_sub(1);
        }
        self.effects.retain(|effect| effect.turns_remaining > 0);
    }

    /// Finds a card by id. `hint` is only trusted when it points at the
    /// same id, since hand order is only stable on the owner's device.
    #[must_use]
    pub fn position_of(&self, id: CardId, hint: Option<usize>) -> Option<usize> {
        hint.filter(|&idx| self.hand.get(idx).is_some_and(|card| card.id == id))
            .or_else(|| self.hand.iter().position(|card| card.id == id))
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PlayerStatus {
    Waiting,
    MyTurn,
    Eliminated,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::MyTurn => "playing",
            Self::Eliminated => "busted",
        };
        write!(f, "{repr:7}")
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PlayerView {
    pub seat: SeatIndex,
    pub peer: PeerId,
    pub hand_size: usize,
    pub status: PlayerStatus,
    pub effects: Vec<StatusEffect>,
}

/// Read-only snapshot handed to the presentation layer.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GameView {
    pub phase: Phase,
    pub tally: i32,
    pub max_tally: i32,
    pub turn: SeatIndex,
    pub deck_size: usize,
    pub discard_size: usize,
    pub top_discard: Option<Card>,
    pub players: Vec<PlayerView>,
    pub local_seat: SeatIndex,
    /// The local seat's hand, in device order.
    pub hand: Vec<Card>,
    /// Whether the local seat may play right now.
    pub can_play: bool,
}

impl GameView {
    #[must_use]
    pub fn is_my_turn(&self) -> bool {
        self.turn == self.local_seat && matches!(self.phase, Phase::InProgress)
    }
}
