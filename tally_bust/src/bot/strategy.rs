//! Card choice strategies.

use enum_dispatch::enum_dispatch;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};

use crate::game::entities::{
    Card, CardValue, GameView, PlayerStatus, PlayerView, SeatIndex, TrumpKind,
};

/// A play decision: which card of the local hand, and where a Jinx lands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Choice {
    pub hand_index: usize,
    pub target: Option<SeatIndex>,
}

#[enum_dispatch]
pub trait CardChooser {
    /// `None` when the view doesn't allow a play.
    fn choose(&mut self, view: &GameView) -> Option<Choice>;
}

#[enum_dispatch(CardChooser)]
#[derive(Debug)]
pub enum Strategy {
    Cautious,
    Reckless,
}

impl Strategy {
    #[must_use]
    pub fn cautious() -> Self {
        Cautious.into()
    }

    #[must_use]
    pub fn reckless(seed: u64) -> Self {
        Reckless::new(seed).into()
    }
}

/// Tally after `card` resolves. LimitChange and Jinx cards leave it alone.
fn projected_tally(view: &GameView, card: &Card) -> i32 {
    match card.value {
        CardValue::Number(value) => view.tally + value,
        CardValue::Trump(TrumpKind::Wipeout) => 0,
        CardValue::Trump(TrumpKind::Maxout) => view.max_tally,
        CardValue::Trump(TrumpKind::LimitChange) | CardValue::Jinx(_) => view.tally,
    }
}

/// Other seats still in the match.
fn targets(view: &GameView) -> impl Iterator<Item = &PlayerView> {
    view.players.iter().filter(|player| {
        player.seat != view.local_seat && player.status != PlayerStatus::Eliminated
    })
}

/// Keeps the tally as low as it can. Jinxes go to the seat holding the most
/// cards.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cautious;

impl CardChooser for Cautious {
    fn choose(&mut self, view: &GameView) -> Option<Choice> {
        if !view.can_play {
            return None;
        }
        let (hand_index, card) = view
            .hand
            .iter()
            .enumerate()
            .min_by_key(|(idx, card)| (projected_tally(view, card), *idx))?;
        let target = match card.value {
            CardValue::Jinx(_) => targets(view)
                .max_by_key(|player| (player.hand_size, std::cmp::Reverse(player.seat)))
                .map(|player| player.seat),
            _ => None,
        };
        Some(Choice { hand_index, target })
    }
}

/// Plays a uniformly random card.
#[derive(Debug)]
pub struct Reckless {
    rng: StdRng,
}

impl Reckless {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl CardChooser for Reckless {
    fn choose(&mut self, view: &GameView) -> Option<Choice> {
        if !view.can_play || view.hand.is_empty() {
            return None;
        }
        let hand_index = self.rng.random_range(0..view.hand.len());
        let target = match view.hand[hand_index].value {
            CardValue::Jinx(_) => {
                let seats: Vec<SeatIndex> = targets(view).map(|player| player.seat).collect();
                seats.choose(&mut self.rng).copied()
            }
            _ => None,
        };
        Some(Choice { hand_index, target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        entities::{JinxKind, PeerId},
        state_machine::Phase,
    };

    fn view(hand: Vec<Card>, tally: i32) -> GameView {
        let players = (0..3)
            .map(|seat| PlayerView {
                seat,
                peer: PeerId::new(&format!("p{seat}")),
                hand_size: 4 + seat,
                status: if seat == 0 {
                    PlayerStatus::MyTurn
                } else {
                    PlayerStatus::Waiting
                },
                effects: Vec::new(),
            })
            .collect();
        GameView {
            phase: Phase::InProgress,
            tally,
            max_tally: 21,
            turn: 0,
            deck_size: 30,
            discard_size: 0,
            top_discard: None,
            players,
            local_seat: 0,
            hand,
            can_play: true,
        }
    }

    #[test]
    fn test_cautious_avoids_bust() {
        let hand = vec![Card::number(0, 5), Card::number(1, -2), Card::number(2, 3)];
        let choice = Cautious.choose(&view(hand, 19)).unwrap();
        assert_eq!(choice.hand_index, 1);
        assert_eq!(choice.target, None);
    }

    #[test]
    fn test_cautious_prefers_wipeout_when_high() {
        let hand = vec![
            Card::number(0, 1),
            Card::trump(1, TrumpKind::Wipeout),
            Card::number(2, 2),
        ];
        let choice = Cautious.choose(&view(hand, 20)).unwrap();
        assert_eq!(choice.hand_index, 1);
    }

    #[test]
    fn test_cautious_jinx_targets_biggest_hand() {
        let hand = vec![Card::jinx(0, JinxKind::Dog), Card::number(1, 4)];
        let choice = Cautious.choose(&view(hand, 0)).unwrap();
        assert_eq!(choice, Choice { hand_index: 0, target: Some(2) });
    }

    #[test]
    fn test_no_choice_when_not_allowed() {
        let mut closed = view(vec![Card::number(0, 1)], 0);
        closed.can_play = false;
        assert_eq!(Strategy::cautious().choose(&closed), None);
        assert_eq!(Strategy::reckless(1).choose(&closed), None);
        assert_eq!(Strategy::reckless(1).choose(&view(Vec::new(), 0)), None);
    }

    #[test]
    fn test_reckless_is_seeded() {
        let hand: Vec<Card> = (0..5).map(|id| Card::number(id, 1)).collect();
        let a: Vec<Option<Choice>> = {
            let mut bot = Strategy::reckless(9);
            (0..10).map(|_| bot.choose(&view(hand.clone(), 0))).collect()
        };
        let b: Vec<Option<Choice>> = {
            let mut bot = Strategy::reckless(9);
            (0..10).map(|_| bot.choose(&view(hand.clone(), 0))).collect()
        };
        assert_eq!(a, b);
        assert!(a.iter().flatten().all(|choice| choice.hand_index < 5));
    }

    #[test]
    fn test_reckless_jinx_target_is_other_seat() {
        let hand = vec![Card::jinx(0, JinxKind::Banana)];
        let mut bot = Strategy::reckless(3);
        for _ in 0..20 {
            let target = bot.choose(&view(hand.clone(), 0)).unwrap().target.unwrap();
            assert!(target == 1 || target == 2);
        }
    }
}
