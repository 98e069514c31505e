//! Rule scenarios played on replicas fed the same events.

mod common;

use common::Replicas;
use rand::{SeedableRng, rngs::StdRng};
use tally_bust::{
    Applied, Card, GameSettings, Message, PlayOutcome, TrumpKind,
    entities::build_deck,
    messages::SyncReason,
};

/// Deals `hands[seat]` to each seat in order, followed by `rest` in the deck.
fn deck(hands: &[Vec<Card>], rest: &[Card]) -> Vec<Card> {
    hands.iter().flatten().chain(rest).copied().collect()
}

fn filler(from: u32, n: u32) -> Vec<Card> {
    (from..from + n).map(|id| Card::number(id, 1)).collect()
}

fn start(replicas: &mut Replicas, cards: Vec<Card>, hand_size: usize) {
    replicas.broadcast(
        0,
        Message::SyncDeck {
            cards,
            reason: SyncReason::Init,
        },
    );
    for seat in 0..replicas.states.len() {
        replicas.broadcast(
            0,
            Message::DealCards {
                target: seat,
                count: hand_size,
            },
        );
    }
}

fn play(replicas: &mut Replicas, seat: usize, card: Card) -> Applied {
    let hand_index = replicas.states[seat].players()[seat]
        .hand
        .iter()
        .position(|c| *c == card)
        .unwrap();
    replicas.broadcast(
        seat,
        Message::PlayedCard {
            by: seat,
            card,
            hand_index,
            target: None,
        },
    )
}

fn hand_over(replicas: &mut Replicas, from: usize, to: usize) {
    replicas.broadcast(from, Message::TurnAdvanced { from, to });
    replicas.broadcast(from, Message::DealCards { target: to, count: 1 });
}

#[test]
fn test_bust_eliminates_and_turn_skips_seat() {
    let five = Card::number(0, 5);
    let eighteen = Card::number(1, 18);
    let hands = vec![
        vec![five, Card::number(2, 1)],
        vec![eighteen, Card::number(3, 1)],
        filler(10, 2),
        filler(20, 2),
    ];
    let mut replicas = Replicas::new(4, GameSettings::default());
    start(&mut replicas, deck(&hands, &filler(100, 10)), 2);

    play(&mut replicas, 0, five);
    assert_eq!(replicas.states[2].tally(), 5);
    assert!(replicas.states.iter().all(|s| !s.is_bust()));
    hand_over(&mut replicas, 0, 1);

    play(&mut replicas, 1, eighteen);
    assert!(replicas.states.iter().all(|s| s.tally() == 23 && s.is_bust()));
    let outcome = replicas.broadcast(1, Message::Eliminate { seat: 1 });
    assert_eq!(outcome, Applied::Eliminated { sole_survivor: None });
    // The elimination already handed the turn on; only the draw remains.
    assert!(replicas.states.iter().all(|s| s.turn() == 2));
    replicas.broadcast(1, Message::DealCards { target: 2, count: 1 });

    for state in &replicas.states {
        assert_eq!(state.tally(), 21);
        assert_eq!(state.turn(), 2);
        let eliminated: Vec<usize> = state
            .players()
            .iter()
            .filter(|p| p.eliminated)
            .map(|p| p.seat)
            .collect();
        assert_eq!(eliminated, vec![1]);
        assert_eq!(state.next_active_seat(0), Some(2));
        assert_eq!(state.next_active_seat(3), Some(0));
    }
    replicas.assert_identical();
}

#[test]
fn test_non_busting_play_never_eliminates() {
    let hands = vec![vec![Card::number(0, 21)], vec![Card::number(1, -4)]];
    let mut replicas = Replicas::new(2, GameSettings::default());
    start(&mut replicas, deck(&hands, &filler(10, 4)), 1);

    play(&mut replicas, 0, Card::number(0, 21));
    for state in &replicas.states {
        assert_eq!(state.tally(), 21);
        assert!(!state.is_bust());
        assert!(state.players().iter().all(|p| !p.eliminated));
    }
}

#[test]
fn test_reshuffle_after_deck_runs_dry() {
    let mut cards: Vec<Card> = (0..20)
        .map(|id| Card::number(id, if id % 2 == 0 { 1 } else { -1 }))
        .collect();
    cards.rotate_left(3);
    let mut replicas = Replicas::new(2, GameSettings::default());
    start(&mut replicas, cards, 4);
    assert_eq!(replicas.states[0].deck().len(), 12);

    let mut seat = 0;
    loop {
        let card = replicas.states[seat].players()[seat].hand[0];
        play(&mut replicas, seat, card);
        let next = 1 - seat;
        replicas.broadcast(seat, Message::TurnAdvanced { from: seat, to: next });
        seat = next;
        if replicas.states[0].deck().is_empty() {
            break;
        }
        replicas.broadcast(seat, Message::DealCards { target: seat, count: 1 });
    }

    let before = replicas.states[0].discard().to_vec();
    assert_eq!(before.len(), 13);
    let cards = replicas.states[seat].plan_reshuffle(&mut StdRng::seed_from_u64(5));
    assert_eq!(cards.len(), 12);
    replicas.broadcast(
        seat,
        Message::SyncDeck {
            cards,
            reason: SyncReason::Reshuffle,
        },
    );

    for state in &replicas.states {
        assert_eq!(state.deck().len(), 12);
        assert_eq!(state.discard(), &before[12..]);
        assert_eq!(state.card_count(), 20);
    }
    replicas.broadcast(seat, Message::DealCards { target: seat, count: 1 });
    replicas.assert_identical();
}

#[test]
fn test_full_recipe_conserved_through_reshuffle() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut cards = build_deck();
    tally_bust::entities::shuffle(&mut cards, &mut rng);
    // Keep only Number cards so plays never need follow-up events.
    cards.retain(|card| matches!(card.value, tally_bust::CardValue::Number(_)));
    let total = cards.len();
    let settings = GameSettings {
        max_tally: 40,
        ..GameSettings::default()
    };
    let mut replicas = Replicas::new(3, settings);
    start(&mut replicas, cards, 4);

    let mut reshuffles = 0;
    let mut seat = 0;
    for _ in 0..80 {
        let state = &replicas.states[seat];
        let card = *state.players()[seat]
            .hand
            .iter()
            .min_by_key(|c| match c.value {
                tally_bust::CardValue::Number(v) => (state.tally() + v).abs(),
                _ => i32::MAX,
            })
            .unwrap();
        play(&mut replicas, seat, card);
        let next = (seat + 1) % 3;
        replicas.broadcast(seat, Message::TurnAdvanced { from: seat, to: next });
        seat = next;
        if replicas.states[seat].deck().is_empty() {
            let cards = replicas.states[seat].plan_reshuffle(&mut rng);
            replicas.broadcast(
                seat,
                Message::SyncDeck {
                    cards,
                    reason: SyncReason::Reshuffle,
                },
            );
            reshuffles += 1;
        }
        replicas.broadcast(seat, Message::DealCards { target: seat, count: 1 });
        assert!(replicas.states.iter().all(|s| s.card_count() == total));
    }
    assert!(reshuffles > 0);
    replicas.assert_identical();
}

#[test]
fn test_limit_change_lowers_limit_and_clamps_tally() {
    let limit_change = Card::trump(2, TrumpKind::LimitChange);
    let hands = vec![
        vec![Card::number(0, 10)],
        vec![Card::number(1, 10)],
        vec![limit_change],
    ];
    let mut replicas = Replicas::new(3, GameSettings::default());
    start(&mut replicas, deck(&hands, &filler(10, 6)), 1);

    play(&mut replicas, 0, Card::number(0, 10));
    hand_over(&mut replicas, 0, 1);
    play(&mut replicas, 1, Card::number(1, 10));
    hand_over(&mut replicas, 1, 2);
    assert_eq!(replicas.states[0].tally(), 20);

    let outcome = play(&mut replicas, 2, limit_change);
    assert_eq!(outcome, Applied::Played(PlayOutcome::NeedsLimitDelta));
    replicas.broadcast(2, Message::AdjustLimit { delta: -3 });

    for state in &replicas.states {
        assert_eq!(state.max_tally(), 18);
        assert_eq!(state.tally(), 18);
        assert!(!state.is_bust());
        assert!(state.players().iter().all(|p| !p.eliminated));
    }
    assert_eq!(
        replicas
            .log
            .iter()
            .filter(|m| matches!(m, Message::AdjustLimit { .. }))
            .count(),
        1
    );
    replicas.assert_identical();
}
