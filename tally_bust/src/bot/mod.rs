//! Automated players.
//!
//! A bot only ever sees the same [`GameView`](crate::game::entities::GameView)
//! the presentation layer gets and answers with a hand index and optional
//! Jinx target, so it drives a [`Peer`](crate::peer::Peer) exactly like a
//! user gesture would.
//!
//! - **Cautious**: plays whatever leaves the tally lowest.
//! - **Reckless**: plays a random card at a random target.

pub mod strategy;

pub use strategy::{Cautious, CardChooser, Choice, Reckless, Strategy};
