//! Runs one bot-only match between in-process peer actors.

use std::time::Duration;

use anyhow::{Context, Error};
use serde::Serialize;
use tally_bust::{
    GameEvent, MeshConfig, PeerId, PeerMesh, PeerNotification, PeerSpec, Phase, Strategy,
};
use tokio::{sync::mpsc, time::timeout};

use crate::{
    config::{BotMix, SimConfig},
    logging,
};

const NAMES: [&str; 4] = ["alice", "bob", "carol", "dave"];

/// How long the match may go without any event before it's declared stuck.
const IDLE_LIMIT: Duration = Duration::from_secs(10);

/// Why the match loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ending {
    Winner,
    TurnLimit,
    Interrupted,
    Stalled,
}

/// Outcome reported at the end of a run
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub ending: Ending,
    pub winner: Option<String>,
    pub turns: usize,
    pub events: u64,
    pub tally: i32,
    pub max_tally: i32,
    pub eliminated: Vec<String>,
    /// Every replica's journal is a prefix of the longest one.
    pub replicas_agree: bool,
}

fn strategy_for(bots: BotMix, seat: usize, seed: Option<u64>) -> Strategy {
    let reckless_seed = seed.unwrap_or(0).wrapping_add(1000 + seat as u64);
    match bots {
        BotMix::Cautious => Strategy::cautious(),
        BotMix::Reckless => Strategy::reckless(reckless_seed),
        BotMix::Mixed if seat % 2 == 0 => Strategy::cautious(),
        BotMix::Mixed => Strategy::reckless(reckless_seed),
    }
}

/// Plays a match to the end, to `max_turns`, or until `stop` fires.
///
/// # Errors
///
/// Fails when the mesh can't be spawned.
pub async fn run_match(
    config: &SimConfig,
    mut stop: mpsc::UnboundedReceiver<()>,
) -> Result<MatchSummary, Error> {
    let specs = NAMES
        .iter()
        .take(config.players)
        .enumerate()
        .map(|(seat, name)| {
            PeerSpec::bot(PeerId::new(name), strategy_for(config.bots, seat, config.seed))
        })
        .collect();
    let mesh_config = MeshConfig {
        settings: config.settings.clone(),
        seed: config.seed,
        ..MeshConfig::default()
    };
    let (observer, mut notifications) = mpsc::unbounded_channel::<PeerNotification>();
    let mesh =
        PeerMesh::spawn(specs, &mesh_config, Some(observer)).context("failed to spawn peers")?;
    let host = mesh.host().clone();
    tracing::info!(
        players = config.players,
        bots = %config.bots,
        jinx_policy = %config.settings.jinx_policy,
        "match starting, host {host}"
    );

    let mut turns = 0;
    let mut winner = None;
    let ending = loop {
        tokio::select! {
            notification = timeout(IDLE_LIMIT, notifications.recv()) => {
                let Ok(Some(PeerNotification { peer, event })) = notification else {
                    break Ending::Stalled;
                };
                // The host's replica narrates; the others report the same events.
                if peer != host {
                    continue;
                }
                logging::log_match_event(peer.as_str(), &event.to_string());
                match event {
                    GameEvent::TurnPassed { .. } => {
                        turns += 1;
                        if turns >= config.max_turns {
                            break Ending::TurnLimit;
                        }
                    }
                    GameEvent::GameOver { winner: seat } => {
                        winner = Some(seat);
                        break Ending::Winner;
                    }
                    _ => {}
                }
            }

            _ = stop.recv() => {
                tracing::warn!("interrupted");
                break Ending::Interrupted;
            }
        }
    };

    let peers = mesh.shutdown().await;
    let longest = peers
        .iter()
        .map(|peer| peer.journal())
        .max_by_key(|journal| journal.len())
        .unwrap_or_default();
    let replicas_agree = peers
        .iter()
        .all(|peer| longest.starts_with(peer.journal()));
    let reference = peers
        .iter()
        .find(|peer| *peer.id() == host)
        .or_else(|| peers.first())
        .context("no peer survived shutdown")?;
    let state = reference.state();

    let seat_name = |seat: usize| {
        reference
            .roster()
            .seating
            .peer_at(seat)
            .map_or_else(|| format!("seat {seat}"), ToString::to_string)
    };
    Ok(MatchSummary {
        ending,
        winner: winner.map(seat_name),
        turns,
        events: state.applied(),
        tally: state.tally(),
        max_tally: state.max_tally(),
        eliminated: state
            .players()
            .iter()
            .filter(|player| player.eliminated)
            .map(|player| player.peer.to_string())
            .collect(),
        replicas_agree: replicas_agree && state.phase() != Phase::Lobby,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_bust::GameSettings;

    fn config(players: usize, bots: BotMix) -> SimConfig {
        SimConfig {
            players,
            seed: Some(7),
            max_turns: 2_000,
            bots,
            settings: GameSettings::default(),
        }
    }

    #[tokio::test]
    async fn test_match_runs_to_a_winner() {
        let (_stop_tx, stop) = mpsc::unbounded_channel();
        let mut config = config(3, BotMix::Reckless);
        config.max_turns = 5_000;
        let summary = run_match(&config, stop).await.unwrap();
        assert_eq!(summary.ending, Ending::Winner);
        assert!(summary.winner.is_some());
        assert_eq!(summary.eliminated.len(), 2);
        assert!(summary.replicas_agree);
    }

    #[tokio::test]
    async fn test_turn_limit() {
        let (_stop_tx, stop) = mpsc::unbounded_channel();
        let mut config = config(2, BotMix::Cautious);
        config.max_turns = 1;
        let summary = run_match(&config, stop).await.unwrap();
        assert_eq!(summary.ending, Ending::TurnLimit);
        assert_eq!(summary.turns, 1);
        assert!(summary.replicas_agree);
    }

    #[tokio::test]
    async fn test_interrupt() {
        let (stop_tx, stop) = mpsc::unbounded_channel();
        stop_tx.send(()).unwrap();
        let summary = run_match(&config(2, BotMix::Reckless), stop).await.unwrap();
        assert!(matches!(
            summary.ending,
            Ending::Interrupted | Ending::Winner | Ending::TurnLimit
        ));
    }

    #[test]
    fn test_summary_serializes() {
        let summary = MatchSummary {
            ending: Ending::Winner,
            winner: Some("alice".to_string()),
            turns: 12,
            events: 80,
            tally: 21,
            max_tally: 21,
            eliminated: vec!["bob".to_string()],
            replicas_agree: true,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains(r#""ending":"winner""#));
        assert!(json.contains(r#""winner":"alice""#));
    }
}
