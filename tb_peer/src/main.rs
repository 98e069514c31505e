//! Single-process tally-bust match between bot peers.
//!
//! Every peer runs as its own actor with a full replica of the match and
//! talks to the others only through encoded envelopes, exactly as it would
//! over a real transport.

mod config;
mod logging;
mod sim;

use anyhow::Error;
use ctrlc::set_handler;
use pico_args::Arguments;
use tokio::sync::mpsc;

use config::{Overrides, SimConfig};

const HELP: &str = "\
Run a tally-bust match between bot peers

USAGE:
  tb_peer [OPTIONS]

OPTIONS:
  --players    N           Number of peers, 2 to 4    [default: env TB_PLAYERS or 4]
  --seed       N           Seed for every generator   [default: env TB_SEED or random]
  --max-turns  N           Stop after N turns         [default: env TB_MAX_TURNS or 500]
  --bots       MIX         cautious, reckless, mixed  [default: env TB_BOTS or mixed]
  --settings   PATH        JSON game settings file    [default: env TB_SETTINGS_FILE]

FLAGS:
  --json                   Print the summary as JSON
  -h, --help               Print help information

ENVIRONMENT:
  TB_BARRIER_TIMEOUT_MS    Barrier timeout, 0 waits forever
  TB_JINX_POLICY           recycle or replenish
  RUST_LOG                 Log filter [default: info]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let json = pargs.contains("--json");
    let overrides = Overrides {
        players: pargs.opt_value_from_str("--players")?,
        seed: pargs.opt_value_from_str("--seed")?,
        max_turns: pargs.opt_value_from_str("--max-turns")?,
        bots: pargs.opt_value_from_str("--bots")?,
        settings_file: pargs.opt_value_from_str("--settings")?,
    };

    logging::init();

    let config = SimConfig::from_env(overrides)?;
    config.validate()?;

    // Catching signals for exit.
    let (stop_tx, stop) = mpsc::unbounded_channel();
    set_handler(move || {
        let _ = stop_tx.send(());
    })?;

    let summary = sim::run_match(&config, stop).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        match &summary.winner {
            Some(winner) => println!("{winner} wins after {} turns", summary.turns),
            None => println!("no winner ({:?}) after {} turns", summary.ending, summary.turns),
        }
        println!(
            "tally {}/{}, {} events, eliminated: {}",
            summary.tally,
            summary.max_tally,
            summary.events,
            summary.eliminated.join(", ")
        );
    }

    if !summary.replicas_agree {
        anyhow::bail!("replicas diverged");
    }
    Ok(())
}
