//! Card game engine: deck recipe, player registry and the replicated state
//! machine.
//!
//! Transitions are plain data in, plain data out. Networking, barriers and
//! authority live in [`crate::peer`]; this module only knows how to apply an
//! event to a state.

pub mod constants;
pub mod entities;
pub mod settings;
pub mod state_machine;

pub use settings::{GameSettings, JinxPolicy};
pub use state_machine::{Applied, GameError, GameEvent, GameState, Origin, Phase, PlayOutcome};
