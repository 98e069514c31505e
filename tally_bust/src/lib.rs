//! # Tally Bust
//!
//! Replicated core of a 2 to 4 player card game in which every play moves a
//! shared tally, and whoever pushes it past the limit at the end of their
//! turn is out. There is no server: every peer holds a full replica of the
//! match and replicas are kept identical by applying the same sequence of
//! events.
//!
//! ## Architecture
//!
//! - [`game`]: cards, deck recipe, settings and the state machine. Local and
//!   remote events go through the same transition function.
//! - [`net`]: message protocol, envelope codec and the transport seam.
//! - [`sync`]: acknowledgement barriers gating bootstrap and reshuffles.
//! - [`session`]: host selection and seating.
//! - [`peer`]: per-peer controller handling authority, step ordering,
//!   barriers and disconnects.
//! - [`actor`]: tokio task per peer plus an in-process mesh.
//! - [`bot`]: automated card choice.
//!
//! ## Example
//!
//! ```
//! use tally_bust::{GameSettings, GameState, Phase, PeerId};
//!
//! let peers = [PeerId::new("alice"), PeerId::new("bob")];
//! let state = GameState::new(&peers, GameSettings::default());
//! assert_eq!(state.phase(), Phase::Lobby);
//! ```

/// Async actors hosting one peer each.
pub mod actor;
pub use actor::{MeshConfig, PeerHandle, PeerMesh, PeerNotification, PeerSpec};

/// Automated players.
pub mod bot;
pub use bot::{CardChooser, Strategy};

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    Applied, GameError, GameEvent, GameSettings, GameState, JinxPolicy, Origin, Phase,
    PlayOutcome,
    constants::{self, MAX_PLAYERS, MIN_PLAYERS},
    entities::{self, Card, CardValue, GameView, JinxKind, PeerId, SeatIndex, TrumpKind},
};

/// Networking components: message protocol and codec.
pub mod net;
pub use net::{
    messages::{self, Destination, Envelope, Message},
    transport::{self, Transport},
    utils,
};

/// Per-peer controller.
pub mod peer;
pub use peer::Peer;

/// Host selection and seating.
pub mod session;
pub use session::{HostSelector, LexicalHostSelector, PreferredHostSelector, Roster, Seating};

/// Acknowledgement barriers.
pub mod sync;
