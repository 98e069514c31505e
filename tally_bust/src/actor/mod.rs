//! Async actor layer.
//!
//! Each peer runs in its own tokio task with an unbounded mpsc inbox.
//! Transport deliveries, local commands and deadline ticks are all
//! processed by that one task, so a [`Peer`](crate::peer::Peer) never sees
//! two events at once. [`PeerMesh`] wires up a whole match in one process.

pub mod channel;
pub mod mesh;
pub mod messages;
pub mod task;

pub use channel::ChannelTransport;
pub use mesh::{MeshConfig, PeerMesh, PeerSpec};
pub use messages::{PeerCommand, PeerNotification};
pub use task::{ActorError, DEFAULT_TICK, PeerActor, PeerHandle};
