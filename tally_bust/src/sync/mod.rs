//! Acknowledgement barriers that gate authority-only progression.

pub mod barrier;

pub use barrier::{Barrier, BarrierKind};
