//! Host selection and seating, computed identically on every peer from
//! the roster the session layer hands over.

pub mod host;
pub mod seating;

pub use host::{HostSelector, LexicalHostSelector, PreferredHostSelector};
pub use seating::{Roster, Seating};
