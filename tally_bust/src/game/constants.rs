//! Fixed game constants shared by the deck recipe, the state machine and
//! the session bootstrap.

/// Fewest peers a match can start with.
pub const MIN_PLAYERS: usize = 2;
/// Most peers a match supports.
pub const MAX_PLAYERS: usize = 4;

pub const DEFAULT_MAX_TALLY: i32 = 21;
pub const DEFAULT_MIN_LIMIT: i32 = 10;
pub const DEFAULT_MAX_LIMIT: i32 = 40;
/// LimitChange deltas are drawn from `[-bound, bound]` excluding zero.
pub const DEFAULT_LIMIT_DELTA_BOUND: i32 = 5;

/// Cards dealt to every seat when the match starts.
pub const INITIAL_HAND_SIZE: usize = 4;
/// Cards dealt to a seat at the start of each of its turns.
pub const TURN_DRAW: usize = 1;
/// Discard cards left behind (most recent first) when reshuffling.
pub const RETAINED_DISCARD: usize = 1;

/// Turns a Banana stays attached to its target.
pub const BANANA_TURNS: u8 = 1;
/// Plays a Banana'd seat must make before its turn can pass.
pub const BANANA_PLAYS: u8 = 2;
/// Turns the cosmetic jinxes stay attached.
pub const JINX_TURNS: u8 = 2;

/// Copies of each Jinx kind in a fresh deck.
pub const JINX_COPIES: usize = 2;
/// Copies of each Trump kind in a fresh deck.
pub const TRUMP_COPIES: usize = 2;
/// Copies of each number magnitude; `+v` and `-v` share the count.
pub const NUMBER_RECIPE: [(i32, usize); 5] = [(1, 4), (2, 4), (3, 4), (4, 3), (5, 3)];

pub const MAX_PEER_ID_LENGTH: usize = 64;
pub const MAX_NOTICE_LENGTH: usize = 256;
