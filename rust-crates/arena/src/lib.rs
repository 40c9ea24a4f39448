//! Simulation engine for the bomb-arena mini-game.
//!
//! The world is an explicit [`state::ArenaState`] advanced one tick at a
//! time by [`state::ArenaState::step`]; callers own the timer. Nothing in
//! here talks to the network — final standings are handed back as a
//! [`outcome::MatchOutcome`] for the caller to reconcile.

pub mod outcome;
pub mod state;

pub use outcome::{
    MatchOutcome,
    PlayerStanding,
};
pub use state::{
    ArenaConfig,
    ArenaState,
    Direction,
    Phase,
    Player,
    TickEvent,
};
