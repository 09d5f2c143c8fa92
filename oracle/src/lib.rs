//! The "pick two indices, guess the 2020th number" game.
//!
//! The protocol is line based. The server greets, the client names two draw
//! indices, the server prints one line per draw (the value for a chosen index,
//! `Nope!` otherwise) and finally judges the client's guess for the next draw.

#[macro_use]
extern crate failure;

pub mod client;
pub mod communication;
pub mod server;

pub use client::{GameClient, Reveal};
pub use communication::{Communicate, LineStream, ProtocolError};
pub use server::{Challenge, Verdict};

/// Number of draws the server prints before asking for a guess.
pub const REVEALED_DRAWS: u32 = 2019;

/// Index of the draw the client has to guess.
pub const TARGET_INDEX: u32 = REVEALED_DRAWS;

pub const HIDDEN: &str = "Nope!";
