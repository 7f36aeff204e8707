//! `pvp-cooldown` - combat cooldown tracking for multiplayer sessions
//!
//! Participants who fight enter a cooldown. While it runs their commands can
//! be blocked, a countdown indicator follows them, and disconnecting is
//! punished. The host environment is reached only through the traits in
//! [`host`], so the tracker can sit behind any game server or the in-memory
//! host used for scenario replay.

pub mod cli;
pub mod clock;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod host;
pub mod observability;
pub mod scenario;
