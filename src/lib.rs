//! # Adaptive Arena
//!
//! Five small real-time games, each played against an opponent that watches
//! the human player and adapts online: a value-learning paddle, an
//! alpha-beta Connect Four searcher with drifting column weights, an n-gram
//! rock-paper-scissors predictor, a spatial targeter for a dodge arena, and a
//! recall-driven difficulty controller for memory match.
//!
//! ## Modules
//!
//! - [`ai`]: Agent trait and the five adaptive opponents
//! - [`arena`]: Game sessions, the delayed-event scheduler, and the arena controller
//! - [`game`]: Connect Four board and rules
//! - [`profile`]: Player profile types and stores
//! - [`sim`]: Scripted players for headless runs
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

pub mod ai;
pub mod arena;
pub mod config;
pub mod error;
pub mod game;
pub mod profile;
pub mod sim;
