//! Terminal Pokémon battle simulator built on tui-dispatch.
//!
//! The library exposes the battle engine, the PokeAPI client and the UI so the
//! binary and the integration tests share one set of modules.

pub mod action;
pub mod api;
pub mod battle;
pub mod config;
pub mod creature;
pub mod damage;
pub mod effect;
pub mod logging;
pub mod reducer;
pub mod rng;
pub mod roster;
pub mod state;
pub mod timeline;
pub mod types;
pub mod ui;
