//! Typed accessors for upstream resource families
//!
//! Every family (status, characters, corporations, alliances, killmails,
//! assets, structures) is a set of [`Resource`] constants plus thin
//! `get_*` / `get_*_with_cache` methods on [`EsiClient`] that delegate to the
//! generic `fetch` / `fetch_paged` helpers.

pub mod assets;
pub mod character;
mod client;
pub mod corporation;
pub mod killmail;
pub mod status;

use serde::{Deserialize, Serialize};

pub use assets::{Asset, Structure};
pub use character::{Character, CharacterPortrait};
pub use client::{Auth, CachedResponse, EsiClient, Resource, MAX_PAGES, X_PAGES};
pub use corporation::{Alliance, Corporation};
pub use killmail::{Attacker, Killmail, KillmailItem, Victim};
pub use status::ServerStatus;

/// Point in space, in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
