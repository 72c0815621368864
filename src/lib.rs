//! Live presence for Ruline workflow versions.
//!
//! A [`PresenceChannel`] keeps one socket open to the console for the
//! workflow version being viewed, announces the local viewer and tracks the
//! other viewers that join and leave.

pub mod clients;
pub mod config;
pub mod models;
pub mod presence;
pub mod utils;

pub use config::Config;
pub use models::{Member, PresenceError, ScopeKey};
pub use presence::{ConnectionStatus, PresenceChannel, PresenceView};
