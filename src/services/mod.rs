//! Domain services used by the websocket routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the session lifecycle and game rules so the route
//! handlers can stay focused on protocol translation and frame plumbing.

pub mod clock;
pub mod names;
pub mod session;
pub mod winner;
