//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the session registry and the connection index. Each session
//! lives behind its own `Mutex`, which is the serialization point for
//! every mutation of that session: claims, admissions, start, and clock
//! ticks all run under it, so broadcasts always see a coherent snapshot.
//! The registry `RwLock` is held only for map lookup/insert, never
//! across a session mutation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, mpsc};
use uuid::Uuid;

use crate::frame::Frame;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Full color universe handed out to players in order of admission.
/// The pool strictly shrinks; colors are never returned.
pub const COLOR_UNIVERSE: [&str; 9] =
    ["red", "blue", "green", "yellow", "purple", "black", "brown", "grey", "orange"];

/// Sentinel assigned when the color pool is exhausted.
pub const NO_COLOR: &str = "none";

/// Countdown length in seconds for a freshly created session.
pub const INITIAL_SECONDS: i32 = 30;

// =============================================================================
// PLAYER
// =============================================================================

/// A roster entry. Append-only: disconnects never remove players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub color: &'static str,
    pub owner: bool,
}

// =============================================================================
// SESSION
// =============================================================================

/// A live connection attached to a session: which player it speaks for
/// and the sender used to push broadcast frames to it.
pub struct ConnectedClient {
    pub player_id: Uuid,
    pub tx: mpsc::Sender<Frame>,
}

/// One game room. Board, roster, connections, countdown, outcome.
pub struct Session {
    pub id: Uuid,
    /// Side length; the board has `board_size²` cells.
    pub board_size: usize,
    /// Cell owners by linear index. `None` is unclaimed.
    pub board: Vec<Option<Uuid>>,
    /// Colors not yet assigned. Popped front-first on admission.
    pub available_colors: Vec<&'static str>,
    pub players: Vec<Player>,
    /// Attached connections keyed by connection id.
    pub clients: HashMap<Uuid, ConnectedClient>,
    pub seconds_left: i32,
    pub started: bool,
    pub stopped: bool,
    pub winner: Option<Player>,
}

impl Session {
    #[must_use]
    pub fn new(board_size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            board_size,
            board: vec![None; board_size * board_size],
            available_colors: COLOR_UNIVERSE.to_vec(),
            players: Vec::new(),
            clients: HashMap::new(),
            seconds_left: INITIAL_SECONDS,
            started: false,
            stopped: false,
            winner: None,
        }
    }

    /// Look up a roster entry by player id.
    #[must_use]
    pub fn player(&self, player_id: Uuid) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    /// Session registry: session id -> session, each behind its own mutex.
    pub sessions: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>>,
    /// Connection index: connection id -> session id it is attached to.
    pub connections: Arc<RwLock<HashMap<Uuid, Uuid>>>,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Record the session a connection is attached to. Rebinding an
    /// already-bound connection overwrites the previous entry.
    pub async fn bind_connection(&self, connection_id: Uuid, session_id: Uuid) {
        self.connections.write().await.insert(connection_id, session_id);
    }

    /// Resolve the session a connection is currently attached to.
    pub async fn resolve_connection(&self, connection_id: Uuid) -> Option<Uuid> {
        self.connections.read().await.get(&connection_id).copied()
    }

    /// Remove a connection's binding. Used on transport disconnect.
    pub async fn unbind_connection(&self, connection_id: Uuid) {
        self.connections.write().await.remove(&connection_id);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
