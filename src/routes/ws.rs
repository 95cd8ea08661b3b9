//! WebSocket handler — bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection id and enters a `select!` loop:
//! - Incoming client frames → parse + dispatch by syscall prefix
//! - Broadcast frames from session peers → forward to client
//!
//! Handler functions are pure business logic — they validate, mutate
//! state, and return an `Outcome`. The dispatch layer owns all outbound
//! concerns: reply to sender and broadcast to peers.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `connection_id`
//! 2. Client sends frames → dispatch → handler returns Outcome
//! 3. Dispatch applies Outcome (reply / broadcast / both / silence)
//! 4. Close → resolve connection index → detach + unbind

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, Frame};
use crate::services::{clock, session};
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what — handlers never send frames directly.
enum Outcome {
    /// Send done+data to sender only.
    Reply(Data),
    /// Reply to sender, and broadcast a separately named frame to all
    /// session peers excluding the sender.
    ReplyAndBroadcast {
        reply: Data,
        session_id: Uuid,
        syscall: &'static str,
        broadcast: Data,
    },
    /// Send empty done to sender only.
    Done,
    /// No mutation happened and nobody is told. The policy for events
    /// addressing unknown sessions.
    Silent,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();

    // Per-connection channel for receiving broadcast frames from peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(256);

    let welcome = Frame::request("session:connected", Data::new())
        .with_data("connection_id", connection_id.to_string());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%connection_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies = process_inbound_text(&state, connection_id, &client_tx, &text).await;
                        for frame in replies {
                            let _ = send_frame(&mut socket, &frame).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    handle_disconnect(&state, connection_id).await;
    info!(%connection_id, "ws: client disconnected");
}

/// Route a transport-level disconnect through the connection index.
async fn handle_disconnect(state: &AppState, connection_id: Uuid) {
    if let Some(session_id) = state.resolve_connection(connection_id).await {
        if let Some(handle) = session::get(state, session_id).await {
            let mut session = handle.lock().await;
            session::detach_connection(&mut session, connection_id);
        }
    }
    state.unbind_connection(connection_id).await;
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the
/// sender. Split from the socket loop so tests can exercise dispatch and
/// broadcast behavior end-to-end over plain channels.
async fn process_inbound_text(
    state: &AppState,
    connection_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    text: &str,
) -> Vec<Frame> {
    let req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%connection_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", Data::new())
                .with_data("message", format!("invalid json: {e}"));
            return vec![err];
        }
    };

    info!(%connection_id, id = %req.id, syscall = %req.syscall, status = ?req.status, "ws: recv frame");

    let result = match req.prefix() {
        "session" => handle_session(state, connection_id, client_tx, &req).await,
        prefix => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    // Apply outcome — the dispatch layer owns all outbound logic.
    match result {
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::ReplyAndBroadcast { reply, session_id, syscall, broadcast }) => {
            let sender_frame = req.done_with(reply);
            let peer_frame = Frame::request(syscall, broadcast).with_session_id(session_id);
            session::broadcast_to(state, session_id, &peer_frame, Some(connection_id)).await;
            vec![sender_frame]
        }
        Ok(Outcome::Done) => vec![req.done()],
        Ok(Outcome::Silent) => vec![],
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// SESSION HANDLERS
// =============================================================================

async fn handle_session(
    state: &AppState,
    connection_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let op = req.syscall.split_once(':').map_or("", |(_, op)| op);

    match op {
        "create" => handle_create(state, connection_id, client_tx, req).await,
        "join" => handle_join(state, connection_id, client_tx, req).await,
        "rejoin" => handle_rejoin(state, connection_id, client_tx, req).await,
        "start" => handle_start(state, connection_id, req).await,
        "claim" => handle_claim(state, req).await,
        _ => Err(req.error(format!("unknown session op: {op}"))),
    }
}

/// `session:create` — new session, admit the caller as owner, attach.
async fn handle_create(
    state: &AppState,
    connection_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let board_size = req
        .data
        .get("board_size")
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(0);

    let handle = session::create(state, board_size)
        .await
        .map_err(|e| req.error_from(&e))?;

    let mut session = handle.lock().await;
    state.bind_connection(connection_id, session.id).await;

    let player = session::admit_player(&mut session, true);
    session::attach_connection(&mut session, connection_id, player.id, client_tx.clone());

    Ok(Outcome::Reply(session_and_player(&session, Some(&player))))
}

/// `session:join` — admit a new player (or reuse a presented identity),
/// attach, and tell the room.
async fn handle_join(
    state: &AppState,
    connection_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let Some(session_id) = request_session_id(req) else {
        return Err(req.error("session_id required"));
    };

    // Bound before the lookup; a dangling binding to an unknown session
    // is cleared on disconnect.
    state.bind_connection(connection_id, session_id).await;

    let Some(handle) = session::get(state, session_id).await else {
        return Ok(Outcome::Silent);
    };

    let mut session = handle.lock().await;
    let (player_id, player) = match data_uuid(&req.data, "player_id") {
        // Presented identities are attached as-is, roster-checked or not.
        Some(id) => (id, session.player(id).cloned()),
        None => {
            let player = session::admit_player(&mut session, false);
            (player.id, Some(player))
        }
    };
    session::attach_connection(&mut session, connection_id, player_id, client_tx.clone());

    Ok(Outcome::ReplyAndBroadcast {
        reply: session_and_player(&session, player.as_ref()),
        session_id,
        syscall: "session:joined",
        broadcast: session::snapshot_data(&session),
    })
}

/// `session:rejoin` — reattach a known identity. Caller-only reply, no
/// room broadcast.
async fn handle_rejoin(
    state: &AppState,
    connection_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let Some(session_id) = request_session_id(req) else {
        return Err(req.error("session_id required"));
    };
    let Some(player_id) = data_uuid(&req.data, "player_id") else {
        return Err(req.error("player_id required"));
    };

    state.bind_connection(connection_id, session_id).await;

    let Some(handle) = session::get(state, session_id).await else {
        return Ok(Outcome::Silent);
    };

    let mut session = handle.lock().await;
    session::attach_connection(&mut session, connection_id, player_id, client_tx.clone());
    let player = session.player(player_id).cloned();

    Ok(Outcome::Reply(session_and_player(&session, player.as_ref())))
}

/// `session:start` — owner-only; spawns the countdown clock.
async fn handle_start(state: &AppState, connection_id: Uuid, req: &Frame) -> Result<Outcome, Frame> {
    let Some(session_id) = request_session_id(req) else {
        return Err(req.error("session_id required"));
    };
    let Some(handle) = session::get(state, session_id).await else {
        return Ok(Outcome::Silent);
    };

    let mut session = handle.lock().await;
    let Some(player_id) = session.clients.get(&connection_id).map(|c| c.player_id) else {
        return Err(req.error("connection is not attached to this session"));
    };

    session::start(&mut session, player_id).map_err(|e| req.error_from(&e))?;

    let reply = session::snapshot_data(&session);
    drop(session);
    let _clock = clock::spawn_clock(handle, clock::TICK_PERIOD);

    Ok(Outcome::Reply(reply))
}

/// `session:claim` — last-writer-wins cell claim, broadcast to the room.
async fn handle_claim(state: &AppState, req: &Frame) -> Result<Outcome, Frame> {
    let Some(session_id) = request_session_id(req) else {
        return Err(req.error("session_id required"));
    };
    let Some(player_id) = data_uuid(&req.data, "player_id") else {
        return Err(req.error("player_id required"));
    };
    let Some(index) = req
        .data
        .get("index")
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
    else {
        return Err(req.error("index required"));
    };

    let Some(handle) = session::get(state, session_id).await else {
        return Ok(Outcome::Silent);
    };

    let mut session = handle.lock().await;
    match session::claim(&mut session, index, player_id) {
        Ok(true) => Ok(Outcome::ReplyAndBroadcast {
            reply: session::snapshot_data(&session),
            session_id,
            syscall: "session:clicked",
            broadcast: session::snapshot_data(&session),
        }),
        // Finished session: the claim is ignored, the board untouched.
        Ok(false) => Ok(Outcome::Done),
        Err(e) => Err(req.error_from(&e)),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Session id from the frame field, falling back to the payload.
fn request_session_id(req: &Frame) -> Option<Uuid> {
    req.session_id.or_else(|| data_uuid(&req.data, "session_id"))
}

fn data_uuid(data: &Data, key: &str) -> Option<Uuid> {
    data.get(key).and_then(|v| v.as_str()).and_then(|s| s.parse().ok())
}

/// Reply payload: the public snapshot plus the caller's player record
/// (null when the presented identity is not on the roster).
fn session_and_player(session: &crate::state::Session, player: Option<&crate::state::Player>) -> Data {
    let mut data = session::snapshot_data(session);
    data.insert("player".into(), serde_json::to_value(player).unwrap_or_default());
    data
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == crate::frame::Status::Error {
        let code = frame.data.get("code").and_then(|v| v.as_str()).unwrap_or("-");
        let message = frame.data.get("message").and_then(|v| v.as_str()).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
