//! WebSocket dispatcher: handshake, session construction and the per-bot
//! reader/writer pumps.
//!
//! Frames are binary; each carries one tagged JSON record. The first frame
//! of a session must be `connect` — anything else closes the socket without
//! a reply.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use felt_shared::{BotRole, ClientMsg, PokerAction, ServerMsg};

use crate::auth::{self, AuthDecision, MAX_TOKEN_LEN};
use crate::bot::{bot_id_from_name, ActionFrame, Bot};
use crate::pool::BotPool;

use super::AppState;

/// Wire protocol revision accepted by this server.
pub const PROTOCOL_VERSION: u32 = 1;

/// The `connect` frame must arrive within this window.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
/// Read deadline; reset by any inbound frame, pongs included.
const PONG_WAIT: Duration = Duration::from_secs(60);
/// Keepalive cadence, comfortably inside the pong window.
const PING_INTERVAL: Duration = Duration::from_secs(54);

/// Bankroll granted to a fresh session, in buy-ins.
const BANKROLL_BUY_INS: u32 = 100;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (bot, outbound, pool, socket) = match handshake(socket, &state).await {
        Ok(session) => session,
        Err(reason) => {
            tracing::debug!(%reason, "handshake rejected");
            return;
        }
    };

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(writer_pump(sink, outbound, Arc::clone(&bot)));
    reader_pump(stream, Arc::clone(&bot)).await;

    // Reader is gone: tear the session down. Close is idempotent, so a
    // server-initiated close that raced us is fine.
    bot.close();
    pool.unregister(&bot.id);
    let _ = writer.await;
    tracing::info!(bot = %bot.id, name = %bot.name, "session ended");
}

type Session = (Arc<Bot>, mpsc::Receiver<ServerMsg>, Arc<BotPool>, WebSocket);

/// Read and validate the `connect` frame, then build and register the Bot.
async fn handshake(mut socket: WebSocket, state: &AppState) -> Result<Session, String> {
    let first = tokio::time::timeout(HANDSHAKE_TIMEOUT, socket.recv())
        .await
        .map_err(|_| "no connect frame before deadline".to_owned())?;
    let Some(Ok(Message::Binary(bytes))) = first else {
        return Err("first frame not binary".to_owned());
    };
    let msg: ClientMsg =
        serde_json::from_slice(&bytes).map_err(|e| format!("malformed connect frame: {e}"))?;
    let ClientMsg::Connect { name, game, role, protocol_version, auth_token } = msg else {
        return Err("first frame must be connect".to_owned());
    };

    if let Some(version) = protocol_version {
        if version != PROTOCOL_VERSION {
            tracing::warn!(version, "client speaks a different protocol revision");
        }
    }
    if let Some(token) = &auth_token {
        if token.len() > MAX_TOKEN_LEN {
            return Err("oversized auth token".to_owned());
        }
    }

    let identity = match auth_token {
        Some(token) => {
            let validator = state.manager.auth();
            let decision = auth::check_token(
                validator.as_deref(),
                &token,
                state.manager.auth_fail_open(),
            )
            .await;
            match decision {
                AuthDecision::Allow(identity) => identity,
                AuthDecision::Deny => return Err("auth denied".to_owned()),
            }
        }
        None => Default::default(),
    };

    let pool = state
        .manager
        .route(game.as_deref())
        .ok_or_else(|| format!("no such game '{}'", game.as_deref().unwrap_or("<default>")))?;

    let id = if name.is_empty() {
        pool.with_rng(|rng| format!("{:08x}", rand::Rng::random::<u32>(rng)))
    } else {
        bot_id_from_name(&name)
    };
    let display_name = if name.is_empty() { id.clone() } else { name };

    let bankroll = pool.cfg.start_chips.saturating_mul(BANKROLL_BUY_INS);
    let (bot, outbound) = Bot::with_identity(
        id,
        display_name,
        pool.game_id.clone(),
        role.unwrap_or(BotRole::Player),
        bankroll,
        identity.owner_id,
        identity.bot_id,
    );
    pool.register(Arc::clone(&bot)).map_err(|e| e.to_string())?;
    tracing::info!(bot = %bot.id, name = %bot.name, game = %bot.game, "session connected");
    Ok((bot, outbound, pool, socket))
}

/// Drain the outbound queue onto the socket, frame keepalive pings, and
/// push a close frame once the session is done.
async fn writer_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerMsg>,
    bot: Arc<Bot>,
) {
    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ping.tick().await; // immediate first tick carries no information
    let mut done = bot.done();
    if *done.borrow() {
        let _ = sink.send(Message::Close(None)).await;
        return;
    }

    loop {
        tokio::select! {
            msg = outbound.recv() => {
                let Some(msg) = msg else { break };
                match serde_json::to_vec(&msg) {
                    Ok(bytes) => {
                        if sink.send(Message::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode server frame");
                    }
                }
            }
            _ = ping.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            _ = done.changed() => {
                if *done.borrow() {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }
}

/// Decode inbound frames under the read deadline and forward action frames
/// to whatever mailbox the runner has installed.
async fn reader_pump(mut stream: SplitStream<WebSocket>, bot: Arc<Bot>) {
    loop {
        let frame = match tokio::time::timeout(PONG_WAIT, stream.next()).await {
            Err(_) => {
                tracing::debug!(bot = %bot.id, "read deadline expired");
                break;
            }
            Ok(None) | Ok(Some(Err(_))) => break,
            Ok(Some(Ok(frame))) => frame,
        };
        match frame {
            Message::Binary(bytes) => match serde_json::from_slice::<ClientMsg>(&bytes) {
                Ok(ClientMsg::Action { action, amount }) => {
                    handle_action_frame(&bot, action, amount);
                }
                Ok(ClientMsg::Connect { .. }) => {
                    tracing::debug!(bot = %bot.id, "duplicate connect frame dropped");
                }
                Err(e) => {
                    tracing::debug!(bot = %bot.id, error = %e, "malformed frame, closing");
                    break;
                }
            },
            Message::Close(_) => break,
            // Pings are answered by the protocol layer; both they and pongs
            // only matter here for resetting the read deadline.
            Message::Ping(_) | Message::Pong(_) | Message::Text(_) => {}
        }
    }
}

/// Sit-out/sit-in toggle the session flag; decision verbs go to the
/// runner's mailbox and are dropped when no request is outstanding.
fn handle_action_frame(bot: &Arc<Bot>, action: PokerAction, amount: u32) {
    match action {
        PokerAction::SitIn => {
            bot.set_sitting_out(false);
            return;
        }
        PokerAction::SitOut => {
            bot.set_sitting_out(true);
            // Fall through: an outstanding request treats it as a fold.
        }
        _ => {}
    }
    if !bot.forward_action(ActionFrame { action, amount }) {
        tracing::trace!(bot = %bot.id, action = %action, "action frame with no listener dropped");
    }
}
