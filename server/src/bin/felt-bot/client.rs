use anyhow::{Context, Result};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use felt_server::npc::{strategy_by_name, DecisionContext, Strategy};
use felt_shared::{BotRole, ClientMsg, ServerMsg};

use crate::args::{HistoryArgs, PlayArgs, StatsArgs};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

async fn send_frame(sink: &mut WsSink, msg: &ClientMsg) -> Result<()> {
    let bytes = serde_json::to_vec(msg).context("encoding client frame")?;
    sink.send(Message::Binary(bytes))
        .await
        .context("sending client frame")?;
    Ok(())
}

/// Connect, handshake and play until the game completes (or the optional
/// hand budget runs out).
pub async fn play(args: PlayArgs) -> Result<()> {
    let url = Url::parse(&args.url).context("parsing websocket url")?;
    let mut strategy = strategy_by_name(&args.strategy, args.seed)
        .with_context(|| format!("unknown strategy '{}'", args.strategy))?;

    let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .with_context(|| format!("connecting to {}", url))?;
    let (mut sink, mut stream) = ws.split();

    send_frame(
        &mut sink,
        &ClientMsg::Connect {
            name: args.name.clone(),
            game: args.game.clone(),
            role: Some(BotRole::Npc),
            protocol_version: Some(felt_server::server::ws::PROTOCOL_VERSION),
            auth_token: args.token.clone(),
        },
    )
    .await?;
    tracing::info!(name = %args.name, strategy = %strategy.name(), "connected");

    let mut my_seat: Option<usize> = None;
    let mut my_stack: Option<u32> = None;
    let mut big_blind: Option<u32> = None;
    let mut hands_done = 0u64;

    while let Some(frame) = stream.next().await {
        let frame = frame.context("reading server frame")?;
        let bytes = match frame {
            Message::Binary(bytes) => bytes,
            Message::Close(_) => break,
            // Pings are answered by the protocol layer.
            _ => continue,
        };
        let msg: ServerMsg = match serde_json::from_slice(&bytes) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable server frame");
                continue;
            }
        };

        match msg {
            ServerMsg::HandStart { hand_id, your_seat, big_blind: bb, .. } => {
                tracing::info!(hand = %hand_id, seat = your_seat, "hand started");
                my_seat = Some(your_seat);
                big_blind = Some(bb);
            }
            ServerMsg::GameUpdate { players, .. } => {
                if let Some(seat) = my_seat {
                    my_stack = players.iter().find(|p| p.seat == seat).map(|p| p.chips);
                }
            }
            ServerMsg::ActionRequest {
                pot,
                to_call,
                min_bet,
                min_raise,
                valid_actions,
                ..
            } => {
                let ctx = DecisionContext {
                    pot,
                    to_call,
                    min_bet,
                    min_raise,
                    valid_actions,
                    stack: my_stack,
                    big_blind,
                };
                let (action, amount) = strategy.decide(&ctx);
                tracing::debug!(action = %action, amount, to_call, "deciding");
                send_frame(&mut sink, &ClientMsg::Action { action, amount }).await?;
            }
            ServerMsg::HandResult { hand_id, winners, pot_size, .. } => {
                hands_done += 1;
                let mine: i64 = winners
                    .iter()
                    .filter(|w| Some(w.seat) == my_seat)
                    .map(|w| w.amount as i64)
                    .sum();
                tracing::info!(hand = %hand_id, pot = pot_size, won = mine, "hand complete");
                if args.hands.is_some_and(|limit| hands_done >= limit) {
                    tracing::info!(hands = hands_done, "hand budget reached, leaving");
                    break;
                }
            }
            ServerMsg::GameCompleted { reason, hands_completed, .. } => {
                tracing::info!(%reason, hands_completed, "game completed");
                break;
            }
            ServerMsg::Error { code, message } => {
                tracing::warn!(%code, %message, "server complaint");
            }
            ServerMsg::StreetChange { .. } | ServerMsg::PlayerAction { .. } => {}
        }
    }

    let _ = sink.send(Message::Close(None)).await;
    Ok(())
}

/// Fetch `/stats` from the admin surface and print it.
pub async fn stats(args: StatsArgs) -> Result<()> {
    let base = args.url.trim_end_matches('/');
    let body: serde_json::Value = reqwest::get(format!("{}/stats", base))
        .await
        .with_context(|| format!("requesting {}/stats", base))?
        .json()
        .await
        .context("decoding stats body")?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Summarize a hand-history file written by the server.
pub fn history(args: &HistoryArgs) -> Result<()> {
    let records = felt_server::monitor::read_history(&args.input)
        .with_context(|| format!("reading history '{}'", args.input.display()))?;
    let summary = felt_server::monitor::HistorySummary::from_records(&records);

    println!("hands:      {}", summary.hands);
    println!("showdowns:  {}", summary.showdowns);
    println!("total pot:  {}", summary.total_pot);
    println!("biggest:    {}", summary.biggest_pot);
    if !summary.wins_by_name.is_empty() {
        println!("wins:");
        for (name, wins) in &summary.wins_by_name {
            println!("  {:<20} {}", name, wins);
        }
    }
    Ok(())
}
