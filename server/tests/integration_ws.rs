//! Full-stack tests over a real WebSocket: handshake, hand play, auth and
//! the admin HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use felt_server::auth::{AuthIdentity, StaticTokenValidator};
use felt_server::config::GameConfig;
use felt_server::manager::GameManager;
use felt_server::monitor::MonitorSet;
use felt_server::server::{build_router, AppState};
use felt_shared::{BotRole, ClientMsg, PokerAction, ServerMsg};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn fast_cfg(hand_limit: Option<u64>) -> GameConfig {
    GameConfig {
        small_blind: 5,
        big_blind: 10,
        start_chips: 1000,
        timeout: Duration::from_millis(500),
        min_players: 2,
        max_players: 6,
        seed: None,
        hand_limit,
    }
}

async fn start_server(manager: Arc<GameManager>) -> SocketAddr {
    let app = build_router(AppState { manager });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("test server error: {e}");
        }
    });
    addr
}

async fn ws_connect(addr: SocketAddr) -> Ws {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws
}

async fn send_client_msg(ws: &mut Ws, msg: &ClientMsg) {
    let bytes = serde_json::to_vec(msg).unwrap();
    ws.send(Message::Binary(bytes)).await.unwrap();
}

async fn handshake(addr: SocketAddr, name: &str, token: Option<&str>) -> Ws {
    let mut ws = ws_connect(addr).await;
    send_client_msg(
        &mut ws,
        &ClientMsg::Connect {
            name: name.to_owned(),
            game: None,
            role: Some(BotRole::Player),
            protocol_version: Some(1),
            auth_token: token.map(str::to_owned),
        },
    )
    .await;
    ws
}

/// Read server frames until `stop` matches, answering action requests like
/// a calling station along the way.
async fn drive_until(ws: &mut Ws, stop: impl Fn(&ServerMsg) -> bool) -> Vec<ServerMsg> {
    let mut seen = Vec::new();
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(10), ws.next())
            .await
            .expect("server frame within deadline");
        let Some(Ok(frame)) = frame else {
            panic!("connection ended while driving: saw {} frames", seen.len());
        };
        let Message::Binary(bytes) = frame else { continue };
        let msg: ServerMsg = serde_json::from_slice(&bytes).unwrap();
        if let ServerMsg::ActionRequest { valid_actions, .. } = &msg {
            let action = if valid_actions.contains(&PokerAction::Check) {
                PokerAction::Check
            } else if valid_actions.contains(&PokerAction::Call) {
                PokerAction::Call
            } else {
                PokerAction::Allin
            };
            send_client_msg(ws, &ClientMsg::Action { action, amount: 0 }).await;
        }
        let matched = stop(&msg);
        seen.push(msg);
        if matched {
            return seen;
        }
    }
}

#[tokio::test]
async fn two_bots_play_a_hand_end_to_end() {
    let manager = GameManager::new(5, MonitorSet::new(), None, false);
    manager.create_game("main", fast_cfg(None)).unwrap();
    let addr = start_server(Arc::clone(&manager)).await;

    let mut ws1 = handshake(addr, "itg-one", None).await;
    let mut ws2 = handshake(addr, "itg-two", None).await;

    let (seen1, seen2) = tokio::join!(
        drive_until(&mut ws1, |m| matches!(m, ServerMsg::HandResult { .. })),
        drive_until(&mut ws2, |m| matches!(m, ServerMsg::HandResult { .. })),
    );

    for seen in [&seen1, &seen2] {
        assert!(matches!(seen.first(), Some(ServerMsg::HandStart { .. })));
        let results = seen.iter().filter(|m| matches!(m, ServerMsg::HandResult { .. })).count();
        assert_eq!(results, 1);
        if let Some(ServerMsg::HandResult { winners, final_board, .. }) = seen.last() {
            assert!(!winners.is_empty());
            assert_eq!(final_board.len(), 5, "calling stations always see a full board");
        }
    }

    // Seats are per-hand; the two observers agree on the same hand id.
    let hand_id = |msgs: &[ServerMsg]| -> String {
        msgs.iter()
            .find_map(|m| match m {
                ServerMsg::HandStart { hand_id, .. } => Some(hand_id.clone()),
                _ => None,
            })
            .unwrap()
    };
    assert_eq!(hand_id(&seen1), hand_id(&seen2));
}

#[tokio::test]
async fn hand_limit_game_completes_over_the_wire() {
    let manager = GameManager::new(6, MonitorSet::new(), None, false);
    manager.create_game("main", fast_cfg(Some(2))).unwrap();
    let addr = start_server(Arc::clone(&manager)).await;

    let mut ws1 = handshake(addr, "lim-one", None).await;
    let mut ws2 = handshake(addr, "lim-two", None).await;

    let (seen1, seen2) = tokio::join!(
        drive_until(&mut ws1, |m| matches!(m, ServerMsg::GameCompleted { .. })),
        drive_until(&mut ws2, |m| matches!(m, ServerMsg::GameCompleted { .. })),
    );

    for seen in [&seen1, &seen2] {
        match seen.last() {
            Some(ServerMsg::GameCompleted { reason, hand_limit, hands_completed }) => {
                assert_eq!(reason, "hand_limit_reached");
                assert_eq!(*hand_limit, Some(2));
                assert_eq!(*hands_completed, 2);
            }
            other => panic!("expected game_completed, got {other:?}"),
        }
        let starts = seen.iter().filter(|m| matches!(m, ServerMsg::HandStart { .. })).count();
        assert_eq!(starts, 2);
    }
}

#[tokio::test]
async fn non_binary_first_frame_closes_the_session() {
    let manager = GameManager::new(7, MonitorSet::new(), None, false);
    manager.create_game("main", fast_cfg(None)).unwrap();
    let addr = start_server(manager).await;

    let mut ws = ws_connect(addr).await;
    ws.send(Message::Text("{\"type\":\"connect\",\"name\":\"texty\"}".into()))
        .await
        .unwrap();

    let end = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(end.is_ok(), "server must close a session whose first frame is not binary");
}

#[tokio::test]
async fn action_before_connect_closes_the_session() {
    let manager = GameManager::new(8, MonitorSet::new(), None, false);
    manager.create_game("main", fast_cfg(None)).unwrap();
    let addr = start_server(manager).await;

    let mut ws = ws_connect(addr).await;
    send_client_msg(&mut ws, &ClientMsg::Action { action: PokerAction::Fold, amount: 0 }).await;

    let end = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(end.is_ok(), "first frame must be connect");
}

#[tokio::test]
async fn auth_token_gates_the_handshake() {
    let mut validator = StaticTokenValidator::new();
    validator.insert(
        "good-token",
        AuthIdentity { bot_id: Some("b-1".into()), owner_id: Some("team".into()) },
    );
    let manager = GameManager::new(9, MonitorSet::new(), Some(Arc::new(validator)), false);
    manager.create_game("main", fast_cfg(None)).unwrap();
    let addr = start_server(Arc::clone(&manager)).await;

    // Bad token: closed without a reply.
    let mut rejected = handshake(addr, "bad-auth", Some("wrong")).await;
    let end = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rejected.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(end.is_ok(), "invalid token must close the session");

    // Good token: the session registers with the pool.
    let _accepted = handshake(addr, "good-auth", Some("good-token")).await;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let registered = manager
            .get("main")
            .map(|p| p.bot_count() > 0)
            .unwrap_or(false);
        if registered {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "authorized bot never registered");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn admin_surface_creates_and_deletes_games() {
    let manager = GameManager::new(10, MonitorSet::new(), None, false);
    manager.create_game("main", fast_cfg(None)).unwrap();
    let addr = start_server(Arc::clone(&manager)).await;
    let base = format!("http://{}", addr);
    let http = reqwest::Client::new();

    let health: serde_json::Value =
        http.get(format!("{base}/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["ok"], true);

    let created = http
        .post(format!("{base}/admin/games"))
        .json(&serde_json::json!({
            "id": "turbo",
            "small_blind": 25,
            "big_blind": 50,
            "start_chips": 5000,
            "timeout_ms": 250,
            "min_players": 2,
            "max_players": 4,
            "hands": 10,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), reqwest::StatusCode::CREATED);
    assert!(manager.get("turbo").is_some());

    // Duplicate id conflicts.
    let dup = http
        .post(format!("{base}/admin/games"))
        .json(&serde_json::json!({
            "id": "turbo",
            "small_blind": 25,
            "big_blind": 50,
            "start_chips": 5000,
            "timeout_ms": 250,
            "min_players": 2,
            "max_players": 4,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status(), reqwest::StatusCode::CONFLICT);

    // Bad body rejected.
    let bad = http
        .post(format!("{base}/admin/games"))
        .json(&serde_json::json!({
            "id": "broken",
            "small_blind": 50,
            "big_blind": 25,
            "start_chips": 5000,
            "timeout_ms": 250,
            "min_players": 2,
            "max_players": 4,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), reqwest::StatusCode::BAD_REQUEST);

    let games: serde_json::Value =
        http.get(format!("{base}/games")).send().await.unwrap().json().await.unwrap();
    let ids: Vec<&str> = games
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["game_id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"main") && ids.contains(&"turbo"));

    let stats: serde_json::Value = http
        .get(format!("{base}/admin/games/turbo/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["hand_limit"], 10);

    let deleted = http
        .delete(format!("{base}/admin/games/turbo"))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), reqwest::StatusCode::NO_CONTENT);
    assert!(manager.get("turbo").is_none());

    let missing = http
        .get(format!("{base}/admin/games/turbo/stats"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn timeout_over_the_wire_folds_the_silent_bot() {
    // One hand only, so the silent bot times out exactly once.
    let manager = GameManager::new(11, MonitorSet::new(), None, false);
    manager.create_game("main", fast_cfg(Some(1))).unwrap();
    let addr = start_server(Arc::clone(&manager)).await;

    let mut active = handshake(addr, "active", None).await;
    // The silent bot connects but never answers action requests.
    let mut silent = handshake(addr, "silent", None).await;

    let seen = drive_until(&mut active, |m| matches!(m, ServerMsg::HandResult { .. })).await;
    let result = seen.last().unwrap();
    if let ServerMsg::HandResult { winners, .. } = result {
        assert_eq!(winners.len(), 1, "the responsive bot scoops");
    }

    // The silent bot's timeout shows up in the pool stats.
    let pool = manager.get("main").unwrap();
    let stats = pool.stats();
    let silent_stats = stats.bots.iter().find(|b| b.name == "silent").unwrap();
    assert_eq!(silent_stats.timeouts, 1);
    let _ = silent.close(None).await;
}
