//! Pool control-loop tests: matchmaking, hand limits, chip conservation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use felt_server::bot::{ActionFrame, Bot};
use felt_server::config::GameConfig;
use felt_server::monitor::MonitorSet;
use felt_server::pool::BotPool;
use felt_shared::{BotRole, PokerAction, ServerMsg};

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

fn make_bot(name: &str) -> (Arc<Bot>, mpsc::Receiver<ServerMsg>) {
    Bot::new(
        felt_server::bot::bot_id_from_name(name),
        name,
        "lifecycle",
        BotRole::Player,
        10_000,
    )
}

/// Calling-station responder that records frames and stops once the game
/// completes.
fn spawn_player(bot: Arc<Bot>, mut rx: mpsc::Receiver<ServerMsg>) -> JoinHandle<Vec<ServerMsg>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(msg) = rx.recv().await {
            if let ServerMsg::ActionRequest { valid_actions, .. } = &msg {
                let action = if valid_actions.contains(&PokerAction::Check) {
                    PokerAction::Check
                } else if valid_actions.contains(&PokerAction::Call) {
                    PokerAction::Call
                } else {
                    PokerAction::Allin
                };
                bot.forward_action(ActionFrame { action, amount: 0 });
            }
            let done = matches!(msg, ServerMsg::GameCompleted { .. });
            seen.push(msg);
            if done {
                break;
            }
        }
        seen
    })
}

#[tokio::test]
async fn hand_limit_completes_the_game_exactly_once() {
    let pool = BotPool::new("lifecycle", fast_cfg(Some(2)), 99, Arc::new(MonitorSet::new()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut players = Vec::new();
    let mut bots = Vec::new();
    for name in ["a", "b", "c"] {
        let (bot, rx) = make_bot(name);
        pool.register(Arc::clone(&bot)).unwrap();
        players.push(spawn_player(Arc::clone(&bot), rx));
        bots.push(bot);
    }

    let pool_task = tokio::spawn(Arc::clone(&pool).run(shutdown_rx));

    // The pool's done channel fires when the limit is reached.
    let mut done = pool.done();
    tokio::time::timeout(Duration::from_secs(10), done.wait_for(|d| *d))
        .await
        .expect("pool should finish within the deadline")
        .unwrap();

    assert!(pool.is_completed());
    assert_eq!(pool.hands_completed(), 2);

    for player in players {
        let seen = tokio::time::timeout(Duration::from_secs(5), player)
            .await
            .expect("players observe game_completed")
            .unwrap();

        let completed: Vec<_> = seen
            .iter()
            .enumerate()
            .filter(|(_, m)| matches!(m, ServerMsg::GameCompleted { .. }))
            .collect();
        assert_eq!(completed.len(), 1, "exactly one game_completed per bot");
        let (completed_at, msg) = (completed[0].0, completed[0].1);
        match msg {
            ServerMsg::GameCompleted { reason, hand_limit, hands_completed } => {
                assert_eq!(reason, "hand_limit_reached");
                assert_eq!(*hand_limit, Some(2));
                assert_eq!(*hands_completed, 2);
            }
            _ => unreachable!(),
        }

        let hand_starts: Vec<usize> = seen
            .iter()
            .enumerate()
            .filter(|(_, m)| matches!(m, ServerMsg::HandStart { .. }))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(hand_starts.len(), 2, "both hands reach every bot");
        assert!(
            hand_starts.iter().all(|&i| i < completed_at),
            "no hand_start may follow game_completed"
        );
    }

    drop(shutdown_tx);
    let _ = pool_task.await;
}

#[tokio::test]
async fn bankrolls_are_conserved_across_hands() {
    let pool = BotPool::new("conserve", fast_cfg(Some(3)), 7, Arc::new(MonitorSet::new()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut players = Vec::new();
    let mut bots = Vec::new();
    for name in ["w", "x", "y", "z"] {
        let (bot, rx) = make_bot(name);
        pool.register(Arc::clone(&bot)).unwrap();
        players.push(spawn_player(Arc::clone(&bot), rx));
        bots.push(bot);
    }
    let total_before: u64 = bots.iter().map(|b| b.bankroll() as u64).sum();

    let pool_task = tokio::spawn(Arc::clone(&pool).run(shutdown_rx));
    let mut done = pool.done();
    tokio::time::timeout(Duration::from_secs(15), done.wait_for(|d| *d))
        .await
        .expect("pool should finish")
        .unwrap();

    let total_after: u64 = bots.iter().map(|b| b.bankroll() as u64).sum();
    assert_eq!(total_before, total_after, "rake is zero; chips only move");

    drop(shutdown_tx);
    let _ = pool_task.await;
    for p in players {
        p.abort();
    }
}

#[tokio::test]
async fn short_pool_sleeps_until_eligibility_changes() {
    let pool = BotPool::new("sleepy", fast_cfg(None), 3, Arc::new(MonitorSet::new()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pool_task = tokio::spawn(Arc::clone(&pool).run(shutdown_rx));

    // One bot below min_players: nothing must start.
    let (first, mut rx_first) = make_bot("only");
    pool.register(Arc::clone(&first)).unwrap();
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(pool.hands_completed(), 0);
    assert!(
        rx_first.try_recv().is_err(),
        "no frames are sent while waiting for players"
    );

    // Second bot arrives; hands begin.
    let (second, rx_second) = make_bot("second");
    pool.register(Arc::clone(&second)).unwrap();
    let p1 = spawn_player(Arc::clone(&first), rx_first);
    let p2 = spawn_player(Arc::clone(&second), rx_second);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while pool.hands_completed() == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(pool.hands_completed() > 0, "hands start once min_players is met");

    shutdown_tx.send(true).unwrap();
    let _ = pool_task.await;
    p1.abort();
    p2.abort();

    // Shutdown closed the sessions.
    assert!(first.is_closed());
    assert!(second.is_closed());
}

#[tokio::test]
async fn unregistered_bot_is_never_seated_again() {
    let pool = BotPool::new("leaver", fast_cfg(Some(1)), 21, Arc::new(MonitorSet::new()));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let (a, rx_a) = make_bot("stay-1");
    let (b, rx_b) = make_bot("stay-2");
    let (c, rx_c) = make_bot("gone");
    pool.register(Arc::clone(&a)).unwrap();
    pool.register(Arc::clone(&b)).unwrap();
    pool.register(Arc::clone(&c)).unwrap();
    // c leaves before the pool task ever runs.
    pool.unregister(&c.id);
    drop(rx_c);

    let p1 = spawn_player(Arc::clone(&a), rx_a);
    let p2 = spawn_player(Arc::clone(&b), rx_b);
    let pool_task = tokio::spawn(Arc::clone(&pool).run(shutdown_rx));

    let mut done = pool.done();
    tokio::time::timeout(Duration::from_secs(10), done.wait_for(|d| *d))
        .await
        .expect("pool should finish")
        .unwrap();

    let seen = p1.await.unwrap();
    for msg in &seen {
        if let ServerMsg::HandStart { players, .. } = msg {
            assert_eq!(players.len(), 2, "the unregistered bot must not be seated");
        }
    }
    let _ = p2.await;
    let _ = pool_task.await;
}
