#![allow(non_snake_case)]

mod support;

use mxi_arena::{
    MatchOutcome,
    PlayerStanding,
};
use mxi_client::reconcile::Reconciler;
use mxi_gateway::GatewayClient;
use std::sync::{
    Arc,
    atomic::Ordering,
};
use support::{
    BackendState,
    StubBackend,
};

fn finished_match() -> MatchOutcome {
    MatchOutcome {
        winner_id: "u-1".to_string(),
        standings: vec![
            PlayerStanding {
                player_id: "u-1".to_string(),
                alive: true,
                blocks_destroyed: 5,
                damage_dealt: 50,
                distance_from_center: 12.0,
                rank: 1,
            },
            PlayerStanding {
                player_id: "u-2".to_string(),
                alive: false,
                blocks_destroyed: 2,
                damage_dealt: 20,
                distance_from_center: 80.5,
                rank: 2,
            },
        ],
    }
}

#[tokio::test]
async fn reconcile__completes_writes_results_and_credits_the_prize_once() {
    // given an active session with a prize
    let state = Arc::new(BackendState::default());
    *state.session_status.lock().unwrap() = Some("in_progress".to_string());
    *state.prize_amount.lock().unwrap() = 40.0;
    let backend = StubBackend::start(state.clone());
    let gateway = GatewayClient::new(&backend.base_url).unwrap();
    let reconciler = Reconciler::new(gateway);

    // when
    let report = reconciler.reconcile("s-1", &finished_match()).await.unwrap();

    // then
    assert!(report.session_completed);
    assert!(!report.already_completed);
    assert_eq!(report.results_written, 2);
    assert_eq!(report.prize_credited, Some(40.0));
    assert!(report.is_clean());
    assert_eq!(
        *state.prize_credits.lock().unwrap(),
        vec![("u-1".to_string(), 40.0)]
    );

    // when the pass runs again over the now-completed session
    let second = reconciler.reconcile("s-1", &finished_match()).await.unwrap();

    // then nothing moves twice: results are re-written (absolute values),
    // completion and prize are skipped
    assert!(second.already_completed);
    assert!(!second.session_completed);
    assert_eq!(second.prize_credited, None);
    assert_eq!(second.results_written, 2);
    assert_eq!(state.completion_writes.load(Ordering::SeqCst), 1);
    assert_eq!(state.prize_credits.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn reconcile__a_failed_completion_write_withholds_the_prize() {
    // given a backend that rejects the completion write
    let state = Arc::new(BackendState::default());
    *state.session_status.lock().unwrap() = Some("in_progress".to_string());
    *state.prize_amount.lock().unwrap() = 25.0;
    state.fail_completion.store(true, Ordering::SeqCst);
    let backend = StubBackend::start(state.clone());
    let gateway = GatewayClient::new(&backend.base_url).unwrap();

    // when
    let report = Reconciler::new(gateway)
        .reconcile("s-1", &finished_match())
        .await
        .unwrap();

    // then the failure is reported and no prize moved
    assert!(!report.session_completed);
    assert_eq!(report.prize_credited, None);
    assert!(!report.is_clean());
    assert!(report.failures[0].starts_with("complete session"));
    // per-player rows were still written
    assert_eq!(report.results_written, 2);
    assert!(state.prize_credits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn reconcile__zero_prize_sessions_skip_the_credit_rpc() {
    // given
    let state = Arc::new(BackendState::default());
    *state.session_status.lock().unwrap() = Some("in_progress".to_string());
    let backend = StubBackend::start(state.clone());
    let gateway = GatewayClient::new(&backend.base_url).unwrap();

    // when
    let report = Reconciler::new(gateway)
        .reconcile("s-1", &finished_match())
        .await
        .unwrap();

    // then
    assert!(report.session_completed);
    assert_eq!(report.prize_credited, None);
    assert!(state.prize_credits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn reconcile__unknown_session_is_a_hard_error() {
    // given no session row
    let state = Arc::new(BackendState::default());
    let backend = StubBackend::start(state);
    let gateway = GatewayClient::new(&backend.base_url).unwrap();

    // when
    let result = Reconciler::new(gateway).reconcile("s-404", &finished_match()).await;

    // then
    assert!(result.unwrap_err().to_string().contains("not found"));
}
