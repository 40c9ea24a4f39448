#![allow(non_snake_case)]

mod support;

use mxi_arena::{
    ArenaConfig,
    Direction,
    TickEvent,
};
use mxi_client::session::{
    ArenaCommand,
    ArenaRunner,
};
use mxi_gateway::GatewayClient;
use std::{
    sync::{
        Arc,
        atomic::Ordering,
    },
    time::Duration,
};
use support::{
    BackendState,
    StubBackend,
};
use tokio::sync::mpsc;

#[tokio::test]
async fn arena_session__plays_out_and_reconciles_the_result() {
    // given a two-player session worth 10 MXI
    let state = Arc::new(BackendState::default());
    *state.roster.lock().unwrap() = vec!["u-1".to_string(), "u-2".to_string()];
    *state.session_status.lock().unwrap() = Some("in_progress".to_string());
    *state.prize_amount.lock().unwrap() = 10.0;
    let backend = StubBackend::start(state.clone());
    let gateway = GatewayClient::new(&backend.base_url).unwrap();

    let config = ArenaConfig {
        duration_ticks: 3,
        ..ArenaConfig::default()
    };
    let (runner, mut ticks) = ArenaRunner::initialize(gateway, "s-1", "u-1", config)
        .await
        .unwrap();
    let runner = runner.with_tick_interval(Duration::from_millis(10));

    // when the local player acts and the short match plays out
    let (commands, command_receiver) = mpsc::channel(8);
    commands.send(ArenaCommand::Move(Direction::Up)).await.unwrap();
    commands.send(ArenaCommand::PlaceBomb).await.unwrap();
    let (outcome, report) = runner.run(command_receiver).await.unwrap();

    // then the match ended and was flushed to the backend
    let mut saw_end = false;
    while let Ok(event) = ticks.try_recv() {
        if event == TickEvent::Ended {
            saw_end = true;
        }
    }
    assert!(saw_end);
    assert_eq!(outcome.standings.len(), 2);
    assert!(report.session_completed);
    assert_eq!(report.results_written, 2);
    assert_eq!(report.prize_credited, Some(10.0));
    assert_eq!(state.completion_writes.load(Ordering::SeqCst), 1);

    let credits = state.prize_credits.lock().unwrap();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0], (outcome.winner_id.clone(), 10.0));

    let mut written = state.participant_writes.lock().unwrap().clone();
    written.sort();
    assert_eq!(written, vec!["u-1".to_string(), "u-2".to_string()]);
}

#[tokio::test]
async fn arena_session__empty_roster_refuses_to_start() {
    // given a session with no participants
    let state = Arc::new(BackendState::default());
    *state.session_status.lock().unwrap() = Some("in_progress".to_string());
    let backend = StubBackend::start(state);
    let gateway = GatewayClient::new(&backend.base_url).unwrap();

    // when
    let result =
        ArenaRunner::initialize(gateway, "s-1", "u-1", ArenaConfig::default()).await;

    // then
    assert!(
        result
            .err()
            .map(|error| error.to_string())
            .unwrap_or_default()
            .contains("no participants")
    );
}
