use crate::reconcile::{
    ReconcileReport,
    Reconciler,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use mxi_arena::{
    ArenaConfig,
    ArenaState,
    Direction,
    MatchOutcome,
    Phase,
    TickEvent,
};
use mxi_gateway::GatewayClient;
use std::time::Duration;
use tokio::{
    sync::mpsc,
    time,
};
use tracing::info;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Input for the local player, accepted at any point while the match
/// runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArenaCommand {
    Move(Direction),
    PlaceBomb,
}

/// Drives one arena session: seeds the engine from the remote roster,
/// advances it once per tick, forwards events, and reconciles the final
/// standings when the match ends.
pub struct ArenaRunner {
    gateway: GatewayClient,
    session_id: String,
    local_player_id: String,
    state: ArenaState,
    tick_interval: Duration,
    events: mpsc::Sender<TickEvent>,
}

impl ArenaRunner {
    pub async fn initialize(
        gateway: GatewayClient,
        session_id: impl Into<String>,
        local_player_id: impl Into<String>,
        config: ArenaConfig,
    ) -> Result<(Self, mpsc::Receiver<TickEvent>)> {
        let session_id = session_id.into();
        let roster = gateway.participants(&session_id).await?;
        if roster.is_empty() {
            return Err(eyre!("session {session_id} has no participants"));
        }
        let player_ids: Vec<String> = roster
            .into_iter()
            .map(|participant| participant.user_id)
            .collect();

        let mut state = ArenaState::new(config);
        state.start(&player_ids, &mut rand::rng());
        info!(
            %session_id,
            players = player_ids.len(),
            "arena session initialized"
        );

        let (events, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let runner = Self {
            gateway,
            session_id,
            local_player_id: local_player_id.into(),
            state,
            tick_interval: TICK_INTERVAL,
            events,
        };
        Ok((runner, receiver))
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn state(&self) -> &ArenaState {
        &self.state
    }

    /// Runs the match to completion, then flushes the outcome to the
    /// backend. Commands arriving between ticks apply immediately;
    /// closing the command channel just leaves the match to play out.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<ArenaCommand>,
    ) -> Result<(MatchOutcome, ReconcileReport)> {
        let mut ticker = time::interval(self.tick_interval);
        // the first tick of a fresh interval completes at once
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for event in self.state.step() {
                        let _ = self.events.send(event).await;
                    }
                    if self.state.phase() == Phase::Ended {
                        break;
                    }
                }
                Some(command) = commands.recv() => match command {
                    ArenaCommand::Move(direction) => {
                        self.state.move_player(&self.local_player_id, direction);
                    }
                    ArenaCommand::PlaceBomb => {
                        self.state.place_bomb(&self.local_player_id);
                    }
                },
            }
        }

        let outcome = self
            .state
            .outcome()
            .ok_or_else(|| eyre!("match ended without an outcome"))?;
        info!(
            session_id = %self.session_id,
            winner = %outcome.winner_id,
            "match finished, reconciling"
        );
        let report = Reconciler::new(self.gateway.clone())
            .reconcile(&self.session_id, &outcome)
            .await?;
        Ok((outcome, report))
    }
}
