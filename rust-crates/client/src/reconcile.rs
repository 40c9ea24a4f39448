use chrono::Utc;
use color_eyre::eyre::{
    Result,
    eyre,
};
use mxi_arena::MatchOutcome;
use mxi_gateway::GatewayClient;
use tracing::{
    debug,
    error,
    info,
};

/// What one reconciliation pass actually did. Nothing is fire-and-forget:
/// every write that failed is named here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconcileReport {
    pub session_id: String,
    /// The session was completed before this pass ran; completion and
    /// prize credit were skipped.
    pub already_completed: bool,
    pub session_completed: bool,
    pub results_written: usize,
    pub prize_credited: Option<f64>,
    pub failures: Vec<String>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Flushes a finished match to the backend in one explicit pass: session
/// completion, per-player results, then the winner's prize credit. The
/// pass is safe to re-run — a session found already completed never
/// re-credits the prize, and result rows carry absolute values.
pub struct Reconciler {
    gateway: GatewayClient,
}

impl Reconciler {
    pub fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }

    pub async fn reconcile(
        &self,
        session_id: &str,
        outcome: &MatchOutcome,
    ) -> Result<ReconcileReport> {
        let session = self
            .gateway
            .game_session(session_id)
            .await?
            .ok_or_else(|| eyre!("game session {session_id} not found"))?;

        let mut report = ReconcileReport {
            session_id: session_id.to_string(),
            already_completed: session.is_completed(),
            ..ReconcileReport::default()
        };

        if report.already_completed {
            debug!(%session_id, "session already completed, skipping completion and prize");
        } else {
            match self
                .gateway
                .complete_session(session_id, &outcome.winner_id, Utc::now())
                .await
            {
                Ok(()) => report.session_completed = true,
                Err(error) => {
                    error!(%session_id, %error, "session completion write failed");
                    report.failures.push(format!("complete session: {error}"));
                }
            }
        }

        for standing in &outcome.standings {
            let written = self
                .gateway
                .record_participant_result(
                    session_id,
                    &standing.player_id,
                    standing.blocks_destroyed,
                    f64::from(standing.distance_from_center),
                    standing.rank,
                )
                .await;
            match written {
                Ok(()) => report.results_written += 1,
                Err(error) => {
                    error!(
                        %session_id,
                        player = %standing.player_id,
                        %error,
                        "participant result write failed"
                    );
                    report
                        .failures
                        .push(format!("participant {}: {error}", standing.player_id));
                }
            }
        }

        // The prize moves at most once: only when this pass completed the
        // session itself.
        if report.session_completed && session.prize_amount > 0.0 {
            match self
                .gateway
                .credit_challenge_reward(&outcome.winner_id, session.prize_amount)
                .await
            {
                Ok(()) => {
                    info!(
                        %session_id,
                        winner = %outcome.winner_id,
                        amount = session.prize_amount,
                        "prize credited"
                    );
                    report.prize_credited = Some(session.prize_amount);
                }
                Err(error) => {
                    error!(%session_id, %error, "prize credit failed");
                    report.failures.push(format!("prize credit: {error}"));
                }
            }
        }

        Ok(report)
    }
}
