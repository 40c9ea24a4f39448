use crate::vesting::VestingSchedule;
use chrono::{
    DateTime,
    Utc,
};
use color_eyre::eyre::Result;
use mxi_gateway::{
    GatewayClient,
    types::{
        BalanceSnapshot,
        UserProfile,
    },
};
use std::time::Duration;
use tokio::{
    sync::watch,
    time,
};
use tracing::warn;

/// New transactions land on the next refresh rather than in real time.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// The current balance split by source, with the vesting share taken
/// from the live estimate rather than the last snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BalanceBreakdown {
    pub purchased: f64,
    pub commissions: f64,
    pub tournaments: f64,
    pub vesting: f64,
}

impl BalanceBreakdown {
    pub fn from_profile(profile: &UserProfile, current_vesting: f64) -> Self {
        Self {
            purchased: profile.mxi_purchased_directly,
            commissions: profile.mxi_from_unified_commissions,
            tournaments: profile.mxi_from_challenges,
            vesting: current_vesting,
        }
    }

    pub fn total(&self) -> f64 {
        self.purchased + self.commissions + self.tournaments + self.vesting
    }

    /// A source's share of the total, in percent; zero when there is no
    /// balance at all.
    pub fn share_percent(&self, part: f64) -> f64 {
        let total = self.total();
        if total > 0.0 { part / total * 100.0 } else { 0.0 }
    }
}

/// Synthetic starting point used when the history table has no rows yet.
pub fn initial_snapshot(
    profile: &UserProfile,
    current_vesting: f64,
    now: DateTime<Utc>,
) -> BalanceSnapshot {
    let breakdown = BalanceBreakdown::from_profile(profile, current_vesting);
    BalanceSnapshot {
        timestamp: now,
        mxi_purchased: breakdown.purchased,
        mxi_commissions: breakdown.commissions,
        mxi_challenges: breakdown.tournaments,
        mxi_vesting: breakdown.vesting,
        total_balance: breakdown.total(),
        transaction_type: None,
        transaction_amount: None,
    }
}

/// Periodically reloads the authoritative balance history and publishes
/// it on a watch channel. Runs alongside the one-second vesting ticker;
/// the two touch disjoint state.
pub struct BalanceFeed {
    gateway: GatewayClient,
    user_id: String,
    refresh_interval: Duration,
}

impl BalanceFeed {
    pub fn new(gateway: GatewayClient, user_id: impl Into<String>) -> Self {
        Self {
            gateway,
            user_id: user_id.into(),
            refresh_interval: REFRESH_INTERVAL,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub async fn load(&self) -> Result<Vec<BalanceSnapshot>> {
        self.gateway.balance_history(&self.user_id).await
    }

    /// Refreshes immediately and then on the interval. A failed or empty
    /// load falls back to a synthetic point built from the profile, so
    /// subscribers always have something to draw.
    pub async fn run(
        &self,
        profile: UserProfile,
        schedule: VestingSchedule,
        sender: watch::Sender<Vec<BalanceSnapshot>>,
    ) {
        let mut ticker = time::interval(self.refresh_interval);
        loop {
            ticker.tick().await;
            let history = match self.load().await {
                Ok(history) if history.is_empty() => {
                    let now = Utc::now();
                    vec![initial_snapshot(&profile, schedule.estimate_at(now), now)]
                }
                Ok(history) => history,
                Err(error) => {
                    warn!(user_id = %self.user_id, %error, "balance history load failed");
                    let now = Utc::now();
                    vec![initial_snapshot(&profile, schedule.estimate_at(now), now)]
                }
            };
            if sender.send(history).is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: "u-1".to_string(),
            mxi_purchased_directly: 100.0,
            mxi_from_unified_commissions: 40.0,
            mxi_from_challenges: 10.0,
            accumulated_yield: 2.0,
            last_yield_update: Utc::now(),
        }
    }

    #[test]
    fn breakdown__shares_sum_to_one_hundred_percent() {
        // given
        let breakdown = BalanceBreakdown::from_profile(&profile(), 2.0);

        // then
        assert_eq!(breakdown.total(), 152.0);
        let sum = breakdown.share_percent(breakdown.purchased)
            + breakdown.share_percent(breakdown.commissions)
            + breakdown.share_percent(breakdown.tournaments)
            + breakdown.share_percent(breakdown.vesting);
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn breakdown__empty_balance_reports_zero_shares() {
        let breakdown = BalanceBreakdown::default();
        assert_eq!(breakdown.share_percent(breakdown.purchased), 0.0);
    }

    #[test]
    fn initial_snapshot__totals_every_source() {
        // given
        let now = Utc::now();

        // when
        let snapshot = initial_snapshot(&profile(), 3.5, now);

        // then
        assert_eq!(snapshot.timestamp, now);
        assert_eq!(snapshot.mxi_vesting, 3.5);
        assert_eq!(snapshot.total_balance, 100.0 + 40.0 + 10.0 + 3.5);
        assert_eq!(snapshot.transaction_type, None);
    }
}
