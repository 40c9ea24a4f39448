use chrono::{
    DateTime,
    Utc,
};
use mxi_gateway::types::UserProfile;
use std::time::Duration;
use tokio::{
    sync::watch,
    time,
};

/// Only purchased MXI accrues, at 3% of the principal per 30-day month.
pub const MONTHLY_YIELD_RATE: f64 = 0.03;
pub const SECONDS_IN_MONTH: f64 = 2_592_000.0;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Client-side accrual estimate between authoritative balance snapshots.
/// Never written back; the backend owns the real yield ledger.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VestingSchedule {
    pub principal: f64,
    pub accumulated: f64,
    pub last_update: DateTime<Utc>,
}

impl VestingSchedule {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            principal: profile.mxi_purchased_directly,
            accumulated: profile.accumulated_yield,
            last_update: profile.last_yield_update,
        }
    }

    pub fn monthly_cap(&self) -> f64 {
        self.principal * MONTHLY_YIELD_RATE
    }

    pub fn yield_per_second(&self) -> f64 {
        self.monthly_cap() / SECONDS_IN_MONTH
    }

    /// The accrued yield at `now`: the stored accumulation plus linear
    /// growth since the last authoritative update, never exceeding the
    /// monthly cap. A zero principal pins the estimate at zero.
    pub fn estimate_at(&self, now: DateTime<Utc>) -> f64 {
        if self.principal <= 0.0 {
            return 0.0;
        }
        let elapsed_secs =
            ((now - self.last_update).num_milliseconds() as f64 / 1000.0).max(0.0);
        let session_yield = elapsed_secs * self.yield_per_second();
        (self.accumulated + session_yield).min(self.monthly_cap())
    }
}

/// Publishes a fresh estimate every second until the receiver goes away.
pub async fn publish_estimates(schedule: VestingSchedule, sender: watch::Sender<f64>) {
    let mut ticker = time::interval(TICK_INTERVAL);
    loop {
        ticker.tick().await;
        if sender.send(schedule.estimate_at(Utc::now())).is_err() {
            break;
        }
    }
}
