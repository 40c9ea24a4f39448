use chrono::{
    DateTime,
    Utc,
};
use std::fmt;

/// Lifecycle of a payment as mirrored from the external processor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PaymentStatus {
    Waiting,
    Pending,
    Confirming,
    Sending,
    Finished,
    Confirmed,
    Failed,
    Expired,
    Refunded,
    Unknown(String),
}

/// Coarse classification used when presenting a status.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusSeverity {
    Settled,
    AwaitingPayment,
    InProgress,
    Failed,
    Unknown,
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "waiting" => PaymentStatus::Waiting,
            "pending" => PaymentStatus::Pending,
            "confirming" => PaymentStatus::Confirming,
            "sending" => PaymentStatus::Sending,
            "finished" => PaymentStatus::Finished,
            "confirmed" => PaymentStatus::Confirmed,
            "failed" => PaymentStatus::Failed,
            "expired" => PaymentStatus::Expired,
            "refunded" => PaymentStatus::Refunded,
            other => PaymentStatus::Unknown(other.to_string()),
        }
    }

    /// Terminal means polling may stop for good. Failed, expired and
    /// refunded payments keep being polled; only a settled payment halts
    /// the cycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Finished | PaymentStatus::Confirmed)
    }

    pub fn severity(&self) -> StatusSeverity {
        match self {
            PaymentStatus::Finished | PaymentStatus::Confirmed => StatusSeverity::Settled,
            PaymentStatus::Waiting | PaymentStatus::Pending => {
                StatusSeverity::AwaitingPayment
            }
            PaymentStatus::Confirming | PaymentStatus::Sending => {
                StatusSeverity::InProgress
            }
            PaymentStatus::Failed | PaymentStatus::Expired | PaymentStatus::Refunded => {
                StatusSeverity::Failed
            }
            PaymentStatus::Unknown(_) => StatusSeverity::Unknown,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PaymentStatus::Waiting => "awaiting payment",
            PaymentStatus::Pending => "payment pending",
            PaymentStatus::Confirming => "confirming payment",
            PaymentStatus::Sending => "sending funds",
            PaymentStatus::Finished => "payment completed",
            PaymentStatus::Confirmed => "payment confirmed",
            PaymentStatus::Failed => "payment failed",
            PaymentStatus::Expired => "payment expired",
            PaymentStatus::Refunded => "payment refunded",
            PaymentStatus::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = match self {
            PaymentStatus::Waiting => "waiting",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirming => "confirming",
            PaymentStatus::Sending => "sending",
            PaymentStatus::Finished => "finished",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Unknown(raw) => raw,
        };
        write!(f, "{raw}")
    }
}

/// A payment row mirrored from the `payments` table.
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentRecord {
    pub id: String,
    pub order_id: String,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    /// Reference assigned by the external processor, present once the
    /// order has been registered there.
    pub payment_id: Option<String>,
}

impl PaymentRecord {
    /// The effective status prefers the processor-reported
    /// `payment_status` and falls back to the local `status` column.
    pub fn current_status(&self) -> PaymentStatus {
        let raw = self
            .payment_status
            .as_deref()
            .or(self.status.as_deref())
            .unwrap_or("waiting");
        PaymentStatus::parse(raw)
    }
}

/// One row of `mxi_balance_history`: an authoritative balance snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub mxi_purchased: f64,
    pub mxi_commissions: f64,
    pub mxi_challenges: f64,
    pub mxi_vesting: f64,
    pub total_balance: f64,
    pub transaction_type: Option<String>,
    pub transaction_amount: Option<f64>,
}

/// A `game_participants` row.
#[derive(Clone, Debug, PartialEq)]
pub struct Participant {
    pub session_id: String,
    pub user_id: String,
    pub blocks_destroyed: Option<u32>,
    pub distance_from_center: Option<f64>,
    pub rank: Option<u32>,
}

/// A `game_sessions` row.
#[derive(Clone, Debug, PartialEq)]
pub struct GameSession {
    pub id: String,
    pub status: String,
    pub winner_user_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub prize_amount: f64,
}

impl GameSession {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

/// The authenticated user's profile, including the balance-source fields
/// the vesting estimator works from.
#[derive(Clone, Debug, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub mxi_purchased_directly: f64,
    pub mxi_from_unified_commissions: f64,
    pub mxi_from_challenges: f64,
    pub accumulated_yield: f64,
    pub last_yield_update: DateTime<Utc>,
}
