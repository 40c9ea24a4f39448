use crate::types::{
    BalanceSnapshot,
    GameSession,
    Participant,
    PaymentRecord,
    PaymentStatus,
    UserProfile,
};
use chrono::{
    DateTime,
    Utc,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use reqwest::StatusCode;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;
use tracing::debug;

/// HTTP client for the hosted backend. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Clone)]
pub struct GatewayClient {
    base_url: String,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .wrap_err("failed to build HTTP client for the backend gateway")?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Looks up the local payment record mirrored for an order.
    pub async fn payment_by_order(
        &self,
        order_id: &str,
    ) -> Result<Option<PaymentRecord>> {
        let url = format!("{}/payments/{}", self.base_url, order_id);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .wrap_err("payment lookup request failed")?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let res = error_for_status(res, "fetching payment record").await?;
        let dto: PaymentDto = res
            .json()
            .await
            .wrap_err("invalid payment record payload")?;
        Ok(Some(dto.into()))
    }

    /// Re-verifies an order with the processor through the hosted
    /// status-check function. Requires the caller's session token; the
    /// backend replies `{success, status?, error?}`.
    pub async fn verify_payment_status(
        &self,
        order_id: &str,
        access_token: &str,
    ) -> Result<PaymentStatus> {
        let url = format!(
            "{}/functions/check-payment-status?order_id={}",
            self.base_url, order_id
        );
        let res = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .wrap_err("status-check request failed")?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .wrap_err("failed to read status-check response body")?;
        if !status.is_success() {
            let message = serde_json::from_slice::<CheckStatusDto>(&bytes)
                .ok()
                .and_then(|dto| dto.error)
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).to_string());
            return Err(eyre!("status check rejected with {status}: {message}"));
        }
        let dto: CheckStatusDto =
            serde_json::from_slice(&bytes).wrap_err("invalid status-check payload")?;
        if !dto.success {
            return Err(eyre!(
                dto.error
                    .unwrap_or_else(|| "payment verification failed".to_string())
            ));
        }
        let raw = dto
            .status
            .ok_or_else(|| eyre!("status check succeeded without a status"))?;
        Ok(PaymentStatus::parse(&raw))
    }

    /// The user's full balance history, oldest first.
    pub async fn balance_history(&self, user_id: &str) -> Result<Vec<BalanceSnapshot>> {
        let url = format!("{}/balance-history/{}", self.base_url, user_id);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .wrap_err("balance history request failed")?;
        let res = error_for_status(res, "fetching balance history").await?;
        let dtos: Vec<BalanceHistoryDto> = res
            .json()
            .await
            .wrap_err("invalid balance history payload")?;
        let mut snapshots: Vec<BalanceSnapshot> =
            dtos.into_iter().map(Into::into).collect();
        snapshots.sort_by_key(|snapshot| snapshot.timestamp);
        Ok(snapshots)
    }

    /// Profile of the authenticated user.
    pub async fn auth_user(&self, access_token: &str) -> Result<UserProfile> {
        let url = format!("{}/auth/user", self.base_url);
        let res = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .wrap_err("auth user request failed")?;
        let res = error_for_status(res, "fetching authenticated user").await?;
        let dto: UserProfileDto =
            res.json().await.wrap_err("invalid user profile payload")?;
        Ok(dto.into())
    }

    pub async fn game_session(&self, session_id: &str) -> Result<Option<GameSession>> {
        let url = format!("{}/sessions/{}", self.base_url, session_id);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .wrap_err("game session request failed")?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let res = error_for_status(res, "fetching game session").await?;
        let dto: GameSessionDto =
            res.json().await.wrap_err("invalid game session payload")?;
        Ok(Some(dto.into()))
    }

    pub async fn participants(&self, session_id: &str) -> Result<Vec<Participant>> {
        let url = format!("{}/sessions/{}/participants", self.base_url, session_id);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .wrap_err("participants request failed")?;
        let res = error_for_status(res, "fetching participants").await?;
        let dtos: Vec<ParticipantDto> =
            res.json().await.wrap_err("invalid participants payload")?;
        Ok(dtos.into_iter().map(Into::into).collect())
    }

    /// Marks a session completed with its winner.
    pub async fn complete_session(
        &self,
        session_id: &str,
        winner_user_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<()> {
        let url = format!("{}/sessions/{}", self.base_url, session_id);
        let body = CompleteSessionBody {
            status: "completed",
            winner_user_id,
            completed_at,
        };
        debug!(%session_id, %winner_user_id, "completing game session");
        let res = self
            .http
            .patch(url)
            .json(&body)
            .send()
            .await
            .wrap_err("session completion request failed")?;
        error_for_status(res, "completing game session").await?;
        Ok(())
    }

    /// Writes one player's final tallies for a session.
    pub async fn record_participant_result(
        &self,
        session_id: &str,
        user_id: &str,
        blocks_destroyed: u32,
        distance_from_center: f64,
        rank: u32,
    ) -> Result<()> {
        let url = format!(
            "{}/sessions/{}/participants/{}",
            self.base_url, session_id, user_id
        );
        let body = ParticipantResultBody {
            blocks_destroyed,
            distance_from_center,
            rank,
        };
        let res = self
            .http
            .patch(url)
            .json(&body)
            .send()
            .await
            .wrap_err("participant result request failed")?;
        error_for_status(res, "recording participant result").await?;
        Ok(())
    }

    /// Credits challenge winnings to a user via the backend RPC.
    pub async fn credit_challenge_reward(
        &self,
        user_id: &str,
        amount: f64,
    ) -> Result<()> {
        let url = format!("{}/rpc/add-mxi-from-challenges", self.base_url);
        let body = ChallengeCreditBody {
            p_user_id: user_id,
            p_amount: amount,
        };
        debug!(%user_id, amount, "crediting challenge reward");
        let res = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .wrap_err("challenge credit request failed")?;
        error_for_status(res, "crediting challenge reward").await?;
        Ok(())
    }
}

impl fmt::Display for GatewayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

async fn error_for_status(
    res: reqwest::Response,
    action: &str,
) -> Result<reqwest::Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res
        .text()
        .await
        .unwrap_or_else(|_| "<unavailable body>".to_string());
    Err(eyre!("backend responded with {status} when {action}: {body}"))
}

#[derive(Deserialize)]
struct PaymentDto {
    id: String,
    order_id: String,
    status: Option<String>,
    payment_status: Option<String>,
    payment_id: Option<String>,
}

#[derive(Deserialize)]
struct CheckStatusDto {
    success: bool,
    status: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct BalanceHistoryDto {
    timestamp: DateTime<Utc>,
    #[serde(default)]
    mxi_purchased: f64,
    #[serde(default)]
    mxi_commissions: f64,
    #[serde(default)]
    mxi_challenges: f64,
    #[serde(default)]
    mxi_vesting: f64,
    #[serde(default)]
    total_balance: f64,
    transaction_type: Option<String>,
    transaction_amount: Option<f64>,
}

#[derive(Deserialize)]
struct ParticipantDto {
    session_id: String,
    user_id: String,
    blocks_destroyed: Option<u32>,
    distance_from_center: Option<f64>,
    rank: Option<u32>,
}

#[derive(Deserialize)]
struct GameSessionDto {
    id: String,
    status: String,
    winner_user_id: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    prize_amount: f64,
}

#[derive(Deserialize)]
struct UserProfileDto {
    id: String,
    #[serde(default)]
    mxi_purchased_directly: f64,
    #[serde(default)]
    mxi_from_unified_commissions: f64,
    #[serde(default)]
    mxi_from_challenges: f64,
    #[serde(default)]
    accumulated_yield: f64,
    last_yield_update: DateTime<Utc>,
}

#[derive(Serialize)]
struct CompleteSessionBody<'a> {
    status: &'a str,
    winner_user_id: &'a str,
    completed_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ParticipantResultBody {
    blocks_destroyed: u32,
    distance_from_center: f64,
    rank: u32,
}

#[derive(Serialize)]
struct ChallengeCreditBody<'a> {
    p_user_id: &'a str,
    p_amount: f64,
}

impl From<PaymentDto> for PaymentRecord {
    fn from(dto: PaymentDto) -> Self {
        PaymentRecord {
            id: dto.id,
            order_id: dto.order_id,
            status: dto.status,
            payment_status: dto.payment_status,
            payment_id: dto.payment_id,
        }
    }
}

impl From<BalanceHistoryDto> for BalanceSnapshot {
    fn from(dto: BalanceHistoryDto) -> Self {
        BalanceSnapshot {
            timestamp: dto.timestamp,
            mxi_purchased: dto.mxi_purchased,
            mxi_commissions: dto.mxi_commissions,
            mxi_challenges: dto.mxi_challenges,
            mxi_vesting: dto.mxi_vesting,
            total_balance: dto.total_balance,
            transaction_type: dto.transaction_type,
            transaction_amount: dto.transaction_amount,
        }
    }
}

impl From<ParticipantDto> for Participant {
    fn from(dto: ParticipantDto) -> Self {
        Participant {
            session_id: dto.session_id,
            user_id: dto.user_id,
            blocks_destroyed: dto.blocks_destroyed,
            distance_from_center: dto.distance_from_center,
            rank: dto.rank,
        }
    }
}

impl From<GameSessionDto> for GameSession {
    fn from(dto: GameSessionDto) -> Self {
        GameSession {
            id: dto.id,
            status: dto.status,
            winner_user_id: dto.winner_user_id,
            completed_at: dto.completed_at,
            prize_amount: dto.prize_amount,
        }
    }
}

impl From<UserProfileDto> for UserProfile {
    fn from(dto: UserProfileDto) -> Self {
        UserProfile {
            id: dto.id,
            mxi_purchased_directly: dto.mxi_purchased_directly,
            mxi_from_unified_commissions: dto.mxi_from_unified_commissions,
            mxi_from_challenges: dto.mxi_from_challenges,
            accumulated_yield: dto.accumulated_yield,
            last_yield_update: dto.last_yield_update,
        }
    }
}
