use chrono::{
    DateTime,
    Utc,
};
use mxi_gateway::{
    GatewayClient,
    SessionStore,
    types::PaymentStatus,
};
use std::{
    sync::{
        Mutex,
        atomic::{
            AtomicBool,
            AtomicU32,
            Ordering,
        },
    },
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    debug,
    info,
    warn,
};

pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// State transitions observed while polling, emitted in order on the
/// poller's event channel.
#[derive(Clone, Debug, PartialEq)]
pub enum PollerEvent {
    /// The status seen by this check, reported whether or not it changed.
    Status(PaymentStatus),
    /// A terminal status arrived; no further checks will run.
    Confirmed,
    /// An advisory failure; polling continues on the next tick.
    Error(String),
}

#[derive(Debug, Default)]
struct Observed {
    status: Option<PaymentStatus>,
    last_checked: Option<DateTime<Utc>>,
}

/// Polls the backend for the state of one payment order: once
/// immediately, then on a fixed interval, plus on demand via [`check`].
/// Every failure is advisory; polling only stops for good once the
/// payment settles or the poller is dropped.
///
/// [`check`]: PaymentStatusPoller::check
pub struct PaymentStatusPoller {
    gateway: GatewayClient,
    sessions: SessionStore,
    order_id: String,
    interval: Duration,
    events: mpsc::Sender<PollerEvent>,
    checking: AtomicBool,
    stopped: AtomicBool,
    checks_issued: AtomicU32,
    observed: Mutex<Observed>,
}

impl PaymentStatusPoller {
    pub fn new(
        gateway: GatewayClient,
        sessions: SessionStore,
        order_id: impl Into<String>,
    ) -> (Self, mpsc::Receiver<PollerEvent>) {
        let (events, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let poller = Self {
            gateway,
            sessions,
            order_id: order_id.into(),
            interval: POLL_INTERVAL,
            events,
            checking: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            checks_issued: AtomicU32::new(0),
            observed: Mutex::new(Observed::default()),
        };
        (poller, receiver)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn status(&self) -> Option<PaymentStatus> {
        self.observed.lock().expect("observed lock poisoned").status.clone()
    }

    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.observed.lock().expect("observed lock poisoned").last_checked
    }

    pub fn checks_issued(&self) -> u32 {
        self.checks_issued.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Checks immediately, then keeps checking on the interval until a
    /// terminal status arrives. The caller owns the future; dropping it
    /// cancels the timer.
    pub async fn run(&self) {
        self.check().await;
        let mut ticker = time::interval(self.interval);
        // the first tick of a fresh interval completes at once
        ticker.tick().await;
        while !self.is_stopped() {
            ticker.tick().await;
            self.check().await;
        }
    }

    /// One status check. A check already in flight makes this a no-op, so
    /// a manual trigger can never stack a second concurrent fetch on top
    /// of the scheduled one.
    pub async fn check(&self) {
        if self.is_stopped() {
            return;
        }
        if self
            .checking
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(order_id = %self.order_id, "check already in flight, skipping");
            return;
        }
        let check_id = self.checks_issued.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(check_id, order_id = %self.order_id, "checking payment status");
        self.check_once(check_id).await;
        self.checking.store(false, Ordering::SeqCst);
    }

    async fn check_once(&self, check_id: u32) {
        let payment = match self.gateway.payment_by_order(&self.order_id).await {
            Ok(Some(payment)) => payment,
            Ok(None) => {
                warn!(check_id, order_id = %self.order_id, "payment record not found");
                self.report_error("payment not found").await;
                return;
            }
            Err(error) => {
                warn!(check_id, order_id = %self.order_id, %error, "payment lookup failed");
                self.report_error("connection error").await;
                return;
            }
        };

        let current = payment.current_status();
        self.report_status(current.clone()).await;
        if current.is_terminal() {
            info!(check_id, order_id = %self.order_id, %current, "payment settled, stopping");
            self.confirm().await;
            return;
        }

        if payment.payment_id.is_none() {
            debug!(check_id, "no processor reference yet, skipping remote re-check");
            return;
        }
        let Some(session) = self.sessions.current() else {
            warn!(check_id, order_id = %self.order_id, "no active session for remote re-check");
            self.report_error("session expired").await;
            return;
        };

        match self
            .gateway
            .verify_payment_status(&self.order_id, &session.access_token)
            .await
        {
            Ok(refreshed) => {
                self.report_status(refreshed.clone()).await;
                if refreshed.is_terminal() {
                    info!(check_id, order_id = %self.order_id, %refreshed, "payment settled, stopping");
                    self.confirm().await;
                }
            }
            Err(error) => {
                warn!(check_id, order_id = %self.order_id, %error, "remote status verification failed");
                self.report_error(error.to_string()).await;
            }
        }
    }

    async fn report_status(&self, status: PaymentStatus) {
        {
            let mut observed = self.observed.lock().expect("observed lock poisoned");
            observed.status = Some(status.clone());
            observed.last_checked = Some(Utc::now());
        }
        let _ = self.events.send(PollerEvent::Status(status)).await;
    }

    async fn report_error(&self, message: impl Into<String>) {
        let _ = self.events.send(PollerEvent::Error(message.into())).await;
    }

    async fn confirm(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _ = self.events.send(PollerEvent::Confirmed).await;
    }
}
