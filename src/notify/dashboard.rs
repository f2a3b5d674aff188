//! Charging status reports for the external dashboard.
//!
//! Reporting is best effort. [`StatusReporter::report`] never blocks: the HTTP
//! implementation queues the report for a background worker, which posts it
//! and logs failures without touching the machine that produced it.

use crate::config::{DashboardConfig, MAX_DASHBOARD_ATTEMPTS};
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Exponential backoff before retry number `attempt` (1-based), capped.
fn retry_delay(attempt: u32) -> Duration {
    2u32.checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| RETRY_BASE_DELAY.checked_mul(factor))
        .map_or(RETRY_MAX_DELAY, |delay| delay.min(RETRY_MAX_DELAY))
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("report queue is full")]
    QueueFull,

    #[error("reporter is closed")]
    Closed,

    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("dashboard answered {0}")]
    Status(reqwest::StatusCode),
}

/// Charging state as the dashboard names it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargingState {
    ConnectedSetup,
    ConnectedCharging,
    Disconnected,
    ConnectedFinished,
}

/// Body of one dashboard POST.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub state: ChargingState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charging_percentage: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charging_goal: Option<i64>,
}

impl StatusReport {
    fn bare(state: ChargingState) -> Self {
        Self {
            state,
            charging_percentage: None,
            charging_goal: None,
        }
    }

    pub fn connected() -> Self {
        Self::bare(ChargingState::ConnectedSetup)
    }

    pub fn charging(percentage: i64, goal: i64) -> Self {
        Self {
            state: ChargingState::ConnectedCharging,
            charging_percentage: Some(percentage),
            charging_goal: Some(goal),
        }
    }

    pub fn disconnected() -> Self {
        Self::bare(ChargingState::Disconnected)
    }

    pub fn finished() -> Self {
        Self::bare(ChargingState::ConnectedFinished)
    }
}

/// Destination of status reports. Must return without waiting on the network.
pub trait StatusReporter: Send + Sync {
    fn report(&self, report: StatusReport) -> Result<(), DashboardError>;
}

/// Delivery counters of an [`HttpDashboard`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub queued: u64,
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    queued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Posts reports as JSON from a background task fed by a bounded queue.
pub struct HttpDashboard {
    queue: mpsc::Sender<StatusReport>,
    counters: Arc<Counters>,
    worker: JoinHandle<()>,
}

impl HttpDashboard {
    /// Start the delivery worker on `runtime`.
    pub fn spawn(config: &DashboardConfig, runtime: &Handle) -> Result<Self, DashboardError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("chargepark/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DashboardError::Client)?;

        let (queue, reports) = mpsc::channel(config.queue_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker = Worker {
            client,
            url: config.url.clone(),
            max_attempts: config.max_attempts.clamp(1, MAX_DASHBOARD_ATTEMPTS),
            counters: Arc::clone(&counters),
        };

        info!(
            url = %config.url,
            timeout_ms = config.timeout_ms,
            max_attempts = config.max_attempts,
            "Created dashboard reporter"
        );

        Ok(Self {
            queue,
            counters,
            worker: runtime.spawn(worker.run(reports)),
        })
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl StatusReporter for HttpDashboard {
    fn report(&self, report: StatusReport) -> Result<(), DashboardError> {
        match self.queue.try_send(report) {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(report)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(state = ?report.state, "Dashboard queue full, report dropped");
                Err(DashboardError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DashboardError::Closed),
        }
    }
}

impl Drop for HttpDashboard {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

struct Worker {
    client: Client,
    url: String,
    max_attempts: u32,
    counters: Arc<Counters>,
}

impl Worker {
    async fn run(self, mut reports: mpsc::Receiver<StatusReport>) {
        while let Some(report) = reports.recv().await {
            match self.post_with_retry(&report).await {
                Ok(()) => {
                    self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    error!(state = ?report.state, error = %e, "Error sending status report");
                }
            }
        }
        debug!("Dashboard worker stopped");
    }

    async fn post_with_retry(&self, report: &StatusReport) -> Result<(), DashboardError> {
        let mut attempt = 1;
        loop {
            let error = match self.client.post(&self.url).json(report).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(
                        state = ?report.state,
                        status = %response.status(),
                        "Status report delivered"
                    );
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status();
                    // Don't retry client errors (4xx)
                    if status.is_client_error() {
                        return Err(DashboardError::Status(status));
                    }
                    DashboardError::Status(status)
                }
                Err(e) => DashboardError::Request(e),
            };

            if attempt >= self.max_attempts {
                return Err(error);
            }
            warn!(
                error = %error,
                attempt,
                max_attempts = self.max_attempts,
                "Status report failed, will retry"
            );
            tokio::time::sleep(retry_delay(attempt)).await;
            attempt += 1;
        }
    }
}

/// Reporter used when the dashboard is disabled: logs and discards.
#[derive(Debug, Default)]
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn report(&self, report: StatusReport) -> Result<(), DashboardError> {
        info!(
            state = ?report.state,
            percentage = report.charging_percentage,
            goal = report.charging_goal,
            "Status report"
        );
        Ok(())
    }
}

/// Reporter that keeps every report in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    reports: Arc<Mutex<Vec<StatusReport>>>,
    failing: bool,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reporter that records nothing and refuses every report.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn reports(&self) -> Vec<StatusReport> {
        self.reports.lock().clone()
    }

    pub fn states(&self) -> Vec<ChargingState> {
        self.reports.lock().iter().map(|r| r.state).collect()
    }
}

impl StatusReporter for MemoryReporter {
    fn report(&self, report: StatusReport) -> Result<(), DashboardError> {
        if self.failing {
            return Err(DashboardError::Closed);
        }
        self.reports.lock().push(report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    #[test]
    fn reports_serialize_to_dashboard_contract() {
        assert_eq!(
            serde_json::to_value(StatusReport::connected()).unwrap(),
            json!({"state": "connected_setup"})
        );
        assert_eq!(
            serde_json::to_value(StatusReport::charging(45, 100)).unwrap(),
            json!({"state": "connected_charging", "chargingPercentage": 45, "chargingGoal": 100})
        );
        assert_eq!(
            serde_json::to_value(StatusReport::disconnected()).unwrap(),
            json!({"state": "disconnected"})
        );
        assert_eq!(
            serde_json::to_value(StatusReport::finished()).unwrap(),
            json!({"state": "connected_finished"})
        );
    }

    #[test]
    fn retry_delay_doubles_then_caps() {
        assert_eq!(retry_delay(1), Duration::from_millis(200));
        assert_eq!(retry_delay(2), Duration::from_millis(400));
        assert_eq!(retry_delay(8), Duration::from_millis(25_600));
        assert_eq!(retry_delay(9), RETRY_MAX_DELAY);
        assert_eq!(retry_delay(40), RETRY_MAX_DELAY);
        assert_eq!(retry_delay(u32::MAX), RETRY_MAX_DELAY);
    }

    #[test]
    fn memory_reporter_records_in_order() {
        let reporter = MemoryReporter::new();
        reporter.report(StatusReport::connected()).unwrap();
        reporter.report(StatusReport::finished()).unwrap();
        assert_eq!(
            reporter.states(),
            vec![ChargingState::ConnectedSetup, ChargingState::ConnectedFinished]
        );
        assert!(MemoryReporter::failing().report(StatusReport::connected()).is_err());
    }

    type Received = Arc<Mutex<Vec<Value>>>;

    async fn record(State(received): State<Received>, Json(body): Json<Value>) -> StatusCode {
        received.lock().push(body);
        StatusCode::OK
    }

    async fn reject(State(received): State<Received>, Json(body): Json<Value>) -> StatusCode {
        received.lock().push(body);
        StatusCode::SERVICE_UNAVAILABLE
    }

    async fn serve(received: Received) -> String {
        let app = Router::new()
            .route("/ok", post(record))
            .route("/down", post(reject))
            .with_state(received);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn wait_for(dashboard: &HttpDashboard, settled: u64) {
        for _ in 0..200 {
            let stats = dashboard.stats();
            if stats.delivered + stats.failed >= settled {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("reports not settled: {:?}", dashboard.stats());
    }

    fn config(url: String, max_attempts: u32) -> DashboardConfig {
        DashboardConfig {
            url,
            timeout_ms: 2000,
            max_attempts,
            ..DashboardConfig::default()
        }
    }

    #[tokio::test]
    async fn http_dashboard_posts_json() {
        let received = Received::default();
        let base = serve(Arc::clone(&received)).await;
        let dashboard =
            HttpDashboard::spawn(&config(format!("{base}/ok"), 1), &Handle::current()).unwrap();

        dashboard.report(StatusReport::charging(25, 100)).unwrap();
        dashboard.report(StatusReport::disconnected()).unwrap();
        wait_for(&dashboard, 2).await;

        assert_eq!(dashboard.stats().delivered, 2);
        let received = received.lock();
        assert_eq!(received[0]["chargingPercentage"], 25);
        assert_eq!(received[1], json!({"state": "disconnected"}));
    }

    #[tokio::test]
    async fn failed_report_is_not_retried_by_default() {
        let received = Received::default();
        let base = serve(Arc::clone(&received)).await;
        let dashboard =
            HttpDashboard::spawn(&config(format!("{base}/down"), 1), &Handle::current()).unwrap();

        dashboard.report(StatusReport::connected()).unwrap();
        dashboard.report(StatusReport::finished()).unwrap();
        wait_for(&dashboard, 2).await;

        assert_eq!(dashboard.stats().failed, 2);
        assert_eq!(received.lock().len(), 2);
    }

    #[tokio::test]
    async fn server_errors_are_retried_up_to_the_limit() {
        let received = Received::default();
        let base = serve(Arc::clone(&received)).await;
        let dashboard =
            HttpDashboard::spawn(&config(format!("{base}/down"), 3), &Handle::current()).unwrap();

        dashboard.report(StatusReport::connected()).unwrap();
        wait_for(&dashboard, 1).await;

        assert_eq!(dashboard.stats().failed, 1);
        assert_eq!(received.lock().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_attempt_limit_keeps_the_worker_alive() {
        let dashboard = HttpDashboard::spawn(
            &config("http://127.0.0.1:9/status".to_string(), 40),
            &Handle::current(),
        )
        .unwrap();

        dashboard.report(StatusReport::connected()).unwrap();
        for _ in 0..600 {
            if dashboard.stats().failed == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        assert_eq!(dashboard.stats().failed, 1);
        assert!(dashboard.report(StatusReport::finished()).is_ok());
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        // The worker cannot take anything off the queue until the test yields
        let config = DashboardConfig {
            url: "http://127.0.0.1:9/status".to_string(),
            timeout_ms: 5000,
            queue_capacity: 1,
            ..DashboardConfig::default()
        };
        let dashboard = HttpDashboard::spawn(&config, &Handle::current()).unwrap();

        let results: Vec<_> = (0..5)
            .map(|_| dashboard.report(StatusReport::connected()))
            .collect();

        assert!(results.iter().any(|r| matches!(r, Err(DashboardError::QueueFull))));
        assert!(dashboard.stats().dropped >= 1);
    }
}
