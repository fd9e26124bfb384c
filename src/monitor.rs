use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

/// Loop bookkeeping shared between the scheduler (the only writer) and the
/// status API.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorState {
    pub last_found_time: DateTime<Utc>,
    pub last_status_time: DateTime<Utc>,
    pub consecutive_zero_runs: u32,
    pub total_scans: u64,
    pub total_found: u64,
    pub notify_failures: u64,
    pub last_scan_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl MonitorState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_found_time: now,
            last_status_time: now,
            consecutive_zero_runs: 0,
            total_scans: 0,
            total_found: 0,
            notify_failures: 0,
            last_scan_time: None,
            last_error: None,
        }
    }
}

pub struct MonitorHealth {
    state: Mutex<MonitorState>,
    silence_after: Duration,
    heartbeat_every: Duration,
}

impl MonitorHealth {
    pub fn new(now: DateTime<Utc>, silence_alert_hours: u32, heartbeat_interval_minutes: u32) -> Self {
        Self {
            state: Mutex::new(MonitorState::new(now)),
            silence_after: Duration::hours(i64::from(silence_alert_hours)),
            heartbeat_every: Duration::minutes(i64::from(heartbeat_interval_minutes)),
        }
    }

    pub async fn record_scan(&self, found: usize, now: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        state.total_scans += 1;
        state.last_scan_time = Some(now);
        state.last_error = None;

        if found > 0 {
            state.total_found += found as u64;
            state.last_found_time = now;
            state.consecutive_zero_runs = 0;
        } else {
            state.consecutive_zero_runs += 1;
        }
    }

    pub async fn record_error(&self, error: &str, now: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        state.last_scan_time = Some(now);
        state.last_error = Some(error.to_string());
    }

    pub async fn record_notify_failure(&self) {
        self.state.lock().await.notify_failures += 1;
    }

    /// Returns the silent duration when an alert is due, resetting the clock
    /// in the same critical section so only one alert fires per window.
    pub async fn check_silence(&self, now: DateTime<Utc>) -> Option<Duration> {
        let mut state = self.state.lock().await;
        let silent_for = now.signed_duration_since(state.last_found_time);
        if silent_for < self.silence_after {
            return None;
        }
        state.last_found_time = now;
        Some(silent_for)
    }

    /// Returns the last find time when a heartbeat is due and marks it sent.
    pub async fn check_heartbeat(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut state = self.state.lock().await;
        if now.signed_duration_since(state.last_status_time) < self.heartbeat_every {
            return None;
        }
        state.last_status_time = now;
        Some(state.last_found_time)
    }

    pub async fn snapshot(&self) -> MonitorState {
        self.state.lock().await.clone()
    }
}
