//! Activity log sink and per-session dwell tracking.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use weblante_common::ActivityRecord;

/// Receives one record per terminal decision. Errors are reported to the
/// caller, which logs and drops them.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(&self, record: ActivityRecord) -> anyhow::Result<()>;
}

/// Writes each record as a structured event on target `weblante::activity`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActivityLog;

#[async_trait]
impl ActivityLog for TracingActivityLog {
    async fn record(&self, record: ActivityRecord) -> anyhow::Result<()> {
        tracing::info!(
            target: "weblante::activity",
            url = %record.url,
            decision = %record.decision,
            risk_score = record.risk_score,
            stage = ?record.stage,
            primary_reason = record.primary_reason.as_deref().unwrap_or(""),
            cached = record.cached,
            duration_ms = record.duration_ms,
            age = ?record.age,
            age_class = ?record.age_class,
            session_id = %record.session_id,
            "navigation decision"
        );
        Ok(())
    }
}

/// Milliseconds since the previous decision in the same session.
#[derive(Debug, Default)]
pub struct DwellTracker {
    last_seen: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl DwellTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a decision at `now`; returns the gap since the previous one,
    /// 0 for the first. Clock skew never yields a negative value.
    pub fn observe(&self, session_id: Uuid, now: DateTime<Utc>) -> i64 {
        let mut last_seen = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        let previous = last_seen.insert(session_id, now);
        previous
            .map(|prev| (now - prev).num_milliseconds().max(0))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use weblante_common::{Decision, SessionContext, Stage};

    #[test]
    fn test_dwell_per_session() {
        let tracker = DwellTracker::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let t0 = Utc::now();

        assert_eq!(tracker.observe(a, t0), 0);
        assert_eq!(tracker.observe(b, t0 + Duration::seconds(1)), 0);
        assert_eq!(tracker.observe(a, t0 + Duration::milliseconds(2500)), 2500);
        assert_eq!(tracker.observe(a, t0), 0);
    }

    #[tokio::test]
    async fn test_tracing_log_accepts_records() {
        let session = SessionContext::new(Some(10));
        let decision = Decision::block(1.0, "Known adult domain (pornhub.com)", Stage::AdultDomain);
        let record = ActivityRecord::new("pornhub.com/", &decision, &session, false, 0, Utc::now());
        assert!(TracingActivityLog.record(record).await.is_ok());
    }
}
