use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

pub(crate) const ATTEMPTS_STARTED: &str = "quiz_attempts_started_total";
pub(crate) const ATTEMPTS_SUBMITTED: &str = "quiz_attempts_submitted_total";
pub(crate) const ATTEMPTS_EXPIRED: &str = "quiz_attempts_expired_total";

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

/// `outcome` is `issued` for a fresh token, `resumed` when the live token is handed back.
pub(crate) fn record_attempt_started(outcome: &'static str) {
    metrics::counter!(ATTEMPTS_STARTED, "outcome" => outcome).increment(1);
}

pub(crate) fn record_attempt_submitted(passed: bool) {
    let passed = if passed { "true" } else { "false" };
    metrics::counter!(ATTEMPTS_SUBMITTED, "passed" => passed).increment(1);
}

pub(crate) fn record_attempts_expired(count: u64) {
    if count > 0 {
        metrics::counter!(ATTEMPTS_EXPIRED).increment(count);
    }
}
