use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::domain::TransactionResult;

/// Metrics registry for the application.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Rule evaluations by outcome
    pub rules_evaluated_total: AtomicU64,
    pub rules_passed_total: AtomicU64,

    /// Attestations issued
    pub attestations_total: AtomicU64,

    /// Messages signed with the service key
    pub messages_signed_total: AtomicU64,

    /// Broadcasts by outcome
    pub submissions_ok: AtomicU64,
    pub submissions_failed: AtomicU64,

    /// Transactions that reached the requested commitment
    pub confirmations_total: AtomicU64,

    /// Co-signer calls that returned a failure
    pub cosign_failures_total: AtomicU64,

    /// Request latency buckets
    pub latency_under_1ms: AtomicU64,
    pub latency_1_10ms: AtomicU64,
    pub latency_10_100ms: AtomicU64,
    pub latency_100ms_1s: AtomicU64,
    pub latency_1_10s: AtomicU64,
    pub latency_over_10s: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        MetricsRegistry::default()
    }

    /// Record a rule evaluation.
    pub fn record_rule_evaluation(&self, passed: bool) {
        self.rules_evaluated_total.fetch_add(1, Ordering::Relaxed);
        if passed {
            self.rules_passed_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_attestation(&self) {
        self.attestations_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of a co-signer call.
    ///
    /// `broadcast` marks calls that attempt submission to a cluster.
    pub fn record_cosign(&self, result: &TransactionResult, broadcast: bool) {
        if result.signature.is_some() {
            self.messages_signed_total.fetch_add(1, Ordering::Relaxed);
        }
        if result.confirmation.is_some() {
            self.confirmations_total.fetch_add(1, Ordering::Relaxed);
        }

        if broadcast {
            if result.success && result.transaction_id.is_some() {
                self.submissions_ok.fetch_add(1, Ordering::Relaxed);
            } else if !result.success {
                self.submissions_failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        if !result.success {
            self.cosign_failures_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record request latency.
    pub fn record_latency(&self, start: Instant) {
        let millis = start.elapsed().as_millis() as u64;

        if millis < 1 {
            self.latency_under_1ms.fetch_add(1, Ordering::Relaxed);
        } else if millis < 10 {
            self.latency_1_10ms.fetch_add(1, Ordering::Relaxed);
        } else if millis < 100 {
            self.latency_10_100ms.fetch_add(1, Ordering::Relaxed);
        } else if millis < 1_000 {
            self.latency_100ms_1s.fetch_add(1, Ordering::Relaxed);
        } else if millis < 10_000 {
            self.latency_1_10s.fetch_add(1, Ordering::Relaxed);
        } else {
            self.latency_over_10s.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let evaluated = self.rules_evaluated_total.load(Ordering::Relaxed);
        let passed = self.rules_passed_total.load(Ordering::Relaxed);

        format!(
            r#"# HELP cap_oracle_rule_evaluations Rule evaluations by outcome
# TYPE cap_oracle_rule_evaluations counter
cap_oracle_rule_evaluations{{outcome="passed"}} {}
cap_oracle_rule_evaluations{{outcome="failed"}} {}

# HELP cap_oracle_attestations_total Attestations issued
# TYPE cap_oracle_attestations_total counter
cap_oracle_attestations_total {}

# HELP cap_oracle_messages_signed_total Messages signed with the service key
# TYPE cap_oracle_messages_signed_total counter
cap_oracle_messages_signed_total {}

# HELP cap_oracle_submissions Transaction broadcasts by outcome
# TYPE cap_oracle_submissions counter
cap_oracle_submissions{{outcome="ok"}} {}
cap_oracle_submissions{{outcome="failed"}} {}

# HELP cap_oracle_confirmations_total Transactions confirmed at the requested commitment
# TYPE cap_oracle_confirmations_total counter
cap_oracle_confirmations_total {}

# HELP cap_oracle_cosign_failures_total Co-signer calls that failed
# TYPE cap_oracle_cosign_failures_total counter
cap_oracle_cosign_failures_total {}

# HELP cap_oracle_request_latency_bucket Request latency histogram
# TYPE cap_oracle_request_latency_bucket counter
cap_oracle_request_latency_bucket{{le="0.001"}} {}
cap_oracle_request_latency_bucket{{le="0.01"}} {}
cap_oracle_request_latency_bucket{{le="0.1"}} {}
cap_oracle_request_latency_bucket{{le="1"}} {}
cap_oracle_request_latency_bucket{{le="10"}} {}
cap_oracle_request_latency_bucket{{le="+Inf"}} {}
"#,
            passed,
            evaluated.saturating_sub(passed),
            self.attestations_total.load(Ordering::Relaxed),
            self.messages_signed_total.load(Ordering::Relaxed),
            self.submissions_ok.load(Ordering::Relaxed),
            self.submissions_failed.load(Ordering::Relaxed),
            self.confirmations_total.load(Ordering::Relaxed),
            self.cosign_failures_total.load(Ordering::Relaxed),
            self.latency_under_1ms.load(Ordering::Relaxed),
            self.latency_1_10ms.load(Ordering::Relaxed),
            self.latency_10_100ms.load(Ordering::Relaxed),
            self.latency_100ms_1s.load(Ordering::Relaxed),
            self.latency_1_10s.load(Ordering::Relaxed),
            self.latency_over_10s.load(Ordering::Relaxed),
        )
    }
}

/// Guard for timing operations.
pub struct TimingGuard<'a> {
    registry: &'a MetricsRegistry,
    start: Instant,
}

impl<'a> TimingGuard<'a> {
    pub fn new(registry: &'a MetricsRegistry) -> Self {
        TimingGuard {
            registry,
            start: Instant::now(),
        }
    }
}

impl<'a> Drop for TimingGuard<'a> {
    fn drop(&mut self) {
        self.registry.record_latency(self.start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rule_evaluation() {
        let metrics = MetricsRegistry::new();

        metrics.record_rule_evaluation(true);
        metrics.record_rule_evaluation(true);
        metrics.record_rule_evaluation(false);

        let output = metrics.to_prometheus();
        assert!(output.contains("cap_oracle_rule_evaluations{outcome=\"passed\"} 2"));
        assert!(output.contains("cap_oracle_rule_evaluations{outcome=\"failed\"} 1"));
    }

    #[test]
    fn test_record_cosign() {
        let metrics = MetricsRegistry::new();

        let signed = TransactionResult {
            success: true,
            signature: Some("sig".into()),
            transaction_id: Some("sig".into()),
            ..Default::default()
        };
        metrics.record_cosign(&signed, true);

        let failed = TransactionResult {
            success: false,
            error: Some("transaction submission failed".into()),
            ..Default::default()
        };
        metrics.record_cosign(&failed, true);
        metrics.record_cosign(&failed, false);

        assert_eq!(metrics.messages_signed_total.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.submissions_ok.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.submissions_failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.cosign_failures_total.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_timing_guard() {
        let metrics = MetricsRegistry::new();
        {
            let _guard = TimingGuard::new(&metrics);
        }

        let recorded = metrics.latency_under_1ms.load(Ordering::Relaxed)
            + metrics.latency_1_10ms.load(Ordering::Relaxed);
        assert_eq!(recorded, 1);
    }
}
