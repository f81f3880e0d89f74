use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use sentinel_common::AlertState;

use crate::error::{MonitorError, Result};

pub struct Metrics {
    registry: Registry,
    pub cycles_started: IntCounter,
    pub analyses_completed: IntCounter,
    pub inconclusive_results: IntCounter,
    pub gateway_errors: IntCounter,
    pub capture_failures: IntCounter,
    pub watchdog_expiries: IntCounter,
    pub late_results_discarded: IntCounter,
    pub alarms_raised: IntCounter,
    pub sms_sent: IntCounter,
    pub alert_state: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, help).namespace("sentinel"))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let alert_state = IntGauge::with_opts(
            Opts::new("alert_state", "Alarm state: 0 idle, 1 active, 2 silenced").namespace("sentinel"),
        )?;
        registry.register(Box::new(alert_state.clone()))?;

        Ok(Self {
            cycles_started: counter(&registry, "cycles_started_total", "Capture and analyze cycles started")?,
            analyses_completed: counter(&registry, "analyses_completed_total", "Analyses completed by the gateway")?,
            inconclusive_results: counter(&registry, "inconclusive_results_total", "Gateway timeouts and bad statuses")?,
            gateway_errors: counter(&registry, "gateway_errors_total", "Unusable gateway responses")?,
            capture_failures: counter(&registry, "capture_failures_total", "Cycles skipped for lack of a frame")?,
            watchdog_expiries: counter(&registry, "watchdog_expiries_total", "Cycles abandoned by the watchdog")?,
            late_results_discarded: counter(&registry, "late_results_discarded_total", "Results that arrived after their cycle was abandoned")?,
            alarms_raised: counter(&registry, "alarms_raised_total", "Transitions into the active alarm state")?,
            sms_sent: counter(&registry, "critical_sms_total", "Critical notifications sent")?,
            alert_state,
            registry,
        })
    }

    pub fn set_alert_state(&self, state: AlertState) {
        let value = match state {
            AlertState::Idle => 0,
            AlertState::Active => 1,
            AlertState::Silenced => 2,
        };
        self.alert_state.set(value);
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| MonitorError::Metrics(e.to_string()))
    }
}
