use async_trait::async_trait;
use sentinel_common::{AlertState, RiskPrediction, SafetyAnalysis};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::processing::alert::AlertEffect;

/// Carries out alarm side effects. SMS delivery is simulated by the bundled
/// implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn sound_alarm(&self) -> Result<()>;
    async fn rearm_alarm(&self) -> Result<()>;
    async fn silence_alarm(&self) -> Result<()>;
    async fn send_critical_sms(&self, phone: &str, message: &str) -> Result<()>;
}

pub async fn dispatch(notifier: &dyn Notifier, effect: &AlertEffect) -> Result<()> {
    match effect {
        AlertEffect::SoundAlarm => notifier.sound_alarm().await,
        AlertEffect::RearmAlarm => notifier.rearm_alarm().await,
        AlertEffect::SilenceAlarm => notifier.silence_alarm().await,
        AlertEffect::CriticalSms { phone, message } => notifier.send_critical_sms(phone, message).await,
    }
}

/// Writes every side effect to the log instead of driving hardware.
#[derive(Debug, Default)]
pub struct LogNotifier;

fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let tail: String = digits.iter().skip(digits.len().saturating_sub(4)).collect();
    format!("***{}", tail)
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn sound_alarm(&self) -> Result<()> {
        warn!(target: "sentinel::alarm", "ALARM: continuous tone started");
        Ok(())
    }

    async fn rearm_alarm(&self) -> Result<()> {
        warn!(target: "sentinel::alarm", "ALARM: tone re-armed");
        Ok(())
    }

    async fn silence_alarm(&self) -> Result<()> {
        info!(target: "sentinel::alarm", "Alarm tone stopped");
        Ok(())
    }

    async fn send_critical_sms(&self, phone: &str, message: &str) -> Result<()> {
        warn!(target: "sentinel::sms", to = %mask_phone(phone), "Simulated SMS: {}", message);
        Ok(())
    }
}

/// Notifications for dashboard subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MonitorEvent {
    CycleStarted { seq: u64, camera_id: String },
    AnalysisCompleted { camera_id: String, analysis: SafetyAnalysis },
    AnalysisInconclusive { camera_id: String, summary: String },
    AnalysisFailed { camera_id: String, summary: String },
    CaptureFailed { camera_id: String, reason: String },
    WatchdogExpired { seq: u64, camera_id: String },
    AlertStateChanged { state: AlertState },
    Predictions { predictions: Vec<RiskPrediction> },
}
