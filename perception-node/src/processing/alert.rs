use sentinel_common::{AlertSettings, AlertState, SafetyAnalysis, Severity};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::AlertConfig;

/// Side effects requested by the alert machine; carried out by a notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertEffect {
    SoundAlarm,
    RearmAlarm,
    SilenceAlarm,
    CriticalSms { phone: String, message: String },
}

/// Session-wide alarm: `Idle -> Active` on a threshold breach, `Active ->
/// Silenced` on acknowledgement, and back to `Idle` only through [`reset`].
/// Safe readings never clear a silenced alarm.
///
/// [`reset`]: AlertStateMachine::reset
#[derive(Debug, Clone)]
pub struct AlertStateMachine {
    state: AlertState,
    settings: AlertSettings,
    sms_cooldown: Duration,
    rearm_interval: Duration,
    last_sms_at: Option<Instant>,
    next_tone_at: Option<Instant>,
}

impl AlertStateMachine {
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            state: AlertState::Idle,
            settings: config.settings.clone(),
            sms_cooldown: config.sms_cooldown(),
            rearm_interval: config.alarm_rearm(),
            last_sms_at: None,
            next_tone_at: None,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn settings(&self) -> &AlertSettings {
        &self.settings
    }

    pub fn next_tone_at(&self) -> Option<Instant> {
        match self.state {
            AlertState::Active if self.settings.sound_enabled => self.next_tone_at,
            _ => None,
        }
    }

    /// Score below the minimum, or worst hazard at or above the trigger.
    pub fn breaches(&self, filtered: &SafetyAnalysis) -> bool {
        let score_breach = filtered.safety_score < self.settings.min_safety_score;
        let severity_breach = self
            .settings
            .min_severity_trigger
            .threshold()
            .map_or(false, |trigger| filtered.max_severity() >= trigger);
        score_breach || severity_breach
    }

    /// Evaluates one completed analysis. `raw` is the unfiltered gateway
    /// result and only drives the critical SMS side channel.
    pub fn evaluate(
        &mut self,
        camera_id: &str,
        filtered: &SafetyAnalysis,
        raw: &SafetyAnalysis,
        now: Instant,
    ) -> Vec<AlertEffect> {
        let mut effects = Vec::new();
        if raw.is_inconclusive() {
            return effects;
        }

        if self.state == AlertState::Idle && self.breaches(filtered) {
            warn!(
                "Alarm raised by camera {} (score {}, worst severity {:?})",
                camera_id,
                filtered.safety_score,
                filtered.max_severity()
            );
            self.state = AlertState::Active;
            if self.settings.sound_enabled {
                effects.push(AlertEffect::SoundAlarm);
                self.next_tone_at = Some(now + self.rearm_interval);
            }
        }

        if let Some(sms) = self.critical_sms(camera_id, raw, now) {
            effects.push(sms);
        }

        effects
    }

    fn critical_sms(&mut self, camera_id: &str, raw: &SafetyAnalysis, now: Instant) -> Option<AlertEffect> {
        if !self.settings.sms_enabled || self.settings.phone_number.trim().is_empty() {
            return None;
        }
        if !raw.has_severity(Severity::High) {
            return None;
        }
        if let Some(sent_at) = self.last_sms_at {
            if now.saturating_duration_since(sent_at) < self.sms_cooldown {
                return None;
            }
        }

        self.last_sms_at = Some(now);
        let types: Vec<&str> = raw
            .hazards
            .iter()
            .filter(|h| h.severity == Severity::High)
            .map(|h| h.hazard_type.as_str())
            .collect();

        Some(AlertEffect::CriticalSms {
            phone: self.settings.phone_number.clone(),
            message: format!(
                "CRITICAL safety alert on camera {}: {} (score {})",
                camera_id,
                types.join(", "),
                raw.safety_score
            ),
        })
    }

    pub fn acknowledge(&mut self) -> Vec<AlertEffect> {
        if self.state != AlertState::Active {
            return Vec::new();
        }
        info!("Alarm acknowledged, silencing");
        self.state = AlertState::Silenced;
        self.next_tone_at = None;
        vec![AlertEffect::SilenceAlarm]
    }

    /// Explicit reset, issued when monitoring stops.
    pub fn reset(&mut self) -> Vec<AlertEffect> {
        let was_active = self.state == AlertState::Active;
        if self.state != AlertState::Idle {
            info!("Alarm reset from {}", self.state.as_str());
        }
        self.state = AlertState::Idle;
        self.next_tone_at = None;
        if was_active {
            vec![AlertEffect::SilenceAlarm]
        } else {
            Vec::new()
        }
    }

    /// Periodic re-arm of the audible tone while the alarm is unacknowledged.
    pub fn tone_due(&mut self, now: Instant) -> Option<AlertEffect> {
        if self.state != AlertState::Active || !self.settings.sound_enabled {
            return None;
        }
        let due = self.next_tone_at.map_or(true, |at| now >= at);
        if !due {
            return None;
        }
        self.next_tone_at = Some(now + self.rearm_interval);
        Some(AlertEffect::RearmAlarm)
    }

    /// Toggling sound while `Active` stops or restarts the tone immediately.
    pub fn update_settings(&mut self, settings: AlertSettings, now: Instant) -> Vec<AlertEffect> {
        let was_enabled = self.settings.sound_enabled;
        self.settings = settings;

        if self.state != AlertState::Active || was_enabled == self.settings.sound_enabled {
            return Vec::new();
        }

        if self.settings.sound_enabled {
            info!("Sound re-enabled while alarm active, resuming tone");
            self.next_tone_at = Some(now + self.rearm_interval);
            vec![AlertEffect::SoundAlarm]
        } else {
            self.next_tone_at = None;
            vec![AlertEffect::SilenceAlarm]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_common::{HazardCategory, HazardObservation, SeverityTrigger};

    fn config(min_safety_score: i32, trigger: SeverityTrigger) -> AlertConfig {
        let mut config = AlertConfig::default();
        config.settings.min_safety_score = min_safety_score;
        config.settings.min_severity_trigger = trigger;
        config
    }

    fn sms_config() -> AlertConfig {
        let mut config = config(60, SeverityTrigger::High);
        config.settings.sms_enabled = true;
        config.settings.phone_number = "+15550100".to_string();
        config
    }

    fn hazard(severity: Severity) -> HazardObservation {
        HazardObservation {
            hazard_type: "Unguarded press".to_string(),
            category: HazardCategory::Machinery,
            severity,
            confidence: Some(90),
            description: String::new(),
            recommendation: String::new(),
            bounding_box: None,
        }
    }

    fn analysis(score: i32, severities: &[Severity]) -> SafetyAnalysis {
        SafetyAnalysis::new(score, severities.iter().map(|s| hazard(*s)).collect(), "", false)
    }

    #[test]
    fn score_breach_alone_raises_alarm() {
        let mut machine = AlertStateMachine::new(&config(60, SeverityTrigger::High));
        let reading = analysis(55, &[]);
        let effects = machine.evaluate("cam-1", &reading, &reading, Instant::now());

        assert_eq!(machine.state(), AlertState::Active);
        assert_eq!(effects, vec![AlertEffect::SoundAlarm]);
    }

    #[test]
    fn low_hazard_with_good_score_does_not_trigger() {
        let mut machine = AlertStateMachine::new(&config(60, SeverityTrigger::High));
        let reading = analysis(90, &[Severity::Low]);
        let effects = machine.evaluate("cam-1", &reading, &reading, Instant::now());

        assert_eq!(machine.state(), AlertState::Idle);
        assert!(effects.is_empty());
    }

    #[test]
    fn severity_trigger_raises_alarm() {
        let mut machine = AlertStateMachine::new(&config(40, SeverityTrigger::Medium));
        let reading = analysis(90, &[Severity::Medium]);
        machine.evaluate("cam-1", &reading, &reading, Instant::now());
        assert_eq!(machine.state(), AlertState::Active);
    }

    #[test]
    fn trigger_off_ignores_severity() {
        let mut machine = AlertStateMachine::new(&config(40, SeverityTrigger::Off));
        let reading = analysis(90, &[Severity::High]);
        machine.evaluate("cam-1", &reading, &reading, Instant::now());
        assert_eq!(machine.state(), AlertState::Idle);
    }

    #[test]
    fn silenced_alarm_survives_further_readings() {
        let mut machine = AlertStateMachine::new(&config(60, SeverityTrigger::High));
        let now = Instant::now();
        let bad = analysis(20, &[Severity::High]);
        machine.evaluate("cam-1", &bad, &bad, now);

        assert_eq!(machine.acknowledge(), vec![AlertEffect::SilenceAlarm]);
        assert_eq!(machine.state(), AlertState::Silenced);

        let effects = machine.evaluate("cam-1", &bad, &bad, now);
        assert_eq!(machine.state(), AlertState::Silenced);
        assert!(!effects.contains(&AlertEffect::SoundAlarm));

        let good = analysis(95, &[]);
        machine.evaluate("cam-1", &good, &good, now);
        assert_eq!(machine.state(), AlertState::Silenced);

        assert!(machine.reset().is_empty());
        assert_eq!(machine.state(), AlertState::Idle);
    }

    #[test]
    fn acknowledge_outside_active_is_noop() {
        let mut machine = AlertStateMachine::new(&config(60, SeverityTrigger::High));
        assert!(machine.acknowledge().is_empty());
        assert_eq!(machine.state(), AlertState::Idle);
    }

    #[test]
    fn reset_while_active_silences() {
        let mut machine = AlertStateMachine::new(&config(60, SeverityTrigger::High));
        let bad = analysis(10, &[]);
        machine.evaluate("cam-1", &bad, &bad, Instant::now());
        assert_eq!(machine.reset(), vec![AlertEffect::SilenceAlarm]);
        assert_eq!(machine.state(), AlertState::Idle);
    }

    #[test]
    fn inconclusive_readings_never_trigger() {
        let mut machine = AlertStateMachine::new(&sms_config());
        let lag = SafetyAnalysis::inconclusive("gateway timeout");
        assert!(machine.evaluate("cam-1", &lag, &lag, Instant::now()).is_empty());
        assert_eq!(machine.state(), AlertState::Idle);
    }

    #[test]
    fn tone_rearms_periodically_while_active() {
        let mut machine = AlertStateMachine::new(&config(60, SeverityTrigger::High));
        let start = Instant::now();
        assert_eq!(machine.tone_due(start), None);

        let bad = analysis(10, &[]);
        machine.evaluate("cam-1", &bad, &bad, start);
        assert_eq!(machine.tone_due(start + Duration::from_secs(1)), None);
        assert_eq!(machine.tone_due(start + Duration::from_secs(3)), Some(AlertEffect::RearmAlarm));
        assert_eq!(machine.tone_due(start + Duration::from_secs(4)), None);

        machine.acknowledge();
        assert_eq!(machine.tone_due(start + Duration::from_secs(60)), None);
    }

    #[test]
    fn muted_sound_raises_silently() {
        let mut cfg = config(60, SeverityTrigger::High);
        cfg.settings.sound_enabled = false;
        let mut machine = AlertStateMachine::new(&cfg);
        let bad = analysis(10, &[]);
        assert!(machine.evaluate("cam-1", &bad, &bad, Instant::now()).is_empty());
        assert_eq!(machine.state(), AlertState::Active);
    }

    #[test]
    fn unmuting_active_alarm_resumes_tone() {
        let mut machine = AlertStateMachine::new(&config(60, SeverityTrigger::High));
        let start = Instant::now();
        let bad = analysis(10, &[]);
        machine.evaluate("cam-1", &bad, &bad, start);

        let mut muted = machine.settings().clone();
        muted.sound_enabled = false;
        assert_eq!(machine.update_settings(muted.clone(), start), vec![AlertEffect::SilenceAlarm]);
        assert_eq!(machine.next_tone_at(), None);

        let later = start + Duration::from_secs(10);
        let mut unmuted = muted;
        unmuted.sound_enabled = true;
        assert_eq!(machine.update_settings(unmuted, later), vec![AlertEffect::SoundAlarm]);
        assert_eq!(machine.state(), AlertState::Active);
        assert_eq!(machine.next_tone_at(), Some(later + Duration::from_secs(3)));
        assert_eq!(
            machine.tone_due(later + Duration::from_secs(3)),
            Some(AlertEffect::RearmAlarm)
        );
    }

    #[test]
    fn unmuting_while_idle_is_silent() {
        let mut cfg = config(60, SeverityTrigger::High);
        cfg.settings.sound_enabled = false;
        let mut machine = AlertStateMachine::new(&cfg);

        let mut unmuted = machine.settings().clone();
        unmuted.sound_enabled = true;
        assert!(machine.update_settings(unmuted, Instant::now()).is_empty());
        assert_eq!(machine.next_tone_at(), None);
    }

    #[test]
    fn sms_fires_at_most_once_per_cooldown() {
        let mut machine = AlertStateMachine::new(&sms_config());
        let start = Instant::now();
        let critical = analysis(20, &[Severity::High]);
        let mut sent_at = Vec::new();

        // One HIGH reading every 2 seconds for 10 minutes.
        for tick in 0..300u64 {
            let now = start + Duration::from_secs(tick * 2);
            let effects = machine.evaluate("cam-1", &critical, &critical, now);
            if effects.iter().any(|e| matches!(e, AlertEffect::CriticalSms { .. })) {
                sent_at.push(tick * 2);
            }
        }

        assert_eq!(sent_at, vec![0, 300]);
    }

    #[test]
    fn sms_uses_unfiltered_hazards() {
        let mut machine = AlertStateMachine::new(&sms_config());
        let raw = analysis(90, &[Severity::High]);
        let filtered = analysis(90, &[]);
        let effects = machine.evaluate("cam-1", &filtered, &raw, Instant::now());

        assert_eq!(machine.state(), AlertState::Idle);
        assert!(matches!(
            effects.as_slice(),
            [AlertEffect::CriticalSms { phone, .. }] if phone == "+15550100"
        ));
    }

    #[test]
    fn sms_disabled_never_fires() {
        let mut machine = AlertStateMachine::new(&config(60, SeverityTrigger::High));
        let critical = analysis(20, &[Severity::High]);
        let effects = machine.evaluate("cam-1", &critical, &critical, Instant::now());
        assert!(!effects.iter().any(|e| matches!(e, AlertEffect::CriticalSms { .. })));
    }
}
