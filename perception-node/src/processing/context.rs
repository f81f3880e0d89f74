use sentinel_common::{
    utils::format_duration, AlertSettings, AlertState, CameraInfo, RiskPrediction, SafetyAnalysis, Severity,
};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use validator::Validate;

use super::alert::{AlertEffect, AlertStateMachine};
use super::hazard_filter::filter_analysis;
use super::history::{HistoryBuffer, HistoryRecord};
use super::predictions::predict;
use super::scheduler::{CameraScheduler, SchedulerWeights};
use crate::camera::registry::CameraRegistry;
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::messaging::MonitorEvent;

/// How a capture-and-analyze cycle ended, as reported by its task.
#[derive(Debug)]
pub enum CycleOutcome {
    NoFrame(String),
    Completed(SafetyAnalysis),
    GatewayFailed(MonitorError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    CaptureFailed,
    Completed,
    Inconclusive,
    Failed,
    WatchdogExpired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleRequest {
    pub seq: u64,
    pub camera_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickDecision {
    Idle,
    Busy,
    Start(CycleRequest),
}

/// Everything a state change asks the runner to do.
#[derive(Debug, Default)]
pub struct Reaction {
    pub outcome: Option<OutcomeKind>,
    pub effects: Vec<AlertEffect>,
    pub events: Vec<MonitorEvent>,
}

impl Reaction {
    fn with_effects(effects: Vec<AlertEffect>) -> Self {
        Self {
            effects,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
struct InFlight {
    seq: u64,
    camera_id: String,
    deadline: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraStatus {
    #[serde(flatten)]
    pub info: CameraInfo,
    pub severity: Severity,
    pub seconds_since_check: Option<f64>,
    pub latest: Option<SafetyAnalysis>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub node_id: String,
    pub running: bool,
    pub busy: bool,
    pub in_flight_camera: Option<String>,
    pub alert_state: AlertState,
    pub settings: AlertSettings,
    pub cameras: Vec<CameraStatus>,
    /// Last displayed result, including inconclusive and failed ones.
    pub latest: Option<HistoryRecord>,
    pub history: Vec<HistoryRecord>,
    pub predictions: Vec<RiskPrediction>,
}

/// Owned state of the scheduling and alerting core. Mutated only from the
/// serialized monitor loop, so it needs no locking.
#[derive(Debug)]
pub struct MonitorContext {
    node_id: String,
    registry: CameraRegistry,
    scheduler: CameraScheduler,
    alerts: AlertStateMachine,
    history: HistoryBuffer,
    watchdog_timeout: Duration,
    running: bool,
    in_flight: Option<InFlight>,
    /// Cycle left behind by `stop`. Blocks new cycles until it reports back
    /// or its watchdog deadline passes; its result is discarded.
    abandoned: Option<InFlight>,
    next_seq: u64,
    latest: Option<HistoryRecord>,
    predictions: Vec<RiskPrediction>,
}

impl MonitorContext {
    pub fn new(config: &MonitorConfig, registry: CameraRegistry) -> Self {
        Self {
            node_id: config.node_id.clone(),
            registry,
            scheduler: CameraScheduler::new(SchedulerWeights::from(&config.scheduler)),
            alerts: AlertStateMachine::new(&config.alerts),
            history: HistoryBuffer::new(config.history.capacity),
            watchdog_timeout: config.scheduler.watchdog_timeout(),
            running: false,
            in_flight: None,
            abandoned: None,
            next_seq: 0,
            latest: None,
            predictions: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn alert_state(&self) -> AlertState {
        self.alerts.state()
    }

    pub fn registry(&self) -> &CameraRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &CameraScheduler {
        &self.scheduler
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn predictions(&self) -> &[RiskPrediction] {
        &self.predictions
    }

    pub fn watchdog_deadline(&self) -> Option<Instant> {
        self.in_flight.as_ref().map(|f| f.deadline)
    }

    pub fn next_tone_at(&self) -> Option<Instant> {
        self.alerts.next_tone_at()
    }

    pub fn start(&mut self) {
        if !self.running {
            info!("Monitoring started on {} active camera(s)", self.registry.active_count());
            self.running = true;
        }
    }

    /// Stops sampling and performs the explicit alarm reset. A cycle still in
    /// flight is abandoned: its result will be discarded, but it keeps the
    /// gateway slot until it finishes or times out.
    pub fn stop(&mut self) -> Reaction {
        if self.running {
            info!("Monitoring stopped");
        }
        self.running = false;
        if let Some(in_flight) = self.in_flight.take() {
            debug!("Abandoning cycle {} on camera {}", in_flight.seq, in_flight.camera_id);
            self.abandoned = Some(in_flight);
        }

        let previous = self.alerts.state();
        let mut reaction = Reaction::with_effects(self.alerts.reset());
        self.push_state_change(previous, &mut reaction);
        reaction
    }

    /// Starts a cycle unless one is already in flight. The chosen camera's
    /// fairness clock is stamped immediately so a failing feed cannot hog
    /// the scheduler.
    pub fn begin_cycle(&mut self, now: Instant) -> TickDecision {
        if !self.running {
            return TickDecision::Idle;
        }
        if let Some(in_flight) = &self.in_flight {
            debug!("Cycle {} still in flight, skipping tick", in_flight.seq);
            return TickDecision::Busy;
        }
        if let Some(abandoned) = &self.abandoned {
            if now < abandoned.deadline {
                debug!("Abandoned cycle {} has not reported back, skipping tick", abandoned.seq);
                return TickDecision::Busy;
            }
            warn!("Abandoned cycle {} outlived its watchdog, releasing slot", abandoned.seq);
            self.abandoned = None;
        }

        let active = self.registry.active_ids();
        let Some(camera_id) = self.scheduler.select_next(&active, now) else {
            return TickDecision::Idle;
        };

        self.next_seq += 1;
        let seq = self.next_seq;
        self.scheduler.mark_checked(&camera_id, now);
        self.in_flight = Some(InFlight {
            seq,
            camera_id: camera_id.clone(),
            deadline: now + self.watchdog_timeout,
        });

        TickDecision::Start(CycleRequest { seq, camera_id })
    }

    /// Applies a finished cycle. Returns `None` for results that no longer
    /// match the in-flight cycle; those are discarded untouched.
    pub fn complete_cycle(&mut self, seq: u64, outcome: CycleOutcome, now: Instant) -> Option<Reaction> {
        if self.abandoned.as_ref().map(|f| f.seq) == Some(seq) {
            self.abandoned = None;
            return None;
        }
        if self.in_flight.as_ref().map(|f| f.seq) != Some(seq) {
            return None;
        }
        let camera_id = self.in_flight.take()?.camera_id;

        let reaction = match outcome {
            CycleOutcome::NoFrame(reason) => {
                warn!("No frame from camera {}: {}", camera_id, reason);
                Reaction {
                    outcome: Some(OutcomeKind::CaptureFailed),
                    events: vec![MonitorEvent::CaptureFailed { camera_id, reason }],
                    ..Default::default()
                }
            }
            CycleOutcome::Completed(raw) => self.apply_analysis(&camera_id, raw, now),
            CycleOutcome::GatewayFailed(error) if error.is_lag() => {
                warn!("Gateway lag on camera {}: {}", camera_id, error);
                self.record_inconclusive(&camera_id, format!("Network lag, assuming safe: {}", error))
            }
            CycleOutcome::GatewayFailed(error) => {
                warn!("Analysis failed on camera {}: {}", camera_id, error);
                let analysis = SafetyAnalysis::failed(format!("Analysis error: {}", error));
                let summary = analysis.summary.clone();
                self.latest = Some(HistoryRecord {
                    camera_id: camera_id.clone(),
                    analysis,
                });
                Reaction {
                    outcome: Some(OutcomeKind::Failed),
                    events: vec![MonitorEvent::AnalysisFailed { camera_id, summary }],
                    ..Default::default()
                }
            }
        };

        Some(reaction)
    }

    /// Force-clears a cycle whose gateway call outlived the watchdog.
    pub fn expire_watchdog(&mut self, now: Instant) -> Option<Reaction> {
        if !self.in_flight.as_ref().map_or(false, |f| now >= f.deadline) {
            return None;
        }
        let in_flight = self.in_flight.take()?;

        warn!(
            "Watchdog abandoned cycle {} on camera {} after {}",
            in_flight.seq,
            in_flight.camera_id,
            format_duration(self.watchdog_timeout)
        );

        let mut reaction = self.record_inconclusive(
            &in_flight.camera_id,
            format!("No answer within {}, assuming safe", format_duration(self.watchdog_timeout)),
        );
        reaction.outcome = Some(OutcomeKind::WatchdogExpired);
        reaction.events.insert(
            0,
            MonitorEvent::WatchdogExpired {
                seq: in_flight.seq,
                camera_id: in_flight.camera_id,
            },
        );
        Some(reaction)
    }

    fn record_inconclusive(&mut self, camera_id: &str, summary: String) -> Reaction {
        self.latest = Some(HistoryRecord {
            camera_id: camera_id.to_string(),
            analysis: SafetyAnalysis::inconclusive(summary.clone()),
        });
        Reaction {
            outcome: Some(OutcomeKind::Inconclusive),
            events: vec![MonitorEvent::AnalysisInconclusive {
                camera_id: camera_id.to_string(),
                summary,
            }],
            ..Default::default()
        }
    }

    fn apply_analysis(&mut self, camera_id: &str, raw: SafetyAnalysis, now: Instant) -> Reaction {
        let filtered = filter_analysis(&raw, &self.alerts.settings().category_thresholds);
        debug!(
            "Camera {} scored {} with {}/{} hazards retained",
            camera_id,
            filtered.safety_score,
            filtered.hazards.len(),
            raw.hazards.len()
        );

        self.scheduler.record_analysis(camera_id, &filtered, now);
        self.history.push(camera_id, filtered.clone());
        self.latest = self.history.latest().cloned();

        let previous = self.alerts.state();
        let effects = self.alerts.evaluate(camera_id, &filtered, &raw, now);

        let mut reaction = Reaction {
            outcome: Some(OutcomeKind::Completed),
            effects,
            events: vec![MonitorEvent::AnalysisCompleted {
                camera_id: camera_id.to_string(),
                analysis: filtered,
            }],
        };
        self.push_state_change(previous, &mut reaction);

        let predictions = predict(&self.history);
        if predictions != self.predictions {
            reaction.events.push(MonitorEvent::Predictions {
                predictions: predictions.clone(),
            });
        }
        self.predictions = predictions;

        reaction
    }

    fn push_state_change(&self, previous: AlertState, reaction: &mut Reaction) {
        let current = self.alerts.state();
        if current != previous {
            reaction.events.push(MonitorEvent::AlertStateChanged { state: current });
        }
    }

    pub fn acknowledge(&mut self) -> Reaction {
        let previous = self.alerts.state();
        let mut reaction = Reaction::with_effects(self.alerts.acknowledge());
        self.push_state_change(previous, &mut reaction);
        reaction
    }

    pub fn tone_due(&mut self, now: Instant) -> Option<AlertEffect> {
        self.alerts.tone_due(now)
    }

    pub fn update_settings(&mut self, settings: AlertSettings, now: Instant) -> Result<Reaction> {
        settings.validate()?;
        Ok(Reaction::with_effects(self.alerts.update_settings(settings, now)))
    }

    pub fn register_camera(&mut self, id: &str, label: &str) -> bool {
        self.registry.register(id, label)
    }

    pub fn set_camera_active(&mut self, id: &str, active: bool) -> Result<()> {
        self.registry.set_active(id, active)
    }

    pub fn rename_camera(&mut self, id: &str, label: &str) -> Result<()> {
        self.registry.rename(id, label)
    }

    pub fn active_camera_count(&self) -> usize {
        self.registry.active_count()
    }

    pub fn snapshot(&self, now: Instant) -> MonitorSnapshot {
        let cameras = self
            .registry
            .list()
            .iter()
            .map(|info| {
                let state = self.scheduler.state(&info.id);
                CameraStatus {
                    info: info.clone(),
                    severity: state.map(|s| s.severity).unwrap_or_default(),
                    seconds_since_check: state
                        .and_then(|s| s.last_checked)
                        .map(|at| now.saturating_duration_since(at).as_secs_f64()),
                    latest: state.and_then(|s| s.latest.clone()),
                }
            })
            .collect();

        MonitorSnapshot {
            node_id: self.node_id.clone(),
            running: self.running,
            busy: self.in_flight.is_some(),
            in_flight_camera: self.in_flight.as_ref().map(|f| f.camera_id.clone()),
            alert_state: self.alerts.state(),
            settings: self.alerts.settings().clone(),
            cameras,
            latest: self.latest.clone(),
            history: self.history.to_vec(),
            predictions: self.predictions.clone(),
        }
    }
}
