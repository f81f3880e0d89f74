use sentinel_common::{SafetyAnalysis, Severity};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::config::SchedulerConfig;

/// Scheduling state kept for one camera.
#[derive(Debug, Clone, Default)]
pub struct PerCameraState {
    /// Stamped on every attempted cycle, successful or not.
    pub last_checked: Option<Instant>,
    pub last_high_at: Option<Instant>,
    pub severity: Severity,
    pub latest: Option<SafetyAnalysis>,
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerWeights {
    pub hazard_weight: f64,
    pub retention_weight: f64,
    pub retention_window: Duration,
}

impl From<&SchedulerConfig> for SchedulerWeights {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            hazard_weight: config.hazard_weight,
            retention_weight: config.retention_weight,
            retention_window: config.retention_window(),
        }
    }
}

/// Picks the next camera to sample. Idle time grows without bound so every
/// camera is eventually chosen; current severity and a decaying bonus after
/// the last HIGH finding keep attention on active incidents.
#[derive(Debug, Clone)]
pub struct CameraScheduler {
    weights: SchedulerWeights,
    states: HashMap<String, PerCameraState>,
}

impl CameraScheduler {
    pub fn new(weights: SchedulerWeights) -> Self {
        Self {
            weights,
            states: HashMap::new(),
        }
    }

    pub fn priority(&self, camera_id: &str, now: Instant) -> f64 {
        let state = self.states.get(camera_id);

        let idle = match state.and_then(|s| s.last_checked) {
            Some(at) => now.saturating_duration_since(at).as_secs_f64(),
            None => return f64::INFINITY,
        };

        let Some(state) = state else {
            return idle;
        };

        let urgency = self.weights.hazard_weight * f64::from(state.severity.level());
        idle + urgency + self.weights.retention_weight * self.retention_factor(state, now)
    }

    /// 1.0 right after a HIGH finding, decaying linearly to 0.0 across the window.
    fn retention_factor(&self, state: &PerCameraState, now: Instant) -> f64 {
        let Some(at) = state.last_high_at else {
            return 0.0;
        };
        let window = self.weights.retention_window.as_secs_f64();
        if window <= 0.0 {
            return 0.0;
        }
        let elapsed = now.saturating_duration_since(at).as_secs_f64();
        (1.0 - elapsed / window).max(0.0)
    }

    /// Highest priority wins; on exact ties the earliest camera in `active` keeps it.
    pub fn select_next(&self, active: &[String], now: Instant) -> Option<String> {
        let mut best: Option<(&String, f64)> = None;

        for camera_id in active {
            let priority = self.priority(camera_id, now);
            match best {
                Some((_, top)) if priority <= top => {}
                _ => best = Some((camera_id, priority)),
            }
        }

        if let Some((camera_id, priority)) = best {
            debug!("Scheduler picked {} with priority {:.1}", camera_id, priority);
        }
        best.map(|(camera_id, _)| camera_id.clone())
    }

    pub fn mark_checked(&mut self, camera_id: &str, now: Instant) {
        self.states.entry(camera_id.to_string()).or_default().last_checked = Some(now);
    }

    /// Folds a completed, filtered analysis into the camera's urgency signal.
    pub fn record_analysis(&mut self, camera_id: &str, filtered: &SafetyAnalysis, now: Instant) {
        let state = self.states.entry(camera_id.to_string()).or_default();
        state.severity = filtered.max_severity();
        if state.severity == Severity::High {
            state.last_high_at = Some(now);
        }
        state.latest = Some(filtered.clone());
    }

    pub fn state(&self, camera_id: &str) -> Option<&PerCameraState> {
        self.states.get(camera_id)
    }

    pub fn set_weights(&mut self, weights: SchedulerWeights) {
        self.weights = weights;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_common::{HazardCategory, HazardObservation};

    fn weights(hazard_weight: f64, retention_weight: f64) -> SchedulerWeights {
        SchedulerWeights {
            hazard_weight,
            retention_weight,
            retention_window: Duration::from_secs(90),
        }
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn analysis_with(severity: Severity) -> SafetyAnalysis {
        let hazards = if severity == Severity::Safe {
            Vec::new()
        } else {
            vec![HazardObservation {
                hazard_type: "finding".to_string(),
                category: HazardCategory::Machinery,
                severity,
                confidence: Some(90),
                description: String::new(),
                recommendation: String::new(),
                bounding_box: None,
            }]
        };
        SafetyAnalysis::new(50, hazards, "", false)
    }

    #[test]
    fn empty_active_set_selects_nothing() {
        let scheduler = CameraScheduler::new(weights(40.0, 0.0));
        assert_eq!(scheduler.select_next(&[], Instant::now()), None);
    }

    #[test]
    fn single_camera_is_always_selected() {
        let mut scheduler = CameraScheduler::new(weights(40.0, 60.0));
        let active = ids(&["cam-1"]);
        let now = Instant::now();
        scheduler.mark_checked("cam-1", now);
        assert_eq!(scheduler.select_next(&active, now), Some("cam-1".to_string()));
    }

    #[test]
    fn unchecked_cameras_go_first_in_order() {
        let mut scheduler = CameraScheduler::new(weights(40.0, 0.0));
        let active = ids(&["cam-1", "cam-2", "cam-3"]);
        let now = Instant::now();

        assert_eq!(scheduler.select_next(&active, now).as_deref(), Some("cam-1"));
        scheduler.mark_checked("cam-1", now);
        assert_eq!(scheduler.select_next(&active, now).as_deref(), Some("cam-2"));
    }

    #[test]
    fn exact_ties_keep_insertion_order() {
        let mut scheduler = CameraScheduler::new(weights(40.0, 0.0));
        let active = ids(&["cam-1", "cam-2"]);
        let start = Instant::now();
        scheduler.mark_checked("cam-1", start);
        scheduler.mark_checked("cam-2", start);

        assert_eq!(
            scheduler.select_next(&active, start + Duration::from_secs(5)).as_deref(),
            Some("cam-1")
        );
    }

    #[test]
    fn no_camera_starves_without_hazards() {
        let mut scheduler = CameraScheduler::new(weights(40.0, 60.0));
        let active = ids(&["cam-1", "cam-2", "cam-3"]);
        let start = Instant::now();
        let mut picks = Vec::new();

        for tick in 0..60u64 {
            let now = start + Duration::from_secs(2 * tick);
            let camera = scheduler.select_next(&active, now).unwrap();
            scheduler.mark_checked(&camera, now);
            scheduler.record_analysis(&camera, &analysis_with(Severity::Safe), now);
            picks.push(camera);
        }

        for window in picks.windows(3) {
            for camera in &active {
                assert!(window.contains(camera), "{} missing from {:?}", camera, window);
            }
        }
    }

    #[test]
    fn high_severity_outweighs_fairness_gap() {
        let mut scheduler = CameraScheduler::new(weights(40.0, 0.0));
        let active = ids(&["safe-cam", "hot-cam"]);
        let start = Instant::now();

        scheduler.mark_checked("safe-cam", start);
        let now = start + Duration::from_secs(60);
        scheduler.mark_checked("hot-cam", now);
        scheduler.record_analysis("hot-cam", &analysis_with(Severity::High), now);

        // hot-cam: 0s idle + 40 * 3 = 120; safe-cam: 60s idle.
        assert_eq!(scheduler.priority("hot-cam", now), 120.0);
        assert_eq!(scheduler.priority("safe-cam", now), 60.0);
        assert_eq!(scheduler.select_next(&active, now).as_deref(), Some("hot-cam"));
    }

    #[test]
    fn hazardous_camera_cannot_monopolize() {
        let mut scheduler = CameraScheduler::new(weights(40.0, 60.0));
        let active = ids(&["hot-cam", "quiet-cam"]);
        let start = Instant::now();
        scheduler.mark_checked("quiet-cam", start);

        let mut quiet_seen_at = None;
        for tick in 0..200u64 {
            let now = start + Duration::from_secs(2 * tick);
            let camera = scheduler.select_next(&active, now).unwrap();
            scheduler.mark_checked(&camera, now);
            if camera == "quiet-cam" {
                quiet_seen_at = Some(tick);
                break;
            }
            scheduler.record_analysis(&camera, &analysis_with(Severity::High), now);
        }

        // Idle time must exceed 120 urgency + 60 retention, i.e. about 90 ticks.
        let tick = quiet_seen_at.expect("quiet camera was starved");
        assert!(tick <= 95, "quiet camera first picked at tick {}", tick);
    }

    #[test]
    fn retention_decays_after_high_finding() {
        let mut scheduler = CameraScheduler::new(weights(40.0, 60.0));
        let start = Instant::now();
        scheduler.mark_checked("cam-1", start);
        scheduler.record_analysis("cam-1", &analysis_with(Severity::High), start);

        let later = start + Duration::from_secs(1);
        scheduler.mark_checked("cam-1", later);
        scheduler.record_analysis("cam-1", &analysis_with(Severity::Safe), later);

        // 45s after the HIGH finding half of the retention bonus remains.
        let at = start + Duration::from_secs(45);
        let expected_idle = 44.0;
        assert!((scheduler.priority("cam-1", at) - (expected_idle + 30.0)).abs() < 1e-6);

        let expired = start + Duration::from_secs(120);
        assert!((scheduler.priority("cam-1", expired) - 119.0).abs() < 1e-6);
    }
}
