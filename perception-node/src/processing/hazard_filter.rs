use sentinel_common::{CategoryThresholds, SafetyAnalysis, SAFE_SCORE_FLOOR};

/// Drops hazards below their category's confidence threshold and recomputes
/// the safe verdict. The gateway's own `is_safe` is never trusted.
///
/// Thresholds apply per category only: a LOW and a HIGH hazard in the same
/// category pass or fail at the same confidence.
pub fn filter_analysis(raw: &SafetyAnalysis, thresholds: &CategoryThresholds) -> SafetyAnalysis {
    let hazards: Vec<_> = raw
        .hazards
        .iter()
        .filter(|h| h.effective_confidence() >= thresholds.get(h.category))
        .cloned()
        .collect();

    let is_safe = hazards.is_empty() && raw.safety_score > SAFE_SCORE_FLOOR;

    SafetyAnalysis {
        hazards,
        is_safe,
        ..raw.clone()
    }
}
