use sentinel_common::{HazardCategory, HazardObservation, PredictionKind, RiskPrediction};

use super::history::HistoryBuffer;

const FATIGUE_WINDOW: usize = 5;
const HEAD_INJURY_MIN_FINDINGS: usize = 2;
const HEAD_KEYWORDS: [&str; 4] = ["helmet", "hard hat", "hardhat", "head"];
const TRIP_KEYWORDS: [&str; 3] = ["trip", "clutter", "obstruct"];

/// Advisory trend heuristics over recent history. Output is informational and
/// never feeds the alarm.
pub fn predict(history: &HistoryBuffer) -> Vec<RiskPrediction> {
    let mut predictions = Vec::new();

    if let Some(prediction) = fatigue(history) {
        predictions.push(prediction);
    }
    if let Some(prediction) = head_injury(history) {
        predictions.push(prediction);
    }
    if let Some(prediction) = congestion(history) {
        predictions.push(prediction);
    }

    predictions
}

fn fatigue(history: &HistoryBuffer) -> Option<RiskPrediction> {
    let scores: Vec<i32> = history
        .recent(FATIGUE_WINDOW)
        .map(|r| r.analysis.safety_score)
        .collect();
    if scores.len() < FATIGUE_WINDOW {
        return None;
    }

    let average = scores.iter().sum::<i32>() as f64 / scores.len() as f64;
    if average > 50.0 && average < 70.0 {
        Some(RiskPrediction {
            kind: PredictionKind::Fatigue,
            confidence: 65,
            rationale: format!(
                "Average safety score over the last {} checks is {:.0}, a sustained mid-range decline",
                FATIGUE_WINDOW, average
            ),
        })
    } else {
        None
    }
}

fn mentions(hazard: &HazardObservation, keywords: &[&str]) -> bool {
    let text = format!("{} {}", hazard.hazard_type, hazard.description).to_lowercase();
    keywords.iter().any(|k| text.contains(k))
}

fn head_injury(history: &HistoryBuffer) -> Option<RiskPrediction> {
    let findings = history
        .iter()
        .flat_map(|r| r.analysis.hazards.iter())
        .filter(|h| h.category == HazardCategory::Ppe && mentions(h, &HEAD_KEYWORDS))
        .count();

    if findings < HEAD_INJURY_MIN_FINDINGS {
        return None;
    }

    Some(RiskPrediction {
        kind: PredictionKind::HeadInjury,
        confidence: (60 + 10 * findings).min(95) as u8,
        rationale: format!("{} recent head-protection findings", findings),
    })
}

fn congestion(history: &HistoryBuffer) -> Option<RiskPrediction> {
    let latest = history.latest()?;
    let trip = latest
        .analysis
        .hazards
        .iter()
        .find(|h| h.category == HazardCategory::Housekeeping || mentions(h, &TRIP_KEYWORDS))?;

    Some(RiskPrediction {
        kind: PredictionKind::Congestion,
        confidence: 70,
        rationale: format!(
            "Current {} on camera {} may slow traffic through the area",
            trip.hazard_type.to_lowercase(),
            latest.camera_id
        ),
    })
}
