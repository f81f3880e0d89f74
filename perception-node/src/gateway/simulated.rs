use async_trait::async_trait;
use rand::Rng;
use sentinel_common::{BoundingBox, HazardCategory, HazardObservation, SafetyAnalysis, Severity};
use std::time::Duration;

use super::AnalysisGateway;
use crate::camera::EncodedImage;
use crate::error::Result;

const SCENARIOS: [(&str, HazardCategory, &str); 5] = [
    ("Missing hard hat", HazardCategory::Ppe, "Wear a helmet in the production area"),
    ("Unguarded press", HazardCategory::Machinery, "Restore the machine guard before operation"),
    ("Trip hazard", HazardCategory::Housekeeping, "Clear cables and pallets from the walkway"),
    ("Smoke near welding bay", HazardCategory::Fire, "Check the extinguisher and isolate the area"),
    ("Running on shop floor", HazardCategory::Behavior, "Remind staff to walk in marked lanes"),
];

/// Offline stand-in for the remote model, producing plausible random findings.
pub struct SimulatedGateway {
    latency: Duration,
    hazard_probability: f64,
}

impl SimulatedGateway {
    pub fn new(latency: Duration, hazard_probability: f64) -> Self {
        Self {
            latency,
            hazard_probability: hazard_probability.clamp(0.0, 1.0),
        }
    }

    fn generate(&self) -> SafetyAnalysis {
        let mut rng = rand::thread_rng();

        if !rng.gen_bool(self.hazard_probability) {
            let score = rng.gen_range(85..=100);
            return SafetyAnalysis::new(score, Vec::new(), "No hazards detected", true);
        }

        let count = rng.gen_range(1..=2);
        let hazards: Vec<HazardObservation> = (0..count)
            .map(|_| {
                let (hazard_type, category, recommendation) = SCENARIOS[rng.gen_range(0..SCENARIOS.len())];
                let severity = Severity::ALL[rng.gen_range(1..Severity::ALL.len())];
                let ymin = rng.gen_range(0..800);
                let xmin = rng.gen_range(0..800);
                HazardObservation {
                    hazard_type: hazard_type.to_string(),
                    category,
                    severity,
                    confidence: Some(rng.gen_range(40..=99)),
                    description: format!("{} observed in frame", hazard_type),
                    recommendation: recommendation.to_string(),
                    bounding_box: Some(BoundingBox {
                        ymin,
                        xmin,
                        ymax: ymin + rng.gen_range(50..=200),
                        xmax: xmin + rng.gen_range(50..=200),
                    }),
                }
            })
            .collect();

        let worst = hazards.iter().map(|h| h.severity.level() as i32).max().unwrap_or(0);
        let score = (90 - worst * 20 - rng.gen_range(0..10)).clamp(0, 100);
        let summary = format!("{} hazard(s) detected", hazards.len());
        SafetyAnalysis::new(score, hazards, summary, false)
    }
}

#[async_trait]
impl AnalysisGateway for SimulatedGateway {
    async fn analyze(&self, _image: &EncodedImage) -> Result<SafetyAnalysis> {
        let analysis = self.generate();
        tokio::time::sleep(self.latency).await;
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> EncodedImage {
        EncodedImage {
            bytes: vec![0xFF, 0xD8],
            mime_type: "image/jpeg",
            width: 1,
            height: 1,
        }
    }

    #[tokio::test]
    async fn clear_scenes_are_safe() {
        let gateway = SimulatedGateway::new(Duration::ZERO, 0.0);
        let analysis = gateway.analyze(&image()).await.unwrap();
        assert!(analysis.hazards.is_empty());
        assert!(analysis.safety_score >= 85);
    }

    #[tokio::test]
    async fn hazardous_scenes_report_findings() {
        let gateway = SimulatedGateway::new(Duration::ZERO, 1.0);
        let analysis = gateway.analyze(&image()).await.unwrap();
        assert!(!analysis.hazards.is_empty());
        assert!(analysis.safety_score <= 70);
        for hazard in &analysis.hazards {
            assert!(hazard.severity > Severity::Safe);
        }
    }
}
