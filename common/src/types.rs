use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Score reported when the gateway did not answer in time or answered with a
/// non-success status. Distinguishes "network lag" from "analyzed and safe".
pub const INCONCLUSIVE_SCORE: i32 = -1;

/// Score recorded when the gateway answered but the answer was unusable.
pub const FAILED_SCORE: i32 = 0;

/// A frame is only considered safe when its score is strictly above this.
pub const SAFE_SCORE_FLOOR: i32 = 80;

/// Absence of confidence means the gateway asserts full certainty.
pub const FULL_CONFIDENCE: u8 = 100;

/// Minimum confidence for categories without an explicit threshold.
pub const DEFAULT_CATEGORY_THRESHOLD: u8 = 50;

/// Upper bound of the normalized bounding box coordinate space.
pub const BOX_SCALE: i32 = 1000;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum HazardCategory {
    #[serde(alias = "ppe")]
    Ppe,
    #[serde(alias = "machinery")]
    Machinery,
    #[serde(alias = "housekeeping")]
    Housekeeping,
    #[serde(alias = "fire")]
    Fire,
    #[serde(alias = "behavior")]
    Behavior,
    #[serde(alias = "other")]
    Other,
}

impl HazardCategory {
    pub const ALL: [HazardCategory; 6] = [
        HazardCategory::Ppe,
        HazardCategory::Machinery,
        HazardCategory::Housekeeping,
        HazardCategory::Fire,
        HazardCategory::Behavior,
        HazardCategory::Other,
    ];

    /// Lenient parse used for gateway payloads; anything unrecognised is `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "PPE" => HazardCategory::Ppe,
            "MACHINERY" => HazardCategory::Machinery,
            "HOUSEKEEPING" => HazardCategory::Housekeeping,
            "FIRE" => HazardCategory::Fire,
            "BEHAVIOR" | "BEHAVIOUR" => HazardCategory::Behavior,
            _ => HazardCategory::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HazardCategory::Ppe => "PPE",
            HazardCategory::Machinery => "MACHINERY",
            HazardCategory::Housekeeping => "HOUSEKEEPING",
            HazardCategory::Fire => "FIRE",
            HazardCategory::Behavior => "BEHAVIOR",
            HazardCategory::Other => "OTHER",
        }
    }
}

/// Totally ordered: `Safe < Low < Medium < High`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Safe,
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Safe, Severity::Low, Severity::Medium, Severity::High];

    /// Numeric level used by the scheduler, 0 through 3.
    pub fn level(&self) -> u8 {
        match self {
            Severity::Safe => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "SAFE" | "NONE" => Some(Severity::Safe),
            "LOW" => Some(Severity::Low),
            "MEDIUM" => Some(Severity::Medium),
            "HIGH" | "CRITICAL" => Some(Severity::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Safe => "SAFE",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

/// Minimum severity that raises the alarm on its own; `Off` disables the
/// severity trigger so only the score threshold applies.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeverityTrigger {
    #[serde(alias = "off")]
    Off,
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "medium")]
    Medium,
    #[default]
    #[serde(alias = "high")]
    High,
}

impl SeverityTrigger {
    pub fn threshold(&self) -> Option<Severity> {
        match self {
            SeverityTrigger::Off => None,
            SeverityTrigger::Low => Some(Severity::Low),
            SeverityTrigger::Medium => Some(Severity::Medium),
            SeverityTrigger::High => Some(Severity::High),
        }
    }
}

/// Box on the 0-1000 normalized scale, ordered ymin/xmin/ymax/xmax.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub ymin: i32,
    pub xmin: i32,
    pub ymax: i32,
    pub xmax: i32,
}

impl BoundingBox {
    pub fn from_array(coords: [i32; 4]) -> Self {
        Self {
            ymin: coords[0],
            xmin: coords[1],
            ymax: coords[2],
            xmax: coords[3],
        }
    }

    pub fn to_array(&self) -> [i32; 4] {
        [self.ymin, self.xmin, self.ymax, self.xmax]
    }

    /// Clamps every coordinate into `[0, BOX_SCALE]` and swaps inverted corners.
    pub fn normalized(&self) -> Self {
        let clamp = |v: i32| v.clamp(0, BOX_SCALE);
        let (y0, y1) = (clamp(self.ymin), clamp(self.ymax));
        let (x0, x1) = (clamp(self.xmin), clamp(self.xmax));
        Self {
            ymin: y0.min(y1),
            xmin: x0.min(x1),
            ymax: y0.max(y1),
            xmax: x0.max(x1),
        }
    }

    pub fn width(&self) -> i32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> i32 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HazardObservation {
    #[serde(rename = "type")]
    pub hazard_type: String,
    pub category: HazardCategory,
    pub severity: Severity,
    pub confidence: Option<u8>,
    pub description: String,
    pub recommendation: String,
    pub bounding_box: Option<BoundingBox>,
}

impl HazardObservation {
    pub fn effective_confidence(&self) -> u8 {
        self.confidence.unwrap_or(FULL_CONFIDENCE)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SafetyAnalysis {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub safety_score: i32,
    pub hazards: Vec<HazardObservation>,
    pub summary: String,
    pub is_safe: bool,
}

impl SafetyAnalysis {
    pub fn new(safety_score: i32, hazards: Vec<HazardObservation>, summary: impl Into<String>, is_safe: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            safety_score,
            hazards,
            summary: summary.into(),
            is_safe,
        }
    }

    /// Sentinel for a gateway timeout or non-success status. Reported as safe so
    /// transient lag never flaps the alarm.
    pub fn inconclusive(summary: impl Into<String>) -> Self {
        Self::new(INCONCLUSIVE_SCORE, Vec::new(), summary, true)
    }

    /// Result recorded when the gateway answered with something unusable.
    pub fn failed(summary: impl Into<String>) -> Self {
        Self::new(FAILED_SCORE, Vec::new(), summary, false)
    }

    pub fn is_inconclusive(&self) -> bool {
        self.safety_score == INCONCLUSIVE_SCORE
    }

    pub fn max_severity(&self) -> Severity {
        self.hazards
            .iter()
            .map(|h| h.severity)
            .max()
            .unwrap_or(Severity::Safe)
    }

    pub fn has_severity(&self, severity: Severity) -> bool {
        self.hazards.iter().any(|h| h.severity == severity)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertState {
    #[default]
    Idle,
    Active,
    Silenced,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Idle => "IDLE",
            AlertState::Active => "ACTIVE",
            AlertState::Silenced => "SILENCED",
        }
    }
}

/// Per-category minimum confidence; unmapped categories use
/// [`DEFAULT_CATEGORY_THRESHOLD`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct CategoryThresholds(HashMap<HazardCategory, u8>);

impl CategoryThresholds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: HazardCategory, threshold: u8) -> Self {
        self.0.insert(category, threshold);
        self
    }

    pub fn get(&self, category: HazardCategory) -> u8 {
        self.0
            .get(&category)
            .copied()
            .unwrap_or(DEFAULT_CATEGORY_THRESHOLD)
    }

    pub fn set(&mut self, category: HazardCategory, threshold: u8) {
        self.0.insert(category, threshold);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HazardCategory, &u8)> {
        self.0.iter()
    }
}

/// The user-editable alerting surface.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
#[validate(schema(function = "validate_sms_target", skip_on_field_errors = false))]
#[serde(default)]
pub struct AlertSettings {
    #[validate(range(min = 0, max = 100))]
    pub min_safety_score: i32,
    pub min_severity_trigger: SeverityTrigger,
    pub sound_enabled: bool,
    #[validate(custom = "validate_thresholds")]
    pub category_thresholds: CategoryThresholds,
    pub sms_enabled: bool,
    pub phone_number: String,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            min_safety_score: 60,
            min_severity_trigger: SeverityTrigger::High,
            sound_enabled: true,
            category_thresholds: CategoryThresholds::default(),
            sms_enabled: false,
            phone_number: String::new(),
        }
    }
}

fn validate_thresholds(thresholds: &CategoryThresholds) -> Result<(), ValidationError> {
    if thresholds.iter().any(|(_, value)| *value > 100) {
        return Err(ValidationError::new("threshold_out_of_range"));
    }
    Ok(())
}

fn validate_sms_target(settings: &AlertSettings) -> Result<(), ValidationError> {
    if settings.sms_enabled && settings.phone_number.trim().is_empty() {
        return Err(ValidationError::new("phone_number_required"));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CameraInfo {
    pub id: String,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PredictionKind {
    Fatigue,
    HeadInjury,
    Congestion,
}

/// Advisory annotation derived from recent history. Never feeds alerting.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RiskPrediction {
    pub kind: PredictionKind,
    pub confidence: u8,
    pub rationale: String,
}
