use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sentinel_common::{BoundingBox, HazardCategory, HazardObservation, SafetyAnalysis, Severity};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::AnalysisGateway;
use crate::camera::EncodedImage;
use crate::config::GatewayConfig;
use crate::error::{MonitorError, Result};

pub struct HttpAnalysisGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    image: String,
    mime_type: &'a str,
    categories: Vec<&'static str>,
    severities: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    safety_score: f64,
    #[serde(default)]
    is_safe: bool,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    hazards: Vec<HazardPayload>,
}

#[derive(Debug, Deserialize)]
struct HazardPayload {
    #[serde(rename = "type")]
    hazard_type: String,
    category: String,
    severity: String,
    confidence: Option<f64>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    recommendation: String,
    box_2d: Option<[f64; 4]>,
}

impl HttpAnalysisGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| MonitorError::Gateway(format!("Failed to build gateway client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl AnalysisGateway for HttpAnalysisGateway {
    #[instrument(skip(self, image), fields(bytes = image.bytes.len()), level = "debug")]
    async fn analyze(&self, image: &EncodedImage) -> Result<SafetyAnalysis> {
        let request = AnalyzeRequest {
            image: STANDARD.encode(&image.bytes),
            mime_type: image.mime_type,
            categories: HazardCategory::ALL.iter().map(|c| c.as_str()).collect(),
            severities: Severity::ALL.iter().map(|s| s.as_str()).collect(),
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::GatewayStatus(status.as_u16()));
        }

        let body = response.text().await?;
        debug!("Gateway answered with {} bytes", body.len());
        parse_response(&body)
    }
}

/// Decodes a gateway body into a raw analysis.
pub fn parse_response(body: &str) -> Result<SafetyAnalysis> {
    let payload: AnalyzeResponse =
        serde_json::from_str(body).map_err(|e| MonitorError::MalformedResponse(e.to_string()))?;

    if !payload.safety_score.is_finite() {
        return Err(MonitorError::MalformedResponse("safetyScore is not a number".to_string()));
    }

    let hazards = payload
        .hazards
        .into_iter()
        .map(HazardPayload::into_observation)
        .collect::<Result<Vec<_>>>()?;

    let score = payload.safety_score.round().clamp(0.0, 100.0) as i32;
    Ok(SafetyAnalysis::new(score, hazards, payload.summary, payload.is_safe))
}

impl HazardPayload {
    fn into_observation(self) -> Result<HazardObservation> {
        let severity = Severity::from_label(&self.severity).ok_or_else(|| {
            MonitorError::MalformedResponse(format!("unknown severity '{}'", self.severity))
        })?;

        let confidence = self
            .confidence
            .filter(|c| c.is_finite())
            .map(|c| c.round().clamp(0.0, 100.0) as u8);

        let bounding_box = self
            .box_2d
            .map(|b| BoundingBox::from_array(b.map(|v| v.round() as i32)).normalized());

        Ok(HazardObservation {
            hazard_type: self.hazard_type,
            category: HazardCategory::from_label(&self.category),
            severity,
            confidence,
            description: self.description,
            recommendation: self.recommendation,
            bounding_box,
        })
    }
}
