use serde::{Deserialize, Serialize};

use crate::domain::{
    detection::Detection,
    evaluation::EvaluationResult,
    matching::MatchParams,
};

/// Caja tal como la expone la API (`x_1`, `y_1`, `x_2`, `y_2`, `type`, `score`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_1: f64,
    pub y_1: f64,
    pub x_2: f64,
    pub y_2: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub score: f64,
}

impl From<&Detection> for BoundingBox {
    fn from(d: &Detection) -> Self {
        Self {
            x_1: d.bbox.x1,
            y_1: d.bbox.y1,
            x_2: d.bbox.x2,
            y_2: d.bbox.y2,
            kind: d.label.clone(),
            score: d.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub detections: Vec<BoundingBox>,
}

impl DetectionResponse {
    pub fn from_detections(detections: &[Detection]) -> Self {
        Self {
            detections: detections.iter().map(BoundingBox::from).collect(),
        }
    }
}

fn default_iou_threshold() -> f64 {
    MatchParams::default().iou_threshold
}

fn default_require_label_match() -> bool {
    MatchParams::default().require_label_match
}

/// Cuerpo de `POST /evaluate/json`. `annotations` es el payload COCO o simple tal cual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub predictions: Vec<Detection>,
    pub annotations: serde_json::Value,
    #[serde(default)]
    pub image_filename: Option<String>,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f64,
    #[serde(default = "default_require_label_match")]
    pub require_label_match: bool,
}

impl EvaluateRequest {
    pub fn match_params(&self) -> MatchParams {
        MatchParams {
            iou_threshold: self.iou_threshold,
            require_label_match: self.require_label_match,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detections: Option<Vec<BoundingBox>>,
    pub metrics: EvaluationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::BBox;

    #[test]
    fn bounding_box_uses_api_field_names() {
        let d = Detection::new(BBox::new(1.0, 2.0, 3.0, 4.0), "Title", 0.9);
        let v = serde_json::to_value(BoundingBox::from(&d)).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"x_1": 1.0, "y_1": 2.0, "x_2": 3.0, "y_2": 4.0, "type": "Title", "score": 0.9})
        );
    }

    #[test]
    fn evaluate_request_defaults() {
        let req: EvaluateRequest =
            serde_json::from_str(r#"{"predictions": [], "annotations": {}}"#).unwrap();
        assert_eq!(req.match_params(), MatchParams::default());
        assert!(req.image_filename.is_none());
    }
}
