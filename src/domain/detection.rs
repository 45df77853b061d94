use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::geometry::{iou, BBox};

/// Elemento de layout producido por el detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BBox,
    pub label: String,
    pub score: f64, // confianza 0..1, no es una probabilidad calibrada
}

/// Anotación de referencia; sin score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub bbox: BBox,
    pub label: String,
}

impl Detection {
    pub fn new(bbox: BBox, label: impl Into<String>, score: f64) -> Self {
        Self { bbox, label: label.into(), score }
    }
}

impl GroundTruth {
    pub fn new(bbox: BBox, label: impl Into<String>) -> Self {
        Self { bbox, label: label.into() }
    }
}

/// Resumen tipo "2 Text, 1 Title" para los logs.
pub fn summarize_detections(detections: &[Detection]) -> String {
    let mut counts = BTreeMap::new();
    for det in detections {
        *counts.entry(det.label.as_str()).or_insert(0usize) += 1;
    }
    counts
        .iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}

/// NMS por etiqueta: de mayor a menor score, descarta las cajas que solapan
/// `> iou_threshold` con una ya aceptada de la misma etiqueta.
pub fn suppress_overlaps(mut detections: Vec<Detection>, iou_threshold: f64) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        let overlaps = kept
            .iter()
            .any(|k| k.label == det.label && iou(&k.bbox, &det.bbox) > iou_threshold);
        if !overlaps {
            kept.push(det);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_labels_in_order() {
        let b = BBox::new(0.0, 0.0, 1.0, 1.0);
        let dets = vec![
            Detection::new(b, "Title", 0.9),
            Detection::new(b, "Text", 0.8),
            Detection::new(b, "Text", 0.85),
        ];
        assert_eq!(summarize_detections(&dets), "2 Text, 1 Title");
        assert_eq!(summarize_detections(&[]), "");
    }

    #[test]
    fn nms_keeps_best_box_per_label() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let a_shifted = BBox::new(1.0, 0.0, 11.0, 10.0);
        let far = BBox::new(50.0, 50.0, 60.0, 60.0);
        let kept = suppress_overlaps(
            vec![
                Detection::new(a_shifted, "Text", 0.85),
                Detection::new(a, "Text", 0.95),
                Detection::new(a, "Table", 0.9),
                Detection::new(far, "Text", 0.81),
            ],
            0.5,
        );
        let summary: Vec<(&str, f64)> = kept.iter().map(|d| (d.label.as_str(), d.score)).collect();
        assert_eq!(summary, vec![("Text", 0.95), ("Table", 0.9), ("Text", 0.81)]);
    }

    #[test]
    fn detection_round_trips_through_json() {
        let json = r#"{"bbox":[0,0,10,10],"label":"Text","score":0.9}"#;
        let det: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(det, Detection::new(BBox::new(0.0, 0.0, 10.0, 10.0), "Text", 0.9));
    }
}
