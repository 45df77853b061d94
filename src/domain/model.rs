use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelId {
    pub name: String,       // logical name, e.g. "publaynet-layout"
    pub onnx_path: String,  // filesystem path
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorParams {
    pub input_size: u32,        // 640 typical
    pub score_threshold: f32,   // 0..1
    pub nms_iou_threshold: f32, // 0..1, per label
    pub max_detections: usize,
    pub labels: Vec<String>,    // class index -> label
}

/// Etiquetas PubLayNet en el orden de salida del modelo.
pub fn publaynet_labels() -> Vec<String> {
    ["Text", "Title", "List", "Table", "Figure"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl DetectorParams {
    pub fn label_for(&self, class_id: usize) -> String {
        self.labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"))
    }
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            score_threshold: 0.8,
            nms_iou_threshold: 0.5,
            max_detections: 100,
            labels: publaynet_labels(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub model: ModelId,
    pub params: DetectorParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_class_gets_synthetic_label() {
        let p = DetectorParams::default();
        assert_eq!(p.label_for(3), "Table");
        assert_eq!(p.label_for(12), "class_12");
    }
}
